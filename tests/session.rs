use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::prelude::*;
use openid4vp_mdl_presentment::{
    core::{
        authorization_request::AuthorizationRequestObject,
        presentation_submission::PresentationSubmission,
        response::{
            parameters::{ErrorCode, ErrorDescription, State, VpToken},
            AuthorizationResponse, Consent, DispatchOutcome,
        },
    },
    holder::{
        consent::{CredentialDocument, DeviceAuthentication, DocumentEncoder, EncodingRequest},
        engine::{AuthorizationEngine, RequestKind, ResolvedRequest},
        items_request::Selection,
        PresentmentError, Session, SessionBuilder, Status, WalletParameters,
    },
};
use serde_json::{json, Value as Json};
use url::Url;

const MDL: &str = "org.iso.18013.5.1.mDL";
const MDL_NAMESPACE: &str = "org.iso.18013.5.1";
const LINK: &str = "mdoc-openid4vp://?client_id=x509_san_dns%3Averifier.example.com&request_uri=https%3A%2F%2Fverifier.example.com%2Frequest%2F1";

#[derive(Clone, Copy)]
enum Resolution {
    Presentation,
    Unsecured,
    Authentication,
    NoNamespace,
    Unreachable,
}

struct MockEngine {
    resolution: Resolution,
    /// `None` simulates a transport failure.
    outcome: Option<DispatchOutcome>,
    resolutions: AtomicUsize,
    dispatched: Mutex<Vec<AuthorizationResponse>>,
}

impl MockEngine {
    fn new(resolution: Resolution, outcome: Option<DispatchOutcome>) -> Arc<Self> {
        Arc::new(Self {
            resolution,
            outcome,
            resolutions: AtomicUsize::new(0),
            dispatched: Mutex::new(vec![]),
        })
    }

    fn accepting(redirect: Option<&str>) -> Arc<Self> {
        Self::new(
            Resolution::Presentation,
            Some(DispatchOutcome::Accepted {
                redirect: redirect.map(|r| r.parse().unwrap()),
            }),
        )
    }

    fn dispatched(&self) -> Vec<AuthorizationResponse> {
        self.dispatched.lock().unwrap().clone()
    }
}

fn presentation_definition(fields: Json) -> Json {
    json!({
        "id": "mDL-sample-req",
        "input_descriptors": [{
            "id": MDL,
            "format": { "mso_mdoc": { "alg": ["ES256"] } },
            "constraints": { "limit_disclosure": "required", "fields": fields }
        }]
    })
}

fn request_object(response_type: &str, definition: Json) -> AuthorizationRequestObject {
    serde_json::from_value(json!({
        "client_id": "x509_san_dns:verifier.example.com",
        "response_type": response_type,
        "response_mode": "direct_post",
        "response_uri": "https://verifier.example.com/response",
        "nonce": "n-0S6_WzA2Mj",
        "state": "af0ifjsldkj",
        "presentation_definition": definition
    }))
    .unwrap()
}

fn mdl_fields() -> Json {
    json!([
        { "path": ["$.mdoc.doctype"], "filter": { "type": "string", "const": MDL } },
        { "path": ["$.mdoc.namespace"], "filter": { "type": "string", "const": MDL_NAMESPACE } },
        { "path": ["$.mdoc.given_name"], "intent_to_retain": true },
        { "path": ["$.mdoc.family_name"], "intent_to_retain": true }
    ])
}

#[async_trait]
impl AuthorizationEngine for MockEngine {
    async fn resolve_request(&self, link: Url) -> Result<ResolvedRequest> {
        assert_eq!(link.scheme(), "mdoc-openid4vp");
        self.resolutions.fetch_add(1, Ordering::SeqCst);

        let definition = presentation_definition(mdl_fields());
        Ok(match self.resolution {
            Resolution::Presentation => ResolvedRequest::Secured(RequestKind::Presentation {
                request: request_object("vp_token", definition.clone()),
                presentation_definition: serde_json::from_value(definition).unwrap(),
            }),
            Resolution::Unsecured => {
                ResolvedRequest::Unsecured(request_object("vp_token", definition))
            }
            Resolution::Authentication => ResolvedRequest::Secured(RequestKind::Authentication(
                request_object("id_token", definition),
            )),
            Resolution::NoNamespace => {
                let definition = presentation_definition(json!([
                    { "path": ["$.mdoc.doctype"], "filter": { "const": MDL } },
                    { "path": ["$.mdoc.given_name"], "intent_to_retain": true }
                ]));
                ResolvedRequest::Secured(RequestKind::Presentation {
                    request: request_object("vp_token", definition.clone()),
                    presentation_definition: serde_json::from_value(definition).unwrap(),
                })
            }
            Resolution::Unreachable => bail!("connection refused"),
        })
    }

    fn build_response(
        &self,
        request: &AuthorizationRequestObject,
        consent: Consent,
    ) -> Result<AuthorizationResponse> {
        AuthorizationResponse::new(request, consent)
    }

    async fn dispatch(
        &self,
        _request: &AuthorizationRequestObject,
        response: AuthorizationResponse,
    ) -> Result<DispatchOutcome> {
        self.dispatched.lock().unwrap().push(response);
        match &self.outcome {
            Some(outcome) => Ok(outcome.clone()),
            None => bail!("connection reset"),
        }
    }
}

/// Encodes the selection itself as CBOR, so tests can read back what was disclosed.
#[derive(Default)]
struct CborEncoder {
    produce_nothing: bool,
    calls: Mutex<Vec<(usize, DeviceAuthentication, Vec<u8>)>>,
}

impl DocumentEncoder for CborEncoder {
    fn encode(&self, request: EncodingRequest<'_>) -> Result<Option<Vec<u8>>> {
        self.calls.lock().unwrap().push((
            request.documents.len(),
            request.device_authentication,
            request.handover.handover_info_hash().to_vec(),
        ));
        if self.produce_nothing {
            return Ok(None);
        }
        let mut bytes = vec![];
        ciborium::into_writer(request.selection, &mut bytes)?;
        Ok(Some(bytes))
    }
}

fn wallet_parameters() -> WalletParameters {
    WalletParameters {
        documents: vec![
            CredentialDocument {
                doc_type: MDL.into(),
                encoded: vec![0xa0],
            },
            CredentialDocument {
                doc_type: "org.iso.23220.photoid.1".into(),
                encoded: vec![0xa0],
            },
        ],
        signing_key_jwk: include_str!("examples/holder.jwk").into(),
    }
}

fn builder(engine: Arc<MockEngine>, encoder: Arc<CborEncoder>) -> SessionBuilder {
    Session::builder()
        .with_wallet_parameters(wallet_parameters())
        .with_request_payload(LINK)
        .with_engine(engine)
        .with_encoder(encoder)
}

fn session(engine: Arc<MockEngine>, encoder: Arc<CborEncoder>) -> Session {
    builder(engine, encoder).build().unwrap()
}

fn given_name_only() -> Selection {
    Selection(BTreeMap::from([(
        MDL.to_string(),
        BTreeMap::from([(MDL_NAMESPACE.to_string(), vec!["given_name".to_string()])]),
    )]))
}

#[tokio::test]
async fn requested_items_are_reported() {
    let mut session = session(MockEngine::accepting(None), Default::default());
    assert_eq!(session.status(), Status::Initialized);

    let requested = session.receive_request().await.unwrap();

    assert_eq!(
        serde_json::to_value(&requested).unwrap(),
        json!({
            "valid_items_requested": {
                MDL: { MDL_NAMESPACE: ["given_name", "family_name"] }
            }
        })
    );
    assert_eq!(session.status(), Status::RequestReceived);
    assert_eq!(
        session.presentation_definition().unwrap().id(),
        "mDL-sample-req"
    );
}

#[tokio::test]
async fn declining_sends_access_denied() {
    let engine = MockEngine::accepting(None);
    let encoder = Arc::new(CborEncoder::default());
    let mut session = session(engine.clone(), encoder.clone());

    let requested = session.receive_request().await.unwrap();
    let redirect = session
        .send_response(false, requested.valid_items_requested.into())
        .await
        .unwrap();

    assert_eq!(redirect, None);
    assert_eq!(session.status(), Status::ResponseSent);
    assert!(encoder.calls.lock().unwrap().is_empty());

    let dispatched = engine.dispatched();
    assert_eq!(dispatched.len(), 1);
    let parameters = dispatched[0].parameters();
    assert_eq!(
        parameters.get::<ErrorCode>().unwrap().unwrap().0,
        "access_denied"
    );
    assert_eq!(
        parameters.get::<ErrorDescription>().unwrap().unwrap().0,
        "Rejected"
    );
    assert!(parameters.get::<VpToken>().is_none());
}

#[tokio::test]
async fn empty_selection_overrides_acceptance() {
    let engine = MockEngine::accepting(None);
    let encoder = Arc::new(CborEncoder::default());
    let mut session = session(engine.clone(), encoder.clone());

    session.receive_request().await.unwrap();
    session
        .send_response(true, Selection::default())
        .await
        .unwrap();

    assert!(encoder.calls.lock().unwrap().is_empty());
    let dispatched = engine.dispatched();
    assert_eq!(
        dispatched[0].parameters().get::<ErrorCode>().unwrap().unwrap().0,
        "access_denied"
    );
}

#[tokio::test]
async fn accepted_selection_is_encoded_and_sent() {
    let engine = MockEngine::accepting(Some("https://verifier.example.com/done?session=1"));
    let encoder = Arc::new(CborEncoder::default());
    let mut session = session(engine.clone(), encoder.clone());

    session.receive_request().await.unwrap();
    let redirect = session
        .send_response(true, given_name_only())
        .await
        .unwrap();

    let expected: Url = "https://verifier.example.com/done?session=1".parse().unwrap();
    assert_eq!(redirect.as_ref(), Some(&expected));
    assert_eq!(session.redirect(), Some(&expected));
    assert_eq!(session.status(), Status::ResponseSent);

    let calls = encoder.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (documents, device_authentication, handover_hash) = &calls[0];
    assert_eq!(*documents, 2);
    assert_eq!(*device_authentication, DeviceAuthentication::Signature);
    assert_eq!(handover_hash.len(), 32);

    let dispatched = engine.dispatched();
    let parameters = dispatched[0].parameters();

    let vp_token = parameters.get::<VpToken>().unwrap().unwrap();
    let device_response = BASE64_URL_SAFE_NO_PAD.decode(vp_token.0).unwrap();
    let disclosed: Selection = ciborium::from_reader(device_response.as_slice()).unwrap();
    assert_eq!(disclosed, given_name_only());

    let submission = parameters.get::<PresentationSubmission>().unwrap().unwrap();
    assert_eq!(submission.definition_id(), "mDL-sample-req");
    assert!(submission.descriptor_map().is_empty());

    assert_eq!(parameters.get::<State>().unwrap().unwrap().0, "af0ifjsldkj");
    assert!(parameters.get::<ErrorCode>().is_none());
}

#[tokio::test]
async fn mac_device_authentication_is_passed_through() {
    let encoder = Arc::new(CborEncoder::default());
    let mut session = builder(MockEngine::accepting(None), encoder.clone())
        .with_device_authentication(DeviceAuthentication::Mac)
        .build()
        .unwrap();

    session.receive_request().await.unwrap();
    session
        .send_response(true, given_name_only())
        .await
        .unwrap();

    assert_eq!(encoder.calls.lock().unwrap()[0].1, DeviceAuthentication::Mac);
}

#[tokio::test]
async fn unsecured_request_is_refused() {
    let engine = MockEngine::new(Resolution::Unsecured, None);
    let mut session = session(engine, Default::default());

    let err = session.receive_request().await.unwrap_err();
    assert!(matches!(err, PresentmentError::InsecureRequest));
    assert_eq!(session.status(), Status::Error);

    let err = session.receive_request().await.unwrap_err();
    assert!(matches!(err, PresentmentError::SessionNotReady(_)));
}

#[tokio::test]
async fn rejected_dispatch_fails_the_session() {
    let engine = MockEngine::new(
        Resolution::Presentation,
        Some(DispatchOutcome::Rejected {
            reason: "invalid_signature".into(),
        }),
    );
    let mut session = session(engine, Default::default());

    session.receive_request().await.unwrap();
    let err = session
        .send_response(true, given_name_only())
        .await
        .unwrap_err();

    match err {
        PresentmentError::DispatchRejected(reason) => assert_eq!(reason, "invalid_signature"),
        other => panic!("expected DispatchRejected, got {other:?}"),
    }
    assert_eq!(session.status(), Status::Error);
    assert!(session.redirect().is_none());
}

#[tokio::test]
async fn transport_failure_is_not_a_rejection() {
    let engine = MockEngine::new(Resolution::Presentation, None);
    let mut session = session(engine, Default::default());

    session.receive_request().await.unwrap();
    let err = session
        .send_response(true, given_name_only())
        .await
        .unwrap_err();

    assert!(matches!(err, PresentmentError::Dispatch(_)));
    assert_eq!(session.status(), Status::Error);
}

#[tokio::test]
async fn responding_before_receiving() {
    let engine = MockEngine::accepting(None);
    let mut session = session(engine.clone(), Default::default());

    let err = session
        .send_response(true, given_name_only())
        .await
        .unwrap_err();

    assert!(matches!(err, PresentmentError::SessionNotReady(_)));
    assert_eq!(session.status(), Status::Error);
    assert!(engine.dispatched().is_empty());
}

#[tokio::test]
async fn responding_twice() {
    let engine = MockEngine::accepting(None);
    let mut session = session(engine.clone(), Default::default());

    session.receive_request().await.unwrap();
    session
        .send_response(true, given_name_only())
        .await
        .unwrap();

    let err = session
        .send_response(true, given_name_only())
        .await
        .unwrap_err();
    assert!(matches!(err, PresentmentError::SessionNotReady(_)));
    assert_eq!(engine.dispatched().len(), 1);
}

#[tokio::test]
async fn receiving_again_resolves_again() {
    let engine = MockEngine::accepting(None);
    let mut session = session(engine.clone(), Default::default());

    session.receive_request().await.unwrap();
    session.receive_request().await.unwrap();

    assert_eq!(engine.resolutions.load(Ordering::SeqCst), 2);
    assert_eq!(session.status(), Status::RequestReceived);
}

#[tokio::test]
async fn authentication_requests_are_unsupported() {
    let engine = MockEngine::new(Resolution::Authentication, None);
    let mut session = session(engine, Default::default());

    let err = session.receive_request().await.unwrap_err();
    assert!(matches!(err, PresentmentError::UnsupportedRequestKind(_)));
    assert_eq!(session.status(), Status::Error);
}

#[tokio::test]
async fn definition_without_namespace() {
    let engine = MockEngine::new(Resolution::NoNamespace, None);
    let mut session = session(engine, Default::default());

    let err = session.receive_request().await.unwrap_err();
    assert!(matches!(err, PresentmentError::InvalidPresentationDefinition));
    assert_eq!(session.status(), Status::Error);
}

#[tokio::test]
async fn resolution_failure() {
    let engine = MockEngine::new(Resolution::Unreachable, None);
    let mut session = session(engine, Default::default());

    let err = session.receive_request().await.unwrap_err();
    assert!(matches!(err, PresentmentError::RequestResolution(_)));
    assert_eq!(session.status(), Status::Error);
}

#[tokio::test]
async fn encoder_without_output() {
    let engine = MockEngine::accepting(None);
    let encoder = Arc::new(CborEncoder {
        produce_nothing: true,
        ..Default::default()
    });
    let mut session = session(engine.clone(), encoder);

    session.receive_request().await.unwrap();
    let err = session
        .send_response(true, given_name_only())
        .await
        .unwrap_err();

    assert!(matches!(err, PresentmentError::DocumentEncodingError));
    assert_eq!(session.status(), Status::Error);
    assert!(engine.dispatched().is_empty());
}

#[test]
fn construction_is_validated() {
    let engine = MockEngine::accepting(None);
    let encoder = Arc::new(CborEncoder::default());

    let err = builder(engine.clone(), encoder.clone())
        .with_request_payload(vec![0xff, 0xfe])
        .build()
        .unwrap_err();
    assert!(matches!(err, PresentmentError::MalformedRequestLink(_)));

    let err = builder(engine.clone(), encoder.clone())
        .with_request_payload("not a link")
        .build()
        .unwrap_err();
    assert!(matches!(err, PresentmentError::MalformedRequestLink(_)));

    let err = builder(engine.clone(), encoder.clone())
        .with_wallet_parameters(WalletParameters {
            documents: vec![],
            ..wallet_parameters()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, PresentmentError::CredentialDataUnavailable(_)));

    let err = builder(engine.clone(), encoder.clone())
        .with_wallet_parameters(WalletParameters {
            signing_key_jwk: String::new(),
            ..wallet_parameters()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, PresentmentError::CredentialDataUnavailable(_)));

    let err = builder(engine.clone(), encoder.clone())
        .with_wallet_parameters(WalletParameters {
            signing_key_jwk: r#"{"kty":"EC","crv":"P-256"}"#.into(),
            ..wallet_parameters()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, PresentmentError::InvalidWalletConfiguration(_)));

    let err = Session::builder()
        .with_wallet_parameters(wallet_parameters())
        .with_request_payload(LINK)
        .with_encoder(encoder)
        .build()
        .unwrap_err();
    assert!(matches!(err, PresentmentError::InvalidWalletConfiguration(_)));
}
