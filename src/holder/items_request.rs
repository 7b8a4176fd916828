use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::presentation_definition::PresentationDefinition;

pub type DocType = String;
pub type NameSpace = String;
pub type DataElementIdentifier = String;

/// Path of the field whose `filter.const` names the requested document type.
pub const DOCTYPE_PATH: &str = "$.mdoc.doctype";
/// Path of the field whose `filter.const` names the requested namespace.
pub const NAMESPACE_PATH: &str = "$.mdoc.namespace";
/// Prefix of every mdoc field path.
pub const MDOC_PATH_PREFIX: &str = "$.mdoc.";

type ItemsByDocType = BTreeMap<DocType, BTreeMap<NameSpace, Vec<DataElementIdentifier>>>;

/// The data elements a verifier asked for, by document type and namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemsRequested(pub ItemsByDocType);

/// The subset of [ItemsRequested] the holder agreed to disclose.
///
/// A selection without any document type means the holder declined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(pub ItemsByDocType);

/// Result of a successful `receive_request`, serialized as
/// `{"valid_items_requested": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidItemsRequested {
    pub valid_items_requested: ItemsRequested,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ItemsRequested> for Selection {
    /// Select everything that was requested.
    fn from(value: ItemsRequested) -> Self {
        Self(value.0)
    }
}

impl ItemsRequested {
    /// Read the requested mdoc data elements out of a presentation definition.
    ///
    /// Only the first input descriptor is considered. Its constraints must contain a
    /// [DOCTYPE_PATH] and a [NAMESPACE_PATH] field with a string `filter.const`, otherwise
    /// `None` is returned. Every other field that declares `intent_to_retain` (either way)
    /// contributes its first path, minus [MDOC_PATH_PREFIX], in declaration order.
    ///
    /// The [DOCTYPE_PATH] and [NAMESPACE_PATH] fields select the document and are never
    /// reported as data elements, even when they declare `intent_to_retain`.
    pub fn from_presentation_definition(definition: &PresentationDefinition) -> Option<Self> {
        let Some(descriptor) = definition.input_descriptors().first() else {
            debug!(definition = %definition.id(), "presentation definition has no input descriptors");
            return None;
        };

        let fields = descriptor.constraints().fields();

        let const_of = |sentinel: &str| {
            fields
                .iter()
                .find(|field| field.first_path() == Some(sentinel))
                .and_then(|field| field.filter_const())
        };

        let Some(doc_type) = const_of(DOCTYPE_PATH) else {
            debug!(descriptor = %descriptor.id(), "no document type requested");
            return None;
        };
        let Some(namespace) = const_of(NAMESPACE_PATH) else {
            debug!(descriptor = %descriptor.id(), "no namespace requested");
            return None;
        };

        let mut elements: Vec<DataElementIdentifier> = Vec::new();
        for field in fields.iter().filter(|field| field.intent_to_retain().is_some()) {
            let Some(path) = field.first_path() else {
                continue;
            };
            if path == DOCTYPE_PATH || path == NAMESPACE_PATH {
                continue;
            }
            let element = path.strip_prefix(MDOC_PATH_PREFIX).unwrap_or(path);
            if !elements.iter().any(|e| e == element) {
                elements.push(element.to_owned());
            }
        }

        Some(Self(BTreeMap::from([(
            doc_type.to_owned(),
            BTreeMap::from([(namespace.to_owned(), elements)]),
        )])))
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    const MDL: &str = "org.iso.18013.5.1.mDL";
    const MDL_NAMESPACE: &str = "org.iso.18013.5.1";

    fn definition(fields: serde_json::Value) -> PresentationDefinition {
        serde_json::from_value(json!({
            "id": "mDL-request",
            "input_descriptors": [{
                "id": MDL,
                "format": { "mso_mdoc": { "alg": ["ES256"] } },
                "constraints": { "limit_disclosure": "required", "fields": fields }
            }]
        }))
        .unwrap()
    }

    fn sentinels() -> Vec<serde_json::Value> {
        vec![
            json!({ "path": ["$.mdoc.doctype"], "filter": { "type": "string", "const": MDL } }),
            json!({ "path": ["$.mdoc.namespace"], "filter": { "type": "string", "const": MDL_NAMESPACE } }),
        ]
    }

    #[test]
    fn mdl_given_and_family_name() {
        let mut fields = sentinels();
        fields.push(json!({ "path": ["$.mdoc.given_name"], "intent_to_retain": true }));
        fields.push(json!({ "path": ["$.mdoc.family_name"], "intent_to_retain": true }));

        let items = ItemsRequested::from_presentation_definition(&definition(fields.into()))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&items).unwrap(),
            json!({ MDL: { MDL_NAMESPACE: ["given_name", "family_name"] } })
        );
    }

    #[test]
    fn order_is_preserved_and_absent_intent_is_skipped() {
        let mut fields = sentinels();
        fields.push(json!({ "path": ["$.mdoc.portrait"], "intent_to_retain": false }));
        fields.push(json!({ "path": ["$.mdoc.birth_date"] }));
        fields.push(json!({ "path": ["$.mdoc.age_over_21"], "intent_to_retain": true }));
        fields.push(json!({ "path": ["$.mdoc.portrait"], "intent_to_retain": true }));
        fields.push(json!({ "intent_to_retain": true }));

        let items = ItemsRequested::from_presentation_definition(&definition(fields.into()))
            .unwrap();

        assert_eq!(
            items.0[MDL][MDL_NAMESPACE],
            vec!["portrait".to_string(), "age_over_21".to_string()]
        );
    }

    #[test]
    fn sentinels_only_yield_an_empty_element_list() {
        let items =
            ItemsRequested::from_presentation_definition(&definition(sentinels().into())).unwrap();
        assert!(items.0[MDL][MDL_NAMESPACE].is_empty());
    }

    #[test]
    fn retained_doctype_and_namespace_are_not_elements() {
        let fields = json!([
            { "path": ["$.mdoc.doctype"], "filter": { "const": MDL }, "intent_to_retain": false },
            { "path": ["$.mdoc.namespace"], "filter": { "const": MDL_NAMESPACE }, "intent_to_retain": true },
            { "path": ["$.mdoc.given_name"], "intent_to_retain": false }
        ]);

        let items = ItemsRequested::from_presentation_definition(&definition(fields)).unwrap();

        assert_eq!(
            serde_json::to_value(&items).unwrap(),
            json!({ MDL: { MDL_NAMESPACE: ["given_name"] } })
        );
    }

    #[test]
    fn missing_doctype_or_namespace() {
        let only_namespace = vec![sentinels().remove(1)];
        assert!(
            ItemsRequested::from_presentation_definition(&definition(only_namespace.into()))
                .is_none()
        );

        let only_doctype = vec![sentinels().remove(0)];
        assert!(
            ItemsRequested::from_presentation_definition(&definition(only_doctype.into()))
                .is_none()
        );

        let non_string_const = json!([
            { "path": ["$.mdoc.doctype"], "filter": { "const": 18013 } },
            { "path": ["$.mdoc.namespace"], "filter": { "const": MDL_NAMESPACE } }
        ]);
        assert!(
            ItemsRequested::from_presentation_definition(&definition(non_string_const)).is_none()
        );
    }

    #[test]
    fn only_the_first_descriptor_is_read() {
        let definition: PresentationDefinition = serde_json::from_value(json!({
            "id": "two-descriptors",
            "input_descriptors": [
                { "id": "first", "constraints": { "fields": [] } },
                { "id": "second", "constraints": { "fields": sentinels() } }
            ]
        }))
        .unwrap();
        assert!(ItemsRequested::from_presentation_definition(&definition).is_none());
    }

    #[test]
    fn empty_selection() {
        assert!(Selection::default().is_empty());
        let selection: Selection = serde_json::from_value(json!({ MDL: {} })).unwrap();
        assert!(!selection.is_empty());
    }
}
