use super::{input_descriptor::JsonPath, object::TypedParameter};

use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A DescriptorMapId is a unique identifier for a DescriptorMap.
pub type DescriptorMapId = String;

/// Presentation Submissions express how the inputs presented to a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier)
/// relate to the requirements of a
/// [PresentationDefinition](super::presentation_definition::PresentationDefinition).
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    id: uuid::Uuid,
    definition_id: DescriptorMapId,
    descriptor_map: Vec<DescriptorMap>,
}

impl TypedParameter for PresentationSubmission {
    const KEY: &'static str = "presentation_submission";
}

impl PresentationSubmission {
    /// The `id` MUST be a unique identifier, the `definition_id` MUST be the id of the
    /// presentation definition being answered.
    pub fn new(
        id: uuid::Uuid,
        definition_id: DescriptorMapId,
        descriptor_map: Vec<DescriptorMap>,
    ) -> Self {
        Self {
            id,
            definition_id,
            descriptor_map,
        }
    }

    pub fn id(&self) -> &uuid::Uuid {
        &self.id
    }

    pub fn definition_id(&self) -> &String {
        &self.definition_id
    }

    pub fn descriptor_map(&self) -> &Vec<DescriptorMap> {
        &self.descriptor_map
    }
}

impl TryFrom<Json> for PresentationSubmission {
    type Error = Error;

    fn try_from(raw: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(raw).map_err(Into::into)
    }
}

impl From<PresentationSubmission> for Json {
    fn from(value: PresentationSubmission) -> Self {
        let descriptor_map = value
            .descriptor_map
            .into_iter()
            .map(Json::from)
            .collect::<Vec<_>>();
        serde_json::json!({
            "id": value.id.to_string(),
            "definition_id": value.definition_id,
            "descriptor_map": descriptor_map,
        })
    }
}

/// Descriptor Maps describe where, in the submitted token, the input for one input descriptor lives.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMap {
    pub id: DescriptorMapId,
    pub format: String,
    pub path: JsonPath,
}

impl From<DescriptorMap> for Json {
    fn from(value: DescriptorMap) -> Self {
        serde_json::json!({
            "id": value.id,
            "format": value.format,
            "path": value.path,
        })
    }
}
