use super::input_descriptor::InputDescriptor;

use anyhow::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A presentation definition is a JSON object that describes the information a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier)
/// requires of a [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder).
///
/// Only the members needed to answer an mdoc request are modelled; other members
/// (`name`, `purpose`, `format`, `submission_requirements`) are accepted and ignored.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition](https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-definition)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PresentationDefinition {
    id: String,
    input_descriptors: Vec<InputDescriptor>,
}

impl PresentationDefinition {
    pub fn id(&self) -> &String {
        &self.id
    }

    /// Return the input descriptors of the presentation definition.
    pub fn input_descriptors(&self) -> &[InputDescriptor] {
        &self.input_descriptors
    }
}

impl TryFrom<Json> for PresentationDefinition {
    type Error = Error;

    fn try_from(value: Json) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(Into::into)
    }
}
