use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A JSONPath is a string that represents a path to a specific value within a JSON object.
///
/// For syntax details, see [https://identity.foundation/presentation-exchange/spec/v2.0.0/#jsonpath-syntax-definition](https://identity.foundation/presentation-exchange/spec/v2.0.0/#jsonpath-syntax-definition)
pub type JsonPath = String;

/// Input Descriptors are objects used to describe the information a
/// [Verifier](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:verifier) requires of a
/// [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder).
///
/// Only `id` and `constraints` are read; `name`, `purpose` and `format` are ignored.
///
/// See: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object](https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InputDescriptor {
    id: String,
    #[serde(default)]
    constraints: Constraints,
}

impl InputDescriptor {
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }
}

/// Constraints are objects used to describe the constraints that a
/// [Holder](https://identity.foundation/presentation-exchange/spec/v2.0.0/#term:holder)
/// must satisfy to fulfill an Input Descriptor.
///
/// For more information, see: [https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object](https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<ConstraintsField>,
}

impl Constraints {
    /// Returns the fields of the constraints object, in the order the verifier declared them.
    pub fn fields(&self) -> &[ConstraintsField] {
        &self.fields
    }
}

/// A single field constraint of an [InputDescriptor].
///
/// `path` is kept as a plain list rather than a non-empty one: mdoc definitions in the wild
/// occasionally ship fields without a path, and those fields are skipped rather than
/// failing the whole definition.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstraintsField {
    #[serde(default)]
    path: Vec<JsonPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent_to_retain: Option<bool>,
}

impl ConstraintsField {
    /// The first declared path, which is the one mdoc requests are keyed on.
    pub fn first_path(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// The `const` member of the filter, when it is a string.
    pub fn filter_const(&self) -> Option<&str> {
        self.filter.as_ref()?.get("const")?.as_str()
    }

    /// The declared intent to retain, `None` when the verifier did not declare one.
    pub fn intent_to_retain(&self) -> Option<bool> {
        self.intent_to_retain
    }
}
