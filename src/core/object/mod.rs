use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// An untyped JSON object from which [TypedParameter]s are read.
///
/// Backs request objects, wallet metadata and authorization responses.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UntypedObject(pub(crate) Map<String, Json>);

/// A strongly typed entry of an [UntypedObject], keyed by [TypedParameter::KEY].
pub trait TypedParameter:
    TryFrom<Json, Error = anyhow::Error> + Into<Json> + Clone + std::fmt::Debug
{
    const KEY: &'static str;
}

impl UntypedObject {
    /// Get a [TypedParameter] from the object or fall back to its default.
    pub fn get_or_default<T: TypedParameter + Default>(&self) -> Result<T> {
        Ok(self
            .0
            .get(T::KEY)
            .cloned()
            .map(TryInto::try_into)
            .transpose()?
            .unwrap_or_default())
    }

    /// Get a [TypedParameter] from the object.
    ///
    /// Note that this method clones the underlying data.
    pub fn get<T: TypedParameter>(&self) -> Option<Result<T>> {
        Some(self.0.get(T::KEY)?.clone().try_into())
    }

    /// Insert a [TypedParameter], replacing any previous entry under the same key.
    pub fn insert<T: TypedParameter>(&mut self, t: T) -> &mut Self {
        self.0.insert(T::KEY.to_owned(), t.into());
        self
    }

    /// Raw access to a member of the object.
    pub fn get_raw(&self, key: &str) -> Option<&Json> {
        self.0.get(key)
    }

    /// Flatten the object into `application/x-www-form-urlencoded` pairs.
    ///
    /// String members are sent as-is, everything else is sent as serialized JSON.
    pub fn to_form_pairs(&self) -> Result<Vec<(String, String)>> {
        self.0
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Json::String(s) => s.clone(),
                    Json::Null => bail!("'{key}' cannot be encoded as null"),
                    other => serde_json::to_string(other)
                        .with_context(|| format!("'{key}' could not be serialized"))?,
                };
                Ok((key.clone(), value))
            })
            .collect()
    }
}

impl From<UntypedObject> for Json {
    fn from(value: UntypedObject) -> Self {
        value.0.into()
    }
}

impl From<Map<String, Json>> for UntypedObject {
    fn from(value: Map<String, Json>) -> Self {
        Self(value)
    }
}

impl TryFrom<Json> for UntypedObject {
    type Error = anyhow::Error;

    fn try_from(value: Json) -> Result<Self> {
        let Json::Object(map) = value else {
            bail!("expected a JSON object")
        };
        Ok(Self(map))
    }
}

pub trait ParsingErrorContext {
    type T: TypedParameter;

    fn parsing_error(self) -> Result<Self::T>;
}

impl<T: TypedParameter> ParsingErrorContext for Option<Result<T>> {
    type T = T;

    fn parsing_error(self) -> Result<T> {
        self.context(format!("'{}' is missing", T::KEY))?
            .context(format!("'{}' could not be parsed", T::KEY))
    }
}

impl<T: TypedParameter> ParsingErrorContext for Result<T> {
    type T = T;

    fn parsing_error(self) -> Result<T> {
        self.context(format!("'{}' could not be parsed", T::KEY))
    }
}
