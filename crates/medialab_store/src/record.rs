//! Records: structured values stored in collections.

use crate::error::{StoreError, StoreResult};
use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A structured value stored in a collection.
///
/// Records are CBOR maps. The collection's key path names the field (dotted
/// for nested maps, e.g. `owner.email`) whose text value identifies the
/// record within its collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(Value);

impl Record {
    /// Wraps a CBOR value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Converts a serde value into a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if the value cannot be represented.
    pub fn from_typed<T: Serialize + ?Sized>(value: &T) -> StoreResult<Self> {
        Value::serialized(value)
            .map(Self)
            .map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// Converts the record into a serde value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if the record doesn't have `T`'s shape.
    pub fn to_typed<T: DeserializeOwned>(&self) -> StoreResult<T> {
        self.0
            .deserialized()
            .map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consumes the record, returning the underlying value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Looks up a field by dotted path.
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.0, |value, segment| {
            value
                .as_map()?
                .iter()
                .find(|(k, _)| k.as_text() == Some(segment))
                .map(|(_, v)| v)
        })
    }

    /// Returns the text value at `key_path`.
    #[must_use]
    pub fn key(&self, key_path: &str) -> Option<&str> {
        self.field(key_path)?.as_text()
    }

    pub(crate) fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(&self.0, &mut buf).map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(buf)
    }

    pub(crate) fn decode(bytes: &[u8]) -> StoreResult<Self> {
        ciborium::from_reader(bytes)
            .map(Self)
            .map_err(|e| StoreError::Codec(e.to_string()))
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
