use crate::{source::Record, Result};

/// Encodes a [`Record`] as a JSON object of field name to string value.
///
/// Deterministic and pure: the same record always yields the same payload,
/// with keys in header order and no type coercion.
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn serialize(record: &Record) -> Result<String> {
        serde_json::to_string(record).map_err(Into::into)
    }
}
