//! Lenient decoding of post payload fields.
//!
//! Clients send ids as numbers or numeric strings, and list fields either as
//! arrays or as a JSON document serialised into a string (multipart forms).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A reference to another row as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Number(i64),
    Text(String),
}

impl IdRef {
    /// The referenced id, or `None` if it cannot name any row.
    pub fn to_id(&self) -> Option<i32> {
        match self {
            IdRef::Number(n) => i32::try_from(*n).ok(),
            IdRef::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, IdRef::Text(s) if s.trim().is_empty())
    }
}

impl From<i32> for IdRef {
    fn from(id: i32) -> Self {
        IdRef::Number(id.into())
    }
}

/// Accepts `[..]`, a string holding `[..]`, or null. Anything unparsable is
/// logged and read as absent.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(raw)) => serde_json::from_str::<Vec<T>>(&raw),
        Some(array @ Value::Array(_)) => serde_json::from_value::<Vec<T>>(array),
        Some(other) => {
            log::warn!("Ignoring list field with unexpected JSON type: {}", other);
            return Ok(None);
        }
    };

    match parsed {
        Ok(list) => Ok(Some(list)),
        Err(e) => {
            log::warn!("Ignoring malformed list field: {}", e);
            Ok(None)
        }
    }
}
