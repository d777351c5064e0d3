//! Categories and tags. Both share one shape and one set of rules.

pub mod categories;
pub mod tags;

use crate::error::AppError;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TermForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl TermForm {
    /// Trimmed name, or `None` when absent or blank.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Names of the fields present in the payload.
    pub fn keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        if self.name.is_some() {
            keys.insert("name".to_owned());
        }
        if self.description.is_some() {
            keys.insert("description".to_owned());
        }
        keys
    }

    fn required_name(&self, label: &str) -> Result<&str, AppError> {
        self.name()
            .ok_or_else(|| AppError::Validation(format!("{} name is required", label)))
    }
}
