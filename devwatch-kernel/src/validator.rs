//! Gate in front of the store: an ingest without a usable `Username` never
//! reaches storage.

use serde_json::Value;
use std::fmt;

pub const IDENTITY_FIELD: &str = "Username";

/// Non-empty identity of a reporting source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Username is required")]
    MissingIdentity,
}

/// Extracts the identity. Strings must be non-empty, numbers are taken in
/// their text form, everything else is rejected.
pub fn validate(payload: &Value) -> Result<Identity, ValidationError> {
    match payload.get(IDENTITY_FIELD) {
        Some(Value::String(s)) if !s.is_empty() => Ok(Identity(s.clone())),
        Some(Value::Number(n)) => Ok(Identity(n.to_string())),
        _ => Err(ValidationError::MissingIdentity),
    }
}
