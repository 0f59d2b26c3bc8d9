// Error handling module
// Defines the client error taxonomy and field-level validation errors

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while talking to the API
#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-success response from the API
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Form-level validation errors returned with a 400
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Operation not valid for the current client-side state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Network, TLS or decode failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Validation(_) => Some(400),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for a 401 response
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Convert a 400 body into field errors when it parses as one
    pub fn into_validation(self) -> Self {
        match self {
            ClientError::Api { status: 400, body } => match FieldErrors::parse(&body) {
                Some(fields) => ClientError::Validation(fields),
                None => ClientError::Api { status: 400, body },
            },
            other => other,
        }
    }
}

/// Per-field messages returned by the auth forms
///
/// Known keys are `username`, `password`, `password1`, `password2` and
/// `non_field_errors`; anything else is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Parse a JSON error body, `None` when it isn't a field map
    pub fn parse(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let object = value.as_object()?;

        let mut fields = BTreeMap::new();
        for (key, messages) in object {
            let messages = match messages {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                    .collect(),
                serde_json::Value::String(s) => vec![s.clone()],
                other => vec![other.to_string()],
            };
            fields.insert(key.clone(), messages);
        }

        Some(Self(fields))
    }

    /// Messages for one field, empty when the field is fine
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Messages not attached to a single field
    pub fn non_field(&self) -> &[String] {
        self.get("non_field_errors")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
