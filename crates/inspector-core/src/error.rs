//! Error types for the inspector proxy

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for inspector operations
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Inspector error types
#[derive(Debug, Error)]
pub enum InspectorError {
    /// Protocol description is structurally invalid
    #[error("Malformed protocol: {0}")]
    MalformedProtocol(String),

    /// Domain or command is not part of the callable surface
    #[error("Unknown operation: {domain}.{command}")]
    UnknownOperation { domain: String, command: String },

    /// Remote end answered with an error envelope
    #[error("{0}")]
    RemoteCall(RemoteError),

    /// Channel failure, id mismatch or an unreadable inbound message
    #[error("Transport fault: {0}")]
    TransportFault(String),

    /// Request could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl InspectorError {
    pub fn unknown_operation(domain: impl Into<String>, command: impl Into<String>) -> Self {
        InspectorError::UnknownOperation {
            domain: domain.into(),
            command: command.into(),
        }
    }

    /// Remote error code, if this is a remote call failure
    pub fn code(&self) -> Option<i64> {
        match self {
            InspectorError::RemoteCall(err) => Some(err.code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for InspectorError {
    fn from(err: serde_json::Error) -> Self {
        InspectorError::Serialization(err.to_string())
    }
}

impl From<RemoteError> for InspectorError {
    fn from(err: RemoteError) -> Self {
        InspectorError::RemoteCall(err)
    }
}

/// Error object carried by a response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "data_as_text"
    )]
    pub data: Option<String>,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{}: {}", self.message, data),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Endpoints usually send `data` as a string; anything else is kept as its JSON text.
fn data_as_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// JSON-RPC error codes used by inspector endpoints
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_joins_data() {
        let err = InspectorError::from(RemoteError::new(5, "Boom").with_data("extra"));
        assert_eq!(err.to_string(), "Boom: extra");
        assert_eq!(err.code(), Some(5));
    }

    #[test]
    fn test_remote_error_display_without_data() {
        let err = RemoteError::new(error_codes::METHOD_NOT_FOUND, "'Foo.bar' wasn't found");
        assert_eq!(err.to_string(), "'Foo.bar' wasn't found");
    }

    #[test]
    fn test_non_string_data_is_kept_as_json() {
        let json = r#"{"code":-32602,"message":"Invalid parameters","data":{"field":"objectId"}}"#;
        let err: RemoteError = serde_json::from_str(json).unwrap();
        assert_eq!(err.data.as_deref(), Some(r#"{"field":"objectId"}"#));

        let json = r#"{"code":1,"message":"x","data":null}"#;
        let err: RemoteError = serde_json::from_str(json).unwrap();
        assert_eq!(err.data, None);
    }

    #[test]
    fn test_unknown_operation_message() {
        let err = InspectorError::unknown_operation("Runtime", "secretEval");
        assert_eq!(err.to_string(), "Unknown operation: Runtime.secretEval");
        assert_eq!(err.code(), None);
    }
}
