//! Wire envelopes exchanged with an inspector endpoint
//!
//! Outbound: `{"id": 7, "method": "Runtime.evaluate", "params": {...}}`
//! Inbound response: `{"id": 7, "result": {...}}` or `{"id": 7, "error": {...}}`
//! Inbound notification: `{"method": "Debugger.paused", "params": {...}}`

use crate::error::{InspectorError, RemoteError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide request id counter
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Allocate a request id. Ids strictly increase and are never reused.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Outbound command request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RequestEnvelope {
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }
}

/// Inbound response to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl ResponseEnvelope {
    pub fn success(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: RemoteError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Resolve into the call's output.
    ///
    /// A response carrying neither `result` nor `error` resolves to `None`.
    pub fn into_result(self) -> Result<Option<serde_json::Value>> {
        match (self.result, self.error) {
            (Some(_), Some(_)) => Err(InspectorError::TransportFault(format!(
                "Response {} carries both result and error",
                self.id
            ))),
            (_, Some(error)) => Err(InspectorError::RemoteCall(error)),
            (result, None) => Ok(result),
        }
    }
}

/// Event pushed by the endpoint without a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Domain part of the method name
    pub fn domain(&self) -> &str {
        self.method
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.method)
    }
}

/// Any message the endpoint can send
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Response(ResponseEnvelope),
    Notification(Notification),
}

impl InboundMessage {
    /// Classify raw inbound text. Messages with an `id` are responses,
    /// messages with only a `method` are notifications.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| InspectorError::TransportFault(format!("Unparseable message: {}", e)))?;

        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let has_method = value.get("method").is_some();

        if has_id {
            serde_json::from_value(value)
                .map(InboundMessage::Response)
                .map_err(|e| InspectorError::TransportFault(format!("Invalid response: {}", e)))
        } else if has_method {
            serde_json::from_value(value)
                .map(InboundMessage::Notification)
                .map_err(|e| {
                    InspectorError::TransportFault(format!("Invalid notification: {}", e))
                })
        } else {
            Err(InspectorError::TransportFault(
                "Message has neither id nor method".into(),
            ))
        }
    }
}

/// Split `Domain.command` into its parts
pub fn split_method(method: &str) -> Option<(&str, &str)> {
    let (domain, command) = method.split_once('.')?;
    if domain.is_empty() || command.is_empty() {
        return None;
    }
    Some((domain, command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_ids_increase() {
        let ids: Vec<u64> = (0..50).map(|_| next_request_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_request_roundtrip() {
        let request = RequestEnvelope::new(
            42,
            "Runtime.evaluate",
            Some(json!({"expression": "this", "returnByValue": true})),
        );
        let decoded = RequestEnvelope::from_json(&request.to_json().unwrap()).unwrap();
        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.method, "Runtime.evaluate");
        assert_eq!(decoded.params, request.params);
    }

    #[test]
    fn test_request_without_params_omits_field() {
        let json = RequestEnvelope::new(1, "Runtime.enable", None)
            .to_json()
            .unwrap();
        assert_eq!(json, r#"{"id":1,"method":"Runtime.enable"}"#);
    }

    #[test]
    fn test_response_result() {
        let response = ResponseEnvelope::success(3, json!({"foo": 1}));
        assert_eq!(response.into_result().unwrap(), Some(json!({"foo": 1})));
    }

    #[test]
    fn test_response_error() {
        let raw = r#"{"id":3,"error":{"code":5,"message":"Boom","data":"extra"}}"#;
        let response: ResponseEnvelope = serde_json::from_str(raw).unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code(), Some(5));
        assert_eq!(err.to_string(), "Boom: extra");
    }

    #[test]
    fn test_response_with_neither_field_is_empty() {
        let response: ResponseEnvelope = serde_json::from_str(r#"{"id":9}"#).unwrap();
        assert_eq!(response.into_result().unwrap(), None);
    }

    #[test]
    fn test_response_with_both_fields_is_fault() {
        let raw = r#"{"id":3,"result":{},"error":{"code":1,"message":"x"}}"#;
        let response: ResponseEnvelope = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            response.into_result(),
            Err(InspectorError::TransportFault(_))
        ));
    }

    #[test]
    fn test_classify_inbound() {
        match InboundMessage::parse(r#"{"id":1,"result":{}}"#).unwrap() {
            InboundMessage::Response(r) => assert_eq!(r.id, 1),
            other => panic!("Wrong message type: {:?}", other),
        }

        match InboundMessage::parse(r#"{"method":"Debugger.paused","params":{"reason":"other"}}"#)
            .unwrap()
        {
            InboundMessage::Notification(n) => {
                assert_eq!(n.method, "Debugger.paused");
                assert_eq!(n.domain(), "Debugger");
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_classify_garbage() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(InspectorError::TransportFault(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"result":{}}"#),
            Err(InspectorError::TransportFault(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"id":"abc","result":{}}"#),
            Err(InspectorError::TransportFault(_))
        ));
    }

    #[test]
    fn test_split_method() {
        assert_eq!(split_method("Runtime.enable"), Some(("Runtime", "enable")));
        assert_eq!(split_method("Runtime"), None);
        assert_eq!(split_method(".enable"), None);
        assert_eq!(split_method("Runtime."), None);
    }
}
