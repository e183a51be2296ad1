//! # inspector-core
//!
//! Core types for the inspector RPC proxy.
//!
//! This crate provides the foundational types shared by the client and CLI:
//! - Protocol description (domains, commands, experimental flags)
//! - Request, response and notification envelopes
//! - Error type and JSON-RPC error codes

pub mod envelope;
pub mod error;
pub mod protocol;

pub use envelope::{
    InboundMessage, Notification, RequestEnvelope, ResponseEnvelope, next_request_id, split_method,
};
pub use error::{InspectorError, RemoteError, Result, error_codes};
pub use protocol::{Command, Domain, ProtocolDescription, ProtocolVersion};
