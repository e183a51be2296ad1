//! Synchronous command proxy for inspector protocols
//!
//! This crate provides:
//! - `CallRegistry`: callable `Domain.command` operations built from a protocol
//!   description, with experimental commands left out
//! - `Dispatcher`: request/response correlation by id with blocking call semantics
//! - `Inspector`: the registry-checked proxy callers use
//! - Transports for in-process, child-process and TCP endpoints

pub mod dispatcher;
pub mod proxy;
pub mod registry;
pub mod sink;
pub mod transport;

pub use dispatcher::{Dispatcher, DispatcherConfig, ResponseWait};
pub use proxy::{DomainProxy, Inspector};
pub use registry::{CallRegistry, CommandEntry, DomainTable};
pub use sink::MessageSink;
pub use transport::{
    Backend, ChildProcessConfig, ChildProcessTransport, LocalTransport, TcpTransport, Transport,
};
