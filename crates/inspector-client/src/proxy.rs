//! Command proxy
//!
//! Pairs the [`CallRegistry`] with a [`Dispatcher`] so that only commands the
//! protocol description exposes can be called:
//!
//! ```ignore
//! let mut inspector = Inspector::connect(&description, transport, DispatcherConfig::default())?;
//! inspector.domain("Runtime")?.call("enable", None)?;
//! let value = inspector.call("Runtime.evaluate", Some(json!({"expression": "1 + 1"})))?;
//! ```

use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::registry::{CallRegistry, CommandEntry};
use crate::transport::Transport;
use inspector_core::{InspectorError, Notification, ProtocolDescription, Result};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::info;

/// Synchronous proxy over an inspector endpoint
pub struct Inspector {
    registry: CallRegistry,
    dispatcher: Dispatcher,
}

impl Inspector {
    /// Build the registry from `description`, then connect `transport`
    pub fn connect(
        description: &ProtocolDescription,
        transport: impl Transport + 'static,
        config: DispatcherConfig,
    ) -> Result<Self> {
        let registry = CallRegistry::build(description)?;
        let mut dispatcher = Dispatcher::new(transport, config)?;
        dispatcher.connect()?;
        info!(
            "Inspector ready: {} domains, {} commands",
            registry.domains().len(),
            registry.len()
        );
        Ok(Self {
            registry,
            dispatcher,
        })
    }

    /// Invoke `domain.command`; fails with `UnknownOperation` without sending
    /// anything if the command is not callable.
    pub fn invoke(
        &mut self,
        domain: &str,
        command: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>> {
        let method = self.registry.lookup(domain, command)?.method.clone();
        self.dispatcher.invoke(&method, params)
    }

    /// Invoke by wire method name, `Domain.command`
    pub fn call(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>> {
        let method = self.registry.resolve(method)?.method.clone();
        self.dispatcher.invoke(&method, params)
    }

    /// Invoke and deserialize the result. A missing result deserializes from `null`.
    pub fn call_as<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<T> {
        let result = self.call(method, params)?.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(Into::into)
    }

    /// Namespace for one domain
    pub fn domain(&mut self, name: &str) -> Result<DomainProxy<'_>> {
        if self.registry.domain(name).is_none() {
            return Err(InspectorError::unknown_operation(name, ""));
        }
        Ok(DomainProxy {
            name: name.to_string(),
            inspector: self,
        })
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    /// Subscribe to notifications pushed by the endpoint
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.dispatcher.subscribe()
    }

    /// Stop the session. Returns false if it was already stopped.
    pub fn shutdown(&mut self) -> Result<bool> {
        let stopped = self.dispatcher.disconnect()?;
        if stopped {
            info!("Inspector session stopped");
        }
        Ok(stopped)
    }
}

/// Commands of a single domain
pub struct DomainProxy<'a> {
    name: String,
    inspector: &'a mut Inspector,
}

impl DomainProxy<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke one of this domain's commands
    pub fn call(
        &mut self,
        command: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>> {
        self.inspector.invoke(&self.name, command, params)
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.inspector
            .registry
            .domain(&self.name)
            .is_some_and(|table| table.contains(command))
    }

    /// Callable commands in declaration order
    pub fn commands(&self) -> &[CommandEntry] {
        self.inspector
            .registry
            .domain(&self.name)
            .map(|table| table.commands())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MessageSink;
    use crate::transport::LocalTransport;
    use inspector_core::{Command, Domain, RequestEnvelope};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn description() -> ProtocolDescription {
        ProtocolDescription::new(vec![
            Domain::new("Runtime")
                .with_command(Command::new("enable"))
                .with_command(Command::new("evaluate"))
                .with_command(Command::new("secretEval").experimental()),
            Domain::new("Debugger").with_command(Command::new("enable")),
        ])
    }

    /// Endpoint that answers every request with its method name and records what it saw
    fn recording_endpoint(
        log: Arc<Mutex<Vec<String>>>,
    ) -> LocalTransport<impl FnMut(&str, &MessageSink) + Send> {
        LocalTransport::new(move |message: &str, channel: &MessageSink| {
            let request = RequestEnvelope::from_json(message).unwrap();
            log.lock().unwrap().push(request.method.clone());
            channel.deliver(
                &json!({"id": request.id, "result": {"method": request.method}}).to_string(),
            );
        })
    }

    #[test]
    fn test_experimental_command_is_unknown_and_never_sent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut inspector = Inspector::connect(
            &description(),
            recording_endpoint(log.clone()),
            DispatcherConfig::default(),
        )
        .unwrap();

        let methods: Vec<&str> = inspector.registry().methods().collect();
        assert_eq!(
            methods,
            vec!["Runtime.enable", "Runtime.evaluate", "Debugger.enable"]
        );

        assert!(matches!(
            inspector.invoke("Runtime", "secretEval", None),
            Err(InspectorError::UnknownOperation { .. })
        ));
        assert!(matches!(
            inspector.call("Runtime.secretEval", None),
            Err(InspectorError::UnknownOperation { .. })
        ));
        assert!(log.lock().unwrap().is_empty());

        let result = inspector.invoke("Runtime", "enable", None).unwrap();
        assert_eq!(result, Some(json!({"method": "Runtime.enable"})));
        assert_eq!(*log.lock().unwrap(), vec!["Runtime.enable".to_string()]);
    }

    #[test]
    fn test_domain_proxy() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut inspector = Inspector::connect(
            &description(),
            recording_endpoint(log.clone()),
            DispatcherConfig::default(),
        )
        .unwrap();

        let mut runtime = inspector.domain("Runtime").unwrap();
        assert_eq!(runtime.name(), "Runtime");
        assert!(runtime.has_command("evaluate"));
        assert!(!runtime.has_command("secretEval"));
        assert_eq!(runtime.commands().len(), 2);
        runtime
            .call("evaluate", Some(json!({"expression": "this"})))
            .unwrap();
        assert!(runtime.call("secretEval", None).is_err());

        assert!(matches!(
            inspector.domain("Network"),
            Err(InspectorError::UnknownOperation { .. })
        ));
        assert_eq!(*log.lock().unwrap(), vec!["Runtime.evaluate".to_string()]);
    }

    #[test]
    fn test_call_as() {
        #[derive(Deserialize)]
        struct Echo {
            method: String,
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut inspector = Inspector::connect(
            &description(),
            recording_endpoint(log),
            DispatcherConfig::default(),
        )
        .unwrap();

        let echo: Echo = inspector.call_as("Debugger.enable", None).unwrap();
        assert_eq!(echo.method, "Debugger.enable");
    }

    #[test]
    fn test_malformed_description_fails_before_connecting() {
        let description = ProtocolDescription::new(vec![Domain::new("Runtime"), Domain::new("Runtime")]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let result = Inspector::connect(
            &description,
            recording_endpoint(log),
            DispatcherConfig::default(),
        );
        assert!(matches!(result, Err(InspectorError::MalformedProtocol(_))));
    }

    #[test]
    fn test_shutdown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut inspector = Inspector::connect(
            &description(),
            recording_endpoint(log),
            DispatcherConfig::default(),
        )
        .unwrap();

        assert!(inspector.shutdown().unwrap());
        assert!(!inspector.shutdown().unwrap());
        assert!(matches!(
            inspector.call("Runtime.enable", None),
            Err(InspectorError::TransportFault(_))
        ));
    }
}
