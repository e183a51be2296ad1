//! Call registry built from a protocol description

use inspector_core::{InspectorError, ProtocolDescription, Result, split_method};
use std::collections::HashMap;

/// A callable command
#[derive(Debug, Clone)]
pub struct CommandEntry {
    /// Wire method name, `Domain.command`
    pub method: String,
    pub name: String,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Parameter schema (opaque)
    pub parameters: Vec<serde_json::Value>,
    /// Return schema (opaque)
    pub returns: Vec<serde_json::Value>,
}

/// Namespace for one domain
#[derive(Debug, Clone)]
pub struct DomainTable {
    pub name: String,
    /// Type definitions (opaque)
    pub types: Vec<serde_json::Value>,
    commands: Vec<CommandEntry>,
    index: HashMap<String, usize>,
}

impl DomainTable {
    /// Get a callable command
    pub fn get(&self, command: &str) -> Option<&CommandEntry> {
        self.index.get(command).map(|&i| &self.commands[i])
    }

    /// Callable commands in declaration order
    pub fn commands(&self) -> &[CommandEntry] {
        &self.commands
    }

    pub fn contains(&self, command: &str) -> bool {
        self.index.contains_key(command)
    }
}

/// Registry of callable operations
///
/// Built once from a [`ProtocolDescription`]; experimental commands are left out.
#[derive(Debug, Clone, Default)]
pub struct CallRegistry {
    domains: Vec<DomainTable>,
    index: HashMap<String, usize>,
}

impl CallRegistry {
    /// Build the registry, rejecting malformed descriptions
    pub fn build(description: &ProtocolDescription) -> Result<Self> {
        description.validate()?;

        let mut registry = Self::default();
        for domain in &description.domains {
            let mut table = DomainTable {
                name: domain.domain.clone(),
                types: domain.types.clone(),
                commands: Vec::new(),
                index: HashMap::new(),
            };

            for command in domain.commands.iter().filter(|c| !c.experimental) {
                table
                    .index
                    .insert(command.name.clone(), table.commands.len());
                table.commands.push(CommandEntry {
                    method: format!("{}.{}", domain.domain, command.name),
                    name: command.name.clone(),
                    description: command.description.clone(),
                    deprecated: command.deprecated,
                    parameters: command.parameters.clone(),
                    returns: command.returns.clone(),
                });
            }

            registry
                .index
                .insert(domain.domain.clone(), registry.domains.len());
            registry.domains.push(table);
        }

        Ok(registry)
    }

    /// Look up a callable operation
    pub fn lookup(&self, domain: &str, command: &str) -> Result<&CommandEntry> {
        self.domain(domain)
            .and_then(|table| table.get(command))
            .ok_or_else(|| InspectorError::unknown_operation(domain, command))
    }

    /// Look up by wire method name, `Domain.command`
    pub fn resolve(&self, method: &str) -> Result<&CommandEntry> {
        let (domain, command) = split_method(method)
            .ok_or_else(|| InspectorError::unknown_operation(method, ""))?;
        self.lookup(domain, command)
    }

    /// Get a domain namespace
    pub fn domain(&self, name: &str) -> Option<&DomainTable> {
        self.index.get(name).map(|&i| &self.domains[i])
    }

    /// Domain namespaces in declaration order
    pub fn domains(&self) -> &[DomainTable] {
        &self.domains
    }

    /// All callable method names in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.domains
            .iter()
            .flat_map(|d| d.commands.iter().map(|c| c.method.as_str()))
    }

    /// Number of callable operations
    pub fn len(&self) -> usize {
        self.domains.iter().map(|d| d.commands.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_core::{Command, Domain};

    fn runtime_description() -> ProtocolDescription {
        ProtocolDescription::new(vec![
            Domain::new("Runtime")
                .with_command(Command::new("enable"))
                .with_command(Command::new("secretEval").experimental())
                .with_command(Command::new("evaluate")),
            Domain::new("Profiler").with_command(Command::new("takeHeapSnapshot").experimental()),
        ])
    }

    #[test]
    fn test_experimental_commands_are_omitted() {
        let registry = CallRegistry::build(&runtime_description()).unwrap();

        assert!(registry.lookup("Runtime", "enable").is_ok());
        assert!(registry.lookup("Runtime", "evaluate").is_ok());
        match registry.lookup("Runtime", "secretEval") {
            Err(InspectorError::UnknownOperation { domain, command }) => {
                assert_eq!(domain, "Runtime");
                assert_eq!(command, "secretEval");
            }
            other => panic!("Expected UnknownOperation, got {:?}", other),
        }
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_domain_with_only_experimental_commands_still_has_namespace() {
        let registry = CallRegistry::build(&runtime_description()).unwrap();
        let profiler = registry.domain("Profiler").unwrap();
        assert!(profiler.commands().is_empty());
        assert!(!profiler.contains("takeHeapSnapshot"));
    }

    #[test]
    fn test_methods_in_declaration_order() {
        let registry = CallRegistry::build(&runtime_description()).unwrap();
        let methods: Vec<&str> = registry.methods().collect();
        assert_eq!(methods, vec!["Runtime.enable", "Runtime.evaluate"]);
    }

    #[test]
    fn test_resolve_method_name() {
        let registry = CallRegistry::build(&runtime_description()).unwrap();
        assert_eq!(
            registry.resolve("Runtime.evaluate").unwrap().name,
            "evaluate"
        );
        assert!(matches!(
            registry.resolve("Runtime"),
            Err(InspectorError::UnknownOperation { .. })
        ));
        assert!(matches!(
            registry.resolve("Network.enable"),
            Err(InspectorError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_malformed_description_is_rejected() {
        let description = ProtocolDescription::new(vec![
            Domain::new("Runtime").with_command(Command::new("")),
        ]);
        assert!(matches!(
            CallRegistry::build(&description),
            Err(InspectorError::MalformedProtocol(_))
        ));
    }

    #[test]
    fn test_empty_description() {
        let registry = CallRegistry::build(&ProtocolDescription::default()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.domains().is_empty());
    }
}
