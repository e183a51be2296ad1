//! Protocol description types
//!
//! Mirrors the JSON layout published by inspector endpoints:
//! `{"version": {...}, "domains": [{"domain": "Runtime", "commands": [...]}]}`.
//! Parameter, return, type and event schemas are carried as opaque JSON.

use crate::error::{InspectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Complete protocol description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolDescription {
    /// Protocol version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ProtocolVersion>,
    /// Domains in declaration order
    pub domains: Vec<Domain>,
}

/// Protocol version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: String,
    pub minor: String,
}

/// A named group of commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    /// Domain name, e.g. `Runtime`
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub experimental: bool,
    #[serde(default)]
    pub deprecated: bool,
    /// Domains this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Type definitions (opaque)
    #[serde(default)]
    pub types: Vec<serde_json::Value>,
    /// Commands in declaration order
    #[serde(default)]
    pub commands: Vec<Command>,
    /// Event definitions (opaque)
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// One remotely invocable command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub experimental: bool,
    #[serde(default)]
    pub deprecated: bool,
    /// Parameter schema (opaque, not enforced)
    #[serde(default)]
    pub parameters: Vec<serde_json::Value>,
    /// Return schema (opaque)
    #[serde(default)]
    pub returns: Vec<serde_json::Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            experimental: false,
            deprecated: false,
            parameters: Vec::new(),
            returns: Vec::new(),
        }
    }

    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            domain: name.into(),
            description: None,
            experimental: false,
            deprecated: false,
            dependencies: Vec::new(),
            types: Vec::new(),
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }
}

impl ProtocolDescription {
    pub fn new(domains: Vec<Domain>) -> Self {
        Self {
            version: None,
            domains,
        }
    }

    /// Parse and validate a description from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let description: Self = serde_json::from_str(json)
            .map_err(|e| InspectorError::MalformedProtocol(e.to_string()))?;
        description.validate()?;
        Ok(description)
    }

    /// Parse and validate a description from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let description: Self = serde_json::from_slice(bytes)
            .map_err(|e| InspectorError::MalformedProtocol(e.to_string()))?;
        description.validate()?;
        Ok(description)
    }

    /// Read, parse and validate a description file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            InspectorError::MalformedProtocol(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_slice(&bytes)
    }

    /// Check names are present and unique within their scope
    pub fn validate(&self) -> Result<()> {
        let mut seen_domains = HashSet::new();
        for (index, domain) in self.domains.iter().enumerate() {
            if domain.domain.trim().is_empty() {
                return Err(InspectorError::MalformedProtocol(format!(
                    "Domain #{} has an empty name",
                    index
                )));
            }
            if !seen_domains.insert(domain.domain.as_str()) {
                return Err(InspectorError::MalformedProtocol(format!(
                    "Duplicate domain: {}",
                    domain.domain
                )));
            }

            let mut seen_commands = HashSet::new();
            for (index, command) in domain.commands.iter().enumerate() {
                if command.name.trim().is_empty() {
                    return Err(InspectorError::MalformedProtocol(format!(
                        "Command #{} in {} has an empty name",
                        index, domain.domain
                    )));
                }
                if !seen_commands.insert(command.name.as_str()) {
                    return Err(InspectorError::MalformedProtocol(format!(
                        "Duplicate command: {}.{}",
                        domain.domain, command.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Find a domain by name
    pub fn domain(&self, name: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.domain == name)
    }
}
