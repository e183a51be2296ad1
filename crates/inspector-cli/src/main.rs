//! inspector-call
//!
//! Loads a protocol description and invokes one command on an endpoint:
//!
//! ```text
//! inspector-call <protocol.json> --list
//! inspector-call <protocol.json> <Domain.command> [params-json] -- <program> [args...]
//! inspector-call <protocol.json> <Domain.command> [params-json] --tcp <host:port>
//! ```

use anyhow::{Context, Result, bail};
use inspector_client::{
    CallRegistry, ChildProcessConfig, ChildProcessTransport, DispatcherConfig, Inspector,
    TcpTransport,
};
use inspector_core::{InspectorError, ProtocolDescription, error_codes};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage: inspector-call <protocol.json> --list\n       \
inspector-call <protocol.json> <Domain.command> [params-json] (-- <program> [args...] | --tcp <host:port>)";

/// Where the endpoint lives
#[derive(Debug, PartialEq)]
enum Endpoint {
    Process { program: String, args: Vec<String> },
    Tcp(String),
}

#[derive(Debug, PartialEq)]
enum Invocation {
    List {
        protocol: String,
    },
    Call {
        protocol: String,
        method: String,
        params: Option<serde_json::Value>,
        endpoint: Endpoint,
    },
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let Some(protocol) = args.first().cloned() else {
        bail!(USAGE);
    };
    let Some(second) = args.get(1) else {
        bail!(USAGE);
    };
    if second == "--list" {
        return Ok(Invocation::List { protocol });
    }
    let method = second.clone();

    let mut rest = &args[2..];
    let mut params = None;
    if let Some(first) = rest.first().filter(|a| *a != "--" && *a != "--tcp") {
        params = Some(
            serde_json::from_str(first)
                .with_context(|| format!("Invalid params JSON: {}", first))?,
        );
        rest = &rest[1..];
    }

    let endpoint = match rest {
        [flag, address] if flag == "--tcp" => Endpoint::Tcp(address.clone()),
        [separator, program, args @ ..] if separator == "--" => Endpoint::Process {
            program: program.clone(),
            args: args.to_vec(),
        },
        _ => bail!(USAGE),
    };

    Ok(Invocation::Call {
        protocol,
        method,
        params,
        endpoint,
    })
}

fn list(description: &ProtocolDescription) -> Result<()> {
    let registry = CallRegistry::build(description)?;
    for table in registry.domains() {
        for command in table.commands() {
            if command.deprecated {
                println!("{} (deprecated)", command.method);
            } else {
                println!("{}", command.method);
            }
        }
    }
    info!(
        "{} callable commands in {} domains",
        registry.len(),
        registry.domains().len()
    );
    Ok(())
}

/// Turn a failed call into a message for the terminal
fn explain(method: &str, err: InspectorError) -> anyhow::Error {
    match err.code() {
        Some(error_codes::METHOD_NOT_FOUND) => {
            anyhow::anyhow!("Endpoint does not implement {}: {}", method, err)
        }
        Some(code) => anyhow::anyhow!("{} failed (code {}): {}", method, code, err),
        None => anyhow::Error::new(err).context(format!("{} failed", method)),
    }
}

fn call(
    description: &ProtocolDescription,
    method: &str,
    params: Option<serde_json::Value>,
    endpoint: Endpoint,
) -> Result<()> {
    let config = DispatcherConfig::blocking();
    let mut inspector = match endpoint {
        Endpoint::Process { program, args } => {
            let transport = ChildProcessTransport::new(ChildProcessConfig::new(program).args(args));
            Inspector::connect(description, transport, config)?
        }
        Endpoint::Tcp(address) => Inspector::connect(description, TcpTransport::new(address), config)?,
    };

    debug!("Calling {}", method);
    let result = inspector.call(method, params);
    inspector.shutdown()?;

    match result.map_err(|e| explain(method, e))? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("null"),
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        Invocation::List { protocol } => {
            let description = ProtocolDescription::from_path(&protocol)
                .with_context(|| format!("Failed to load protocol {}", protocol))?;
            list(&description)
        }
        Invocation::Call {
            protocol,
            method,
            params,
            endpoint,
        } => {
            let description = ProtocolDescription::from_path(&protocol)
                .with_context(|| format!("Failed to load protocol {}", protocol))?;
            call(&description, &method, params, endpoint)
        }
    }
}
