//! Legacy SOAP client command line.
//!
//! Run with: `legacy-soap-client get-user user123`
//!
//! Connection settings come from `--config` (YAML) or from the
//! `SOAP_WSDL_URL`, `SOAP_USERNAME`, `SOAP_PASSWORD` and
//! `SOAP_TIMEOUT_SECONDS` environment variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use legacy_soap_client::{ClientRegistry, LegacyClientConfig, LegacySoapClient, OperationArgs};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Client for a legacy WSDL/SOAP service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML). Environment variables are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a user with GetUser
    GetUser {
        user_id: String,
    },
    /// Set product stock with UpdateProductStock
    UpdateStock {
        product_id: String,
        quantity: i64,
    },
    /// Call any operation with key=value arguments
    Call {
        operation: String,
        #[arg(value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },
    /// List the operations exposed by the service
    Operations,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

/// Numbers and booleans are sent as such; everything else as text.
fn argument_value(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(|v| v.is_number() || v.is_boolean())
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn load_config(path: Option<&PathBuf>) -> Result<LegacyClientConfig> {
    match path {
        Some(path) => {
            info!("Config file: {}", path.display());
            LegacyClientConfig::from_yaml_file(path).context("Failed to load config file")
        }
        None => LegacyClientConfig::from_env().context("Failed to read SOAP_* environment"),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render response")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = load_config(args.config.as_ref())?;
    info!(
        endpoint = %config.endpoint_url,
        basic_auth = config.basic_auth().is_some(),
        timeout_secs = config.timeout_secs,
        "Configuration loaded"
    );

    let registry = ClientRegistry::new();
    let client = LegacySoapClient::connect(&registry, &config).await?;

    match args.command {
        Command::GetUser { user_id } => {
            let user = client.get_user_data(&user_id).await?;
            print_json(&user)?;
        }
        Command::UpdateStock {
            product_id,
            quantity,
        } => {
            let updated = client.update_product_stock(&product_id, quantity).await?;
            print_json(&Value::Bool(updated))?;
        }
        Command::Call { operation, args } => {
            let args: OperationArgs = args
                .iter()
                .map(|(k, v)| (k.as_str(), argument_value(v)))
                .collect();
            let result = client.call(&operation, args).await?;
            print_json(&result)?;
        }
        Command::Operations => {
            for operation in client.operations() {
                println!("{}", operation);
            }
        }
    }

    Ok(())
}
