use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::config::{DEFAULT_PAGE_SIZE, load_config_from_path};
use crate::errors::Result;
use crate::pipeline::run::{check, read};
use crate::pipeline::{ConfiguredCatalog, State, discover};
use crate::writer::StdoutWriter;

/// CLI
#[derive(Parser, Debug)]
#[command(
    name = "chargetap",
    version,
    about = "Extract Chargebee subscriptions and their scheduled changes.",
    long_about = "Extract Chargebee subscriptions and their scheduled changes.\n\n\
Streams:\n  • subscription: paginated listing, full refresh or incremental on updated_at\n  • subscription_with_scheduled_changes: one lookup per subscription, tagged with subscription_id\n\n\
Messages are written to stdout as JSON lines; logs go to stderr."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the accepted configuration fields.
    Spec,
    /// Verify credentials against the subscription listing.
    Check {
        #[arg(long, short = 'c', value_name = "FILE")]
        config: PathBuf,
    },
    /// Print the stream catalog.
    Discover {
        #[arg(long, short = 'c', value_name = "FILE")]
        config: PathBuf,
    },
    /// Read the streams of a configured catalog.
    Read {
        #[arg(long, short = 'c', value_name = "FILE")]
        config: PathBuf,
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
        #[arg(long, value_name = "FILE")]
        state: Option<PathBuf>,
    },
}

fn connection_spec() -> serde_json::Value {
    json!({
        "required": ["site", "site_api_key", "product_catalog", "start_date"],
        "properties": {
            "site": {"type": "string", "description": "Chargebee site prefix, e.g. `acme` for acme.chargebee.com"},
            "site_api_key": {"type": "string", "secret": true},
            "site_api_key_env": {"type": "string", "description": "Environment variable holding the API key"},
            "product_catalog": {"type": "string", "enum": ["1.0", "2.0"]},
            "start_date": {"type": "string", "format": "date-time"},
            "base_url": {"type": "string"},
            "page_size": {"type": "integer", "minimum": 1, "maximum": DEFAULT_PAGE_SIZE},
            "retry": {
                "type": "object",
                "properties": {
                    "max_retries": {"type": "integer"},
                    "min_delay_ms": {"type": "integer"},
                    "max_delay_ms": {"type": "integer"}
                }
            }
        }
    })
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let f = File::open(path)?;
    Ok(serde_json::from_reader(f)?)
}

#[instrument(skip_all)]
pub async fn run(cli: Cli) -> Result<()> {
    let t0 = Instant::now();
    match cli.command {
        Command::Spec => {
            println!("{}", serde_json::to_string(&connection_spec())?);
        }
        Command::Check { config } => {
            let cfg = load_config_from_path(&config)?;
            check(&cfg).await?;
            println!("{}", json!({"type": "CONNECTION_STATUS", "status": "SUCCEEDED"}));
        }
        Command::Discover { config } => {
            // validates the config even though the catalog is static
            load_config_from_path(&config)?;
            println!("{}", serde_json::to_string(&discover())?);
        }
        Command::Read {
            config,
            catalog,
            state,
        } => {
            let cfg = load_config_from_path(&config)?;
            info!(site = %cfg.site, "loaded config");
            let catalog: ConfiguredCatalog = load_json(&catalog)?;
            let state: State = match state {
                Some(path) => load_json(&path)?,
                None => State::new(),
            };
            debug!(?catalog, "configured catalog");

            let summary = read(&cfg, &catalog, &state, &StdoutWriter).await?;
            info!(
                total_ms = t0.elapsed().as_millis() as u64,
                records = summary.total_records(),
                "read finished"
            );
        }
    }
    Ok(())
}
