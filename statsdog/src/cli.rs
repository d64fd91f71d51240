use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use statsdog_config::{Config, OverridableConfig};
use statsdog_datadog::BACKEND_NAME;

use crate::setup::{self, BackendContext};

/// Exports aggregated statsd metrics to Datadog.
#[derive(Debug, Parser)]
#[command(name = "statsdog", version, max_term_width = 79)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a metrics snapshot to a backend.
    ///
    /// The snapshot is a JSON document holding the aggregated state of one flush cycle. It is
    /// sent once, retrying transient failures until the configured retry budget is spent.
    Send(SendArgs),
    /// Print the sample configuration of registered backends.
    SampleConfig {
        /// Only print the sample configuration of this backend.
        name: Option<String>,
    },
}

#[derive(Debug, Args)]
struct SendArgs {
    /// The path to the config folder.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    config: PathBuf,

    /// The backend to send the snapshot to.
    #[arg(short, long, value_name = "NAME", default_value = BACKEND_NAME)]
    backend: String,

    /// The Datadog API key.
    #[arg(long, value_name = "KEY", env = "STATSDOG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// The Datadog series endpoint.
    #[arg(long, value_name = "URL")]
    api_endpoint: Option<String>,

    /// The host of metrics without a statsd_source_id tag.
    #[arg(long, value_name = "HOST")]
    hostname: Option<String>,

    /// The log level.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Path to the JSON snapshot, or `-` to read it from stdin.
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,
}

impl SendArgs {
    fn overrides(&self) -> OverridableConfig {
        OverridableConfig {
            api_key: self.api_key.clone(),
            api_endpoint: self.api_endpoint.clone(),
            hostname: self.hostname.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

/// Parses the command line and runs the selected command.
pub fn execute() -> Result<()> {
    match Cli::parse().command {
        Command::Send(args) => send(args),
        Command::SampleConfig { name } => sample_config(name.as_deref()),
    }
}

fn send(args: SendArgs) -> Result<()> {
    let mut config = Config::from_path(&args.config)?;
    config.apply_override(args.overrides())?;
    statsdog_log::init(config.logging());

    let context = BackendContext::new(config)?;
    setup::dump_spawn_infos(&context, &args.backend);

    let sender = setup::backend_registry().create(&args.backend, &context)?;
    let metrics = setup::read_snapshot(&args.snapshot)?;
    setup::dump_snapshot_infos(&metrics);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start the runtime")?;

    runtime.block_on(sender.send_metrics(&metrics))?;
    statsdog_log::info!("snapshot sent to {}", sender.name());

    Ok(())
}

fn sample_config(name: Option<&str>) -> Result<()> {
    let registry = setup::backend_registry();

    let names: Vec<_> = match name {
        Some(name) if registry.sample_config(name).is_none() => bail!("unknown backend '{name}'"),
        Some(name) => vec![name],
        None => registry.names().collect(),
    };

    let mut stdout = io::stdout().lock();
    for name in names {
        if let Some(sample) = registry.sample_config(name) {
            writeln!(stdout, "# {name}\n{sample}")?;
        }
    }

    Ok(())
}
