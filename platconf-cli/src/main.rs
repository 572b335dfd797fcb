use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use platconf::config::validate_config;
use platconf::{load_config, Mode, PlatconfError, Reconciler, RunConfig};

#[derive(Parser, Debug)]
#[command(
    name = "platconf",
    version,
    about = "Create or delete platform service resources described by a run configuration"
)]
struct Cli {
    /// Run configuration (YAML, or JSON with a `.json` extension).
    #[arg(long, short, env = "PLATCONF_CONFIG")]
    config: PathBuf,

    /// Overrides the configured mode (`create` or `delete`).
    #[arg(long)]
    mode: Option<Mode>,

    /// Overrides the configured comma separated realm list.
    #[arg(long)]
    realms: Option<String>,

    /// Overrides the configured endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Extra build property available to `${...}` placeholders.
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// Debug logging unless RUST_LOG says otherwise.
    #[arg(long, short)]
    verbose: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

fn apply_overrides(cli: &Cli, config: &mut RunConfig) {
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(realms) = &cli.realms {
        config.realms = realms.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    for (key, value) in &cli.properties {
        config.properties.insert(key.clone(), value.clone());
    }
}

fn exit_code(error: &PlatconfError) -> ExitCode {
    match error {
        PlatconfError::Items(_) => ExitCode::from(1),
        PlatconfError::Config(_) => ExitCode::from(2),
        PlatconfError::Authorization(_) => ExitCode::from(3),
        PlatconfError::Transport(_) => ExitCode::from(4),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };
    apply_overrides(&cli, &mut config);
    if let Err(e) = validate_config(&config) {
        error!("{}", e);
        return ExitCode::from(2);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("platconf v{} using {:?}", env!("CARGO_PKG_VERSION"), cli.config);

    match runtime.block_on(Reconciler::new().run(&config)) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("Failed to serialize report: {}", e),
                }
            } else {
                println!("{}", report);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            exit_code(&e)
        }
    }
}
