mod config;

use clap::{Args, Parser};
use gateway::params::Params;
use gateway::signature::{
    ACCESS_KEY_PARAM, SIGNATURE_METHOD_PARAM, SIGNATURE_VERSION_PARAM, SignatureMethod,
    compute_signature, signed_query_string,
};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "EC2 Query API gateway for CloudStack")]
enum CliCommand {
    /// Serve the gateway
    Run(RunArgs),
    /// Sign a set of request parameters the way an EC2 client would
    Sign(SignArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config_file: PathBuf,
}

#[derive(Args)]
struct SignArgs {
    #[arg(long)]
    secret_key: String,
    /// Added as `AWSAccessKeyId` when given
    #[arg(long)]
    access_key: Option<String>,
    #[arg(long, default_value = "POST")]
    method: String,
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value = "/")]
    path: String,
    #[arg(long, default_value = "HmacSHA256")]
    signature_method: String,
    /// Request parameters as KEY=VALUE
    #[arg(value_parser = parse_param)]
    params: Vec<(String, String)>,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Gateway(#[from] gateway::GatewayServerError),
    #[error(transparent)]
    InvalidArgument(#[from] gateway::errors::GatewayError),
    #[error("could not set up logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let result = match CliCommand::parse() {
        CliCommand::Run(args) => run(args),
        CliCommand::Sign(args) => sign(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cloudgate: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: RunArgs) -> Result<(), CliError> {
    let config = config::Config::from_file(&args.config_file)?;

    // Kept alive until shutdown so buffered events are flushed.
    let _sentry = init_logging(&config.logging)?;

    if let Some(metrics) = &config.metrics {
        init_metrics(metrics)?;
    }

    tracing::info!(config_file = %args.config_file.display(), "Starting cloudgate");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(gateway::run(config.gateway))?;
    Ok(())
}

fn init_logging(
    logging: &config::LoggingConfig,
) -> Result<Option<sentry::ClientInitGuard>, CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let guard = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.is_some().then(sentry::integrations::tracing::layer))
        .try_init()?;

    Ok(guard)
}

fn init_metrics(metrics: &config::MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(metrics.statsd_host.as_str(), metrics.statsd_port)
        .build(Some("cloudgate"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_all(gateway::metrics_defs::ALL_METRICS);
    Ok(())
}

fn sign(args: SignArgs) -> Result<(), CliError> {
    let signature_method: SignatureMethod = args.signature_method.parse()?;

    let mut params: Params = args.params.into_iter().collect();
    params.insert(SIGNATURE_VERSION_PARAM, "2");
    params.insert(SIGNATURE_METHOD_PARAM, signature_method.as_str());
    if let Some(access_key) = args.access_key {
        params.insert(ACCESS_KEY_PARAM, access_key);
    }

    let signature = compute_signature(
        &args.secret_key,
        signature_method,
        &args.method,
        &args.host,
        &args.path,
        &params,
    );

    println!("{}", signed_query_string(&params, &signature));
    Ok(())
}
