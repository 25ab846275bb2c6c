use std::path::PathBuf;

use anyhow::{Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{RestHostModule, RestfulModule};
use runtime::{AppConfig, CliArgs};
use tokio_util::sync::CancellationToken;
use users_info::UsersInfo;

mod shutdown;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const API_INGRESS: &str = "api_ingress";

/// Users Server - in-memory user CRUD API with OpenAPI docs
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - in-memory user CRUD API with OpenAPI docs")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Development mode: debug-level console logging
    #[arg(long)]
    debug: bool,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    // Print config and exit if requested
    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let home_dir = config.home_dir()?;
    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, &home_dir);
    tracing::info!(debug = config.server.debug, "Users Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn ingress_config(config: &AppConfig) -> Result<ApiIngressConfig> {
    let ingress = config.module_config::<ApiIngressConfig>(API_INGRESS)?;
    if ingress.enable_docs {
        ingress
            .validate()
            .with_context(|| format!("invalid {API_INGRESS} config"))?;
    }
    Ok(ingress)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let host = ApiIngress::new(ingress_config(&config)?);
    let users = UsersInfo::new();

    // REST phase: host prepares, modules register, host finalizes
    let router = host.rest_prepare(axum::Router::new())?;
    let router = users
        .register_rest(router, host.as_registry())
        .context("users_info REST registration failed")?;
    host.rest_finalize(router)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = shutdown::wait_for_shutdown().await {
                tracing::error!(error = %e, "Signal handler failed; shutting down");
            }
            cancel.cancel();
        }
    });

    let addr = config.bind_addr();
    tracing::info!("Serving on http://{}", addr);
    host.serve(&addr, cancel).await?;

    tracing::info!("Users Server stopped");
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    ingress_config(config)?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);

    Ok(())
}
