// src/main.rs
//! OTP authentication server entry point
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use phone_otp_auth::auth::{AuthConfig, AuthService, Backends};
use phone_otp_auth::server::OtpServer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Interval between sweeps of expired in-memory records
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "otp_server")]
#[command(about = "Phone number OTP authentication server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print a session token for an existing user
    IssueToken(IssueTokenArgs),
    /// Clear the OTP issuance counter for a phone number
    ResetLimit {
        /// Phone number in E.164 format
        #[arg(long)]
        phone: String,
    },
}

#[derive(ClapArgs)]
struct IssueTokenArgs {
    /// User id to mint the token for
    #[arg(long)]
    user_id: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let mut config = AuthConfig::from_env()
        .map_err(|e| anyhow::anyhow!("configuration error: {}", e))?;

    if matches!(args.command, Some(Commands::ResetLimit { .. })) {
        config.require_shared_store("reset-limit")?;
    }

    let backends = Backends::from_config(&config).await?;

    match args.command {
        Some(Commands::IssueToken(issue)) => {
            let service = AuthService::new(&config, backends)?;
            let token = service.issue_token_for(issue.user_id).await?;
            println!("{}", token);
        }
        Some(Commands::ResetLimit { phone }) => {
            let service = AuthService::new(&config, backends)?;
            service.reset_rate_limit(&phone).await?;
            info!("rate limit cleared");
        }
        Some(Commands::Serve { bind }) => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config, backends).await?;
        }
        None => {
            info!("No command specified, starting server on {}", config.bind_addr);
            serve(config, backends).await?;
        }
    }

    Ok(())
}

async fn serve(config: AuthConfig, backends: Backends) -> Result<()> {
    info!("Starting OTP auth server v{}", env!("CARGO_PKG_VERSION"));

    let sweeper = backends.spawn_sweeper(SWEEP_INTERVAL);
    let service = Arc::new(AuthService::new(&config, backends)?);

    let result = OtpServer::new(&config, service).start().await;
    if let Some(handle) = sweeper {
        handle.abort();
    }
    result
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,tower_http=debug"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
