use std::io;

use tracing_subscriber::EnvFilter;

use plan_share::{app::AppContext, storage::config::Config};

mod cli;
use cli::{CliCommand, USAGE, parse_cli_command, run_command};

#[tokio::main]
async fn main() -> Result<(), io::Error> {
    setup_logging();

    let command = match parse_cli_command(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if command == CliCommand::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = match Config::load_or_create() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let app = AppContext::new(config);
    if let Err(e) = app.restore().await {
        tracing::warn!("Could not restore previous session: {}", e);
    }

    if let Err(e) = run_command(&app, command).await {
        if let Some(store_err) = e.downcast_ref::<plan_share::StoreError>()
            && store_err.is_auth()
        {
            eprintln!("Session expired. Sign in again with `plan-share signin NAME PASSWORD`.");
        } else {
            eprintln!("Error: {:#}", e);
        }
        tracing::error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn setup_logging() {
    let log_dir = Config::config_dir();

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "plan-share.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("plan-share started");
}
