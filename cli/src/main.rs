use clap::Parser;
use std::path::PathBuf;

mod commands;
mod config;

use commands::Commands;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, PartialEq, Debug)]
#[command(name = "xauth")]
#[command(about = "Complete X (Twitter) OAuth consent using an auth_token cookie", long_about = None)]
struct Cli {
    /// Value of the account's auth_token cookie
    #[arg(long = "auth-token", env = "XAUTH_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// Path to a provider config file (default: ~/.xauth/config.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long = "debug", default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "error,xauth=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let provider_config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command.run(&cli.auth_token, provider_config).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
