mod cli;
mod config;
mod content;
mod http;
mod llm;
mod serve;
mod session;

use clap::Parser;
use cli::{Cli, Commands};
use config::DrafterConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = DrafterConfig::load_or_default(&cli.config)
        .with_overrides(cli.data_dir.clone(), cli.session.clone());

    match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Init => cli::init::run(&cli.config).await,
        Commands::Config(cmd) => cli::config_cmd::run(cmd, &cli.config, &config).await,
        Commands::Audit(args) => cli::audit::run(args, &config).await,
        Commands::Shell => {
            let session = session::open(&config)?;
            cli::shell::run(&session, &config, &cli.config).await
        }
        command => {
            let session = session::open(&config)?;
            cli::run_with_session(command, &session).await
        }
    }
}
