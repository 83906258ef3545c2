// src/main.rs — eveapi entry point

use clap::Parser;

use eveapi::cli::{Cli, Commands};
use eveapi::infra::config::Config;
use eveapi::infra::{logger, paths};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG overrides the -v level
    logger::init_logging(logger::level_for_verbosity(cli.verbose));

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(std::path::Path::new(path))?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Update => eveapi::cli::update::run_update(config).await,
        Commands::Daemon { action } => {
            eveapi::cli::update::run_daemon_command(action, config).await
        }
        Commands::Keys { action } => {
            let store = eveapi::db::open(&paths::db_path())?;
            eveapi::cli::keys::run_keys(&store, action)
        }
        Commands::Tokens { action } => {
            let store = eveapi::db::open(&paths::db_path())?;
            eveapi::cli::tokens::run_tokens(&store, action)
        }
        Commands::Migrate { status, rollback } => {
            eveapi::cli::migrate::run_migrate(status, rollback)
        }
        Commands::Status => eveapi::cli::status::show_status(),
    }
}
