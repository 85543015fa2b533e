//! Command line interface

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use counselbook_core::storage::Database;
use counselbook_core::{screening, Config};
use counselbook_net::{Handler, Server};
use tracing::info;

use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "counselbook",
    about = "Counselling appointment scheduling and PHQ-9 screening service",
    version
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the RPC server (default command)
    Serve(ServeArgs),
    /// Create or upgrade the database schema and exit
    Migrate,
    /// Score nine PHQ-9 answers and print the result
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
    /// Override the configured database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Answers in questionnaire order, each 0-3
    #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
    answers: Vec<i32>,
}

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => serve(&config, args),
        Command::Migrate => migrate(&config),
        Command::Score(args) => score(&args),
    }
}

fn serve(config: &Config, args: ServeArgs) -> Result<(), AppError> {
    let db_path = match args.database {
        Some(path) => path,
        None => config.database_path()?,
    };
    let port = args.port.unwrap_or(config.server.port);
    let handler = Handler::new(
        db_path.clone(),
        config.busy_timeout(),
        config.scheduling.session_minutes,
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let server = Server::start(SocketAddr::from(([0, 0, 0, 0], port)), handler).await?;
        info!(
            addr = %server.addr(),
            database = %db_path.display(),
            session_minutes = config.scheduling.session_minutes,
            "Counselbook serving"
        );
        tokio::signal::ctrl_c().await?;
        server.shutdown();
        Ok::<(), AppError>(())
    })
}

fn migrate(config: &Config) -> Result<(), AppError> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open_with_timeout(&db_path, config.busy_timeout())?;
    info!(
        database = %db_path.display(),
        version = db.schema_version()?,
        "Schema up to date"
    );
    Ok(())
}

fn score(args: &ScoreArgs) -> Result<(), AppError> {
    let result = screening::score(&args.answers)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
