//! Circulate CLI Entry Point
//!
//! Resolves a connection profile, prompts for the database login, connects and
//! runs the command loop on stdin/stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use circulate::config::{resolve_connection, ConnectionOverrides};
use circulate::console::{Console, LineConsole};
use circulate::engine::{ConnectionConfig, DatabaseEngine, DatabaseType};
use circulate::session::{login, run_session, Session};

/// Circulate - library circulation database console
#[derive(Parser)]
#[command(name = "circulate")]
#[command(about = "Terminal front-end for a library circulation database")]
#[command(version)]
struct Cli {
    /// Named connection profile (defaults to the configured default)
    #[arg(long)]
    connection: Option<String>,

    /// Database engine; without --connection the profile is built from flags alone
    #[arg(long, value_enum)]
    engine: Option<CliEngine>,

    /// Database host (postgres/mysql)
    #[arg(long)]
    host: Option<String>,

    /// Database port (postgres/mysql)
    #[arg(long)]
    port: Option<u16>,

    /// Database name (postgres/mysql)
    #[arg(long)]
    database: Option<String>,

    /// Database file (sqlite)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Log level for stderr output (overrides RUST_LOG)
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEngine {
    Sqlite,
    Postgres,
    Mysql,
}

impl From<CliEngine> for DatabaseType {
    fn from(engine: CliEngine) -> Self {
        match engine {
            CliEngine::Sqlite => Self::SQLite,
            CliEngine::Postgres => Self::Postgres,
            CliEngine::Mysql => Self::MySQL,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Off => Self::Off,
            CliLogLevel::Error => Self::Error,
            CliLogLevel::Warn => Self::Warn,
            CliLogLevel::Info => Self::Info,
            CliLogLevel::Debug => Self::Debug,
            CliLogLevel::Trace => Self::Trace,
        }
    }
}

fn init_logging(level: Option<CliLogLevel>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level.into());
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = ConnectionOverrides {
        engine: cli.engine.map(DatabaseType::from),
        host: cli.host,
        port: cli.port,
        database: cli.database,
        file: cli.file,
    };
    let profile = resolve_connection(cli.connection.as_deref(), &overrides)
        .context("Could not resolve a connection profile")?;

    let mut console = LineConsole::stdio();
    let (session, config) = login(&mut console, &profile).context("Login failed")?;

    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            serve::<circulate::engine::sqlite::SqliteEngine, _>(&config, &mut console, &session)
                .await
        }
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            serve::<circulate::engine::postgres::PostgresEngine, _>(
                &config,
                &mut console,
                &session,
            )
            .await
        }
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            serve::<circulate::engine::mysql::MySqlEngine, _>(&config, &mut console, &session)
                .await
        }
        #[allow(unreachable_patterns)]
        other => bail!("The {other} engine is not enabled in this build"),
    }
}

/// Connect with engine `E` and run the session until logout
async fn serve<E: DatabaseEngine, C: Console>(
    config: &ConnectionConfig,
    console: &mut C,
    session: &Session,
) -> anyhow::Result<()> {
    let mut engine = E::connect(config)
        .await
        .with_context(|| format!("Could not connect to the {} database", config.engine))?;
    log::info!("connected to {} database", config.engine);

    run_session(&mut engine, console, session).await?;
    engine.close().await?;
    Ok(())
}
