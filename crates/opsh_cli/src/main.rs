use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opsh_core::CompletionEngine;
use opsh_ui::{Repl, ScriptedKeys, Session, Terminal, UiConfig, UiError};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod catalog;

/// Interactive command shell with hierarchical commands and tab completion.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (TOML, or JSON by extension)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// History file
    #[arg(long, value_name = "FILE")]
    history_file: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long, conflicts_with = "history_file")]
    no_history: bool,

    /// Log filter, e.g. `debug` or `opsh_core=trace`
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Directory for log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Run one line and exit
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    command: Option<String>,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print completion candidates for LINE as JSON
    Complete {
        /// Text left of the cursor
        line: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("opsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let _guard = init_logging(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run_async(cli, config))
}

fn load_config(cli: &Cli) -> Result<UiConfig> {
    let mut config = UiConfig::load(cli.config.as_deref())?;

    if cli.no_history {
        config.history_file = None;
    } else if let Some(path) = &cli.history_file {
        config.history_file = Some(path.clone());
    } else if config.history_file.is_none() {
        config.history_file = UiConfig::default_history_path();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    } else if config.log_dir.is_none() {
        config.log_dir = UiConfig::default_log_dir();
    }
    Ok(config)
}

/// Log to a daily file so the interactive screen stays clean.
fn init_logging(config: &UiConfig) -> Result<Option<WorkerGuard>> {
    let Some(dir) = &config.log_dir else {
        return Ok(None);
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let filter = EnvFilter::try_from_env("OPSH_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create log filter")?;

    let appender = tracing_appender::rolling::daily(dir, "opsh.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install log subscriber")?;
    Ok(Some(guard))
}

async fn run_async(cli: Cli, config: UiConfig) -> Result<ExitCode> {
    // Only the REPL reads the keyboard. One-shot runs see closed input.
    let interactive = cli.command.is_none() && cli.action.is_none();
    let terminal = if interactive {
        Terminal::stdout()
    } else {
        Terminal::headless(io::stdout(), ScriptedKeys::default())
    };
    let session = Session::open(terminal, config).await;

    let store = catalog::SharedStore::default();
    let registry = Rc::new(catalog::build(store, session.asker()).context("Failed to build command catalog")?);
    info!(commands = registry.len(), interactive, "opsh starting");

    if let Some(Action::Complete { line }) = cli.action {
        let candidates = CompletionEngine::new(registry).complete(&line).await?;
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut repl = Repl::new(registry, session);
    let result = match cli.command {
        Some(line) => repl.run_once(&line).await.map(|ok| if ok { 0 } else { 1 }),
        None => repl.run().await.map(|()| 0),
    };
    let code = match result {
        Ok(code) => code,
        Err(UiError::Io(e)) => return Err(e).context("Terminal I/O failed"),
        Err(e) => e.exit_code(),
    };
    Ok(exit_code(code))
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
