//! Nivuus - autonomous system administration agent
//!
//! Entry point: parses the CLI, loads configuration, installs logging and the
//! flush hooks that protect the session, then dispatches the subcommand.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use console::style;
use nivuus_core::agent::{ExitReason, Session};
use nivuus_core::config::{NivuusConfig, load_dotenv};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after a termination signal
const SIGNAL_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    let args = Cli::parse();

    let config = match cli::load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(args.log_level.as_deref().unwrap_or(&config.logging.level));

    match run(&args, &config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Cli, config: &NivuusConfig) -> Result<ExitCode> {
    match args.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => {
            cli::chat::migrate_before_start(config);
            let session = Session::load(&config.storage, &config.memory);
            install_panic_hook(session.clone());
            spawn_signal_handler(session.clone());

            let reason = cli::handle_chat_command(config, session.clone(), args.api_key.as_deref())
                .await
                .inspect_err(|_| {
                    session.emergency_flush();
                })?;
            Ok(exit_code_for(&reason, &session))
        }
        Commands::MigrateMemory => {
            cli::handle_migrate_memory_command(config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitConfig { output, force } => {
            let workspace = cli::workspace_dir(args)?;
            cli::handle_init_config_command(&workspace, output.as_deref(), force)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::ShowMemory { path } => {
            cli::handle_show_memory_command(config, path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code_for(reason: &ExitReason, session: &Session) -> ExitCode {
    match reason {
        ExitReason::Fatal(err) => {
            let report = session.emergency_flush();
            if !report.is_complete() {
                warn!(?report, "session only partially saved after fatal error");
            }
            eprintln!("{} {err}", style("Fatal:").red().bold());
            ExitCode::FAILURE
        }
        ExitReason::UserQuit | ExitReason::InputClosed => {
            println!("{}", style("Goodbye.").dim());
            ExitCode::SUCCESS
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn install_panic_hook(session: Session) {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let report = session.emergency_flush();
        eprintln!(
            "{} session flushed before panic (transcript: {}, memory: {})",
            style("Crash:").red().bold(),
            report.transcript_saved,
            report.memory_saved
        );
        original_hook(panic_info);
    }));
}

/// Flush and exit on SIGINT, SIGTERM or SIGHUP
fn spawn_signal_handler(session: Session) {
    tokio::spawn(async move {
        wait_for_termination().await;
        let report = session.emergency_flush();
        if report.risky_action_in_flight {
            eprintln!(
                "\n{} interrupted while a confirmed action was running",
                style("Warning:").yellow().bold()
            );
        }
        eprintln!(
            "\n{} session saved: {}",
            style("Interrupted.").yellow().bold(),
            report.is_complete()
        );
        std::process::exit(SIGNAL_EXIT_CODE);
    });
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sighup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(sigterm), Ok(sighup)) => (sigterm, sighup),
        _ => {
            warn!("Could not register SIGTERM/SIGHUP handlers, only Ctrl-C is handled");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
        _ = sighup.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
