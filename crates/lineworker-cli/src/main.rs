#![doc = include_str!("../README.md")]

mod config;
mod telemetry;
mod worker;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, Input, RunConfig};
use lineworker::{ChunkSource, Line, LineWorker, RunSummary, Worker};
use telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use worker::{CommandWorker, EchoWorker};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(process_input(config));
    // A reader blocked on an interactive stdin must not hold up exit.
    runtime.shutdown_background();
    result
}

async fn process_input(config: RunConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let source = open_input(&config).await?;
    let summary = match config.command.clone() {
        Some(command) => run(source, CommandWorker::new(command), &config, shutdown).await?,
        None => run(source, EchoWorker::new(), &config, shutdown).await?,
    };

    tracing::info!(
        lines_read = summary.lines_read,
        lines_skipped = summary.lines_skipped,
        tasks_completed = summary.tasks_completed,
        tasks_failed = summary.tasks_failed,
        "Finished processing input"
    );
    Ok(())
}

async fn open_input(config: &RunConfig) -> anyhow::Result<ChunkSource> {
    match &config.input {
        Input::Stdin => Ok(ChunkSource::from_reader(
            tokio::io::stdin(),
            config.chunk_size,
        )),
        Input::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(ChunkSource::from_reader(file, config.chunk_size))
        }
    }
}

async fn run<W>(
    source: ChunkSource,
    worker: W,
    config: &RunConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<RunSummary>
where
    W: Worker<Line>,
{
    let summary = LineWorker::new(source, worker, config.lines.clone())?
        .with_shutdown(shutdown)
        .run()
        .await?;
    Ok(summary)
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    } else {
        tracing::debug!(
            "Reading {:?} with concurrency {}",
            config.input,
            config.lines.concurrency
        );
    }
}

async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, finishing running lines...");
    token.cancel();
}
