use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use directory_ingest::config;
use directory_ingest::db;
use directory_ingest::model::SubmissionKind;
use directory_ingest::queue::{self, QueueClient, SqsQueue};
use directory_ingest::server;
use directory_ingest::worker::{Worker, WorkerSettings};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let sqs = queue::sqs_client(&cfg.aws).await;

    let token = CancellationToken::new();
    spawn_signal_handlers(token.clone());

    let settings = WorkerSettings {
        wait_time_seconds: cfg.app.wait_time_seconds,
        max_messages: cfg.app.max_messages,
    };

    // One worker per submission kind, all sharing the shutdown token.
    let mut join_set = JoinSet::new();
    let mut intake_queues: HashMap<SubmissionKind, Arc<dyn QueueClient>> = HashMap::new();
    for kind in SubmissionKind::ALL {
        let pair = cfg.queue_pair(kind);
        let inbound: Arc<dyn QueueClient> =
            Arc::new(SqsQueue::resolve(sqs.clone(), &pair.inbound).await?);
        let invalid: Arc<dyn QueueClient> =
            Arc::new(SqsQueue::resolve(sqs.clone(), &pair.invalid).await?);
        intake_queues.insert(kind, inbound.clone());

        let worker = Worker::new(kind, pool.clone(), inbound, invalid, settings);
        let worker_token = token.clone();
        join_set.spawn(async move { worker.run(worker_token).await });
    }

    let state = Arc::new(server::AppState::new(intake_queues));
    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.app.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.app.bind_addr))?;
    info!(addr = %cfg.app.bind_addr, "intake API listening");

    let server_token = token.clone();
    join_set.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_token.cancelled_owned())
            .await
            .context("intake API failed")
    });

    // First failure wins: cancel everything else and exit non-zero so the
    // supervisor restarts the process.
    let mut first_error: Option<anyhow::Error> = None;
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(?err, "task failed; shutting down");
                if first_error.is_none() {
                    first_error = Some(err);
                }
                token.cancel();
            }
            Err(err) => {
                error!(?err, "task panicked; shutting down");
                if first_error.is_none() {
                    first_error = Some(anyhow::Error::new(err));
                }
                token.cancel();
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => {
            info!("shutdown complete");
            Ok(())
        }
    }
}

fn spawn_signal_handlers(token: CancellationToken) {
    let interrupt_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt; draining");
            interrupt_token.cancel();
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM; draining");
                token.cancel();
            }
            Err(err) => error!(?err, "failed to install SIGTERM handler"),
        }
    });
}
