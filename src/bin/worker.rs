//! Standalone worker process for a single submission kind.
//!
//! Deploy one of these per queue (replicated as needed); the queue's
//! visibility timeout keeps replicas from processing the same delivery
//! concurrently.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use directory_ingest::config;
use directory_ingest::db;
use directory_ingest::model::SubmissionKind;
use directory_ingest::queue::{self, QueueClient, SqsQueue};
use directory_ingest::worker::{Worker, WorkerSettings};

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Submission kind to consume: enrolment, registration or form
    #[arg(long)]
    kind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let kind = args
        .kind
        .parse::<SubmissionKind>()
        .map_err(|_| anyhow!("unknown submission kind: {}", args.kind))?;

    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    let sqs = queue::sqs_client(&cfg.aws).await;
    let pair = cfg.queue_pair(kind);
    let inbound: Arc<dyn QueueClient> =
        Arc::new(SqsQueue::resolve(sqs.clone(), &pair.inbound).await?);
    let invalid: Arc<dyn QueueClient> = Arc::new(SqsQueue::resolve(sqs, &pair.invalid).await?);

    let settings = WorkerSettings {
        wait_time_seconds: cfg.app.wait_time_seconds,
        max_messages: cfg.app.max_messages,
    };
    let worker = Worker::new(kind, pool, inbound, invalid, settings);

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt; draining");
            signal_token.cancel();
        }
    });
    #[cfg(unix)]
    {
        let sigterm_token = token.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                info!("received SIGTERM; draining");
                sigterm_token.cancel();
            }
        });
    }

    worker.run(token).await
}
