//! loner CLI: operator interface to uniqueness locks.

use clap::{Parser, Subcommand};
use loner::classify::classify;
use loner::config::Config;
use loner::config::secrets::ExposeSecret;
use loner::key::derive_key;
use loner::store::RedisStore;
use loner::telemetry::{TelemetryConfig, init_telemetry};
use loner::{JobPayload, JobTypeRegistry, LockManager};
use serde_json::Value;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "loner", about = "Inspect and release unique job locks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show classification, lock key and lock state for a payload
    Status {
        queue: String,
        /// Job payload JSON, e.g. '{"class":"ReportJob","args":[{"unique_key":"a"}]}'
        payload: String,
    },
    /// Set the lock for a payload as if it had just been enqueued
    Mark { queue: String, payload: String },
    /// Release the lock for a payload as if it had just left the queue
    Release { queue: String, payload: String },
    /// Release locks for queued entries of a job type
    Destroy {
        queue: String,
        /// Job type identifier
        class: String,
        /// Exact args to match; each is parsed as JSON, else taken as a string
        args: Vec<String>,
    },
    /// Delete every lock under a queue's prefix
    Cleanup { queue: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "loner".to_string(),
        default_level: config.log_level.clone(),
    })?;

    let registry = match config.job_types_dir {
        Some(ref dir) => JobTypeRegistry::load_from_dir(dir)?,
        None => JobTypeRegistry::empty(),
    };
    let store = RedisStore::connect(config.redis_url.expose_secret()).await?;
    store.health_check().await?;
    let locks = LockManager::new(Arc::new(store), Arc::new(registry));

    match cli.command {
        Command::Status { queue, payload } => cmd_status(&locks, &queue, &payload).await,
        Command::Mark { queue, payload } => {
            locks.mark_queued(&queue, &parse_payload(&payload)?).await?;
            println!("marked");
            Ok(())
        }
        Command::Release { queue, payload } => {
            locks.mark_unqueued(&queue, &parse_payload(&payload)?).await?;
            println!("released");
            Ok(())
        }
        Command::Destroy { queue, class, args } => {
            let args: Vec<Value> = args.iter().map(String::as_str).map(parse_arg).collect();
            let released = locks.destroy_matching_queued(&queue, &class, &args).await?;
            println!("released {released} lock(s)");
            Ok(())
        }
        Command::Cleanup { queue } => {
            let removed = locks.cleanup_all(&queue).await?;
            println!("deleted {removed} lock(s)");
            Ok(())
        }
    }
}

async fn cmd_status(locks: &LockManager<RedisStore>, queue: &str, raw: &str) -> anyhow::Result<()> {
    let payload = parse_payload(raw)?;
    let desc = classify(locks.registry(), &payload);

    println!("type:        {}", payload.job_type);
    println!("unique:      {}", desc.is_unique);
    if !desc.is_unique {
        return Ok(());
    }
    match derive_key(queue, &payload) {
        Ok(key) => println!("key:         {key}"),
        Err(e) => {
            println!("key:         <{e}>");
            return Ok(());
        }
    }
    println!("enqueue ttl: {}", desc.ttl_on_enqueue);
    println!("grace ttl:   {}", desc.grace_ttl_after_completion);
    println!("state:       {}", locks.lock_state(queue, &payload).await?);
    Ok(())
}

fn parse_payload(raw: &str) -> anyhow::Result<JobPayload> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("invalid payload JSON: {e}"))
}

fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
