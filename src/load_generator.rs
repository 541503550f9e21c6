use anyhow::Context;
use clap::Parser;
use logdispatch::config::LoggingConfig;
use logdispatch::logging::integration::{flush_async, AsyncLogging};
use logdispatch::logging::{Level, NullSink, OverflowPolicy, PoolStats, SourceLocation};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Drive the log dispatch queue with synthetic load", long_about = None)]
struct Args {
    /// Number of producer threads
    #[arg(long, default_value_t = 4)]
    producers: usize,

    /// Records logged by each producer
    #[arg(long, default_value_t = 100_000)]
    records: usize,

    /// Queue capacity
    #[arg(long, default_value_t = 8192)]
    capacity: usize,

    /// Worker threads draining the queue
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Overflow policy: block, overrun_oldest or drop_if_full
    #[arg(long, default_value_t = OverflowPolicy::Block)]
    policy: OverflowPolicy,

    /// Optional JSON5 logging config; command-line sizes override it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct LoadSummary {
    policy: OverflowPolicy,
    sent: u64,
    written: u64,
    elapsed_ms: u128,
    records_per_sec: f64,
    stats: PoolStats,
}

async fn run_load(args: Args) -> anyhow::Result<LoadSummary> {
    let mut config = match &args.config {
        Some(path) => LoggingConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LoggingConfig::default(),
    };
    config.pool.capacity = args.capacity;
    config.pool.workers = args.workers;
    config.default_overflow = args.policy;

    let logging = AsyncLogging::new(config.registry_config()?)?;
    let sink = Arc::new(NullSink::new());
    let logger = logging.create_logger("load", vec![sink.clone()])?;
    logger.set_level(Level::Trace);

    let start = Instant::now();
    let producers: Vec<_> = (0..args.producers)
        .map(|p| {
            let logger = logger.clone();
            let records = args.records;
            tokio::task::spawn_blocking(move || {
                for i in 0..records {
                    logger.log(
                        Level::Info,
                        SourceLocation::new(file!(), line!(), module_path!()),
                        format_args!("producer {} record {}", p, i),
                    );
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await?;
    }
    flush_async(&logger).await?;
    let elapsed = start.elapsed();

    let stats = logging
        .stats()
        .context("worker pool was never created")?;
    let sent = (args.producers * args.records) as u64;
    let summary = LoadSummary {
        policy: args.policy,
        sent,
        written: sink.written(),
        elapsed_ms: elapsed.as_millis(),
        records_per_sec: sent as f64 / elapsed.max(Duration::from_micros(1)).as_secs_f64(),
        stats,
    };
    logging.shutdown().await?;
    Ok(summary)
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let summary = run_load(args).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
