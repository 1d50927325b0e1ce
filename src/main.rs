use log::{error, info};
use std::error::Error;
use std::sync::Arc;

use socialstream::socialstream::config::PipelineConfig;
use socialstream::socialstream::connect::{BackendTarget, ResilientConnector, StartupLatch};
use socialstream::socialstream::generator::DataGenerator;
use socialstream::socialstream::query::{QueryExecutor, ResultRow};
use socialstream::socialstream::storage::{FsStorageBackend, PartitionedWriter};
use socialstream::socialstream::test_harness::{FixedQueryService, MemoryQueryBackend};

const USAGE: &str = "usage:
  socialstream write <tweets|events|users> <count>
  socialstream query <name> [params...]

query names:
  most-liked [limit]           most-retweeted [limit]
  celebrity-top <category> [limit]
  trending-hashtags [limit]    most-mentioned [limit]
  engagement-stats             advanced-stats
  time-analytics <year> <month>
  ensure-tables [location]";

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args).await {
        Ok(()) => {}
        Err(err) => {
            error!("{}", err);
            eprintln!("socialstream: {}", err);
            std::process::exit(1);
        }
    }
}

async fn run(args: Vec<String>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = PipelineConfig::from_env()?;

    match args.first().map(String::as_str) {
        Some("write") => {
            let kind = args.get(1).ok_or(USAGE)?.as_str();
            let count: usize = args.get(2).ok_or(USAGE)?.parse().map_err(|_| USAGE)?;
            write_records(&config, kind, count).await
        }
        Some("query") => {
            let name = args.get(1).ok_or(USAGE)?.as_str();
            run_query(&config, name, &args[2..]).await
        }
        _ => Err(USAGE.into()),
    }
}

fn storage_root(config: &PipelineConfig) -> Result<String, Box<dyn Error + Send + Sync>> {
    config
        .storage_url
        .strip_prefix("file://")
        .map(|root| if root.is_empty() { "/" } else { root }.to_string())
        .ok_or_else(|| {
            format!(
                "unsupported storage url '{}': only file:// stores are bundled",
                config.storage_url
            )
            .into()
        })
}

fn make_writer(config: &PipelineConfig) -> Result<PartitionedWriter, Box<dyn Error + Send + Sync>> {
    let root = storage_root(config)?;
    let backend = Arc::new(FsStorageBackend::new(root));
    let target = BackendTarget::storage("object-store", config.storage_url.clone());
    let connector = ResilientConnector::new(config.storage_retry);
    Ok(PartitionedWriter::new(backend, target, connector)
        .with_concurrency(config.write_concurrency))
}

async fn write_records(
    config: &PipelineConfig,
    kind: &str,
    count: usize,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let writer = make_writer(config)?;
    // Only the first write in this process pays the store bootstrap.
    StartupLatch::ensure_started(&config.storage_url, || async {
        writer.ensure_base_path(&config.base_path).await
    })
    .await?;
    let mut generator = DataGenerator::new(None);

    let report = match kind {
        "tweets" => {
            writer
                .write("tweets", generator.generate_tweets(count), &config.base_path)
                .await?
        }
        "events" => {
            writer
                .write("events", generator.generate_events(count), &config.base_path)
                .await?
        }
        "users" => {
            let users = generator.generate_users(count);
            let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
            let path = format!("{}/users/users_{}.json", config.base_path, stamp);
            let written = writer.write_json_lines(&users, &path).await?;
            println!("wrote {} users to {}", written, path);
            return Ok(());
        }
        other => return Err(format!("unknown record kind '{}'\n{}", other, USAGE).into()),
    };

    println!(
        "wrote {} records across {} partitions",
        report.total_records_written(),
        report.partition_count()
    );
    if !report.all_succeeded() {
        for failure in report.failed() {
            let detail = failure
                .outcome
                .as_ref()
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default();
            eprintln!(
                "partition {} failed ({} records): {}",
                failure.key, failure.record_count, detail
            );
        }
        return Err(format!("{} partition(s) failed", report.failed().len()).into());
    }
    Ok(())
}

fn make_executor(config: &PipelineConfig) -> Result<QueryExecutor, Box<dyn Error + Send + Sync>> {
    if !config.query_url.starts_with("mem://") {
        return Err(format!(
            "unsupported query url '{}': only the bundled mem:// backend is available",
            config.query_url
        )
        .into());
    }
    let service = Arc::new(FixedQueryService::new(Arc::new(
        MemoryQueryBackend::with_rows(Vec::new()),
    )));
    let target = BackendTarget::query("warehouse", config.query_url.clone());
    let connector = ResilientConnector::new(config.query_retry);
    Ok(QueryExecutor::new(service, target, connector))
}

async fn run_query(
    config: &PipelineConfig,
    name: &str,
    params: &[String],
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let executor = make_executor(config)?;

    let limit = |index: usize, default: u32| -> u32 {
        params
            .get(index)
            .and_then(|p| p.parse().ok())
            .unwrap_or(default)
    };

    if name == "ensure-tables" {
        let location = params
            .first()
            .cloned()
            .unwrap_or_else(|| format!("{}/tweets", config.base_path));
        StartupLatch::ensure_started(&config.query_url, || async {
            executor.ensure_tweets_table(&location).await
        })
        .await?;
        println!("tweets table ready at {}", location);
        return Ok(());
    }

    let rows = match name {
        "most-liked" => executor.most_liked_tweets(limit(0, 10)).await?,
        "most-retweeted" => executor.most_retweeted_tweets(limit(0, 10)).await?,
        "celebrity-top" => {
            let category = params.first().ok_or(USAGE)?;
            executor
                .popular_celebrity_tweets(category, limit(1, 10))
                .await?
        }
        "trending-hashtags" => executor.trending_hashtags(limit(0, 10)).await?,
        "most-mentioned" => executor.most_mentioned_users(limit(0, 10)).await?,
        "engagement-stats" => executor.celebrity_engagement_stats().await?,
        "advanced-stats" => executor.advanced_engagement_stats().await?,
        "time-analytics" => {
            let year: i64 = params.first().ok_or(USAGE)?.parse().map_err(|_| USAGE)?;
            let month: i64 = params.get(1).ok_or(USAGE)?.parse().map_err(|_| USAGE)?;
            executor.time_based_analytics(year, month).await?
        }
        other => return Err(format!("unknown query '{}'\n{}", other, USAGE).into()),
    };

    info!("query '{}' returned {} rows", name, rows.len());
    print_rows(&rows);
    Ok(())
}

fn print_rows(rows: &[ResultRow]) {
    for row in rows {
        let line: Vec<String> = row
            .cells()
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        println!("{}", line.join("  "));
    }
    println!("({} rows)", rows.len());
}
