//! Ad-hoc CLI: run a single crawl against an in-memory task record,
//! bypassing the API and Scheduler. Useful for trying the engine
//! against a real site without standing up the full service.

use clap::Parser as ClapParser;
use site_crawl_search::prelude::*;
use std::sync::Arc;
use tracing::Level;

#[derive(ClapParser, Debug)]
#[clap(author, version, about = "Run a single site crawl")]
struct Args {
    /// Starting URL to crawl
    url: String,

    #[clap(short = 'd', long, default_value = "3")]
    max_depth: i64,

    #[clap(short = 'p', long, default_value = "100")]
    max_pages: i64,

    #[clap(long, default_value = "500")]
    delay_ms: u64,

    #[clap(long)]
    allow_other_domains: bool,

    #[clap(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let db_path = std::env::temp_dir()
        .join(format!("site-crawl-search-cli-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    let store = Arc::new(Store::init(&db_path).await?);

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new("site-crawl-search/0.1", 30, 2_000_000)?);
    let index: Arc<dyn IndexGateway> = Arc::new(MeiliIndexGateway::new("http://localhost:7700", "", "web_pages_cli"));

    let task = store
        .create_task(None, args.url.clone(), args.max_depth, args.max_pages, !args.allow_other_domains)
        .await?;

    let run_args = RunArgs {
        task_id: task.id.clone(),
        start_url: args.url,
        max_depth: args.max_depth,
        max_pages: args.max_pages,
        same_domain_only: !args.allow_other_domains,
        domain_restriction: None,
        crawl_delay_ms: args.delay_ms,
    };

    CrawlEngine::run(store.clone(), index, fetcher, run_args).await?;

    let finished = store.get_task(&task.id).await?;
    println!(
        "task {} finished: status={} success={} failed={} total={}",
        finished.id, finished.status, finished.success_pages, finished.failed_pages, finished.total_pages
    );

    Ok(())
}
