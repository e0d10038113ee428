//! Presidential actions feed client
//!
//! Loads the presidential actions through the proxy, reusing the local
//! cache for an hour, and prints them as text or JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use actions_proxy::feed::{
    search, ActionItem, FeedLoader, FileStorage, LoadOrigin, LocalFeedCache, ProxyFeedSource,
    DEFAULT_FEED_URL, RETRY_HINT,
};

const STORAGE_FILE: &str = "local-storage.json";

#[derive(Parser, Debug)]
#[command(name = "actions-feed")]
#[command(version, about = "List White House presidential actions", long_about = None)]
struct Cli {
    /// Base URL of the caching proxy
    #[arg(
        long,
        env = "ACTIONS_PROXY_URL",
        default_value = "http://localhost:3000",
        hide_env = true
    )]
    proxy: String,

    /// Feed to request through the proxy
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Directory holding the local cache file
    #[arg(long, env = "ACTIONS_FEED_CACHE_DIR", hide_env = true)]
    cache_dir: Option<PathBuf>,

    /// Ignore the local cache and fetch again
    #[arg(long)]
    refresh: bool,

    /// Only show items whose title or description contains this text
    #[arg(short, long)]
    search: Option<String>,

    /// Print items as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "actions_proxy=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cache_dir = match cli.cache_dir {
        Some(dir) => dir,
        None => dirs::cache_dir()
            .map(|base| base.join("actions-feed"))
            .context("could not determine a cache directory, pass --cache-dir")?,
    };
    let storage = FileStorage::new(cache_dir.join(STORAGE_FILE));
    debug!("Local cache at {}", storage.path().display());

    let source = ProxyFeedSource::new(&cli.proxy, &cli.feed_url)
        .with_context(|| format!("cannot use proxy {}. {}", cli.proxy, RETRY_HINT))?;
    let loader = FeedLoader::new(Arc::new(source), LocalFeedCache::new(storage));

    let loaded = if cli.refresh {
        loader.refresh().await?
    } else {
        loader.load().await?
    };

    let items = match cli.search.as_deref() {
        Some(query) => search::filter(&loaded.items, query),
        None => loaded.items.iter().collect(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No presidential actions found.");
        return Ok(());
    }

    for (index, item) in items.iter().enumerate() {
        print_item(index + 1, item);
    }

    if let LoadOrigin::LocalCache = loaded.origin {
        println!("(from local cache, use --refresh to fetch again)");
    }
    Ok(())
}

fn print_item(number: usize, item: &ActionItem) {
    println!("{}. {}", number, item.title);
    match item.publication_date {
        Some(date) => println!("   {}", date.format("%B %-d, %Y")),
        None if !item.pub_date.is_empty() => println!("   {}", item.pub_date),
        None => {}
    }
    if !item.link.is_empty() {
        println!("   {}", item.link);
    }
    if !item.description.is_empty() {
        println!("   {}", item.description);
    }
    println!();
}
