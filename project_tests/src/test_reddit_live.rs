//! # Reddit Live Data Test
//!
//! Fetches one listing page through lib_streamer's `RedditApi` and prints the
//! ids it returned, then runs the dedup cache over a second fetch to show how
//! many records would have been streamed.

use clap::Parser;
use lib_streamer::core::{DedupCache, FetchClient, ItemType, Subject};
use lib_streamer::retrieve::ApiClientOptions;
use lib_streamer::sources::reddit::RedditApi;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(about = "Probe the live Reddit listing endpoints")]
struct Args {
    /// Subreddit to probe.
    #[clap(long, default_value = "rust")]
    subreddit: String,

    /// Listing to probe: 'post' or 'comment'.
    #[clap(long, default_value = "post")]
    item_type: String,

    /// Records per request.
    #[clap(long, default_value_t = 25)]
    limit: u32,

    /// Seconds between the two fetches.
    #[clap(long, default_value_t = 5)]
    pause: u64,
}

/// Executes the live listing fetch.
///
/// Exits with status 1 when either request fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let item_type = match args.item_type.as_str() {
        "comment" | "comments" => ItemType::Comment,
        _ => ItemType::Post,
    };
    let subject = Subject::from(args.subreddit.as_str());

    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply()?;

    let api = RedditApi::new(ApiClientOptions {
        user_agent: "test_reddit_live/0.1".to_string(),
        ..ApiClientOptions::default()
    })?;
    let cache = DedupCache::new(std::slice::from_ref(&subject));

    println!("[*] Requesting r/{} {} listing (limit {})...", subject, item_type, args.limit);

    let first = match api.fetch(item_type, &subject, args.limit).await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("\n[ERROR] Listing retrieval failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    };
    println!("\n[SUCCESS] {} records received:", first.len());
    println!("-----------------------------------------------");
    for record in &first {
        let title = record.payload.get("title").and_then(|t| t.as_str()).unwrap_or("");
        println!("{:>10}  {}", record.id, title);
    }
    println!("-----------------------------------------------");
    let seeded = cache.filter_and_add(first, &subject, item_type)?;

    tokio::time::sleep(Duration::from_secs(args.pause)).await;

    match api.fetch(item_type, &subject, args.limit).await {
        Ok(second) => {
            let total = second.len();
            let out = cache.filter_and_add(second, &subject, item_type)?;
            println!(
                "[INFO] Second fetch: {} records, {} new | Cache size: {} (was {})",
                total,
                out.fresh.len(),
                out.cache_size,
                seeded.cache_size
            );
        }
        Err(e) => {
            eprintln!("\n[ERROR] Second fetch failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
