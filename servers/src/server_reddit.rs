use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use lib_streamer::core::{EventFilter, RateScheduler};
use lib_streamer::sources::reddit::RedditApi;
use lib_streamer::RedditStreamer;

mod reddit_logic;
use reddit_logic::{config, ingest, logger};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;
    logger::setup_logging(&config.log_dir(), config.log_level())?;

    let subjects = config.subjects()?;
    let settings = config.streamer_settings();
    let filter = EventFilter::parse(config.events.as_deref().unwrap_or("all"))
        .context("Invalid --events value")?;

    let api = RedditApi::with_base_url(config.base_url(), config.api_options())?;
    let streamer = RedditStreamer::new(subjects.clone(), Arc::new(api), settings.clone())?;
    let tuner = RateScheduler::new(subjects.clone(), settings.quota.clone())?;
    let stats = ingest::register(&streamer, filter);

    log::info!(
        "Streaming {} subreddits under a quota of {} requests/min",
        subjects.len(),
        settings.quota.max_requests_per_minute
    );

    let shutdown = CancellationToken::new();
    let streamer_handle = tokio::spawn(streamer.run(tuner, shutdown.clone()));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Could not install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    shutdown.cancel();
    streamer_handle.await??;

    log::info!("Shutdown complete: {}", stats.summary());
    Ok(())
}
