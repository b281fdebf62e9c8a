use anyhow::{Context, Result, bail};
use clap::Parser;
use lib_streamer::core::Subject;
use lib_streamer::retrieve::ApiClientOptions;
use lib_streamer::sources::reddit::REDDIT_BASE_URL;
use lib_streamer::{QuotaConfig, StreamerSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "server_reddit.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Quota-aware subreddit streamer", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "REDDIT_SUBREDDITS", value_delimiter = ',', help = "Comma-separated subreddits to stream.")]
    pub subreddits: Option<Vec<String>>,

    #[clap(long, env = "REDDIT_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "REDDIT_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "REDDIT_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "REDDIT_BASE_URL", help = "Base URL serving the /r/<subreddit>/<listing>.json endpoints.")]
    pub base_url: Option<String>,

    #[clap(long, env = "REDDIT_USER_AGENT", help = "User-Agent sent with every request.")]
    pub user_agent: Option<String>,

    #[clap(long, env = "REDDIT_MAX_REQUESTS_PER_MINUTE", help = "Global request quota per minute.")]
    pub max_requests_per_minute: Option<u32>,

    #[clap(long, env = "REDDIT_SAFETY_MARGIN_PCT", help = "Percentage of the quota held back from each share.")]
    pub safety_margin_pct: Option<u32>,

    #[clap(long, env = "REDDIT_POST_SHARE_PCT", help = "Percentage of the quota for post listings.")]
    pub post_share_pct: Option<u32>,

    #[clap(long, env = "REDDIT_COMMENT_SHARE_PCT", help = "Percentage of the quota for comment listings.")]
    pub comment_share_pct: Option<u32>,

    #[clap(long, env = "REDDIT_RETUNE_OVERFLOW_PCT", help = "Head-room added to observed volume when retuning.")]
    pub retune_overflow_pct: Option<u32>,

    #[clap(long, env = "REDDIT_PRELOAD_LIMIT", help = "Records fetched per feed when seeding the caches.")]
    pub preload_limit: Option<u32>,

    #[clap(long, env = "REDDIT_STREAM_LIMIT", help = "Records fetched per scheduled poll.")]
    pub stream_limit: Option<u32>,

    #[clap(long, env = "REDDIT_FETCH_TIMEOUT_SECS", help = "Timeout in seconds for a single poll.")]
    pub fetch_timeout_secs: Option<u64>,

    #[clap(long, env = "REDDIT_MAX_RETRIES", help = "HTTP retries for transient failures.")]
    pub max_retries: Option<u32>,

    #[clap(long, env = "REDDIT_ALIGN_TO_MINUTE", help = "Start the clock at the wall-clock second (true/false).")]
    pub align_to_minute: Option<bool>,

    #[clap(long, env = "REDDIT_EVENTS", help = "Events the ingest subscriber receives: 'all' or a list such as 'stream,plan_swapped'.")]
    pub events: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            subreddits: other.subreddits.or(self.subreddits),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            base_url: other.base_url.or(self.base_url),
            user_agent: other.user_agent.or(self.user_agent),
            max_requests_per_minute: other.max_requests_per_minute.or(self.max_requests_per_minute),
            safety_margin_pct: other.safety_margin_pct.or(self.safety_margin_pct),
            post_share_pct: other.post_share_pct.or(self.post_share_pct),
            comment_share_pct: other.comment_share_pct.or(self.comment_share_pct),
            retune_overflow_pct: other.retune_overflow_pct.or(self.retune_overflow_pct),
            preload_limit: other.preload_limit.or(self.preload_limit),
            stream_limit: other.stream_limit.or(self.stream_limit),
            fetch_timeout_secs: other.fetch_timeout_secs.or(self.fetch_timeout_secs),
            max_retries: other.max_retries.or(self.max_retries),
            align_to_minute: other.align_to_minute.or(self.align_to_minute),
            events: other.events.or(self.events),
        }
    }

    fn defaults() -> Config {
        let quota = QuotaConfig::default();
        let settings = StreamerSettings::default();
        Config {
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            base_url: Some(REDDIT_BASE_URL.to_string()),
            user_agent: Some(format!("server_reddit/{}", env!("CARGO_PKG_VERSION"))),
            max_requests_per_minute: Some(quota.max_requests_per_minute),
            safety_margin_pct: Some(quota.safety_margin_pct),
            post_share_pct: Some(quota.post_share_pct),
            comment_share_pct: Some(quota.comment_share_pct),
            retune_overflow_pct: Some(quota.retune_overflow_pct),
            preload_limit: Some(settings.preload_limit),
            stream_limit: Some(settings.stream_limit),
            fetch_timeout_secs: Some(settings.fetch_timeout_secs),
            max_retries: Some(3),
            align_to_minute: Some(settings.align_to_minute),
            events: Some("stream,plan_swapped".to_string()),
            ..Default::default()
        }
    }

    /// Subreddits as validated subjects.
    pub fn subjects(&self) -> Result<Vec<Subject>> {
        let names: Vec<Subject> = self
            .subreddits
            .iter()
            .flatten()
            .map(|s| s.trim().trim_start_matches("r/"))
            .filter(|s| !s.is_empty())
            .map(Subject::from)
            .collect();
        if names.is_empty() {
            bail!("no subreddits configured (use --subreddits or the 'subreddits' config key)");
        }
        Ok(names)
    }

    pub fn streamer_settings(&self) -> StreamerSettings {
        let base = StreamerSettings::default();
        let quota = QuotaConfig {
            max_requests_per_minute: self.max_requests_per_minute.unwrap_or(base.quota.max_requests_per_minute),
            safety_margin_pct: self.safety_margin_pct.unwrap_or(base.quota.safety_margin_pct),
            post_share_pct: self.post_share_pct.unwrap_or(base.quota.post_share_pct),
            comment_share_pct: self.comment_share_pct.unwrap_or(base.quota.comment_share_pct),
            retune_overflow_pct: self.retune_overflow_pct.unwrap_or(base.quota.retune_overflow_pct),
            ..base.quota.clone()
        };
        StreamerSettings {
            quota,
            preload_limit: self.preload_limit.unwrap_or(base.preload_limit),
            stream_limit: self.stream_limit.unwrap_or(base.stream_limit),
            fetch_timeout_secs: self.fetch_timeout_secs.unwrap_or(base.fetch_timeout_secs),
            align_to_minute: self.align_to_minute.unwrap_or(base.align_to_minute),
        }
    }

    pub fn api_options(&self) -> ApiClientOptions {
        let base = ApiClientOptions::default();
        ApiClientOptions {
            user_agent: self.user_agent.clone().unwrap_or(base.user_agent),
            timeout: self.fetch_timeout_secs.map(Duration::from_secs).unwrap_or(base.timeout),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            auth_token: None,
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(REDDIT_BASE_URL)
    }
}

fn read_config_file(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str::<Config>(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Layers defaults, the JSON config file and the CLI/env values, in that order.
///
/// A missing default config file is fine; a missing file that was asked for
/// explicitly is an error.
pub fn resolve(cli: Config) -> Result<Config> {
    let mut current_config = Config::defaults();

    match &cli.config_path {
        Some(path) => current_config = current_config.merge(read_config_file(path)?),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.exists() {
                current_config = current_config.merge(read_config_file(&path)?);
            }
        }
    }

    Ok(current_config.merge(cli))
}

pub fn load_config() -> Result<Config> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();
    resolve(Config::parse())
}
