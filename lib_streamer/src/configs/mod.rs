//! # Configuration Modules
//!
//! Quota and runtime settings for the streamer. Values deserialize from the
//! camelCase JSON the server reads from its config file; every field has a
//! default so partial files are fine.

/// Global request quota and its post/comment split.
pub mod quota;
/// Streamer runtime settings (batch sizes, timeouts, clock alignment).
pub mod settings;

pub use quota::QuotaConfig;
pub use settings::StreamerSettings;
