use serde::{Deserialize, Serialize};

use crate::core::model::ItemType;
use crate::error::{StreamerError, StreamerResult};

/// # Quota Configuration
///
/// One global "requests per minute" budget shared by every subject and both
/// item types. All shares are whole percentages so the split is computed in
/// integer arithmetic: `floor((share - margin) * quota / 100)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotaConfig {
    /// Hard cap on requests per minute across everything.
    pub max_requests_per_minute: u32,
    /// Held back from each share against overflow.
    pub safety_margin_pct: u32,
    /// Share of the quota spent on post listings.
    pub post_share_pct: u32,
    /// Share of the quota spent on comment listings.
    pub comment_share_pct: u32,
    /// Head-room added to observed volume when retuning.
    pub retune_overflow_pct: u32,
    /// Largest `limit` a single fetch may ask for.
    pub max_records_per_request: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 60,
            safety_margin_pct: 5,
            post_share_pct: 25,
            comment_share_pct: 75,
            retune_overflow_pct: 25,
            max_records_per_request: 100,
        }
    }
}

impl QuotaConfig {
    /// A default split around a different global quota.
    pub fn with_quota(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute,
            ..Self::default()
        }
    }

    /// Rejects configurations the scheduler cannot plan with.
    pub fn validate(&self) -> StreamerResult<()> {
        if self.max_requests_per_minute == 0 {
            return Err(StreamerError::InvalidQuota(
                "maxRequestsPerMinute must be greater than zero".into(),
            ));
        }
        if self.post_share_pct + self.comment_share_pct != 100 {
            return Err(StreamerError::InvalidQuota(format!(
                "post ({}%) and comment ({}%) shares must add up to 100%",
                self.post_share_pct, self.comment_share_pct
            )));
        }
        if self.safety_margin_pct >= self.post_share_pct.min(self.comment_share_pct) {
            return Err(StreamerError::InvalidQuota(format!(
                "safety margin {}% leaves nothing of the smaller share",
                self.safety_margin_pct
            )));
        }
        if self.max_records_per_request == 0 {
            return Err(StreamerError::InvalidQuota(
                "maxRecordsPerRequest must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Share of the quota for one type, after the safety margin.
    pub fn share_pct(&self, item_type: ItemType) -> u32 {
        let share = match item_type {
            ItemType::Post => self.post_share_pct,
            ItemType::Comment => self.comment_share_pct,
        };
        share.saturating_sub(self.safety_margin_pct)
    }

    /// Requests per minute available to one type across all subjects.
    pub fn requests_per_minute(&self, item_type: ItemType) -> u32 {
        let product = u64::from(self.share_pct(item_type)) * u64::from(self.max_requests_per_minute);
        (product / 100) as u32
    }

    /// Steady-state requests per minute for an observed per-minute volume:
    /// `max(1, ceil(observed * (1 + overflow) / max_records_per_request))`.
    pub fn requests_for_volume(&self, observed: u32) -> u32 {
        let scaled = u64::from(observed) * u64::from(100 + self.retune_overflow_pct);
        let per_request = 100 * u64::from(self.max_records_per_request);
        let needed = scaled.div_ceil(per_request);
        u32::try_from(needed).unwrap_or(u32::MAX).max(1)
    }
}
