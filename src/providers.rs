//! Provider abstractions over wearable feeds and activity platforms
//!
//! The engine never talks to vendor APIs directly; it consumes these
//! traits so fetch, auth, and rate limiting stay on the provider side.
//! All implementations must be `Send + Sync` for use across async tasks.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ProviderError;
use crate::models::{
    AccountTier, Activity, ActivitySamples, BiometricSample, DateWindow, SleepSession,
};

/// Result alias for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Source of biometric readings and sleep sessions
#[async_trait]
pub trait WearableFeed: Send + Sync {
    /// Feed name for logs and error reports
    fn name(&self) -> &'static str;

    /// All biometric samples with timestamps inside the window
    async fn biometric_samples(&self, window: &DateWindow)
        -> ProviderResult<Vec<BiometricSample>>;

    /// The night attributed to the given wake-up date, if recorded
    async fn sleep_session(&self, date: NaiveDate) -> ProviderResult<Option<SleepSession>>;
}

/// Source of externally tracked training activities
#[async_trait]
pub trait ActivityPlatform: Send + Sync {
    /// Platform name; also stamped on activities for deduplication
    fn name(&self) -> &'static str;

    /// Activity summaries starting inside the window
    async fn activities(&self, window: &DateWindow) -> ProviderResult<Vec<Activity>>;

    /// Per-second sample stream for one activity, when the platform has
    /// one
    async fn activity_samples(&self, activity_id: &str)
        -> ProviderResult<Option<ActivitySamples>>;
}

/// Source of the athlete's account tier
#[async_trait]
pub trait TierSource: Send + Sync {
    async fn account_tier(&self) -> ProviderResult<AccountTier>;
}

/// In-memory wearable feed for replays and tests
#[derive(Debug, Default)]
pub struct StaticWearableFeed {
    samples: Vec<BiometricSample>,
    sleep: HashMap<NaiveDate, SleepSession>,
}

impl StaticWearableFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(mut self, samples: Vec<BiometricSample>) -> Self {
        self.samples.extend(samples);
        self
    }

    pub fn with_sleep(mut self, session: SleepSession) -> Self {
        self.sleep.insert(session.date, session);
        self
    }
}

#[async_trait]
impl WearableFeed for StaticWearableFeed {
    fn name(&self) -> &'static str {
        "static_wearable"
    }

    async fn biometric_samples(
        &self,
        window: &DateWindow,
    ) -> ProviderResult<Vec<BiometricSample>> {
        Ok(self
            .samples
            .iter()
            .filter(|s| window.contains(s.date()))
            .cloned()
            .collect())
    }

    async fn sleep_session(&self, date: NaiveDate) -> ProviderResult<Option<SleepSession>> {
        Ok(self.sleep.get(&date).cloned())
    }
}

/// In-memory activity platform for replays and tests
#[derive(Debug, Default)]
pub struct StaticActivityPlatform {
    activities: Vec<Activity>,
    samples: HashMap<String, ActivitySamples>,
}

impl StaticActivityPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn with_samples(mut self, samples: ActivitySamples) -> Self {
        self.samples.insert(samples.activity_id.clone(), samples);
        self
    }
}

#[async_trait]
impl ActivityPlatform for StaticActivityPlatform {
    fn name(&self) -> &'static str {
        "static_platform"
    }

    async fn activities(&self, window: &DateWindow) -> ProviderResult<Vec<Activity>> {
        Ok(self
            .activities
            .iter()
            .filter(|a| window.contains(a.date()))
            .cloned()
            .collect())
    }

    async fn activity_samples(
        &self,
        activity_id: &str,
    ) -> ProviderResult<Option<ActivitySamples>> {
        Ok(self.samples.get(activity_id).cloned())
    }
}

/// Tier source that always reports the same tier
#[derive(Debug, Clone, Copy)]
pub struct FixedTier(pub AccountTier);

#[async_trait]
impl TierSource for FixedTier {
    async fn account_tier(&self) -> ProviderResult<AccountTier> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityCategory, BiometricMetric};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_static_feed_filters_by_window() {
        let inside = Utc.with_ymd_and_hms(2024, 6, 10, 7, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        let feed = StaticWearableFeed::new().with_samples(vec![
            BiometricSample::new(BiometricMetric::Hrv, 65.0, inside),
            BiometricSample::new(BiometricMetric::Hrv, 80.0, outside),
        ]);

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );
        let samples = feed.biometric_samples(&window).await.unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 65.0);
    }

    #[tokio::test]
    async fn test_static_platform_roundtrip() {
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let activity = Activity::new(start, 3600, ActivityCategory::Cardio);
        let id = activity.id.clone();

        let platform = StaticActivityPlatform::new().with_activity(activity);

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );
        let activities = platform.activities(&window).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].id, id);

        // No stream registered for the activity
        assert!(platform.activity_samples(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fixed_tier() {
        let source = FixedTier(AccountTier::Premium);
        assert_eq!(source.account_tier().await.unwrap(), AccountTier::Premium);
    }
}
