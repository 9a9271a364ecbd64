//! In-memory stores for computed results
//!
//! Scores, load states, and baseline snapshots are kept in
//! `RwLock`-guarded ordered maps. Writers insert dated records that
//! supersede earlier ones for the same key; nothing is mutated in place,
//! so a reader holding yesterday's snapshot is never surprised.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::models::{
    BaselineMetric, DailyBaseline, DailyLoad, DailyScore, DateWindow, ScoreType,
};

/// Store for computed daily scores, keyed by family and date
#[derive(Debug, Default)]
pub struct ScoreStore {
    scores: RwLock<BTreeMap<(ScoreType, NaiveDate), DailyScore>>,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a score, superseding any earlier result for that day
    pub async fn put(&self, score: DailyScore) {
        let key = (score.score_type, score.date);
        self.scores.write().await.insert(key, score);
    }

    pub async fn get(&self, score_type: ScoreType, date: NaiveDate) -> Option<DailyScore> {
        self.scores.read().await.get(&(score_type, date)).cloned()
    }

    /// Scores of one family inside the window, in date order
    pub async fn range(&self, score_type: ScoreType, window: &DateWindow) -> Vec<DailyScore> {
        self.scores
            .read()
            .await
            .range((score_type, window.start)..=(score_type, window.end))
            .map(|(_, score)| score.clone())
            .collect()
    }

    /// Most recent score of one family
    pub async fn latest(&self, score_type: ScoreType) -> Option<DailyScore> {
        self.scores
            .read()
            .await
            .range((score_type, NaiveDate::MIN)..=(score_type, NaiveDate::MAX))
            .next_back()
            .map(|(_, score)| score.clone())
    }
}

/// Store for the daily training load series
#[derive(Debug, Default)]
pub struct LoadStore {
    loads: RwLock<BTreeMap<NaiveDate, DailyLoad>>,
}

impl LoadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, load: DailyLoad) {
        self.loads.write().await.insert(load.date, load);
    }

    /// Insert a replayed series in one write
    pub async fn put_many(&self, series: Vec<DailyLoad>) {
        let mut loads = self.loads.write().await;
        for load in series {
            loads.insert(load.date, load);
        }
    }

    pub async fn get(&self, date: NaiveDate) -> Option<DailyLoad> {
        self.loads.read().await.get(&date).cloned()
    }

    /// Latest load state on record
    pub async fn latest(&self) -> Option<DailyLoad> {
        self.loads
            .read()
            .await
            .last_key_value()
            .map(|(_, load)| load.clone())
    }

    /// Latest load state strictly before the date
    pub async fn latest_before(&self, date: NaiveDate) -> Option<DailyLoad> {
        self.loads
            .read()
            .await
            .range(..date)
            .next_back()
            .map(|(_, load)| load.clone())
    }

    /// Load states inside the window, in date order
    pub async fn range(&self, window: &DateWindow) -> Vec<DailyLoad> {
        self.loads
            .read()
            .await
            .range(window.start..=window.end)
            .map(|(_, load)| load.clone())
            .collect()
    }
}

/// Store for dated baseline snapshots per metric
#[derive(Debug, Default)]
pub struct BaselineStore {
    baselines: RwLock<BTreeMap<(BaselineMetric, NaiveDate), DailyBaseline>>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, baseline: DailyBaseline) {
        let key = (baseline.metric, baseline.date);
        self.baselines.write().await.insert(key, baseline);
    }

    pub async fn get(&self, metric: BaselineMetric, date: NaiveDate) -> Option<DailyBaseline> {
        self.baselines.read().await.get(&(metric, date)).cloned()
    }

    /// Most recent snapshot for the metric on or before the date.
    ///
    /// Scoring a day compares against the snapshot current as of that
    /// day, so late-arriving history reads the baseline it would have
    /// seen at the time.
    pub async fn latest_on_or_before(
        &self,
        metric: BaselineMetric,
        date: NaiveDate,
    ) -> Option<DailyBaseline> {
        self.baselines
            .read()
            .await
            .range((metric, NaiveDate::MIN)..=(metric, date))
            .next_back()
            .map(|(_, baseline)| baseline.clone())
    }

    /// Most recent snapshot for the metric
    pub async fn latest(&self, metric: BaselineMetric) -> Option<DailyBaseline> {
        self.baselines
            .read()
            .await
            .range((metric, NaiveDate::MIN)..=(metric, NaiveDate::MAX))
            .next_back()
            .map(|(_, baseline)| baseline.clone())
    }
}
