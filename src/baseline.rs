//! Rolling physiological baselines
//!
//! Every comparative judgement in the engine ("HRV is 18% below normal")
//! is made against a trailing per-metric baseline rather than a
//! population norm. Baselines are recomputed when a new day's value
//! arrives; each recomputation produces a fresh dated snapshot and the
//! previous one is superseded, never edited.

use std::collections::{HashMap, VecDeque};

use chrono::{Duration, NaiveDate};
use statrs::statistics::Statistics;

use crate::config::BaselineSettings;
use crate::models::{BaselineMetric, BiometricMetric, DailyBaseline};

/// Tracks trailing-window baselines for every metric it has seen
#[derive(Debug, Clone)]
pub struct BaselineTracker {
    config: BaselineSettings,
    windows: HashMap<BaselineMetric, VecDeque<(NaiveDate, f64)>>,
    latest: HashMap<BaselineMetric, DailyBaseline>,
}

impl Default for BaselineTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::with_config(BaselineSettings::default())
    }

    pub fn with_config(config: BaselineSettings) -> Self {
        BaselineTracker {
            config,
            windows: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    /// Fold one day's value into the metric's window and return the new
    /// baseline snapshot.
    ///
    /// Re-submitting a date replaces that day's contribution, so a
    /// refreshed pass over the same day is idempotent. Days with no value
    /// simply never enter the window; gaps are excluded, not zero-filled.
    pub fn update(&mut self, metric: BaselineMetric, value: f64, date: NaiveDate) -> DailyBaseline {
        let window = self.windows.entry(metric).or_default();

        window.retain(|(d, _)| *d != date);

        // Keep the window date-ordered so eviction can work from the front
        let pos = window.partition_point(|(d, _)| *d < date);
        window.insert(pos, (date, value));

        let newest = window.back().map(|(d, _)| *d).unwrap_or(date);
        let horizon = newest - Duration::days(self.config.window_days as i64 - 1);
        while let Some((front, _)) = window.front() {
            if *front < horizon {
                window.pop_front();
            } else {
                break;
            }
        }

        let values: Vec<f64> = window.iter().map(|(_, v)| *v).collect();
        let mean = values.iter().copied().mean();
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            values.iter().copied().std_dev()
        };

        let baseline = DailyBaseline {
            metric,
            date: newest,
            mean,
            std_dev,
            window_size_days: self.config.window_days,
            sample_count: values.len(),
            low_confidence: values.len() < self.config.min_days,
        };

        tracing::trace!(
            ?metric,
            %date,
            mean,
            std_dev,
            samples = values.len(),
            low_confidence = baseline.low_confidence,
            "baseline updated"
        );

        self.latest.insert(metric, baseline.clone());
        baseline
    }

    /// Latest snapshot for a metric, if any day has been observed
    pub fn latest(&self, metric: BaselineMetric) -> Option<&DailyBaseline> {
        self.latest.get(&metric)
    }

    /// Percent deviation of `value` from the metric's latest mean
    pub fn deviation_pct(&self, metric: BaselineMetric, value: f64) -> Option<f64> {
        self.latest(metric).and_then(|b| b.deviation_pct(value))
    }

    /// Raw window contents for a metric, oldest first
    pub fn window(&self, metric: BaselineMetric) -> Vec<(NaiveDate, f64)> {
        self.windows
            .get(&metric)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Collapse one day's raw samples into a single value for baselining.
///
/// HRV and respiratory rate average across the night, resting HR takes
/// the overnight minimum, counters sum.
pub fn aggregate_daily(metric: BiometricMetric, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let aggregated = match metric {
        BiometricMetric::Hrv | BiometricMetric::RespiratoryRate => {
            values.iter().sum::<f64>() / values.len() as f64
        }
        BiometricMetric::RestingHr => values.iter().copied().fold(f64::INFINITY, f64::min),
        BiometricMetric::StepCount | BiometricMetric::ActiveEnergy => values.iter().sum(),
    };
    Some(aggregated)
}

/// Baseline metric a biometric sample feeds, where one exists
pub fn baseline_metric_for(metric: BiometricMetric) -> Option<BaselineMetric> {
    match metric {
        BiometricMetric::Hrv => Some(BaselineMetric::Hrv),
        BiometricMetric::RestingHr => Some(BaselineMetric::RestingHr),
        BiometricMetric::RespiratoryRate => Some(BaselineMetric::RespiratoryRate),
        BiometricMetric::StepCount | BiometricMetric::ActiveEnergy => None,
    }
}
