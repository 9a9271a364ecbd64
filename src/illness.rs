//! Body-stress detection
//!
//! Six physiological signals evaluated over a trailing window. Each
//! fired signal adds a fixed confidence increment, a sustained
//! same-direction trend adds a flat bonus, and an indicator is raised
//! only when both the confidence gate and the concurrent-signal gate
//! pass. The detector never guesses from thin data: under three days of
//! readings it stays silent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::IllnessSettings;
use crate::models::{DailyBaseline, IllnessIndicator, IllnessSeverity, IllnessSignal};

/// One day's worth of signal inputs, assembled by the engine from
/// baselines, sleep scores, and activity totals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyVitals {
    pub date: NaiveDate,

    /// Overnight HRV mean, milliseconds
    pub hrv: Option<f64>,

    /// Overnight resting heart rate, bpm
    pub resting_hr: Option<f64>,

    /// Overnight respiratory rate, breaths per minute
    pub respiratory_rate: Option<f64>,

    /// Sleep score for the night ending this day
    pub sleep_score: Option<f64>,

    /// Total activity minutes for the day
    pub activity_minutes: Option<f64>,
}

impl DailyVitals {
    pub fn new(date: NaiveDate) -> Self {
        DailyVitals {
            date,
            ..Default::default()
        }
    }

    fn has_data(&self) -> bool {
        self.hrv.is_some()
            || self.resting_hr.is_some()
            || self.respiratory_rate.is_some()
            || self.sleep_score.is_some()
            || self.activity_minutes.is_some()
    }
}

/// Baselines the detector compares today's vitals against
#[derive(Debug, Clone, Copy, Default)]
pub struct IllnessContext<'a> {
    pub hrv_baseline: Option<&'a DailyBaseline>,
    pub rhr_baseline: Option<&'a DailyBaseline>,
    pub respiratory_baseline: Option<&'a DailyBaseline>,
    pub activity_baseline: Option<&'a DailyBaseline>,
}

/// Multi-signal illness detector
#[derive(Debug, Clone)]
pub struct IllnessDetector {
    config: IllnessSettings,
}

impl Default for IllnessDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl IllnessDetector {
    pub fn new() -> Self {
        Self::with_config(IllnessSettings::default())
    }

    pub fn with_config(config: IllnessSettings) -> Self {
        IllnessDetector { config }
    }

    /// Evaluate the trailing window, last entry being today.
    ///
    /// Returns None when data is insufficient or the gates do not pass;
    /// an absent indicator is the normal healthy state, not an error.
    pub fn evaluate(
        &self,
        window: &[DailyVitals],
        ctx: &IllnessContext,
    ) -> Option<IllnessIndicator> {
        let today = window.last()?;
        let days_with_data = window.iter().filter(|v| v.has_data()).count();
        if days_with_data < self.config.min_days {
            tracing::debug!(
                date = %today.date,
                days_with_data,
                "body-stress detection skipped, not enough history"
            );
            return None;
        }

        let mut signals = BTreeSet::new();
        let mut confidence = 0.0f64;

        if let Some(pct) = deviation_pct(today.hrv, ctx.hrv_baseline) {
            if pct <= self.config.hrv_drop_pct {
                signals.insert(IllnessSignal::HrvDrop);
                confidence += self.config.hrv_drop_confidence;
            } else if pct >= self.config.hrv_spike_pct {
                // Parasympathetic overdrive, a distinct pattern from
                // ordinary suppression
                signals.insert(IllnessSignal::HrvSpike);
                confidence += self.config.hrv_spike_confidence;
                if pct >= self.config.hrv_spike_pct * 2.0 {
                    confidence += self.config.extreme_spike_bonus;
                }
            }
        }

        if let Some(pct) = deviation_pct(today.resting_hr, ctx.rhr_baseline) {
            if pct >= self.config.rhr_rise_pct {
                signals.insert(IllnessSignal::ElevatedRestingHr);
                confidence += self.config.rhr_confidence;
            }
        }

        if let Some(pct) = self.sleep_drop_pct(window) {
            if pct <= self.config.sleep_drop_pct {
                signals.insert(IllnessSignal::SleepDisruption);
                confidence += self.config.sleep_confidence;
            }
        }

        if let Some(pct) = deviation_pct(today.respiratory_rate, ctx.respiratory_baseline) {
            if pct.abs() >= self.config.respiratory_change_pct {
                signals.insert(IllnessSignal::RespiratoryChange);
                confidence += self.config.respiratory_confidence;
            }
        }

        if let Some(pct) = deviation_pct(today.activity_minutes, ctx.activity_baseline) {
            if pct <= self.config.activity_drop_pct {
                signals.insert(IllnessSignal::ActivityDrop);
                confidence += self.config.activity_confidence;
            }
        }

        if self.sustained_trend(window) {
            confidence += self.config.trend_bonus;
        }

        let confidence = confidence.min(100.0);
        if signals.len() < self.config.min_signals || confidence < self.config.min_confidence {
            return None;
        }

        let severity = IllnessSeverity::from_confidence(confidence)?;
        tracing::info!(
            date = %today.date,
            confidence,
            ?severity,
            signals = signals.len(),
            "body-stress indicator raised"
        );

        Some(IllnessIndicator {
            date: today.date,
            signals,
            confidence,
            severity,
        })
    }

    /// Today's sleep score relative to the mean of the prior window
    fn sleep_drop_pct(&self, window: &[DailyVitals]) -> Option<f64> {
        let (today, prior) = window.split_last()?;
        let today_score = today.sleep_score?;

        let prior_scores: Vec<f64> = prior.iter().filter_map(|v| v.sleep_score).collect();
        if prior_scores.is_empty() {
            return None;
        }
        let prior_mean = prior_scores.iter().sum::<f64>() / prior_scores.len() as f64;
        if prior_mean <= 0.0 {
            return None;
        }
        Some((today_score - prior_mean) / prior_mean * 100.0)
    }

    /// HRV strictly falling or resting HR strictly rising across the
    /// last `trend_days` days
    fn sustained_trend(&self, window: &[DailyVitals]) -> bool {
        let n = self.config.trend_days;
        if n < 2 || window.len() < n {
            return false;
        }
        let tail = &window[window.len() - n..];

        let hrv: Vec<f64> = tail.iter().filter_map(|v| v.hrv).collect();
        let hrv_falling = hrv.len() == n && hrv.windows(2).all(|pair| pair[1] < pair[0]);

        let rhr: Vec<f64> = tail.iter().filter_map(|v| v.resting_hr).collect();
        let rhr_rising = rhr.len() == n && rhr.windows(2).all(|pair| pair[1] > pair[0]);

        hrv_falling || rhr_rising
    }
}

/// Percent deviation of a value from its baseline mean, None when either
/// side is missing or the baseline is degenerate
fn deviation_pct(value: Option<f64>, baseline: Option<&DailyBaseline>) -> Option<f64> {
    let value = value?;
    let mean = baseline?.mean;
    if mean <= 0.0 {
        return None;
    }
    Some((value - mean) / mean * 100.0)
}
