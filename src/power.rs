//! Power-duration analysis and threshold estimation
//!
//! Builds a mean-maximal-power curve from historical power streams and
//! derives functional threshold power from the best 60, 20, and 5 minute
//! efforts, weighting longer efforts more heavily and applying a small
//! upward buffer since best-effort data tends to understate a
//! sustainable threshold.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::ThresholdSettings;
use crate::error::{ReadyRsError, Result};
use crate::models::DateWindow;

/// Mean-maximal durations tracked on the curve, in seconds
pub const MMP_DURATIONS: [u32; 10] = [5, 15, 30, 60, 120, 300, 600, 1200, 1800, 3600];

/// One activity's power stream with its calendar date
#[derive(Debug, Clone)]
pub struct PowerObservation {
    pub date: NaiveDate,
    pub activity_id: String,
    pub watts: Vec<u16>,
}

/// Best average power held for one duration
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCurvePoint {
    pub duration_seconds: u32,
    pub max_power: u16,
    pub date: NaiveDate,
    pub activity_id: String,
}

/// Mean-maximal power curve over a historical window
#[derive(Debug, Clone)]
pub struct PowerDurationCurve {
    /// Every per-activity best, for provenance
    pub points: Vec<PowerCurvePoint>,

    /// Best power across all activities per tracked duration
    pub standard_durations: HashMap<u32, u16>,

    /// First and last activity dates contributing to the curve
    pub date_range: (NaiveDate, NaiveDate),
}

impl PowerDurationCurve {
    pub fn best_for(&self, duration_seconds: u32) -> Option<u16> {
        self.standard_durations.get(&duration_seconds).copied()
    }
}

/// One estimator's contribution to the threshold estimate
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEstimate {
    /// Effort duration the method reads, seconds
    pub duration_seconds: u32,

    /// Best power held for that duration
    pub best_power: u16,

    /// The method's threshold estimate in watts
    pub ftp: u16,

    /// Confidence weight of the method
    pub weight: f64,
}

/// Weighted threshold estimate with its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct FtpEstimate {
    /// Final estimate after weighting and the upward buffer
    pub ftp: u16,

    /// Per-method estimates that contributed
    pub methods: Vec<MethodEstimate>,

    /// Share of total method weight that was available, 0 to 1
    pub confidence: f64,
}

/// Builds power curves and estimates threshold power
#[derive(Debug, Clone)]
pub struct ThresholdEstimator {
    config: ThresholdSettings,
}

impl Default for ThresholdEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdEstimator {
    pub fn new() -> Self {
        Self::with_config(ThresholdSettings::default())
    }

    pub fn with_config(config: ThresholdSettings) -> Self {
        ThresholdEstimator { config }
    }

    /// Mean-maximal curve over the observations that fall inside the
    /// window
    pub fn calculate_curve(
        &self,
        observations: &[PowerObservation],
        window: &DateWindow,
    ) -> Result<PowerDurationCurve> {
        let mut points = Vec::new();

        for obs in observations {
            if !window.contains(obs.date) || obs.watts.is_empty() {
                continue;
            }
            for &duration in &MMP_DURATIONS {
                if let Some(max_power) = mean_maximal_power(&obs.watts, duration) {
                    points.push(PowerCurvePoint {
                        duration_seconds: duration,
                        max_power,
                        date: obs.date,
                        activity_id: obs.activity_id.clone(),
                    });
                }
            }
        }

        if points.is_empty() {
            return Err(ReadyRsError::insufficient(
                "power duration curve",
                "no power streams inside the historical window",
            ));
        }

        let mut standard_durations = HashMap::new();
        for &duration in &MMP_DURATIONS {
            let best = points
                .iter()
                .filter(|p| p.duration_seconds == duration)
                .map(|p| p.max_power)
                .max();
            if let Some(max_power) = best {
                standard_durations.insert(duration, max_power);
            }
        }

        let min_date = points.iter().map(|p| p.date).min().unwrap_or(window.start);
        let max_date = points.iter().map(|p| p.date).max().unwrap_or(window.end);

        tracing::debug!(
            activities = observations.len(),
            durations = standard_durations.len(),
            start = %min_date,
            end = %max_date,
            "power duration curve built"
        );

        Ok(PowerDurationCurve {
            points,
            standard_durations,
            date_range: (min_date, max_date),
        })
    }

    /// Threshold power from the curve's best 60, 20, and 5 minute
    /// efforts.
    ///
    /// Each available method contributes its estimate at its confidence
    /// weight; the weighted mean then gets the configured upward buffer.
    /// None when the curve holds none of the three durations, in which
    /// case the caller falls back to an externally supplied threshold.
    pub fn estimate_ftp(&self, curve: &PowerDurationCurve) -> Option<FtpEstimate> {
        let candidates = [
            (3600, self.config.sixty_min_factor, self.config.sixty_min_weight),
            (1200, self.config.twenty_min_factor, self.config.twenty_min_weight),
            (300, self.config.five_min_factor, self.config.five_min_weight),
        ];
        let total_weight: f64 = candidates.iter().map(|(_, _, w)| w).sum();

        let mut methods = Vec::new();
        for (duration, factor, weight) in candidates {
            if let Some(best_power) = curve.best_for(duration) {
                let ftp = (Decimal::from(best_power) * factor)
                    .round()
                    .to_u16()
                    .unwrap_or(0);
                methods.push(MethodEstimate {
                    duration_seconds: duration,
                    best_power,
                    ftp,
                    weight,
                });
            }
        }

        if methods.is_empty() {
            return None;
        }

        let weight_sum: f64 = methods.iter().map(|m| m.weight).sum();
        let weighted: f64 = methods
            .iter()
            .map(|m| m.ftp as f64 * m.weight)
            .sum::<f64>()
            / weight_sum;
        let buffer = self.config.buffer_factor.to_f64().unwrap_or(1.0);
        let ftp = (weighted * buffer).round() as u16;

        let estimate = FtpEstimate {
            ftp,
            methods,
            confidence: weight_sum / total_weight,
        };

        tracing::info!(
            ftp = estimate.ftp,
            methods = estimate.methods.len(),
            confidence = estimate.confidence,
            "threshold power estimated"
        );

        Some(estimate)
    }
}

/// Best rolling average over windows of the given length, assuming
/// one-second samples. None when the stream is shorter than the window.
fn mean_maximal_power(watts: &[u16], duration_seconds: u32) -> Option<u16> {
    let window_size = duration_seconds as usize;
    if watts.len() < window_size || window_size == 0 {
        return None;
    }

    let mut max_avg = 0u32;
    for window in watts.windows(window_size) {
        let sum: u32 = window.iter().map(|&p| p as u32).sum();
        let avg = sum / window_size as u32;
        max_avg = max_avg.max(avg);
    }

    Some(max_avg as u16)
}
