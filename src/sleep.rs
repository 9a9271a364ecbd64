//! Sleep scoring
//!
//! Five weighted factors turn one night into a 0-100 score: duration
//! against a personalized need, stage architecture, efficiency,
//! disturbances, and bed/wake timing consistency. A debt ledger carries
//! the running shortfall forward with asymmetric repayment.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SleepSettings;
use crate::error::SleepError;
use crate::models::{DailyBaseline, DailyScore, ScoreType, SleepSession};

/// Baselines and prior-day context used while scoring a night
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepContext<'a> {
    /// Rolling sleep-duration baseline, minutes
    pub duration_baseline: Option<&'a DailyBaseline>,

    /// Rolling bedtime baseline, signed minutes from midnight
    pub bedtime_baseline: Option<&'a DailyBaseline>,

    /// Rolling wake-time baseline, signed minutes from midnight
    pub wake_baseline: Option<&'a DailyBaseline>,

    /// Total training stress of the previous day
    pub prior_day_tss: Option<Decimal>,
}

/// Scored night plus the need figures the debt ledger consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepAssessment {
    /// The 0-100 sleep score with factor breakdown
    pub score: DailyScore,

    /// Personalized sleep need for this night, minutes
    pub need_minutes: f64,

    /// Need minus actual sleep; positive when under-slept
    pub deficit_minutes: f64,
}

/// Running sleep-debt balance.
///
/// Deficits accumulate in full; surplus nights repay only a fraction,
/// and the balance never goes below zero. Each night is recorded once,
/// so re-scoring a day does not double-charge the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepDebtLedger {
    debt_minutes: f64,
    last_recorded: Option<NaiveDate>,
}

impl SleepDebtLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one night's deficit or surplus to the balance
    pub fn record_night(&mut self, date: NaiveDate, deficit_minutes: f64, surplus_repayment: f64) {
        if let Some(last) = self.last_recorded {
            if date <= last {
                return;
            }
        }

        if deficit_minutes > 0.0 {
            self.debt_minutes += deficit_minutes;
        } else {
            self.debt_minutes = (self.debt_minutes + deficit_minutes * surplus_repayment).max(0.0);
        }
        self.last_recorded = Some(date);
    }

    pub fn debt_minutes(&self) -> f64 {
        self.debt_minutes
    }
}

/// Scores sleep sessions against rolling baselines
#[derive(Debug, Clone)]
pub struct SleepScoreCalculator {
    config: SleepSettings,
}

impl Default for SleepScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepScoreCalculator {
    pub fn new() -> Self {
        Self::with_config(SleepSettings::default())
    }

    pub fn with_config(config: SleepSettings) -> Self {
        SleepScoreCalculator { config }
    }

    /// Score one night.
    ///
    /// A session with zero time in bed is invalid and produces no score
    /// at all; every other input degrades to a clamped factor instead of
    /// failing.
    pub fn score(
        &self,
        session: &SleepSession,
        ctx: &SleepContext,
    ) -> Result<SleepAssessment, SleepError> {
        if session.time_in_bed_minutes == 0 {
            return Err(SleepError::EmptyTimeInBed { date: session.date });
        }

        let need = self.sleep_need(ctx);
        let total_sleep = session.total_sleep_minutes as f64;

        let performance = clamp_factor(total_sleep / need * 100.0);
        let stage_quality = self.stage_quality(session);
        let efficiency =
            clamp_factor(total_sleep / session.time_in_bed_minutes as f64 * 100.0);
        let disturbances = clamp_factor(
            100.0 - self.config.disturbance_penalty * session.wake_event_count as f64,
        );
        let timing = self.timing_consistency(session, ctx);

        let value = performance * self.config.performance_weight
            + stage_quality * self.config.stage_weight
            + efficiency * self.config.efficiency_weight
            + disturbances * self.config.disturbance_weight
            + timing * self.config.timing_weight;

        let low_confidence = ctx
            .duration_baseline
            .map(|b| b.low_confidence)
            .unwrap_or(true);

        let score = DailyScore::new(session.date, ScoreType::Sleep, value)
            .with_sub_score("performance", performance)
            .with_sub_score("stage_quality", stage_quality)
            .with_sub_score("efficiency", efficiency)
            .with_sub_score("disturbances", disturbances)
            .with_sub_score("timing", timing)
            .with_low_confidence(low_confidence);

        tracing::debug!(
            date = %session.date,
            value = score.value,
            performance,
            stage_quality,
            efficiency,
            need,
            "sleep scored"
        );

        Ok(SleepAssessment {
            score,
            need_minutes: need,
            deficit_minutes: need - total_sleep,
        })
    }

    /// Personalized need: duration baseline when one exists, plus a
    /// fixed uplift after a high-strain day
    fn sleep_need(&self, ctx: &SleepContext) -> f64 {
        let base = ctx
            .duration_baseline
            .map(|b| b.mean)
            .filter(|m| *m > 0.0)
            .unwrap_or(self.config.default_need_minutes);

        let hard_day = ctx
            .prior_day_tss
            .and_then(|tss| tss.to_f64())
            .map(|tss| tss >= self.config.high_strain_tss)
            .unwrap_or(false);

        if hard_day {
            base + self.config.strain_need_uplift_minutes
        } else {
            base
        }
    }

    /// Deep + REM share of total sleep against the optimal share
    fn stage_quality(&self, session: &SleepSession) -> f64 {
        if session.total_sleep_minutes == 0 {
            return 0.0;
        }
        let share = session.restorative_minutes() as f64 / session.total_sleep_minutes as f64;
        clamp_factor(share / self.config.optimal_restorative_share * 100.0)
    }

    /// Mean bed/wake deviation from the timing baselines, with a grace
    /// band. Neutral 100 until timing baselines exist.
    fn timing_consistency(&self, session: &SleepSession, ctx: &SleepContext) -> f64 {
        let bed_deviation = ctx.bedtime_baseline.map(|b| {
            circular_minute_gap(signed_minutes_from_midnight(&session.bedtime), b.mean)
        });
        let wake_deviation = ctx.wake_baseline.map(|b| {
            circular_minute_gap(signed_minutes_from_midnight(&session.wake_time), b.mean)
        });

        let deviation = match (bed_deviation, wake_deviation) {
            (Some(bed), Some(wake)) => (bed + wake) / 2.0,
            (Some(bed), None) => bed,
            (None, Some(wake)) => wake,
            (None, None) => return 100.0,
        };

        let excess = (deviation - self.config.timing_grace_minutes).max(0.0);
        clamp_factor(100.0 - self.config.timing_penalty_per_minute * excess)
    }
}

fn clamp_factor(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Clock time as signed minutes from midnight in [-720, 720), so evening
/// bedtimes and after-midnight bedtimes average sensibly
pub fn signed_minutes_from_midnight(instant: &DateTime<Utc>) -> f64 {
    let minutes = (instant.hour() * 60 + instant.minute()) as f64;
    if minutes >= 720.0 {
        minutes - 1440.0
    } else {
        minutes
    }
}

/// Shortest distance between two clock positions on the 24-hour circle
fn circular_minute_gap(a: f64, b: f64) -> f64 {
    let gap = (a - b).abs() % 1440.0;
    gap.min(1440.0 - gap)
}
