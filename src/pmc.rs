//! Chronic and acute training-load tracking
//!
//! Classic performance-management arithmetic: CTL and ATL are exponential
//! moving averages of daily training stress with 42-day and 7-day
//! horizons, TSB is their difference. All values are kept in `Decimal` so
//! a backfill replay reproduces the incremental path digit for digit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LoadError;
use crate::models::{DailyLoad, DateWindow};

/// Time constants for the load averages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Chronic (fitness) horizon in days
    pub ctl_days: u32,

    /// Acute (fatigue) horizon in days
    pub atl_days: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            ctl_days: 42,
            atl_days: 7,
        }
    }
}

/// Starting state for a backfill replay
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadSeed {
    /// Continue from a stored (ctl, atl) pair
    Known { ctl: Decimal, atl: Decimal },

    /// No prior state; seed both averages with the mean TSS of the first
    /// two weeks of data so the chronic average does not start
    /// artificially low
    Estimated,
}

/// Interpretation bands for the training stress balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    VeryFresh,    // +25 and above
    Fresh,        // +5 to +25
    Neutral,      // -10 to +5
    Fatigued,     // -30 to -10
    VeryFatigued, // Below -30
}

impl Freshness {
    pub fn from_tsb(tsb: Decimal) -> Self {
        if tsb >= Decimal::from(25) {
            Freshness::VeryFresh
        } else if tsb >= Decimal::from(5) {
            Freshness::Fresh
        } else if tsb >= Decimal::from(-10) {
            Freshness::Neutral
        } else if tsb >= Decimal::from(-30) {
            Freshness::Fatigued
        } else {
            Freshness::VeryFatigued
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Freshness::VeryFresh => "Very fresh (may be losing fitness)",
            Freshness::Fresh => "Fresh and ready for hard training",
            Freshness::Neutral => "Neutral (normal training)",
            Freshness::Fatigued => "Fatigued (monitor closely)",
            Freshness::VeryFatigued => "Very fatigued (rest needed)",
        }
    }
}

/// Trend summary over a span of daily loads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTrends {
    /// CTL change per week, None until a week of history exists
    pub ctl_ramp_per_week: Option<Decimal>,

    /// Freshness band for the latest day
    pub freshness: Freshness,
}

/// Training-load calculator
#[derive(Debug, Clone)]
pub struct LoadTracker {
    config: LoadConfig,
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::with_config(LoadConfig::default())
    }

    pub fn with_config(config: LoadConfig) -> Self {
        LoadTracker { config }
    }

    /// Smoothing factor 2/(N+1) for the chronic average
    fn ctl_alpha(&self) -> Decimal {
        Decimal::from(2) / Decimal::from(self.config.ctl_days + 1)
    }

    /// Smoothing factor 2/(N+1) for the acute average
    fn atl_alpha(&self) -> Decimal {
        Decimal::from(2) / Decimal::from(self.config.atl_days + 1)
    }

    fn step(&self, date: NaiveDate, tss: Decimal, prior_ctl: Decimal, prior_atl: Decimal) -> DailyLoad {
        let ctl_alpha = self.ctl_alpha();
        let atl_alpha = self.atl_alpha();

        let ctl = tss * ctl_alpha + prior_ctl * (Decimal::ONE - ctl_alpha);
        let atl = tss * atl_alpha + prior_atl * (Decimal::ONE - atl_alpha);

        DailyLoad {
            date,
            tss,
            ctl,
            atl,
            tsb: ctl - atl,
        }
    }

    /// Advance the load state by exactly one day.
    ///
    /// The date must be the day after `prev.date`; any other date means
    /// the caller lost track of the sequence and must backfill instead.
    pub fn advance(
        &self,
        prev: &DailyLoad,
        date: NaiveDate,
        tss: Decimal,
    ) -> Result<DailyLoad, LoadError> {
        let expected = prev.date.succ_opt();
        if expected != Some(date) {
            return Err(LoadError::OutOfOrderBackfill {
                expected: expected.unwrap_or(prev.date),
                got: date,
            });
        }
        Ok(self.step(date, tss, prev.ctl, prev.atl))
    }

    /// Replay a window of daily TSS values in chronological order.
    ///
    /// Days absent from the map count as rest days with zero stress.
    /// Replaying the same window from the same seed always yields the
    /// same series as day-by-day `advance` calls.
    pub fn replay(
        &self,
        seed: LoadSeed,
        daily_tss: &BTreeMap<NaiveDate, Decimal>,
        window: &DateWindow,
    ) -> Result<Vec<DailyLoad>, LoadError> {
        if window.start > window.end {
            return Err(LoadError::EmptyRange {
                start: window.start,
                end: window.end,
            });
        }

        let (mut ctl, mut atl) = match seed {
            LoadSeed::Known { ctl, atl } => (ctl, atl),
            LoadSeed::Estimated => {
                let estimate = self.estimated_seed(daily_tss, window.start);
                (estimate, estimate)
            }
        };

        let mut series = Vec::with_capacity(window.num_days() as usize);
        for date in window.days() {
            let tss = daily_tss.get(&date).copied().unwrap_or(Decimal::ZERO);
            let day = self.step(date, tss, ctl, atl);
            ctl = day.ctl;
            atl = day.atl;
            series.push(day);
        }

        tracing::debug!(
            start = %window.start,
            end = %window.end,
            days = series.len(),
            "training load replayed"
        );

        Ok(series)
    }

    /// Mean daily TSS over the first two weeks on or after `start`,
    /// counting days without data as rest days
    fn estimated_seed(&self, daily_tss: &BTreeMap<NaiveDate, Decimal>, start: NaiveDate) -> Decimal {
        let window = DateWindow::trailing(
            start
                .checked_add_days(chrono::Days::new(13))
                .unwrap_or(start),
            14,
        );

        let total: Decimal = window
            .days()
            .map(|date| daily_tss.get(&date).copied().unwrap_or(Decimal::ZERO))
            .sum();
        total / Decimal::from(14)
    }

    /// Ramp rate and freshness for the latest day of a series
    pub fn trends(&self, series: &[DailyLoad]) -> Option<LoadTrends> {
        let last = series.last()?;

        let ctl_ramp_per_week = if series.len() >= 7 {
            let past = &series[series.len() - 7];
            Some(last.ctl - past.ctl)
        } else {
            None
        };

        Some(LoadTrends {
            ctl_ramp_per_week,
            freshness: Freshness::from_tsb(last.tsb),
        })
    }
}
