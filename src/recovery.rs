//! Recovery scoring
//!
//! Fuses the morning's autonomic signals, last night's sleep score, and
//! the training stress balance into the daily readiness number. An
//! active body-stress indicator caps the result outright and suppresses
//! the alcohol check, since the two share a signal pattern.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::config::RecoverySettings;
use crate::error::{ReadyRsError, Result};
use crate::models::{DailyBaseline, DailyScore, IllnessIndicator, ScoreType};

/// Everything the fusion reads for one day
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryInputs<'a> {
    pub date: NaiveDate,

    /// Overnight HRV mean, milliseconds
    pub hrv: Option<f64>,
    pub hrv_baseline: Option<&'a DailyBaseline>,

    /// Overnight resting heart rate, bpm
    pub resting_hr: Option<f64>,
    pub rhr_baseline: Option<&'a DailyBaseline>,

    /// Overnight respiratory rate, breaths per minute
    pub respiratory_rate: Option<f64>,
    pub respiratory_baseline: Option<&'a DailyBaseline>,

    /// Same-date sleep score, None when the night went unrecorded
    pub sleep_score: Option<&'a DailyScore>,

    /// Training stress balance after yesterday's load
    pub tsb: Option<Decimal>,

    /// Active body-stress indicator, if the detector raised one
    pub illness: Option<&'a IllnessIndicator>,
}

/// Fuses factor scores into the daily recovery number
#[derive(Debug, Clone)]
pub struct RecoveryScoreCalculator {
    config: RecoverySettings,
}

impl Default for RecoveryScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryScoreCalculator {
    pub fn new() -> Self {
        Self::with_config(RecoverySettings::default())
    }

    pub fn with_config(config: RecoverySettings) -> Self {
        RecoveryScoreCalculator { config }
    }

    /// Score one day.
    ///
    /// Factors whose inputs are missing drop out and the remaining
    /// weights renormalize, except sleep, which substitutes a neutral
    /// value and flags reduced confidence. A day with no usable factor
    /// at all is insufficient data, not a score.
    pub fn score(&self, inputs: &RecoveryInputs) -> Result<DailyScore> {
        let hrv_factor = ratio_factor(inputs.hrv, inputs.hrv_baseline);
        let rhr_factor = self.rhr_factor(inputs);
        let respiratory_factor = self.respiratory_factor(inputs);
        let load_factor = inputs
            .tsb
            .and_then(|tsb| tsb.to_f64())
            .map(|tsb| self.load_factor(tsb));

        if hrv_factor.is_none()
            && rhr_factor.is_none()
            && respiratory_factor.is_none()
            && load_factor.is_none()
            && inputs.sleep_score.is_none()
        {
            return Err(ReadyRsError::insufficient(
                "recovery score",
                "no overnight biometrics, sleep score, or training load available",
            ));
        }

        let sleep_missing = inputs.sleep_score.is_none();
        let sleep_factor = inputs
            .sleep_score
            .map(|s| s.value)
            .unwrap_or(self.config.neutral_sleep_score);

        let mut weighted = sleep_factor * self.config.sleep_weight;
        let mut weight_sum = self.config.sleep_weight;
        for (factor, weight) in [
            (hrv_factor, self.config.hrv_weight),
            (rhr_factor, self.config.rhr_weight),
            (respiratory_factor, self.config.respiratory_weight),
            (load_factor, self.config.load_weight),
        ] {
            if let Some(value) = factor {
                weighted += value * weight;
                weight_sum += weight;
            }
        }
        let mut value = weighted / weight_sum;

        // An active indicator caps the day and makes the alcohol check
        // meaningless: the signature is the same HRV suppression.
        let mut alcohol_penalty = None;
        if inputs.illness.is_some() {
            value = value.min(self.config.illness_ceiling);
        } else if let Some(penalty) = self.alcohol_penalty(inputs) {
            value = (value - penalty).max(0.0);
            alcohol_penalty = Some(penalty);
        }

        let low_confidence = sleep_missing
            || inputs.sleep_score.map(|s| s.low_confidence).unwrap_or(false)
            || hrv_factor.is_none()
            || inputs.hrv_baseline.map(|b| b.low_confidence).unwrap_or(true);

        let mut score = DailyScore::new(inputs.date, ScoreType::Recovery, value)
            .with_sub_score("sleep", sleep_factor)
            .with_low_confidence(low_confidence);
        if let Some(v) = hrv_factor {
            score = score.with_sub_score("hrv", v);
        }
        if let Some(v) = rhr_factor {
            score = score.with_sub_score("resting_hr", v);
        }
        if let Some(v) = respiratory_factor {
            score = score.with_sub_score("respiratory", v);
        }
        if let Some(v) = load_factor {
            score = score.with_sub_score("training_load", v);
        }
        if let Some(p) = alcohol_penalty {
            score = score.with_sub_score("alcohol_penalty", p);
        }

        tracing::debug!(
            date = %inputs.date,
            value = score.value,
            capped = inputs.illness.is_some(),
            low_confidence,
            "recovery scored"
        );

        Ok(score)
    }

    /// 100 at or below baseline, minus fixed points per percent elevated
    fn rhr_factor(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let pct = deviation_pct(inputs.resting_hr, inputs.rhr_baseline)?;
        Some((100.0 - self.config.rhr_penalty_per_pct * pct.max(0.0)).clamp(0.0, 100.0))
    }

    /// Full marks inside the grace band, penalized per percent beyond it
    /// in either direction
    fn respiratory_factor(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let pct = deviation_pct(inputs.respiratory_rate, inputs.respiratory_baseline)?;
        let excess = (pct.abs() - self.config.respiratory_grace_pct).max(0.0);
        Some((100.0 - self.config.respiratory_penalty_per_pct * excess).clamp(0.0, 100.0))
    }

    /// Piecewise freshness curve over the training stress balance.
    ///
    /// The fresh band scores full marks; deep fatigue falls away steeply
    /// and an over-rested balance drifts down mildly toward 85.
    fn load_factor(&self, tsb: f64) -> f64 {
        let factor = if (5.0..=25.0).contains(&tsb) {
            100.0
        } else if tsb > 25.0 {
            100.0 - ((tsb - 25.0) * 0.6).min(15.0)
        } else if tsb >= 0.0 {
            85.0 + 3.0 * tsb
        } else if tsb >= -10.0 {
            70.0 + 1.5 * (tsb + 10.0)
        } else if tsb >= -30.0 {
            40.0 + 1.5 * (tsb + 30.0)
        } else {
            40.0 + (tsb + 30.0) * (4.0 / 3.0)
        };
        factor.clamp(0.0, 100.0)
    }

    /// HRV suppression with no illness indicator, tiered by depth
    fn alcohol_penalty(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let pct = deviation_pct(inputs.hrv, inputs.hrv_baseline)?;
        if pct <= self.config.alcohol_heavy_pct {
            Some(self.config.alcohol_heavy_penalty)
        } else if pct <= self.config.alcohol_moderate_pct {
            Some(self.config.alcohol_moderate_penalty)
        } else if pct <= self.config.alcohol_mild_pct {
            Some(self.config.alcohol_mild_penalty)
        } else {
            None
        }
    }
}

/// Today's value as a share of baseline, capped at 100
fn ratio_factor(value: Option<f64>, baseline: Option<&DailyBaseline>) -> Option<f64> {
    let value = value?;
    let mean = baseline?.mean;
    if mean <= 0.0 {
        return None;
    }
    Some((value / mean * 100.0).clamp(0.0, 100.0))
}

/// Percent deviation from baseline, None when either side is missing
fn deviation_pct(value: Option<f64>, baseline: Option<&DailyBaseline>) -> Option<f64> {
    let value = value?;
    let mean = baseline?.mean;
    if mean <= 0.0 {
        return None;
    }
    Some((value - mean) / mean * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaselineMetric, IllnessSeverity, IllnessSignal, ScoreBand};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn baseline(metric: BaselineMetric, mean: f64) -> DailyBaseline {
        DailyBaseline {
            metric,
            date: date(),
            mean,
            std_dev: mean * 0.05,
            window_size_days: 7,
            sample_count: 7,
            low_confidence: false,
        }
    }

    fn sleep(value: f64) -> DailyScore {
        DailyScore::new(date(), ScoreType::Sleep, value)
    }

    fn indicator() -> IllnessIndicator {
        let mut signals = BTreeSet::new();
        signals.insert(IllnessSignal::HrvDrop);
        signals.insert(IllnessSignal::ElevatedRestingHr);
        IllnessIndicator {
            date: date(),
            signals,
            confidence: 70.0,
            severity: IllnessSeverity::Moderate,
        }
    }

    struct Fixture {
        hrv: DailyBaseline,
        rhr: DailyBaseline,
        resp: DailyBaseline,
        sleep: DailyScore,
    }

    impl Fixture {
        fn rested() -> Self {
            Fixture {
                hrv: baseline(BaselineMetric::Hrv, 80.0),
                rhr: baseline(BaselineMetric::RestingHr, 48.0),
                resp: baseline(BaselineMetric::RespiratoryRate, 14.0),
                sleep: sleep(85.0),
            }
        }

        fn inputs(&self) -> RecoveryInputs<'_> {
            RecoveryInputs {
                date: date(),
                hrv: Some(80.0),
                hrv_baseline: Some(&self.hrv),
                resting_hr: Some(48.0),
                rhr_baseline: Some(&self.rhr),
                respiratory_rate: Some(14.0),
                respiratory_baseline: Some(&self.resp),
                sleep_score: Some(&self.sleep),
                tsb: Some(dec!(10)),
                illness: None,
            }
        }
    }

    #[test]
    fn test_rested_athlete_scores_optimal() {
        let calc = RecoveryScoreCalculator::new();
        let fixture = Fixture::rested();

        let score = calc.score(&fixture.inputs()).unwrap();
        // 0.3*100 + 0.3*85 + 0.2*100 + 0.1*100 + 0.1*100 = 95.5
        assert!((score.value - 95.5).abs() < 1e-9);
        assert_eq!(score.band, ScoreBand::Optimal);
        assert!(!score.low_confidence);
        assert_eq!(score.sub_scores["hrv"], 100.0);
        assert_eq!(score.sub_scores["training_load"], 100.0);
    }

    #[test]
    fn test_suppressed_hrv_drags_the_score() {
        let calc = RecoveryScoreCalculator::new();
        let fixture = Fixture::rested();
        let mut inputs = fixture.inputs();
        inputs.hrv = Some(68.0); // -15%, mild alcohol tier

        let score = calc.score(&inputs).unwrap();
        assert_eq!(score.sub_scores["hrv"], 85.0);
        // base 91.0 minus the 10-point mild penalty
        assert!((score.value - 81.0).abs() < 1e-9);
        assert_eq!(score.sub_scores["alcohol_penalty"], 10.0);
    }

    #[test]
    fn test_missing_factors_renormalize() {
        let calc = RecoveryScoreCalculator::new();
        let fixture = Fixture::rested();
        let inputs = RecoveryInputs {
            date: date(),
            resting_hr: Some(48.0),
            rhr_baseline: Some(&fixture.rhr),
            sleep_score: Some(&fixture.sleep),
            ..Default::default()
        };

        // Only sleep (85, weight .3) and resting HR (100, weight .2)
        let score = calc.score(&inputs).unwrap();
        assert!((score.value - 91.0).abs() < 1e-9);
        assert!(!score.sub_scores.contains_key("hrv"));
        // HRV never arrived, so confidence is reduced
        assert!(score.low_confidence);
    }

    #[test]
    fn test_absent_sleep_substitutes_neutral() {
        let calc = RecoveryScoreCalculator::new();
        let fixture = Fixture::rested();
        let mut inputs = fixture.inputs();
        inputs.sleep_score = None;

        let score = calc.score(&inputs).unwrap();
        assert_eq!(score.sub_scores["sleep"], 60.0);
        assert!(score.low_confidence);
        // 0.3*100 + 0.3*60 + 0.2*100 + 0.1*100 + 0.1*100 = 88
        assert!((score.value - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_illness_caps_an_otherwise_great_day() {
        let calc = RecoveryScoreCalculator::new();
        let fixture = Fixture::rested();
        let ind = indicator();
        let mut inputs = fixture.inputs();
        inputs.illness = Some(&ind);
        inputs.tsb = Some(dec!(20)); // strongly fresh

        let score = calc.score(&inputs).unwrap();
        assert_eq!(score.value, 60.0);
        assert_eq!(score.band, ScoreBand::Fair);
        // Factor breakdown survives the cap
        assert_eq!(score.sub_scores["hrv"], 100.0);
    }

    #[test]
    fn test_illness_supersedes_alcohol_check() {
        let calc = RecoveryScoreCalculator::new();
        let fixture = Fixture::rested();
        let ind = indicator();
        let mut inputs = fixture.inputs();
        inputs.hrv = Some(56.0); // -30%, heavy tier if it were checked
        inputs.illness = Some(&ind);

        let score = calc.score(&inputs).unwrap();
        assert!(!score.sub_scores.contains_key("alcohol_penalty"));
        assert!(score.value <= 60.0);
    }

    #[test]
    fn test_alcohol_tiers() {
        let calc = RecoveryScoreCalculator::new();
        let hrv_baseline = baseline(BaselineMetric::Hrv, 100.0);
        let night = sleep(85.0);

        let mut tiers = Vec::new();
        for today in [84.0, 78.0, 73.0] {
            let inputs = RecoveryInputs {
                date: date(),
                hrv: Some(today),
                hrv_baseline: Some(&hrv_baseline),
                sleep_score: Some(&night),
                ..Default::default()
            };
            let score = calc.score(&inputs).unwrap();
            tiers.push(score.sub_scores["alcohol_penalty"]);
        }
        assert_eq!(tiers, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_load_factor_curve() {
        let calc = RecoveryScoreCalculator::new();
        assert_eq!(calc.load_factor(10.0), 100.0);
        assert_eq!(calc.load_factor(5.0), 100.0);
        assert_eq!(calc.load_factor(25.0), 100.0);
        assert_eq!(calc.load_factor(0.0), 85.0);
        assert_eq!(calc.load_factor(-10.0), 70.0);
        assert_eq!(calc.load_factor(-30.0), 40.0);
        assert_eq!(calc.load_factor(-60.0), 0.0);
        // Over-rested drifts down gently
        assert!((calc.load_factor(30.0) - 97.0).abs() < 1e-9);
        assert!((calc.load_factor(-5.0) - 77.5).abs() < 1e-9);
        assert!((calc.load_factor(-20.0) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_readings_stay_clamped() {
        let calc = RecoveryScoreCalculator::new();
        let hrv_baseline = baseline(BaselineMetric::Hrv, 10.0);
        let rhr_baseline = baseline(BaselineMetric::RestingHr, 40.0);
        let night = sleep(50.0);
        let inputs = RecoveryInputs {
            date: date(),
            hrv: Some(300.0),
            hrv_baseline: Some(&hrv_baseline),
            resting_hr: Some(200.0),
            rhr_baseline: Some(&rhr_baseline),
            sleep_score: Some(&night),
            ..Default::default()
        };

        let score = calc.score(&inputs).unwrap();
        assert_eq!(score.sub_scores["hrv"], 100.0);
        assert_eq!(score.sub_scores["resting_hr"], 0.0);
        assert!((0.0..=100.0).contains(&score.value));
    }

    #[test]
    fn test_no_inputs_is_insufficient_data() {
        let calc = RecoveryScoreCalculator::new();
        let inputs = RecoveryInputs {
            date: date(),
            ..Default::default()
        };
        assert!(calc.score(&inputs).is_err());
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_score_bounded_for_any_inputs(
            hrv in 5.0f64..250.0,
            hrv_mean in 20.0f64..120.0,
            rhr in 30.0f64..120.0,
            rhr_mean in 35.0f64..80.0,
            sleep_value in 0.0f64..100.0,
            tsb in -80.0f64..80.0,
            ill in proptest::bool::ANY
        ) {
            let calc = RecoveryScoreCalculator::new();
            let hrv_baseline = baseline(BaselineMetric::Hrv, hrv_mean);
            let rhr_baseline = baseline(BaselineMetric::RestingHr, rhr_mean);
            let night = sleep(sleep_value);
            let ind = indicator();
            let inputs = RecoveryInputs {
                date: date(),
                hrv: Some(hrv),
                hrv_baseline: Some(&hrv_baseline),
                resting_hr: Some(rhr),
                rhr_baseline: Some(&rhr_baseline),
                sleep_score: Some(&night),
                tsb: Some(Decimal::from_f64(tsb).unwrap()),
                illness: ill.then_some(&ind),
                ..Default::default()
            };

            let score = calc.score(&inputs).unwrap();
            prop_assert!(score.value >= 0.0);
            prop_assert!(score.value <= 100.0);
            if ill {
                prop_assert!(score.value <= 60.0);
            }
        }
    }
}
