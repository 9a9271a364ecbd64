//! Training impulse and daily strain
//!
//! Each activity is reduced to a single training-impulse value on the
//! power-stress scale, using the best method its data allows. Same-day
//! impulses blend with background movement (steps, active energy) into a
//! 0-100 strain score, while the raw impulse sum feeds the chronic/acute
//! load tracker.

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::StrainSettings;
use crate::error::StrainError;
use crate::models::{
    Activity, ActivityCategory, ActivitySamples, DailyScore, SamplePoint, ScoreType,
};

/// Banister exponential weighting constants (male coefficients)
const BANISTER_A: f64 = 0.64;
const BANISTER_B: f64 = 1.92;

/// Heart-rate-reserve zone floors; effort below 50% HRR is noise
const ZONE_FLOORS: [f64; 5] = [0.50, 0.60, 0.70, 0.80, 0.90];

/// Method that produced an impulse value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpulseMethod {
    /// Platform-supplied TSS taken as-is
    PlatformTss,
    /// Normalized power over the full stream
    PowerStream,
    /// Zone-weighted exponential heart-rate model over the stream
    HeartRateStream,
    /// Average power against FTP
    PowerSummary,
    /// Average heart rate against the heart-rate reserve
    HeartRateSummary,
    /// Duration-only estimate for the category
    DurationEstimate,
}

/// Thresholds available when computing impulses
#[derive(Debug, Clone, Copy, Default)]
pub struct StrainContext {
    /// Functional threshold power in watts
    pub ftp: Option<u16>,

    /// Maximum heart rate in bpm
    pub max_hr: Option<u16>,

    /// Resting heart rate in bpm, usually the current baseline
    pub resting_hr: Option<u16>,
}

/// Training impulse for one activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityImpulse {
    /// Activity the impulse belongs to
    pub activity_id: String,

    /// Category carried through for daily blending
    pub category: ActivityCategory,

    /// Impulse on the power-stress scale
    pub impulse: Decimal,

    /// Method that produced the value
    pub method: ImpulseMethod,

    /// Intensity factor, for power-derived methods
    pub intensity_factor: Option<Decimal>,

    /// Normalized power, when computed from a stream
    pub normalized_power: Option<u16>,
}

/// Aggregated strain state for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStrain {
    /// Day the strain describes
    pub date: NaiveDate,

    /// Per-category impulse sub-totals
    pub cardio_impulse: Decimal,
    pub strength_impulse: Decimal,
    pub general_impulse: Decimal,

    /// Unweighted impulse sum; this is the day's TSS for load tracking
    pub total_impulse: Decimal,

    /// 0-100 strain score with factor breakdown
    pub score: DailyScore,
}

/// Computes per-activity impulses and daily strain
#[derive(Debug, Clone)]
pub struct StrainCalculator {
    config: StrainSettings,
}

impl Default for StrainCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl StrainCalculator {
    pub fn new() -> Self {
        Self::with_config(StrainSettings::default())
    }

    pub fn with_config(config: StrainSettings) -> Self {
        StrainCalculator { config }
    }

    /// Compute the impulse for one activity using the best available
    /// method, in order of reliability: platform TSS, power stream,
    /// heart-rate stream, power summary, heart-rate summary, then a
    /// duration-only estimate.
    pub fn activity_impulse(
        &self,
        activity: &Activity,
        samples: Option<&ActivitySamples>,
        ctx: &StrainContext,
    ) -> Result<ActivityImpulse, StrainError> {
        if let Some(tss) = activity.tss {
            return Ok(ActivityImpulse {
                activity_id: activity.id.clone(),
                category: activity.category,
                impulse: tss.max(Decimal::ZERO),
                method: ImpulseMethod::PlatformTss,
                intensity_factor: activity.intensity_factor,
                normalized_power: activity.normalized_power,
            });
        }

        if let (Some(samples), Some(ftp)) = (samples, ctx.ftp) {
            let power_points = samples.points.iter().filter(|p| p.power.is_some()).count();
            if power_points >= self.config.min_stream_points && ftp > 0 {
                if let Ok(result) = self.power_stream_impulse(activity, &samples.points, ftp) {
                    return Ok(result);
                }
            }
        }

        if let (Some(samples), Some(max_hr), Some(resting_hr)) =
            (samples, ctx.max_hr, ctx.resting_hr)
        {
            let hr_points = samples
                .points
                .iter()
                .filter(|p| p.heart_rate.is_some())
                .count();
            if hr_points >= self.config.min_stream_points {
                if let Ok(result) =
                    self.heart_rate_stream_impulse(activity, &samples.points, max_hr, resting_hr)
                {
                    return Ok(result);
                }
            }
        }

        if let (Some(avg_power), Some(ftp)) = (activity.average_power, ctx.ftp) {
            if ftp > 0 {
                return Ok(self.power_summary_impulse(activity, avg_power, ftp));
            }
        }

        if let (Some(avg_hr), Some(max_hr), Some(resting_hr)) =
            (activity.average_hr, ctx.max_hr, ctx.resting_hr)
        {
            if max_hr > resting_hr {
                return Ok(self.heart_rate_summary_impulse(activity, avg_hr, max_hr, resting_hr));
            }
        }

        if activity.duration_seconds == 0 {
            return Err(StrainError::NoUsableInput {
                activity_id: activity.id.clone(),
            });
        }

        Ok(self.duration_estimate(activity))
    }

    /// Impulses for a batch of activities, computed in parallel.
    ///
    /// Output order matches input order; parallelism never changes the
    /// result.
    pub fn batch_impulses(
        &self,
        items: &[(Activity, Option<ActivitySamples>)],
        ctx: &StrainContext,
    ) -> Vec<Result<ActivityImpulse, StrainError>> {
        items
            .par_iter()
            .map(|(activity, samples)| self.activity_impulse(activity, samples.as_ref(), ctx))
            .collect()
    }

    /// Blend one day's impulses and background movement into a strain
    /// score. Cardio counts fully, strength and general activity at
    /// reduced weight, plus small contributions from steps and active
    /// energy. The blended load maps logarithmically onto 0-100.
    pub fn daily_strain(
        &self,
        date: NaiveDate,
        impulses: &[ActivityImpulse],
        steps: Option<f64>,
        active_energy_kcal: Option<f64>,
    ) -> DailyStrain {
        let mut cardio = Decimal::ZERO;
        let mut strength = Decimal::ZERO;
        let mut general = Decimal::ZERO;

        for impulse in impulses {
            match impulse.category {
                ActivityCategory::Cardio => cardio += impulse.impulse,
                ActivityCategory::Strength => strength += impulse.impulse,
                ActivityCategory::General => general += impulse.impulse,
            }
        }

        let background = steps.unwrap_or(0.0).max(0.0) / self.config.steps_divisor
            + active_energy_kcal.unwrap_or(0.0).max(0.0) / self.config.energy_divisor;

        let blended = cardio.to_f64().unwrap_or(0.0) * self.config.cardio_weight
            + strength.to_f64().unwrap_or(0.0) * self.config.strength_weight
            + general.to_f64().unwrap_or(0.0) * self.config.general_weight
            + background;

        let value = 100.0 * (blended + 1.0).ln() / (self.config.daily_cap + 1.0).ln();

        let score = DailyScore::new(date, ScoreType::Strain, value)
            .with_sub_score("cardio", cardio.to_f64().unwrap_or(0.0))
            .with_sub_score("strength", strength.to_f64().unwrap_or(0.0))
            .with_sub_score("general", general.to_f64().unwrap_or(0.0))
            .with_sub_score("background", background);

        tracing::debug!(
            %date,
            blended,
            score = score.value,
            activities = impulses.len(),
            "daily strain computed"
        );

        DailyStrain {
            date,
            cardio_impulse: cardio,
            strength_impulse: strength,
            general_impulse: general,
            total_impulse: cardio + strength + general,
            score,
        }
    }

    /// Power stream impulse: normalized power, IF = NP/FTP,
    /// impulse = hours x IF^2 x 100
    fn power_stream_impulse(
        &self,
        activity: &Activity,
        points: &[SamplePoint],
        ftp: u16,
    ) -> Result<ActivityImpulse, StrainError> {
        let normalized_power = normalized_power(points).ok_or(StrainError::NoUsableInput {
            activity_id: activity.id.clone(),
        })?;

        let intensity_factor = Decimal::from(normalized_power) / Decimal::from(ftp);
        let duration_hours = Decimal::from(activity.duration_seconds) / Decimal::from(3600);
        let impulse = duration_hours * intensity_factor * intensity_factor * Decimal::from(100);

        Ok(ActivityImpulse {
            activity_id: activity.id.clone(),
            category: activity.category,
            impulse,
            method: ImpulseMethod::PowerStream,
            intensity_factor: Some(intensity_factor),
            normalized_power: Some(normalized_power),
        })
    }

    /// Heart-rate stream impulse: bucket samples into five
    /// heart-rate-reserve zones and weight minutes exponentially with the
    /// zone midpoint intensity.
    fn heart_rate_stream_impulse(
        &self,
        activity: &Activity,
        points: &[SamplePoint],
        max_hr: u16,
        resting_hr: u16,
    ) -> Result<ActivityImpulse, StrainError> {
        if max_hr <= resting_hr {
            return Err(StrainError::InvalidHeartRateReserve { max_hr, resting_hr });
        }
        let reserve = (max_hr - resting_hr) as f64;

        // Minutes per zone, assuming one sample per second
        let mut zone_minutes = [0.0f64; 5];
        let mut counted = 0usize;
        for point in points {
            if let Some(hr) = point.heart_rate {
                let fraction = ((hr.saturating_sub(resting_hr)) as f64 / reserve).clamp(0.0, 1.0);
                if let Some(zone) = zone_index(fraction) {
                    zone_minutes[zone] += 1.0 / 60.0;
                }
                counted += 1;
            }
        }

        if counted == 0 {
            return Err(StrainError::NoUsableInput {
                activity_id: activity.id.clone(),
            });
        }

        let mut trimp = 0.0;
        for (zone, minutes) in zone_minutes.iter().enumerate() {
            let midpoint = ZONE_FLOORS[zone] + 0.05;
            trimp += minutes * midpoint * BANISTER_A * (BANISTER_B * midpoint).exp();
        }
        let impulse = Decimal::from_f64(trimp * self.config.trimp_scale)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);

        Ok(ActivityImpulse {
            activity_id: activity.id.clone(),
            category: activity.category,
            impulse,
            method: ImpulseMethod::HeartRateStream,
            intensity_factor: None,
            normalized_power: None,
        })
    }

    fn power_summary_impulse(&self, activity: &Activity, avg_power: u16, ftp: u16) -> ActivityImpulse {
        let intensity_factor = Decimal::from(avg_power) / Decimal::from(ftp);
        let duration_hours = Decimal::from(activity.duration_seconds) / Decimal::from(3600);
        let impulse = duration_hours * intensity_factor * intensity_factor * Decimal::from(100);

        ActivityImpulse {
            activity_id: activity.id.clone(),
            category: activity.category,
            impulse,
            method: ImpulseMethod::PowerSummary,
            intensity_factor: Some(intensity_factor),
            normalized_power: None,
        }
    }

    /// Whole session treated as one block at the average intensity
    fn heart_rate_summary_impulse(
        &self,
        activity: &Activity,
        avg_hr: u16,
        max_hr: u16,
        resting_hr: u16,
    ) -> ActivityImpulse {
        let reserve = (max_hr - resting_hr) as f64;
        let fraction = ((avg_hr.saturating_sub(resting_hr)) as f64 / reserve).clamp(0.0, 1.0);
        let minutes = activity.duration_minutes();
        let trimp = minutes * fraction * BANISTER_A * (BANISTER_B * fraction).exp();
        let impulse = Decimal::from_f64(trimp * self.config.trimp_scale)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);

        ActivityImpulse {
            activity_id: activity.id.clone(),
            category: activity.category,
            impulse,
            method: ImpulseMethod::HeartRateSummary,
            intensity_factor: None,
            normalized_power: None,
        }
    }

    fn duration_estimate(&self, activity: &Activity) -> ActivityImpulse {
        let per_hour = match activity.category {
            ActivityCategory::Cardio => Decimal::from(60),
            ActivityCategory::Strength => Decimal::from(45),
            ActivityCategory::General => Decimal::from(35),
        };
        let duration_hours = Decimal::from(activity.duration_seconds) / Decimal::from(3600);

        ActivityImpulse {
            activity_id: activity.id.clone(),
            category: activity.category,
            impulse: duration_hours * per_hour,
            method: ImpulseMethod::DurationEstimate,
            intensity_factor: None,
            normalized_power: None,
        }
    }
}

/// Zone index for a heart-rate-reserve fraction, None below the floor
fn zone_index(fraction: f64) -> Option<usize> {
    ZONE_FLOORS
        .iter()
        .rposition(|floor| fraction >= *floor)
}

/// Normalized power: 30-second rolling averages, mean of fourth powers,
/// fourth root.
pub fn normalized_power(points: &[SamplePoint]) -> Option<u16> {
    if points.is_empty() {
        return None;
    }

    let window_size = 30;
    let mut rolling: Vec<f64> = Vec::with_capacity(points.len());

    for window_start in 0..points.len() {
        let window_end = (window_start + window_size).min(points.len());
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for point in &points[window_start..window_end] {
            if let Some(power) = point.power {
                sum += power as f64;
                count += 1;
            }
        }
        if count > 0 {
            rolling.push(sum / count as f64);
        }
    }

    if rolling.is_empty() {
        return None;
    }

    let avg_fourth: f64 = rolling.iter().map(|p| p.powi(4)).sum::<f64>() / rolling.len() as f64;
    let np = avg_fourth.sqrt().sqrt();
    if np.is_finite() && np >= 0.0 && np <= u16::MAX as f64 {
        Some(np.round() as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn test_activity(duration_seconds: u32, category: ActivityCategory) -> Activity {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 17, 0, 0).unwrap();
        let mut activity = Activity::new(start, duration_seconds, category);
        activity.id = "act-1".to_string();
        activity
    }

    fn steady_power_stream(watts: u16, seconds: u32) -> ActivitySamples {
        ActivitySamples {
            activity_id: "act-1".to_string(),
            points: (0..seconds)
                .map(|offset| SamplePoint {
                    offset_seconds: offset,
                    heart_rate: None,
                    power: Some(watts),
                })
                .collect(),
        }
    }

    fn steady_hr_stream(bpm: u16, seconds: u32) -> ActivitySamples {
        ActivitySamples {
            activity_id: "act-1".to_string(),
            points: (0..seconds)
                .map(|offset| SamplePoint {
                    offset_seconds: offset,
                    heart_rate: Some(bpm),
                    power: None,
                })
                .collect(),
        }
    }

    fn ctx() -> StrainContext {
        StrainContext {
            ftp: Some(250),
            max_hr: Some(190),
            resting_hr: Some(50),
        }
    }

    #[test]
    fn test_platform_tss_wins_over_streams() {
        let mut activity = test_activity(3600, ActivityCategory::Cardio);
        activity.tss = Some(dec!(85));
        let samples = steady_power_stream(250, 3600);

        let result = StrainCalculator::new()
            .activity_impulse(&activity, Some(&samples), &ctx())
            .unwrap();

        assert_eq!(result.method, ImpulseMethod::PlatformTss);
        assert_eq!(result.impulse, dec!(85));
    }

    #[test]
    fn test_power_stream_impulse_at_threshold() {
        let activity = test_activity(3600, ActivityCategory::Cardio);
        let samples = steady_power_stream(250, 3600);

        let result = StrainCalculator::new()
            .activity_impulse(&activity, Some(&samples), &ctx())
            .unwrap();

        // One hour exactly at FTP is 100 by definition
        assert_eq!(result.method, ImpulseMethod::PowerStream);
        assert_eq!(result.normalized_power, Some(250));
        assert_eq!(result.impulse, dec!(100));
    }

    #[test]
    fn test_variable_power_np_exceeds_average() {
        let activity = test_activity(1200, ActivityCategory::Cardio);
        let mut points = Vec::new();
        for offset in 0..1200u32 {
            // Alternate 30 s blocks of 150 W and 350 W, average 250 W
            let watts = if (offset / 30) % 2 == 0 { 150 } else { 350 };
            points.push(SamplePoint {
                offset_seconds: offset,
                heart_rate: None,
                power: Some(watts),
            });
        }
        let np = normalized_power(&points).unwrap();
        assert!(np > 250, "normalized power {np} should exceed the average");
    }

    #[test]
    fn test_hr_stream_impulse_monotonic_in_intensity() {
        let calc = StrainCalculator::new();
        let activity = test_activity(3600, ActivityCategory::Cardio);
        let no_ftp = StrainContext {
            ftp: None,
            ..ctx()
        };

        let easy = calc
            .activity_impulse(&activity, Some(&steady_hr_stream(120, 3600)), &no_ftp)
            .unwrap();
        let hard = calc
            .activity_impulse(&activity, Some(&steady_hr_stream(170, 3600)), &no_ftp)
            .unwrap();

        assert_eq!(easy.method, ImpulseMethod::HeartRateStream);
        assert!(hard.impulse > easy.impulse);
        assert!(easy.impulse > Decimal::ZERO);
    }

    #[test]
    fn test_threshold_hour_lands_near_hundred_either_path() {
        let calc = StrainCalculator::new();
        let activity = test_activity(3600, ActivityCategory::Cardio);
        let no_ftp = StrainContext {
            ftp: None,
            ..ctx()
        };

        // ~88% HRR, a solid threshold effort
        let hr = calc
            .activity_impulse(&activity, Some(&steady_hr_stream(173, 3600)), &no_ftp)
            .unwrap();
        let value = hr.impulse.to_f64().unwrap();
        assert!(
            (70.0..=140.0).contains(&value),
            "threshold-hour TRIMP {value} should sit near the power scale"
        );
    }

    #[test]
    fn test_short_stream_falls_back_to_summary() {
        let calc = StrainCalculator::new();
        let mut activity = test_activity(3600, ActivityCategory::Cardio);
        activity.average_power = Some(200);

        // 60 points is far below the stream threshold
        let samples = steady_power_stream(250, 60);
        let result = calc
            .activity_impulse(&activity, Some(&samples), &ctx())
            .unwrap();

        assert_eq!(result.method, ImpulseMethod::PowerSummary);
        assert_eq!(result.intensity_factor, Some(dec!(0.8)));
    }

    #[test]
    fn test_hr_summary_path() {
        let calc = StrainCalculator::new();
        let mut activity = test_activity(1800, ActivityCategory::Cardio);
        activity.average_hr = Some(150);
        let no_ftp = StrainContext {
            ftp: None,
            ..ctx()
        };

        let result = calc.activity_impulse(&activity, None, &no_ftp).unwrap();
        assert_eq!(result.method, ImpulseMethod::HeartRateSummary);
        assert!(result.impulse > Decimal::ZERO);
    }

    #[test]
    fn test_duration_estimate_fallback() {
        let calc = StrainCalculator::new();
        let activity = test_activity(3600, ActivityCategory::Strength);
        let bare = StrainContext::default();

        let result = calc.activity_impulse(&activity, None, &bare).unwrap();
        assert_eq!(result.method, ImpulseMethod::DurationEstimate);
        assert_eq!(result.impulse, dec!(45));
    }

    #[test]
    fn test_zero_duration_without_data_is_an_error() {
        let calc = StrainCalculator::new();
        let activity = test_activity(0, ActivityCategory::General);
        let bare = StrainContext::default();

        assert!(calc.activity_impulse(&activity, None, &bare).is_err());
    }

    #[test]
    fn test_zone_index_buckets() {
        assert_eq!(zone_index(0.3), None);
        assert_eq!(zone_index(0.50), Some(0));
        assert_eq!(zone_index(0.65), Some(1));
        assert_eq!(zone_index(0.79), Some(2));
        assert_eq!(zone_index(0.80), Some(3));
        assert_eq!(zone_index(0.95), Some(4));
        assert_eq!(zone_index(1.0), Some(4));
    }

    #[test]
    fn test_daily_strain_weights_categories() {
        let calc = StrainCalculator::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        let impulses = vec![
            ActivityImpulse {
                activity_id: "ride".to_string(),
                category: ActivityCategory::Cardio,
                impulse: dec!(100),
                method: ImpulseMethod::PlatformTss,
                intensity_factor: None,
                normalized_power: None,
            },
            ActivityImpulse {
                activity_id: "gym".to_string(),
                category: ActivityCategory::Strength,
                impulse: dec!(50),
                method: ImpulseMethod::DurationEstimate,
                intensity_factor: None,
                normalized_power: None,
            },
        ];

        let strain = calc.daily_strain(date, &impulses, Some(8000.0), Some(400.0));

        assert_eq!(strain.cardio_impulse, dec!(100));
        assert_eq!(strain.strength_impulse, dec!(50));
        assert_eq!(strain.total_impulse, dec!(150));
        // blended = 100 + 50*0.6 + 8000/2000 + 400/100 = 138
        let expected = 100.0 * 139.0f64.ln() / 601.0f64.ln();
        assert!((strain.score.value - expected).abs() < 1e-9);
        assert_eq!(strain.score.score_type, ScoreType::Strain);
    }

    #[test]
    fn test_rest_day_strain_is_low_not_zero_with_steps() {
        let calc = StrainCalculator::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        let quiet = calc.daily_strain(date, &[], None, None);
        assert_eq!(quiet.score.value, 0.0);
        assert_eq!(quiet.total_impulse, Decimal::ZERO);

        let walking = calc.daily_strain(date, &[], Some(12000.0), None);
        assert!(walking.score.value > 0.0);
        assert!(walking.score.value < 40.0);
    }

    #[test]
    fn test_batch_order_matches_input() {
        let calc = StrainCalculator::new();
        let mut a = test_activity(3600, ActivityCategory::Cardio);
        a.id = "first".to_string();
        a.tss = Some(dec!(80));
        let mut b = test_activity(1800, ActivityCategory::General);
        b.id = "second".to_string();
        b.tss = Some(dec!(20));

        let results = calc.batch_impulses(&[(a, None), (b, None)], &ctx());
        assert_eq!(results[0].as_ref().unwrap().activity_id, "first");
        assert_eq!(results[1].as_ref().unwrap().activity_id, "second");
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_impulse_never_negative(
            avg_power in 50u16..500u16,
            ftp in 150u16..350u16,
            duration in 600u32..14400u32
        ) {
            let calc = StrainCalculator::new();
            let mut activity = test_activity(duration, ActivityCategory::Cardio);
            activity.average_power = Some(avg_power);
            let ctx = StrainContext { ftp: Some(ftp), max_hr: None, resting_hr: None };

            let result = calc.activity_impulse(&activity, None, &ctx);
            prop_assert!(result.is_ok());
            prop_assert!(result.unwrap().impulse >= Decimal::ZERO);
        }

        #[test]
        fn test_daily_strain_always_in_range(
            cardio in 0.0f64..2000.0,
            strength in 0.0f64..500.0,
            steps in 0.0f64..50000.0,
            energy in 0.0f64..3000.0
        ) {
            let calc = StrainCalculator::new();
            let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
            let impulses = vec![
                ActivityImpulse {
                    activity_id: "a".to_string(),
                    category: ActivityCategory::Cardio,
                    impulse: Decimal::from_f64(cardio).unwrap_or(Decimal::ZERO),
                    method: ImpulseMethod::PlatformTss,
                    intensity_factor: None,
                    normalized_power: None,
                },
                ActivityImpulse {
                    activity_id: "b".to_string(),
                    category: ActivityCategory::Strength,
                    impulse: Decimal::from_f64(strength).unwrap_or(Decimal::ZERO),
                    method: ImpulseMethod::DurationEstimate,
                    intensity_factor: None,
                    normalized_power: None,
                },
            ];

            let strain = calc.daily_strain(date, &impulses, Some(steps), Some(energy));
            prop_assert!(strain.score.value >= 0.0);
            prop_assert!(strain.score.value <= 100.0);
        }

        #[test]
        fn test_hr_fraction_clamped_for_any_reading(
            hr in 30u16..250u16,
            max_hr in 160u16..210u16,
            resting_hr in 35u16..75u16
        ) {
            prop_assume!(max_hr > resting_hr);
            let calc = StrainCalculator::new();
            let activity = test_activity(1800, ActivityCategory::Cardio);
            let samples = steady_hr_stream(hr, 1800);
            let ctx = StrainContext { ftp: None, max_hr: Some(max_hr), resting_hr: Some(resting_hr) };

            let result = calc.activity_impulse(&activity, Some(&samples), &ctx);
            prop_assert!(result.is_ok());
            prop_assert!(result.unwrap().impulse >= Decimal::ZERO);
        }
    }
}
