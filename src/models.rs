use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Biometric sample kinds delivered by wearable feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BiometricMetric {
    /// Heart rate variability (RMSSD, milliseconds)
    Hrv,
    /// Resting heart rate (beats per minute)
    RestingHr,
    /// Respiratory rate (breaths per minute)
    RespiratoryRate,
    /// Daily step count
    StepCount,
    /// Active energy burned (kilocalories)
    ActiveEnergy,
}

/// Single timestamped reading from a wearable device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Kind of measurement
    pub metric: BiometricMetric,

    /// Measured value in the metric's native unit
    pub value: f64,

    /// Instant the reading was taken
    pub timestamp: DateTime<Utc>,

    /// Device or app that produced the reading
    pub source_device: String,
}

impl BiometricSample {
    pub fn new(metric: BiometricMetric, value: f64, timestamp: DateTime<Utc>) -> Self {
        BiometricSample {
            metric,
            value,
            timestamp,
            source_device: String::new(),
        }
    }

    /// Calendar day the sample belongs to
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Sleep stages reported by wearables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepStage {
    /// Awake periods during the sleep window
    Awake,
    /// Core / light sleep (NREM 1 & 2)
    Core,
    /// Deep sleep / slow-wave sleep (NREM 3)
    Deep,
    /// REM (rapid eye movement) sleep
    Rem,
    /// In bed but not asleep (pre-onset, reading, etc.)
    InBed,
}

impl SleepStage {
    /// Whether minutes in this stage count as actual sleep
    pub fn is_sleep(&self) -> bool {
        matches!(self, SleepStage::Core | SleepStage::Deep | SleepStage::Rem)
    }
}

/// Contiguous interval spent in a single sleep stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInterval {
    /// Stage for this interval
    pub stage: SleepStage,

    /// Interval start
    pub start: DateTime<Utc>,

    /// Interval end
    pub end: DateTime<Utc>,
}

impl StageInterval {
    pub fn new(stage: SleepStage, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        StageInterval { stage, start, end }
    }

    /// Interval length in whole minutes
    pub fn duration_minutes(&self) -> u32 {
        (self.end - self.start).num_minutes().max(0) as u32
    }
}

/// One night of sleep, immutable once the night has ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    /// Calendar date the night is attributed to (the wake-up day)
    pub date: NaiveDate,

    /// Detailed stage intervals in chronological order
    pub stages: Vec<StageInterval>,

    /// Minutes actually asleep (core + deep + REM)
    pub total_sleep_minutes: u32,

    /// Minutes between getting into bed and final wake
    pub time_in_bed_minutes: u32,

    /// Number of distinct wake events during the night
    pub wake_event_count: u8,

    /// When the athlete got into bed
    pub bedtime: DateTime<Utc>,

    /// Final wake time
    pub wake_time: DateTime<Utc>,
}

impl SleepSession {
    /// Build a session from chronological stage intervals.
    ///
    /// Aggregates asleep minutes, derives time in bed from the outer
    /// interval bounds, and counts transitions into `Awake` from a sleep
    /// stage as wake events.
    pub fn from_stages(date: NaiveDate, stages: Vec<StageInterval>) -> Option<Self> {
        let first = stages.first()?;
        let last = stages.last()?;
        let bedtime = first.start;
        let wake_time = last.end;
        if wake_time <= bedtime {
            return None;
        }

        let mut total_sleep_minutes = 0u32;
        let mut wake_event_count = 0u8;
        let mut last_stage: Option<SleepStage> = None;

        for interval in &stages {
            if interval.stage.is_sleep() {
                total_sleep_minutes += interval.duration_minutes();
            }
            if interval.stage == SleepStage::Awake {
                if let Some(prev) = last_stage {
                    if prev.is_sleep() {
                        wake_event_count = wake_event_count.saturating_add(1);
                    }
                }
            }
            last_stage = Some(interval.stage);
        }

        let time_in_bed_minutes = (wake_time - bedtime).num_minutes().max(0) as u32;

        Some(SleepSession {
            date,
            stages,
            total_sleep_minutes,
            time_in_bed_minutes,
            wake_event_count,
            bedtime,
            wake_time,
        })
    }

    /// Total minutes spent in a given stage
    pub fn stage_minutes(&self, stage: SleepStage) -> u32 {
        self.stages
            .iter()
            .filter(|i| i.stage == stage)
            .map(|i| i.duration_minutes())
            .sum()
    }

    /// Deep + REM minutes, the restorative portion of the night
    pub fn restorative_minutes(&self) -> u32 {
        self.stage_minutes(SleepStage::Deep) + self.stage_minutes(SleepStage::Rem)
    }
}

/// Activity categories used for strain weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    /// Endurance work: riding, running, swimming, rowing
    Cardio,
    /// Resistance and gym sessions
    Strength,
    /// Everything else: walks, yoga, unclassified sessions
    General,
}

impl Default for ActivityCategory {
    fn default() -> Self {
        ActivityCategory::Cardio
    }
}

/// Externally tracked training activity (summary record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Platform-scoped identifier; generated when the platform has none
    pub id: String,

    /// Activity start instant
    pub start: DateTime<Utc>,

    /// Moving duration in seconds
    pub duration_seconds: u32,

    /// Distance covered in meters
    pub distance_meters: Option<Decimal>,

    /// Average power in watts
    pub average_power: Option<u16>,

    /// Normalized power in watts
    pub normalized_power: Option<u16>,

    /// Average heart rate in bpm
    pub average_hr: Option<u16>,

    /// Maximum heart rate in bpm
    pub max_hr: Option<u16>,

    /// Training stress score supplied by the platform
    pub tss: Option<Decimal>,

    /// Intensity factor supplied by the platform
    pub intensity_factor: Option<Decimal>,

    /// Platform the record came from
    pub source_platform: String,

    /// Category used for strain weighting
    pub category: ActivityCategory,
}

impl Activity {
    /// New summary-only activity with a generated identifier
    pub fn new(start: DateTime<Utc>, duration_seconds: u32, category: ActivityCategory) -> Self {
        Activity {
            id: Uuid::new_v4().to_string(),
            start,
            duration_seconds,
            distance_meters: None,
            average_power: None,
            normalized_power: None,
            average_hr: None,
            max_hr: None,
            tss: None,
            intensity_factor: None,
            source_platform: String::new(),
            category,
        }
    }

    /// Calendar day the activity is attributed to
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds as f64 / 60.0
    }
}

/// One point of a per-second activity stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Seconds from activity start
    pub offset_seconds: u32,

    /// Heart rate in bpm
    pub heart_rate: Option<u16>,

    /// Power in watts
    pub power: Option<u16>,
}

/// Raw sample stream for one activity, fetched on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySamples {
    /// Activity the stream belongs to
    pub activity_id: String,

    /// Points ordered by offset
    pub points: Vec<SamplePoint>,
}

impl ActivitySamples {
    /// Power values in offset order, where present
    pub fn power_series(&self) -> Vec<u16> {
        self.points.iter().filter_map(|p| p.power).collect()
    }

    /// Heart rate values in offset order, where present
    pub fn heart_rate_series(&self) -> Vec<u16> {
        self.points.iter().filter_map(|p| p.heart_rate).collect()
    }
}

/// Metrics tracked as rolling baselines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaselineMetric {
    Hrv,
    RestingHr,
    SleepDuration,
    RespiratoryRate,
    TrainingVolume,
    /// Bedtime as signed minutes from midnight, for timing consistency
    Bedtime,
    /// Wake time as signed minutes from midnight, for timing consistency
    WakeTime,
}

/// Rolling baseline snapshot for one metric on one day
///
/// A new record supersedes the previous day's record; baselines are never
/// mutated in place, so readers of an older snapshot stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBaseline {
    /// Metric this baseline describes
    pub metric: BaselineMetric,

    /// Day the baseline was computed for
    pub date: NaiveDate,

    /// Rolling mean over the trailing window
    pub mean: f64,

    /// Rolling standard deviation over the trailing window
    pub std_dev: f64,

    /// Nominal window length in days
    pub window_size_days: u16,

    /// Days that actually contributed (gaps are excluded, not zero-filled)
    pub sample_count: usize,

    /// True while fewer days than the minimum have accumulated
    pub low_confidence: bool,
}

impl DailyBaseline {
    /// Percent deviation of `value` from this baseline's mean
    pub fn deviation_pct(&self, value: f64) -> Option<f64> {
        if self.mean.abs() < f64::EPSILON {
            return None;
        }
        Some((value - self.mean) / self.mean * 100.0)
    }
}

/// Score families produced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreType {
    Sleep,
    Recovery,
    Strain,
}

/// Qualitative band for a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    Optimal,
    Good,
    Fair,
    Poor,
    LimitedData,
}

impl ScoreBand {
    /// Fixed banding: Optimal >= 90, Good >= 75, Fair >= 60, Poor >= 40
    pub fn from_value(value: f64) -> Self {
        if value >= 90.0 {
            ScoreBand::Optimal
        } else if value >= 75.0 {
            ScoreBand::Good
        } else if value >= 60.0 {
            ScoreBand::Fair
        } else if value >= 40.0 {
            ScoreBand::Poor
        } else {
            ScoreBand::LimitedData
        }
    }
}

/// One computed daily score with its factor breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyScore {
    /// Day the score describes
    pub date: NaiveDate,

    /// Score family
    pub score_type: ScoreType,

    /// Final value, clamped to 0-100
    pub value: f64,

    /// Band derived from the value
    pub band: ScoreBand,

    /// Named sub-scores that fed the final value
    pub sub_scores: BTreeMap<String, f64>,

    /// True when inputs were partial and a neutral substitute was used
    pub low_confidence: bool,

    /// When the score was computed
    pub computed_at: DateTime<Utc>,
}

impl DailyScore {
    pub fn new(date: NaiveDate, score_type: ScoreType, value: f64) -> Self {
        let value = value.clamp(0.0, 100.0);
        DailyScore {
            date,
            score_type,
            value,
            band: ScoreBand::from_value(value),
            sub_scores: BTreeMap::new(),
            low_confidence: false,
            computed_at: Utc::now(),
        }
    }

    pub fn with_sub_score(mut self, name: &str, value: f64) -> Self {
        self.sub_scores.insert(name.to_string(), value);
        self
    }

    pub fn with_low_confidence(mut self, low_confidence: bool) -> Self {
        self.low_confidence = low_confidence;
        self
    }
}

/// Daily training load state: stress input plus chronic/acute/balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    /// Day this load state describes
    pub date: NaiveDate,

    /// Total training stress accumulated on this day
    pub tss: Decimal,

    /// Chronic training load (42-day weighted fitness)
    pub ctl: Decimal,

    /// Acute training load (7-day weighted fatigue)
    pub atl: Decimal,

    /// Training stress balance (ctl - atl)
    pub tsb: Decimal,
}

/// Signals the body-stress detector evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IllnessSignal {
    HrvDrop,
    HrvSpike,
    ElevatedRestingHr,
    SleepDisruption,
    RespiratoryChange,
    ActivityDrop,
}

/// Severity bands derived from detection confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IllnessSeverity {
    Low,
    Moderate,
    High,
}

impl IllnessSeverity {
    /// Low [50, 66), Moderate [66, 80), High [80, 100]
    pub fn from_confidence(confidence: f64) -> Option<Self> {
        if confidence >= 80.0 {
            Some(IllnessSeverity::High)
        } else if confidence >= 66.0 {
            Some(IllnessSeverity::Moderate)
        } else if confidence >= 50.0 {
            Some(IllnessSeverity::Low)
        } else {
            None
        }
    }
}

/// Active body-stress indicator; transient, recomputed each pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllnessIndicator {
    /// Day the indicator was raised for
    pub date: NaiveDate,

    /// Signals that fired concurrently
    pub signals: BTreeSet<IllnessSignal>,

    /// Aggregate confidence, 0-100
    pub confidence: f64,

    /// Severity band for the confidence
    pub severity: IllnessSeverity,
}

/// Where the profile's FTP value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FtpSource {
    /// Estimated locally from the power-duration curve
    Computed,
    /// Supplied by an external platform
    External,
    /// Entered by the athlete
    Manual,
}

/// Power zones, seven ascending bands keyed off FTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerZones {
    pub zone1_max: u16, // Active Recovery
    pub zone2_max: u16, // Endurance
    pub zone3_max: u16, // Tempo
    pub zone4_max: u16, // Lactate Threshold
    pub zone5_max: u16, // VO2 Max
    pub zone6_max: u16, // Anaerobic Capacity
    pub zone7_max: u16, // Neuromuscular
}

/// Heart rate zones, seven ascending bands keyed off max HR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrZones {
    pub zone1_max: u16,
    pub zone2_max: u16,
    pub zone3_max: u16,
    pub zone4_max: u16,
    pub zone5_max: u16,
    pub zone6_max: u16,
    pub zone7_max: u16,
}

/// Athlete threshold state; FTP and both zone sets move together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Functional threshold power in watts
    pub ftp: Option<u16>,

    /// Provenance of the current FTP value
    pub ftp_source: FtpSource,

    /// Power zones derived from the current FTP
    pub power_zones: Option<PowerZones>,

    /// Heart rate zones derived from max HR
    pub hr_zones: Option<HrZones>,

    /// Maximum heart rate in bpm
    pub max_hr: Option<u16>,

    /// Last regeneration timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for AthleteProfile {
    fn default() -> Self {
        AthleteProfile {
            ftp: None,
            ftp_source: FtpSource::External,
            power_zones: None,
            hr_zones: None,
            max_hr: None,
            updated_at: Utc::now(),
        }
    }
}

/// Account tier, gates the threshold-estimation history window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountTier {
    Standard,
    Premium,
}

impl AccountTier {
    /// History window available for power-curve analysis
    pub fn history_window_days(&self) -> i64 {
        match self {
            AccountTier::Standard => 90,
            AccountTier::Premium => 120,
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    /// Window ending at `end`, spanning `days` calendar days
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        DateWindow {
            start: end - Duration::days(days.max(1) - 1),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Dates in chronological order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days()).map(move |offset| start + Duration::days(offset))
    }
}
