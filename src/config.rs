use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pmc::LoadConfig;

/// Engine configuration, one section per scoring component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Rolling baseline settings
    pub baseline: BaselineSettings,

    /// Sleep scoring settings
    pub sleep: SleepSettings,

    /// Strain aggregation settings
    pub strain: StrainSettings,

    /// Chronic/acute load settings
    pub load: LoadConfig,

    /// Body-stress detection settings
    pub illness: IllnessSettings,

    /// Recovery fusion settings
    pub recovery: RecoverySettings,

    /// Threshold estimation settings
    pub threshold: ThresholdSettings,

    /// Cross-platform duplicate resolution settings
    pub dedup: DedupSettings,

    /// Worker and channel settings
    pub runtime: RuntimeSettings,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Rolling baseline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSettings {
    /// Trailing window length in days
    pub window_days: u16,

    /// Days required before a baseline leaves low-confidence
    pub min_days: usize,
}

/// Sleep scoring settings
///
/// Factor weights must sum to 1.0; `validate` enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepSettings {
    /// Weight of duration vs need
    pub performance_weight: f64,

    /// Weight of deep+REM architecture
    pub stage_weight: f64,

    /// Weight of asleep vs in-bed efficiency
    pub efficiency_weight: f64,

    /// Weight of wake-event disturbances
    pub disturbance_weight: f64,

    /// Weight of bed/wake timing consistency
    pub timing_weight: f64,

    /// Sleep need before any baseline exists (minutes)
    pub default_need_minutes: f64,

    /// Extra need after a high-strain day (minutes)
    pub strain_need_uplift_minutes: f64,

    /// Daily TSS at or above which the uplift applies
    pub high_strain_tss: f64,

    /// Deep+REM share of total sleep that scores full marks
    pub optimal_restorative_share: f64,

    /// Points removed per wake event
    pub disturbance_penalty: f64,

    /// Bed/wake deviation tolerated before timing penalties (minutes)
    pub timing_grace_minutes: f64,

    /// Points removed per minute of deviation beyond the grace band
    pub timing_penalty_per_minute: f64,

    /// Share of a surplus night credited against accumulated debt
    pub surplus_repayment: f64,
}

/// Strain aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrainSettings {
    /// Blend weight for cardio impulse
    pub cardio_weight: f64,

    /// Blend weight for strength impulse
    pub strength_weight: f64,

    /// Blend weight for general activity impulse
    pub general_weight: f64,

    /// Raw blended load mapped to a strain of 100
    pub daily_cap: f64,

    /// Scales the exponential heart-rate impulse onto the power-stress
    /// scale so an hour near threshold lands around 100 either way
    pub trimp_scale: f64,

    /// Steps per point of background load
    pub steps_divisor: f64,

    /// Active kilocalories per point of background load
    pub energy_divisor: f64,

    /// Minimum stream points before a stream-based method is trusted
    pub min_stream_points: usize,
}

/// Body-stress detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IllnessSettings {
    /// Evaluation window in days
    pub window_days: i64,

    /// Days of data required before detection runs
    pub min_days: usize,

    /// HRV suppression threshold (percent, negative)
    pub hrv_drop_pct: f64,

    /// HRV spike threshold (percent)
    pub hrv_spike_pct: f64,

    /// Resting HR elevation threshold (percent)
    pub rhr_rise_pct: f64,

    /// Sleep-score drop vs the prior window mean (percent, negative)
    pub sleep_drop_pct: f64,

    /// Respiratory-rate deviation threshold (percent, either direction)
    pub respiratory_change_pct: f64,

    /// Activity-volume drop threshold (percent, negative)
    pub activity_drop_pct: f64,

    /// Confidence added per fired signal
    pub hrv_drop_confidence: f64,
    pub hrv_spike_confidence: f64,
    pub rhr_confidence: f64,
    pub sleep_confidence: f64,
    pub respiratory_confidence: f64,
    pub activity_confidence: f64,

    /// Extra confidence when the HRV spike reaches twice the threshold
    pub extreme_spike_bonus: f64,

    /// Flat bonus for a sustained same-direction trend
    pub trend_bonus: f64,

    /// Consecutive days that constitute a trend
    pub trend_days: usize,

    /// Aggregate confidence required to raise an indicator
    pub min_confidence: f64,

    /// Concurrent signals required to raise an indicator
    pub min_signals: usize,
}

/// Recovery fusion settings
///
/// Factor weights must sum to 1.0; `validate` enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverySettings {
    /// Weight of HRV vs baseline
    pub hrv_weight: f64,

    /// Weight of the sleep score
    pub sleep_weight: f64,

    /// Weight of resting HR vs baseline
    pub rhr_weight: f64,

    /// Weight of respiratory rate vs baseline
    pub respiratory_weight: f64,

    /// Weight of the training stress balance factor
    pub load_weight: f64,

    /// Hard cap while a body-stress indicator is active
    pub illness_ceiling: f64,

    /// Neutral substitute when sleep data is wholly absent
    pub neutral_sleep_score: f64,

    /// Points removed per percent of resting HR elevation
    pub rhr_penalty_per_pct: f64,

    /// Respiratory deviation tolerated at full score (percent)
    pub respiratory_grace_pct: f64,

    /// Points removed per percent beyond the respiratory grace band
    pub respiratory_penalty_per_pct: f64,

    /// HRV-drop tiers for the alcohol signature (percent, negative)
    pub alcohol_mild_pct: f64,
    pub alcohol_moderate_pct: f64,
    pub alcohol_heavy_pct: f64,

    /// Points removed per alcohol tier
    pub alcohol_mild_penalty: f64,
    pub alcohol_moderate_penalty: f64,
    pub alcohol_heavy_penalty: f64,
}

/// Threshold estimation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSettings {
    /// FTP as a fraction of the 60-minute best effort
    pub sixty_min_factor: Decimal,

    /// FTP as a fraction of the 20-minute best effort
    pub twenty_min_factor: Decimal,

    /// FTP as a fraction of the 5-minute best effort
    pub five_min_factor: Decimal,

    /// Estimator confidence weights; longer efforts are more reliable
    pub sixty_min_weight: f64,
    pub twenty_min_weight: f64,
    pub five_min_weight: f64,

    /// Upward buffer applied to the weighted estimate
    pub buffer_factor: Decimal,
}

/// Cross-platform duplicate resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupSettings {
    /// Start times within this window are candidate duplicates (seconds)
    pub start_tolerance_seconds: i64,

    /// Durations within this window are candidate duplicates (seconds)
    pub duration_tolerance_seconds: i64,

    /// Platform precedence for completeness ties, highest first
    pub platform_priority: Vec<String>,
}

/// Worker and channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Bounded wait for the sleep score dependency (milliseconds)
    pub sleep_wait_ms: u64,

    /// Broadcast bus capacity
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let now = Utc::now();

        EngineConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            baseline: BaselineSettings::default(),
            sleep: SleepSettings::default(),
            strain: StrainSettings::default(),
            load: LoadConfig::default(),
            illness: IllnessSettings::default(),
            recovery: RecoverySettings::default(),
            threshold: ThresholdSettings::default(),
            dedup: DedupSettings::default(),
            runtime: RuntimeSettings::default(),
        }
    }
}

impl Default for BaselineSettings {
    fn default() -> Self {
        BaselineSettings {
            window_days: 7,
            min_days: 3,
        }
    }
}

impl Default for SleepSettings {
    fn default() -> Self {
        SleepSettings {
            performance_weight: 0.30,
            stage_weight: 0.32,
            efficiency_weight: 0.22,
            disturbance_weight: 0.14,
            timing_weight: 0.02,
            default_need_minutes: 480.0,
            strain_need_uplift_minutes: 30.0,
            high_strain_tss: 100.0,
            optimal_restorative_share: 0.40,
            disturbance_penalty: 12.5,
            timing_grace_minutes: 15.0,
            timing_penalty_per_minute: 1.5,
            surplus_repayment: 0.5,
        }
    }
}

impl Default for StrainSettings {
    fn default() -> Self {
        StrainSettings {
            cardio_weight: 1.0,
            strength_weight: 0.6,
            general_weight: 0.4,
            daily_cap: 600.0,
            trimp_scale: 0.6,
            steps_divisor: 2000.0,
            energy_divisor: 100.0,
            min_stream_points: 600,
        }
    }
}

impl Default for IllnessSettings {
    fn default() -> Self {
        IllnessSettings {
            window_days: 7,
            min_days: 3,
            hrv_drop_pct: -15.0,
            hrv_spike_pct: 100.0,
            rhr_rise_pct: 5.0,
            sleep_drop_pct: -20.0,
            respiratory_change_pct: 10.0,
            activity_drop_pct: -30.0,
            hrv_drop_confidence: 25.0,
            hrv_spike_confidence: 35.0,
            rhr_confidence: 20.0,
            sleep_confidence: 15.0,
            respiratory_confidence: 25.0,
            activity_confidence: 10.0,
            extreme_spike_bonus: 10.0,
            trend_bonus: 10.0,
            trend_days: 3,
            min_confidence: 50.0,
            min_signals: 2,
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        RecoverySettings {
            hrv_weight: 0.30,
            sleep_weight: 0.30,
            rhr_weight: 0.20,
            respiratory_weight: 0.10,
            load_weight: 0.10,
            illness_ceiling: 60.0,
            neutral_sleep_score: 60.0,
            rhr_penalty_per_pct: 4.0,
            respiratory_grace_pct: 3.0,
            respiratory_penalty_per_pct: 7.0,
            alcohol_mild_pct: -15.0,
            alcohol_moderate_pct: -20.0,
            alcohol_heavy_pct: -25.0,
            alcohol_mild_penalty: 10.0,
            alcohol_moderate_penalty: 20.0,
            alcohol_heavy_penalty: 30.0,
        }
    }
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        ThresholdSettings {
            sixty_min_factor: dec!(0.99),
            twenty_min_factor: dec!(0.95),
            five_min_factor: dec!(0.87),
            sixty_min_weight: 1.0,
            twenty_min_weight: 0.75,
            five_min_weight: 0.40,
            buffer_factor: dec!(1.02),
        }
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        DedupSettings {
            start_tolerance_seconds: 300,
            duration_tolerance_seconds: 120,
            platform_priority: vec![
                "garmin".to_string(),
                "wahoo".to_string(),
                "zwift".to_string(),
                "strava".to_string(),
            ],
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        RuntimeSettings {
            sleep_wait_ms: 5000,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        // Update modification timestamp
        self.metadata.updated_at = Utc::now();

        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readyrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(_) => {
                tracing::debug!(
                    path = %config_path.display(),
                    "config file not found or invalid, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        let sleep_sum = self.sleep.performance_weight
            + self.sleep.stage_weight
            + self.sleep.efficiency_weight
            + self.sleep.disturbance_weight
            + self.sleep.timing_weight;
        if (sleep_sum - 1.0).abs() > 1e-6 {
            bail!("sleep factor weights must sum to 1.0, got {sleep_sum}");
        }

        let recovery_sum = self.recovery.hrv_weight
            + self.recovery.sleep_weight
            + self.recovery.rhr_weight
            + self.recovery.respiratory_weight
            + self.recovery.load_weight;
        if (recovery_sum - 1.0).abs() > 1e-6 {
            bail!("recovery factor weights must sum to 1.0, got {recovery_sum}");
        }

        if self.load.atl_days == 0 || self.load.ctl_days <= self.load.atl_days {
            bail!(
                "chronic window ({}) must exceed acute window ({})",
                self.load.ctl_days,
                self.load.atl_days
            );
        }

        if !(0.0..=100.0).contains(&self.illness.min_confidence) {
            bail!(
                "illness min_confidence must be within 0-100, got {}",
                self.illness.min_confidence
            );
        }

        if self.baseline.min_days == 0 || self.baseline.window_days == 0 {
            bail!("baseline windows must be non-zero");
        }

        Ok(())
    }
}
