//! Unified error hierarchy for ReadyRS
//!
//! Structured error information for every subsystem, with severity mapping
//! into the tracing system. Missing data is modelled as a recoverable
//! condition so calculators can degrade to low-confidence output instead
//! of failing the whole pass.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::ScoreType;

/// Top-level error type for all ReadyRS operations
#[derive(Debug, Error)]
pub enum ReadyRsError {
    /// Not enough history or readings for a meaningful result
    #[error("Insufficient data for {what}: {reason}")]
    InsufficientData { what: String, reason: String },

    /// Sleep session validation errors
    #[error("Sleep session error: {0}")]
    Sleep(#[from] SleepError),

    /// Training load sequencing errors
    #[error("Training load error: {0}")]
    Load(#[from] LoadError),

    /// Strain computation errors
    #[error("Strain error: {0}")]
    Strain(#[from] StrainError),

    /// Threshold and zone derivation errors
    #[error("Zone error: {0}")]
    Zone(#[from] ZoneError),

    /// Upstream provider failures
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A dependent score did not arrive within the bounded wait
    #[error("Stale dependency: {score_type:?} for {date} never arrived")]
    StaleDependency { score_type: ScoreType, date: NaiveDate },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Sleep session validation errors
#[derive(Debug, Error)]
pub enum SleepError {
    /// Session with zero time in bed; scoring is skipped, not zeroed
    #[error("Invalid session for {date}: time in bed is zero")]
    EmptyTimeInBed { date: NaiveDate },

    /// Stage intervals missing or out of order
    #[error("Invalid session for {date}: {reason}")]
    MalformedStages { date: NaiveDate, reason: String },
}

/// Training load sequencing errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Incremental update called with a non-consecutive date
    #[error("Out-of-order load update: expected {expected}, got {got}")]
    OutOfOrderBackfill { expected: NaiveDate, got: NaiveDate },

    /// Backfill invoked over an empty date range
    #[error("Backfill range {start}..{end} is empty")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Strain computation errors
#[derive(Debug, Error)]
pub enum StrainError {
    /// No usable method for the activity (no tss, power, HR, or duration)
    #[error("No usable strain input for activity {activity_id}")]
    NoUsableInput { activity_id: String },

    /// Heart rate reserve is degenerate (max <= resting)
    #[error("Invalid heart rate reserve: max {max_hr} <= resting {resting_hr}")]
    InvalidHeartRateReserve { max_hr: u16, resting_hr: u16 },
}

/// Threshold and zone derivation errors
#[derive(Debug, Error)]
pub enum ZoneError {
    /// FTP outside the plausible range
    #[error("Invalid FTP: {ftp} watts (expected {min}-{max})")]
    InvalidFtp { ftp: u16, min: u16, max: u16 },

    /// Max HR outside the plausible range
    #[error("Invalid max HR: {max_hr} bpm (expected {min}-{max})")]
    InvalidMaxHr { max_hr: u16, min: u16, max: u16 },
}

/// Upstream provider failures
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider temporarily unreachable
    #[error("Provider {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    /// Provider returned a record the engine cannot interpret
    #[error("Malformed record from {name}: {reason}")]
    Malformed { name: String, reason: String },
}

/// Result type alias for ReadyRS operations
pub type Result<T> = std::result::Result<T, ReadyRsError>;

impl ReadyRsError {
    /// Convenience constructor for the common insufficient-data case
    pub fn insufficient(what: impl Into<String>, reason: impl Into<String>) -> Self {
        ReadyRsError::InsufficientData {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can degrade or retry instead of aborting.
    ///
    /// Insufficient data and stale dependencies surface as low-confidence
    /// output; provider outages are retryable. Sequencing errors are
    /// programmer errors and are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReadyRsError::InsufficientData { .. }
                | ReadyRsError::Sleep(_)
                | ReadyRsError::StaleDependency { .. }
                | ReadyRsError::Provider(ProviderError::Unavailable { .. })
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadyRsError::InsufficientData { .. } => ErrorSeverity::Info,
            ReadyRsError::Sleep(_) => ErrorSeverity::Warning,
            ReadyRsError::StaleDependency { .. } => ErrorSeverity::Warning,
            ReadyRsError::Strain(_) => ErrorSeverity::Warning,
            ReadyRsError::Zone(_) => ErrorSeverity::Error,
            ReadyRsError::Provider(_) => ErrorSeverity::Error,
            ReadyRsError::Configuration(_) => ErrorSeverity::Error,
            ReadyRsError::Io(_) => ErrorSeverity::Error,
            ReadyRsError::Load(LoadError::OutOfOrderBackfill { .. }) => ErrorSeverity::Critical,
            ReadyRsError::Load(_) => ErrorSeverity::Error,
            ReadyRsError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ReadyRsError::InsufficientData { what, .. } => {
                format!(
                    "Not enough data yet to compute {}. Keep wearing your device and check back soon.",
                    what
                )
            }
            ReadyRsError::Sleep(SleepError::EmptyTimeInBed { date }) => {
                format!("No usable sleep recording for {}.", date)
            }
            ReadyRsError::Provider(ProviderError::Unavailable { name, .. }) => {
                format!("{} is temporarily unavailable. Data will sync on the next refresh.", name)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
