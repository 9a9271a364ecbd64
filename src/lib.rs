// Library interface for the readiness engine
// This allows integration tests to access the core functionality

pub mod baseline;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod illness;
pub mod logging;
pub mod models;
pub mod pmc;
pub mod power;
pub mod providers;
pub mod recovery;
pub mod registry;
pub mod sleep;
pub mod store;
pub mod strain;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use baseline::BaselineTracker;
pub use engine::{EngineEvent, ReadinessEngine};
pub use illness::IllnessDetector;
pub use pmc::{LoadSeed, LoadTracker};
pub use power::ThresholdEstimator;
pub use recovery::RecoveryScoreCalculator;
pub use sleep::{SleepDebtLedger, SleepScoreCalculator};
pub use strain::StrainCalculator;
pub use zones::ZoneCalculator;
pub use config::EngineConfig;
pub use error::{ReadyRsError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
