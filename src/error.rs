//! Configuration errors
//!
//! The drop controller itself has no failure modes; invalid inputs are
//! ignored. Only loading and validating a [`crate::DropConfig`] can fail.

use thiserror::Error;

/// Failure while loading or validating a drop configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{name} range is inverted ({min} > {max})")]
    InvertedRange {
        name: &'static str,
        min: i64,
        max: i64,
    },

    #[error("{name} must not be negative (got {value})")]
    Negative { name: &'static str, value: i64 },

    #[error("{name} must be greater than zero (got {value})")]
    NonPositive { name: &'static str, value: f32 },

    #[error("difficulty {level}: base must be > 0 and exponent >= 1 (got base {base}, exponent {exponent})")]
    InvalidCurve {
        level: u8,
        base: f64,
        exponent: f64,
    },

    #[error("expected {expected} multiplier curves, got {got}")]
    CurveCount { expected: usize, got: usize },
}
