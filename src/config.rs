//! Drop timing and balance configuration
//!
//! Loaded from JSON; every field falls back to the defaults in [`crate::consts`].

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::multiplier::{CurveParams, MultiplierCurve};

/// Inclusive integer range sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl IntRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Uniform sample in `[min, max]`, both ends included
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        rng.random_range(self.min..=self.max)
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedRange {
                name,
                min: self.min as i64,
                max: self.max as i64,
            });
        }
        Ok(())
    }
}

/// How the tiles scroll for one `MoveTiles` phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Discrete per-section interpolation
    Sectioned { sections: u32 },
    /// One whole-field scroll over `continuous_scroll_ms`
    Continuous,
}

/// Drop controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    /// RNG seed for the run
    pub seed: u64,

    // === Countdowns ===
    /// Idle and between-drop countdown (seconds)
    pub idle_duration_secs: f32,
    /// Crash screen duration before the session resets (seconds)
    pub crash_display_secs: f32,

    // === Random ranges (inclusive) ===
    /// Drops granted per activation
    pub drop_count: IntRange,
    /// Seconds of tile scrolling per drop
    pub drop_seconds: IntRange,

    // === Animation ===
    pub time_per_section_ms: f32,
    pub continuous_scroll_ms: f32,
    pub elevator_descent_ms: f32,
    /// Elevator descent distance, in tile rows
    pub elevator_descent_rows: f32,

    // === Layout ===
    pub rows: usize,
    pub cols: usize,

    /// Multiplier curve per difficulty level (index 0 = level 1)
    pub curves: Vec<CurveParams>,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,

            idle_duration_secs: IDLE_DURATION_SECS,
            crash_display_secs: CRASH_DISPLAY_SECS,

            drop_count: IntRange::new(MIN_DROPS, MAX_DROPS),
            drop_seconds: IntRange::new(MIN_DROP_SECS as i32, MAX_DROP_SECS as i32),

            time_per_section_ms: TIME_PER_SECTION_MS,
            continuous_scroll_ms: CONTINUOUS_SCROLL_MS,
            elevator_descent_ms: ELEVATOR_DESCENT_MS,
            elevator_descent_rows: 4.0,

            rows: ROWS,
            cols: COLS,

            curves: MultiplierCurve::default_params().to_vec(),
        }
    }
}

impl DropConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from `path` if given, falling back to defaults on any failure
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default drop config");
            return Self::default();
        };

        match Self::from_path(path) {
            Ok(config) => {
                log::info!("Loaded drop config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Check ranges, durations and curves
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drop_count.validate("drop_count")?;
        self.drop_seconds.validate("drop_seconds")?;
        if self.drop_seconds.min < 0 {
            return Err(ConfigError::Negative {
                name: "drop_seconds.min",
                value: self.drop_seconds.min as i64,
            });
        }

        for (name, value) in [
            ("idle_duration_secs", self.idle_duration_secs),
            ("crash_display_secs", self.crash_display_secs),
            ("time_per_section_ms", self.time_per_section_ms),
            ("continuous_scroll_ms", self.continuous_scroll_ms),
            ("elevator_descent_ms", self.elevator_descent_ms),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::NonPositive {
                name: "rows/cols",
                value: 0.0,
            });
        }

        MultiplierCurve::new(self.curves.clone()).map(|_| ())
    }

    /// Scroll mode for a drop lasting `drop_secs`
    pub fn scroll_mode(&self, drop_secs: u32) -> ScrollMode {
        match crate::sections_for(drop_secs as f32 * 1000.0, self.time_per_section_ms) {
            0 => ScrollMode::Continuous,
            sections => ScrollMode::Sectioned { sections },
        }
    }
}
