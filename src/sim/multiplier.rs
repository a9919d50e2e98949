//! Stake multiplier curve
//!
//! One `{base, exponent}` pair per difficulty; the payout multiplier after
//! `stake_index` completed drops is `base * exponent^stake_index`.

use serde::{Deserialize, Serialize};

use super::state::Difficulty;
use crate::consts::DIFFICULTY_LEVELS;
use crate::error::ConfigError;

/// Two-parameter curve for a single difficulty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub base: f64,
    pub exponent: f64,
}

impl CurveParams {
    pub const fn new(base: f64, exponent: f64) -> Self {
        Self { base, exponent }
    }

    /// Point on the curve at `stake_index`
    pub fn at(&self, stake_index: u32) -> f64 {
        self.base * self.exponent.powf(stake_index as f64)
    }

    /// Non-decreasing in `stake_index` only when this holds
    fn is_valid(&self) -> bool {
        self.base > 0.0 && self.base.is_finite() && self.exponent >= 1.0 && self.exponent.is_finite()
    }
}

/// Validated curves for every difficulty level
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplierCurve {
    params: Vec<CurveParams>,
}

impl Default for MultiplierCurve {
    fn default() -> Self {
        Self {
            params: Self::default_params().to_vec(),
        }
    }
}

impl MultiplierCurve {
    /// Built-in curves, gentlest first
    pub const fn default_params() -> [CurveParams; DIFFICULTY_LEVELS as usize] {
        [
            CurveParams::new(1.0, 1.1),
            CurveParams::new(1.0, 1.2),
            CurveParams::new(1.0, 1.35),
            CurveParams::new(1.0, 1.5),
        ]
    }

    pub fn new(params: Vec<CurveParams>) -> Result<Self, ConfigError> {
        if params.len() != DIFFICULTY_LEVELS as usize {
            return Err(ConfigError::CurveCount {
                expected: DIFFICULTY_LEVELS as usize,
                got: params.len(),
            });
        }
        for (i, p) in params.iter().enumerate() {
            if !p.is_valid() {
                return Err(ConfigError::InvalidCurve {
                    level: i as u8 + 1,
                    base: p.base,
                    exponent: p.exponent,
                });
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self, difficulty: Difficulty) -> CurveParams {
        self.params[difficulty.index()]
    }

    /// Payout multiplier for `difficulty` after `stake_index` drops
    pub fn multiplier(&self, difficulty: Difficulty, stake_index: u32) -> f64 {
        self.params(difficulty).at(stake_index)
    }
}

/// Display label, e.g. `x1.21`
pub fn format_multiplier(value: f64) -> String {
    format!("x{:.2}", value)
}
