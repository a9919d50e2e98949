//! Elevator Drop - headless core of a mobile elevator-drop slot prototype
//!
//! Core modules:
//! - `sim`: Drop state controller, stake multiplier, tile scroll sequencer
//! - `config`: Data-driven timing, ranges and multiplier curves
//! - `preview`: Device/texture format cycling for layout previews
//!
//! Nothing in here touches a rendering surface. The presentation layer reads
//! [`sim::Snapshot`] each frame and consumes [`sim::DropEvent`] intents.

pub mod config;
pub mod error;
pub mod preview;
pub mod sim;

pub use config::{DropConfig, ScrollMode};
pub use error::ConfigError;
pub use preview::{PhoneFormat, PreviewSettings, TextureFormat, ViewType};

/// Game configuration constants
pub mod consts {
    /// Nominal frame delta used for the first frame (60 Hz)
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Largest delta a single frame may advance (tab switches, debugger stops)
    pub const MAX_FRAME_DT: f32 = 0.25;

    /// Idle / between-drop countdown
    pub const IDLE_DURATION_SECS: f32 = 5.0;
    /// Countdown shown after a crash before the session resets
    pub const CRASH_DISPLAY_SECS: f32 = 3.0;

    /// Drops per activation (inclusive)
    pub const MIN_DROPS: i32 = 1;
    pub const MAX_DROPS: i32 = 3;

    /// Seconds of tile scrolling per drop (inclusive)
    pub const MIN_DROP_SECS: u32 = 3;
    pub const MAX_DROP_SECS: u32 = 8;

    /// Duration of one discrete scroll section
    pub const TIME_PER_SECTION_MS: f32 = 1500.0;
    /// Whole-field scroll used when no sections are scheduled
    pub const CONTINUOUS_SCROLL_MS: f32 = 5000.0;
    /// Elevator descent animation
    pub const ELEVATOR_DESCENT_MS: f32 = 2000.0;

    /// Completed drops per layer
    pub const DROPS_PER_LAYER: u32 = 3;

    /// Tile grid dimensions
    pub const ROWS: usize = 32;
    pub const COLS: usize = 16;

    /// Number of difficulty levels
    pub const DIFFICULTY_LEVELS: u8 = 4;

    /// Default run seed
    pub const DEFAULT_SEED: u64 = 0x5EED_D209;
}

/// Number of scroll sections needed to cover `duration_ms` (rounded up)
///
/// `sections_for(5000.0, 1500.0) == 4`.
#[inline]
pub fn sections_for(duration_ms: f32, section_ms: f32) -> u32 {
    if duration_ms <= 0.0 || section_ms <= 0.0 {
        return 0;
    }
    (duration_ms / section_ms).ceil() as u32
}
