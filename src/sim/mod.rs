//! Deterministic drop simulation
//!
//! All game-state logic lives here. This module must stay pure:
//! - Time only advances through `tick(dt)`
//! - Seeded RNG only
//! - No rendering or platform dependencies

pub mod controller;
pub mod multiplier;
pub mod state;
pub mod tiles;

pub use controller::{DropController, FrameClock, Snapshot};
pub use multiplier::{CurveParams, MultiplierCurve, format_multiplier};
pub use state::{AnimationKind, BetLabel, Difficulty, DropEvent, GameState, Session};
pub use tiles::{MapGuide, TileId, TilePage, TileScroller, Tween};
