//! Drop session state and core simulation types
//!
//! Everything the presentation layer may read lives here; only the
//! controller writes it.

use serde::{Deserialize, Serialize};

use super::multiplier::format_multiplier;
use crate::consts::DIFFICULTY_LEVELS;

/// Current phase of the drop cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameState {
    /// Countdown before the elevator drops, bets accepted
    #[default]
    Idle,
    /// Elevator descending into the shaft
    DropElevator,
    /// Short countdown between drops, get-out accepted
    IdleDrop,
    /// Tile pages scrolling section by section
    MoveTiles,
    /// Transient stop/continue decision point
    StopDrop,
    /// Run over, waiting to reset
    Crashed,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Idle => "idle",
            GameState::DropElevator => "dropElevator",
            GameState::IdleDrop => "idleDrop",
            GameState::MoveTiles => "moveTiles",
            GameState::StopDrop => "stopDrop",
            GameState::Crashed => "crashed",
        }
    }

    /// Whether a countdown is running in this state
    pub fn counts_down(&self) -> bool {
        matches!(self, Self::Idle | Self::IdleDrop | Self::Crashed)
    }
}

/// Difficulty level, 1 through 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Difficulty(u8);

impl Default for Difficulty {
    fn default() -> Self {
        Self(1)
    }
}

impl Difficulty {
    /// `None` outside `1..=4`
    pub fn new(level: u8) -> Option<Self> {
        (1..=DIFFICULTY_LEVELS).contains(&level).then_some(Self(level))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Zero-based index into per-difficulty tables
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

/// Label on the bet button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetLabel {
    Bet,
    Wait,
    GetOut,
}

impl BetLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetLabel::Bet => "BET",
            BetLabel::Wait => "WAIT",
            BetLabel::GetOut => "GET OUT",
        }
    }
}

/// Animations whose completion drives a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationKind {
    ElevatorDescent,
    SectionScroll,
}

/// Display intents emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DropEvent {
    StateChanged { from: GameState, to: GameState },
    TimerShown,
    TimerHidden,
    BetPlaced { auto: bool },
    GotOut { multiplier: f64 },
    MultiplierChanged { label: String },
    DifficultyChanged { level: u8 },
    AnimationStarted(AnimationKind),
    SectionScrolled { sections_left: u32 },
    LayerAdvanced { layer: u32 },
    Crashed { stake_index: u32 },
    SessionReset,
    TilesRebuilt,
}

/// The single active drop session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub game_state: GameState,
    /// Countdown (seconds), meaningful while `game_state.counts_down()`
    pub time_left: f32,
    pub difficulty: Difficulty,
    /// Completed drops this session, indexes the multiplier curve
    pub stake_index: u32,
    /// Depth tier, advances every third completed drop
    pub layer: u32,
    /// Completed drops since the last layer advance
    pub drops_done: u32,
    /// Drops left before the crash; crash when this goes negative
    pub amount_of_drops: i32,
    pub has_bet: bool,
    pub has_gotten_out: bool,
    pub timer_visible: bool,
    /// Multiplier as last evaluated for display
    pub multiplier: f64,
    pub multiplier_label: String,
    /// Multiplier locked in at get-out
    pub cashed_out_at: Option<f64>,
}

impl Session {
    pub fn new(difficulty: Difficulty, idle_duration: f32, multiplier: f64) -> Self {
        Self {
            game_state: GameState::Idle,
            time_left: idle_duration,
            difficulty,
            stake_index: 0,
            layer: 0,
            drops_done: 0,
            amount_of_drops: 0,
            has_bet: false,
            has_gotten_out: false,
            timer_visible: true,
            multiplier,
            multiplier_label: format_multiplier(multiplier),
            cashed_out_at: None,
        }
    }

    pub fn bet_label(&self) -> BetLabel {
        match self.game_state {
            GameState::Idle if !self.has_bet => BetLabel::Bet,
            GameState::IdleDrop if self.can_get_out() => BetLabel::GetOut,
            _ => BetLabel::Wait,
        }
    }

    pub fn can_get_out(&self) -> bool {
        self.game_state == GameState::IdleDrop && self.has_bet && !self.has_gotten_out
    }
}
