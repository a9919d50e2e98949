//! Drop state controller
//!
//! Drives idle countdown -> elevator drop -> tile scroll -> stop/continue ->
//! crash. The controller owns the session and is the only writer of it; the
//! presentation layer reads [`Snapshot`]s and drains [`DropEvent`]s.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::multiplier::{MultiplierCurve, format_multiplier};
use super::state::{AnimationKind, BetLabel, Difficulty, DropEvent, GameState, Session};
use super::tiles::{TilePage, TileScroller, Tween};
use crate::config::{DropConfig, ScrollMode};
use crate::consts::{DROPS_PER_LAYER, FRAME_DT, MAX_FRAME_DT};
use crate::preview::{Modifiers, PhoneFormat, PreviewSettings, TextureFormat};

/// Phase changes one tick may run through before leftover time is dropped
const MAX_PHASES_PER_TICK: usize = 8;

/// Read-only view handed to the presentation layer each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_state: GameState,
    pub time_left_secs: f32,
    pub timer_visible: bool,
    pub multiplier_label: String,
    pub bet_label: BetLabel,
    pub difficulty: u8,
    pub layer: u32,
    pub stake_index: u32,
    pub cashed_out_at: Option<f64>,
    pub elevator_offset: Vec2,
    pub active_page: TilePage,
    pub staged_page: TilePage,
}

/// Converts frame timestamps into clamped deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous frame (nominal delta on the first one)
    pub fn advance(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => FRAME_DT,
        };
        self.last_ms = Some(now_ms);
        dt.clamp(0.0, MAX_FRAME_DT)
    }
}

/// Owns the session and runs the drop state machine
#[derive(Debug, Clone)]
pub struct DropController<R: Rng = Pcg32> {
    config: DropConfig,
    curve: MultiplierCurve,
    session: Session,
    preview: PreviewSettings,
    scroller: TileScroller,
    elevator: Option<Tween>,
    elevator_offset: Vec2,
    rng: R,
    events: Vec<DropEvent>,
}

impl DropController<Pcg32> {
    /// Controller seeded from `config.seed`
    pub fn new(config: DropConfig) -> Self {
        let rng = Pcg32::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> DropController<R> {
    /// Controller with an injected random source
    pub fn with_rng(config: DropConfig, rng: R) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("Invalid drop config ({}), using defaults", e);
                DropConfig {
                    seed: config.seed,
                    ..Default::default()
                }
            }
        };
        let curve = MultiplierCurve::new(config.curves.clone()).unwrap_or_default();
        let preview = PreviewSettings::default();
        let difficulty = Difficulty::default();
        let session = Session::new(
            difficulty,
            config.idle_duration_secs,
            curve.multiplier(difficulty, 0),
        );
        let scroller = TileScroller::new(config.rows, config.cols, preview.tile_extent(), 0);

        Self {
            config,
            curve,
            session,
            preview,
            scroller,
            elevator: None,
            elevator_offset: Vec2::ZERO,
            rng,
            events: Vec::new(),
        }
    }

    /// Start from previously saved preview settings
    pub fn with_preview(mut self, preview: PreviewSettings) -> Self {
        self.preview = preview;
        self.scroller.set_tile_extent(self.preview.tile_extent());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> GameState {
        self.session.game_state
    }

    pub fn config(&self) -> &DropConfig {
        &self.config
    }

    pub fn preview(&self) -> &PreviewSettings {
        &self.preview
    }

    pub fn scroller(&self) -> &TileScroller {
        &self.scroller
    }

    /// Display intents emitted since the last call
    pub fn drain_events(&mut self) -> Vec<DropEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            game_state: self.session.game_state,
            time_left_secs: self.session.time_left,
            timer_visible: self.session.timer_visible,
            multiplier_label: self.session.multiplier_label.clone(),
            bet_label: self.session.bet_label(),
            difficulty: self.session.difficulty.level(),
            layer: self.session.layer,
            stake_index: self.session.stake_index,
            cashed_out_at: self.session.cashed_out_at,
            elevator_offset: self.elevator_offset,
            active_page: self.scroller.active_page().clone(),
            staged_page: self.scroller.staged_page().clone(),
        }
    }

    /// Advance countdowns and running animations by `dt` seconds
    ///
    /// Time left over when a phase finishes runs the next one.
    pub fn tick(&mut self, dt: f32) {
        let mut remaining = dt.max(0.0);
        for _ in 0..MAX_PHASES_PER_TICK {
            remaining = self.advance_phase(remaining);
            if remaining <= 0.0 {
                break;
            }
        }
    }

    /// Run the current phase for up to `dt` seconds; returns the unused time
    fn advance_phase(&mut self, dt: f32) -> f32 {
        let state = self.session.game_state;
        if state.counts_down() {
            let leftover = dt - self.session.time_left;
            self.session.time_left = (self.session.time_left - dt).max(0.0);
            if self.session.time_left > 0.0 {
                return 0.0;
            }
            match state {
                GameState::Idle => self.change_state(GameState::DropElevator),
                GameState::IdleDrop => self.change_state(GameState::MoveTiles),
                _ => self.reset_session(),
            }
            return leftover.max(0.0);
        }

        let dt_ms = dt * 1000.0;
        match state {
            GameState::DropElevator => {
                let Some(tween) = self.elevator.as_mut() else {
                    return 0.0;
                };
                let left_ms = tween.remaining_ms();
                let finished = tween.advance(dt_ms);
                self.elevator_offset = tween.value();
                if !finished {
                    return 0.0;
                }
                self.on_animation_complete(AnimationKind::ElevatorDescent);
                ((dt_ms - left_ms) / 1000.0).max(0.0)
            }
            GameState::MoveTiles => {
                let left_ms = self.scroller.remaining_ms();
                if !self.scroller.advance(dt_ms) {
                    return 0.0;
                }
                self.on_animation_complete(AnimationKind::SectionScroll);
                ((dt_ms - left_ms) / 1000.0).max(0.0)
            }
            // StopDrop is transient, never held across ticks
            _ => 0.0,
        }
    }

    /// Animation finished; mismatched completions are ignored
    pub fn on_animation_complete(&mut self, kind: AnimationKind) {
        match (kind, self.session.game_state) {
            (AnimationKind::ElevatorDescent, GameState::DropElevator) => {
                if let Some(tween) = self.elevator.take() {
                    self.elevator_offset = tween.to;
                }
                self.change_state(GameState::MoveTiles);
            }
            (AnimationKind::SectionScroll, GameState::MoveTiles) => {
                let more = self.scroller.complete_section();
                self.events.push(DropEvent::SectionScrolled {
                    sections_left: self.scroller.sections_left(),
                });
                if !more {
                    self.change_state(GameState::StopDrop);
                }
            }
            (kind, state) => {
                log::debug!("Ignoring {:?} completion in {}", kind, state.as_str());
            }
        }
    }

    /// Transition to `next`; a transition to the current state does nothing
    pub fn change_state(&mut self, next: GameState) {
        let from = self.session.game_state;
        if from == next {
            return;
        }

        log::info!("Game state {} -> {}", from.as_str(), next.as_str());
        self.session.game_state = next;
        self.events.push(DropEvent::StateChanged { from, to: next });

        match next {
            GameState::Idle => self.enter_idle(),
            GameState::DropElevator => self.enter_drop_elevator(),
            GameState::IdleDrop => self.enter_idle_drop(),
            GameState::MoveTiles => self.enter_move_tiles(),
            GameState::StopDrop => self.enter_stop_drop(),
            GameState::Crashed => self.enter_crashed(),
        }
    }

    fn enter_idle(&mut self) {
        self.session.time_left = self.config.idle_duration_secs;
        self.show_timer();
    }

    fn enter_drop_elevator(&mut self) {
        if !self.session.has_bet {
            self.session.has_bet = true;
            self.events.push(DropEvent::BetPlaced { auto: true });
        }
        self.refresh_multiplier();
        self.hide_timer();

        self.session.amount_of_drops = self.config.drop_count.sample(&mut self.rng);
        log::info!("Elevator dropping, {} drops", self.session.amount_of_drops);

        let distance = self.config.elevator_descent_rows * self.scroller.tile_extent();
        self.elevator_offset = Vec2::ZERO;
        self.elevator = Some(Tween::new(
            Vec2::ZERO,
            Vec2::new(0.0, distance),
            self.config.elevator_descent_ms,
        ));
        self.events
            .push(DropEvent::AnimationStarted(AnimationKind::ElevatorDescent));
    }

    fn enter_idle_drop(&mut self) {
        self.show_timer();
        self.session.time_left = self.config.idle_duration_secs;
    }

    fn enter_move_tiles(&mut self) {
        self.hide_timer();
        self.refresh_multiplier();

        let drop_secs = self.config.drop_seconds.sample(&mut self.rng).max(0) as u32;
        let mode = self.config.scroll_mode(drop_secs);
        match mode {
            ScrollMode::Sectioned { sections } => {
                log::info!("Scrolling {}s in {} sections", drop_secs, sections)
            }
            ScrollMode::Continuous => log::info!("Scrolling whole field"),
        }

        self.scroller.start(
            mode,
            self.config.time_per_section_ms,
            self.config.continuous_scroll_ms,
            self.session.layer,
        );
        self.events
            .push(DropEvent::AnimationStarted(AnimationKind::SectionScroll));
    }

    fn enter_stop_drop(&mut self) {
        let session = &mut self.session;
        session.drops_done += 1;
        if session.drops_done % DROPS_PER_LAYER == 0 {
            session.layer += 1;
            session.drops_done = 0;
            self.events.push(DropEvent::LayerAdvanced {
                layer: session.layer,
            });
        }
        session.stake_index += 1;
        session.amount_of_drops -= 1;

        // Zero drops left still allows one more stop
        if session.amount_of_drops >= 0 {
            self.change_state(GameState::IdleDrop);
        } else {
            self.change_state(GameState::Crashed);
        }
    }

    fn enter_crashed(&mut self) {
        self.hide_timer();
        self.session.time_left = self.config.crash_display_secs;
        log::info!(
            "Crashed after {} drops (cashed out: {:?})",
            self.session.stake_index,
            self.session.cashed_out_at
        );
        self.events.push(DropEvent::Crashed {
            stake_index: self.session.stake_index,
        });
    }

    /// Start a fresh session in `Idle`, keeping the chosen difficulty
    pub fn restart(&mut self) {
        self.reset_session();
    }

    fn reset_session(&mut self) {
        let from = self.session.game_state;
        let difficulty = self.session.difficulty;
        self.session = Session::new(
            difficulty,
            self.config.idle_duration_secs,
            self.curve.multiplier(difficulty, 0),
        );
        self.scroller.reset(0);
        self.elevator = None;
        self.elevator_offset = Vec2::ZERO;

        log::info!("Session reset");
        self.events.push(DropEvent::SessionReset);
        if from != GameState::Idle {
            self.events.push(DropEvent::StateChanged {
                from,
                to: GameState::Idle,
            });
        }
        self.events.push(DropEvent::TimerShown);
        self.events.push(DropEvent::MultiplierChanged {
            label: self.session.multiplier_label.clone(),
        });
    }

    /// Place a bet; only while `Idle` and only once
    pub fn place_bet(&mut self) {
        if self.session.game_state != GameState::Idle || self.session.has_bet {
            log::debug!("Ignoring bet in {}", self.session.game_state.as_str());
            return;
        }
        self.session.has_bet = true;
        self.events.push(DropEvent::BetPlaced { auto: false });
    }

    /// Cash out at the displayed multiplier; only during `IdleDrop`
    pub fn request_get_out(&mut self) {
        if !self.session.can_get_out() {
            log::debug!("Ignoring get out in {}", self.session.game_state.as_str());
            return;
        }
        let multiplier = self.session.multiplier;
        self.session.has_gotten_out = true;
        self.session.cashed_out_at = Some(multiplier);
        log::info!("Got out at {}", format_multiplier(multiplier));
        self.events.push(DropEvent::GotOut { multiplier });
    }

    /// Change difficulty (1..=4); only while `Idle`
    pub fn select_difficulty(&mut self, level: u8) {
        if self.session.game_state != GameState::Idle {
            log::debug!(
                "Ignoring difficulty {} in {}",
                level,
                self.session.game_state.as_str()
            );
            return;
        }
        let Some(difficulty) = Difficulty::new(level) else {
            log::debug!("Ignoring out of range difficulty {}", level);
            return;
        };
        if difficulty == self.session.difficulty {
            return;
        }
        self.session.difficulty = difficulty;
        self.events.push(DropEvent::DifficultyChanged { level });
        self.refresh_multiplier();
    }

    // Preview operations return true when the preview settings changed

    pub fn on_phone_format_changed(&mut self, format: PhoneFormat) -> bool {
        if !self.preview.set_phone(format) {
            return false;
        }
        self.phone_format_applied();
        true
    }

    pub fn cycle_phone_format(&mut self, step: isize) -> bool {
        if !self.preview.cycle_phone(step) {
            return false;
        }
        self.phone_format_applied();
        true
    }

    fn phone_format_applied(&mut self) {
        log::info!("Phone format: {}", self.preview.phone.as_str());
        self.rebuild_tiles();
    }

    pub fn on_texture_format_changed(&mut self, format: TextureFormat) -> bool {
        if !self.preview.set_texture(format) {
            return false;
        }
        self.texture_format_applied();
        true
    }

    pub fn cycle_texture_format(&mut self, step: isize) -> bool {
        if !self.preview.cycle_texture(step) {
            return false;
        }
        self.texture_format_applied();
        true
    }

    fn texture_format_applied(&mut self) {
        log::info!("Texture format: {}", self.preview.texture.as_str());
        self.rebuild_tiles();
    }

    pub fn on_scale_changed(&mut self, scale: f32) -> bool {
        if !self.preview.change_scale(scale) {
            return false;
        }
        self.rebuild_tiles();
        true
    }

    /// Scale buttons; ignored while no texture set is shown
    pub fn step_scale(&mut self, up: bool, modifiers: Modifiers) -> bool {
        if !self.preview.scale_controls_visible() || !self.preview.step_scale(up, modifiers) {
            return false;
        }
        log::debug!("Scale: {:.2}", self.preview.scale);
        self.rebuild_tiles();
        true
    }

    /// Tile buttons; only in the tile view
    pub fn change_tile(&mut self, id: isize) -> bool {
        if !self.preview.tile_controls_visible() {
            return false;
        }
        self.preview.change_tile(id)
    }

    pub fn toggle_view(&mut self) -> bool {
        let changed = self.preview.toggle_view();
        log::debug!("View: {}", self.preview.view.as_str());
        changed
    }

    fn rebuild_tiles(&mut self) {
        let extent = self.preview.tile_extent();
        self.scroller.set_tile_extent(extent);

        // Keep the elevator's progress, retarget its distance
        if let Some(tween) = self.elevator.as_mut() {
            tween.to = Vec2::new(0.0, self.config.elevator_descent_rows * extent);
            self.elevator_offset = tween.value();
        }
        self.events.push(DropEvent::TilesRebuilt);
    }

    fn refresh_multiplier(&mut self) {
        let multiplier = self
            .curve
            .multiplier(self.session.difficulty, self.session.stake_index);
        let label = format_multiplier(multiplier);
        self.session.multiplier = multiplier;
        if label != self.session.multiplier_label {
            self.session.multiplier_label = label.clone();
            self.events.push(DropEvent::MultiplierChanged { label });
        }
    }

    fn show_timer(&mut self) {
        if !self.session.timer_visible {
            self.session.timer_visible = true;
            self.events.push(DropEvent::TimerShown);
        }
    }

    fn hide_timer(&mut self) {
        if self.session.timer_visible {
            self.session.timer_visible = false;
            self.events.push(DropEvent::TimerHidden);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntRange;
    use crate::preview::MAX_SCALE;
    use crate::sim::tiles::MapGuide;

    /// One drop per activation, 5 s of scrolling (4 sections of 1.5 s)
    fn fixed_config(drops: i32) -> DropConfig {
        DropConfig {
            drop_count: IntRange::new(drops, drops),
            drop_seconds: IntRange::new(5, 5),
            ..Default::default()
        }
    }

    fn run_until(ctrl: &mut DropController, state: GameState, max_ticks: usize) {
        for _ in 0..max_ticks {
            if ctrl.state() == state {
                return;
            }
            ctrl.tick(0.5);
        }
        assert_eq!(ctrl.state(), state, "never reached {}", state.as_str());
    }

    fn transitions(events: &[DropEvent]) -> Vec<(GameState, GameState)> {
        events
            .iter()
            .filter_map(|e| match e {
                DropEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_idle_countdown_drops_elevator() {
        let mut ctrl = DropController::new(DropConfig::default());
        assert_eq!(ctrl.state(), GameState::Idle);
        assert_eq!(ctrl.snapshot().bet_label, BetLabel::Bet);

        for _ in 0..4 {
            ctrl.tick(1.0);
        }
        assert_eq!(ctrl.state(), GameState::Idle);
        assert_eq!(ctrl.session().time_left, 1.0);

        ctrl.tick(1.0);
        assert_eq!(ctrl.state(), GameState::DropElevator);
        assert!(ctrl.session().has_bet);
        assert!((1..=3).contains(&ctrl.session().amount_of_drops));
        assert!(!ctrl.session().timer_visible);

        let events = ctrl.drain_events();
        assert!(events.contains(&DropEvent::BetPlaced { auto: true }));
        assert!(events.contains(&DropEvent::AnimationStarted(AnimationKind::ElevatorDescent)));
    }

    #[test]
    fn test_manual_bet_is_not_doubled() {
        let mut ctrl = DropController::new(DropConfig::default());
        ctrl.place_bet();
        ctrl.place_bet();
        assert_eq!(ctrl.snapshot().bet_label, BetLabel::Wait);

        run_until(&mut ctrl, GameState::DropElevator, 20);
        let bets: Vec<_> = ctrl
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, DropEvent::BetPlaced { .. }))
            .collect();
        assert_eq!(bets, vec![DropEvent::BetPlaced { auto: false }]);
    }

    #[test]
    fn test_self_transition_is_noop() {
        let mut ctrl = DropController::new(fixed_config(2));
        let states = [
            GameState::Idle,
            GameState::DropElevator,
            GameState::MoveTiles,
            GameState::IdleDrop,
        ];
        for state in states {
            run_until(&mut ctrl, state, 100);
            ctrl.drain_events();
            let before = ctrl.session().clone();
            ctrl.change_state(state);
            assert_eq!(ctrl.session(), &before);
            assert!(ctrl.drain_events().is_empty());
        }
    }

    #[test]
    fn test_elevator_descent_then_move_tiles() {
        let mut ctrl = DropController::new(fixed_config(1));
        run_until(&mut ctrl, GameState::DropElevator, 20);

        ctrl.tick(1.0);
        let halfway = ctrl.snapshot().elevator_offset.y;
        assert_eq!(halfway, 2.0 * 32.0);

        ctrl.tick(1.0);
        assert_eq!(ctrl.state(), GameState::MoveTiles);
        assert_eq!(ctrl.snapshot().elevator_offset.y, 4.0 * 32.0);
        assert_eq!(ctrl.scroller().sections_left(), 4);
    }

    #[test]
    fn test_four_sections_then_stop_drop() {
        let mut ctrl = DropController::new(fixed_config(1));
        run_until(&mut ctrl, GameState::MoveTiles, 20);
        ctrl.drain_events();

        for i in 0..4 {
            assert_eq!(ctrl.state(), GameState::MoveTiles, "section {}", i);
            ctrl.tick(1.5);
        }

        let events = ctrl.drain_events();
        let scrolled: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                DropEvent::SectionScrolled { sections_left } => Some(*sections_left),
                _ => None,
            })
            .collect();
        assert_eq!(scrolled, vec![3, 2, 1, 0]);
        assert_eq!(
            transitions(&events),
            vec![
                (GameState::MoveTiles, GameState::StopDrop),
                (GameState::StopDrop, GameState::IdleDrop),
            ]
        );
        assert_eq!(ctrl.snapshot().active_page.guide, MapGuide::DropStop);
        let shown = events.iter().filter(|e| **e == DropEvent::TimerShown).count();
        assert_eq!(shown, 1);
        assert_eq!(ctrl.session().time_left, ctrl.config().idle_duration_secs);
    }

    #[test]
    fn test_zero_drops_left_still_idles_then_crashes() {
        let mut ctrl = DropController::new(fixed_config(1));
        run_until(&mut ctrl, GameState::IdleDrop, 100);
        assert_eq!(ctrl.session().amount_of_drops, 0);
        assert_eq!(ctrl.session().stake_index, 1);
        assert!(ctrl.session().timer_visible);

        run_until(&mut ctrl, GameState::Crashed, 100);
        assert_eq!(ctrl.session().amount_of_drops, -1);
        assert_eq!(ctrl.session().stake_index, 2);
        assert!(
            ctrl.drain_events()
                .contains(&DropEvent::Crashed { stake_index: 2 })
        );
    }

    #[test]
    fn test_stake_index_and_layer_progression() {
        let mut ctrl = DropController::new(fixed_config(6));
        run_until(&mut ctrl, GameState::MoveTiles, 20);

        let mut last_stake = 0;
        for drop in 1..=6u32 {
            run_until(&mut ctrl, GameState::IdleDrop, 100);
            let session = ctrl.session();
            assert_eq!(session.stake_index, last_stake + 1);
            assert_eq!(session.layer, drop / 3);
            assert_eq!(session.drops_done, drop % 3);
            last_stake = session.stake_index;
            run_until(&mut ctrl, GameState::MoveTiles, 100);
        }
        let layers: Vec<_> = ctrl
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, DropEvent::LayerAdvanced { .. }))
            .collect();
        assert_eq!(
            layers,
            vec![
                DropEvent::LayerAdvanced { layer: 1 },
                DropEvent::LayerAdvanced { layer: 2 }
            ]
        );
    }

    #[test]
    fn test_difficulty_only_while_idle() {
        let mut ctrl = DropController::new(fixed_config(1));
        ctrl.select_difficulty(3);
        assert_eq!(ctrl.session().difficulty.level(), 3);

        ctrl.select_difficulty(9);
        assert_eq!(ctrl.session().difficulty.level(), 3);

        run_until(&mut ctrl, GameState::MoveTiles, 20);
        ctrl.select_difficulty(1);
        assert_eq!(ctrl.session().difficulty.level(), 3);
    }

    #[test]
    fn test_multiplier_label_follows_stake_and_difficulty() {
        let mut ctrl = DropController::new(fixed_config(3));
        ctrl.select_difficulty(4);
        assert_eq!(ctrl.snapshot().multiplier_label, "x1.00");

        // Re-evaluated on MoveTiles entry after one completed drop
        run_until(&mut ctrl, GameState::IdleDrop, 100);
        run_until(&mut ctrl, GameState::MoveTiles, 100);
        assert_eq!(ctrl.snapshot().multiplier_label, "x1.50");
    }

    #[test]
    fn test_get_out_only_in_idle_drop() {
        let mut ctrl = DropController::new(fixed_config(2));
        ctrl.request_get_out();
        assert!(!ctrl.session().has_gotten_out);

        run_until(&mut ctrl, GameState::IdleDrop, 100);
        assert_eq!(ctrl.snapshot().bet_label, BetLabel::GetOut);
        ctrl.request_get_out();
        ctrl.request_get_out();
        assert!(ctrl.session().has_gotten_out);
        assert_eq!(ctrl.session().cashed_out_at, Some(1.0));
        assert_eq!(ctrl.snapshot().bet_label, BetLabel::Wait);

        let outs = ctrl
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, DropEvent::GotOut { .. }))
            .count();
        assert_eq!(outs, 1);
    }

    #[test]
    fn test_crash_resets_to_idle() {
        let mut ctrl = DropController::new(fixed_config(0));
        ctrl.select_difficulty(2);
        run_until(&mut ctrl, GameState::Crashed, 100);
        assert!(!ctrl.session().timer_visible);

        ctrl.tick(ctrl.config().crash_display_secs);
        let session = ctrl.session();
        assert_eq!(session.game_state, GameState::Idle);
        assert_eq!(session.stake_index, 0);
        assert_eq!(session.layer, 0);
        assert!(!session.has_bet);
        assert_eq!(session.difficulty.level(), 2);
        assert_eq!(ctrl.snapshot().active_page.guide, MapGuide::Begin);
    }

    #[test]
    fn test_restart_mid_drop() {
        let mut ctrl = DropController::new(fixed_config(3));
        run_until(&mut ctrl, GameState::MoveTiles, 20);
        ctrl.drain_events();

        ctrl.restart();
        assert_eq!(ctrl.state(), GameState::Idle);
        assert_eq!(ctrl.session().time_left, ctrl.config().idle_duration_secs);
        assert!(!ctrl.scroller().is_scrolling());
        let events = ctrl.drain_events();
        assert_eq!(events[0], DropEvent::SessionReset);
        assert_eq!(
            transitions(&events),
            vec![(GameState::MoveTiles, GameState::Idle)]
        );
    }

    #[test]
    fn test_mismatched_animation_completion_ignored() {
        let mut ctrl = DropController::new(fixed_config(1));
        ctrl.on_animation_complete(AnimationKind::ElevatorDescent);
        ctrl.on_animation_complete(AnimationKind::SectionScroll);
        assert_eq!(ctrl.state(), GameState::Idle);

        run_until(&mut ctrl, GameState::DropElevator, 20);
        ctrl.on_animation_complete(AnimationKind::SectionScroll);
        assert_eq!(ctrl.state(), GameState::DropElevator);

        // External completion short-circuits the descent
        ctrl.on_animation_complete(AnimationKind::ElevatorDescent);
        assert_eq!(ctrl.state(), GameState::MoveTiles);
    }

    #[test]
    fn test_format_change_rebuilds_tiles() {
        let mut ctrl = DropController::new(DropConfig::default());
        ctrl.on_texture_format_changed(TextureFormat::Scaled32To128);
        assert_eq!(ctrl.scroller().tile_extent(), 128.0);
        assert_eq!(ctrl.drain_events(), vec![DropEvent::TilesRebuilt]);

        ctrl.on_texture_format_changed(TextureFormat::Scaled32To128);
        assert!(ctrl.drain_events().is_empty());

        ctrl.on_phone_format_changed(PhoneFormat::Pixel7);
        assert_eq!(ctrl.preview().phone, PhoneFormat::Pixel7);
        assert_eq!(ctrl.drain_events(), vec![DropEvent::TilesRebuilt]);
    }

    #[test]
    fn test_texture_change_mid_descent_keeps_progress() {
        let mut ctrl = DropController::new(fixed_config(1));
        run_until(&mut ctrl, GameState::DropElevator, 20);
        ctrl.tick(1.0);
        assert_eq!(ctrl.snapshot().elevator_offset.y, 2.0 * 32.0);

        ctrl.on_texture_format_changed(TextureFormat::Scaled32To128);
        assert_eq!(ctrl.state(), GameState::DropElevator);
        assert_eq!(ctrl.snapshot().elevator_offset.y, 2.0 * 128.0);

        ctrl.tick(1.0);
        assert_eq!(ctrl.state(), GameState::MoveTiles);
        assert_eq!(ctrl.snapshot().elevator_offset.y, 4.0 * 128.0);
    }

    #[test]
    fn test_texture_change_mid_section_retargets_scroll() {
        let mut ctrl = DropController::new(fixed_config(1));
        run_until(&mut ctrl, GameState::MoveTiles, 20);
        ctrl.tick(0.75);
        assert_eq!(ctrl.snapshot().active_page.offset.y, -16.0 * 32.0);

        ctrl.on_texture_format_changed(TextureFormat::Scaled32To128);
        let snapshot = ctrl.snapshot();
        assert_eq!(snapshot.active_page.offset.y, -16.0 * 128.0);
        assert_eq!(snapshot.staged_page.offset.y, 16.0 * 128.0);
        assert_eq!(ctrl.scroller().sections_left(), 4);
        assert!(ctrl.scroller().is_scrolling());

        ctrl.tick(0.75);
        assert_eq!(ctrl.scroller().sections_left(), 3);
        assert_eq!(ctrl.snapshot().active_page.offset.y, 0.0);
    }

    #[test]
    fn test_scale_change_rebuilds_tiles() {
        let mut ctrl = DropController::new(DropConfig::default());
        assert!(ctrl.on_scale_changed(2.0));
        assert_eq!(ctrl.scroller().tile_extent(), 64.0);
        assert_eq!(ctrl.drain_events(), vec![DropEvent::TilesRebuilt]);

        assert!(!ctrl.on_scale_changed(2.0));
        assert!(ctrl.on_scale_changed(50.0));
        assert_eq!(ctrl.preview().scale, MAX_SCALE);
        assert!(!ctrl.on_scale_changed(60.0));
        assert_eq!(ctrl.drain_events(), vec![DropEvent::TilesRebuilt]);
    }

    #[test]
    fn test_preview_controls_follow_texture_and_view() {
        let mut ctrl = DropController::new(DropConfig::default());
        assert!(!ctrl.step_scale(true, Modifiers::default()));
        assert!(!ctrl.change_tile(3));

        assert!(ctrl.cycle_texture_format(1));
        assert_eq!(ctrl.preview().texture, TextureFormat::Default32);
        assert!(ctrl.step_scale(true, Modifiers::default()));
        assert_eq!(ctrl.scroller().tile_extent(), 64.0);

        assert!(!ctrl.change_tile(3));
        assert!(ctrl.toggle_view());
        assert!(ctrl.change_tile(3));
        assert_eq!(ctrl.preview().tile_id, 3);

        assert!(ctrl.cycle_phone_format(-1));
        assert_eq!(ctrl.preview().phone, PhoneFormat::SamsungGalaxyS20Ultra);
        assert_eq!(ctrl.scroller().tile_extent(), 32.0);
    }

    #[test]
    fn test_difficulty_locked_outside_idle() {
        let mut ctrl = DropController::new(fixed_config(1));
        for state in [
            GameState::DropElevator,
            GameState::IdleDrop,
            GameState::Crashed,
        ] {
            run_until(&mut ctrl, state, 100);
            ctrl.drain_events();
            ctrl.select_difficulty(4);
            assert_eq!(ctrl.session().difficulty.level(), 1, "{}", state.as_str());
            assert!(ctrl.drain_events().is_empty());
        }
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let config = DropConfig {
            seed: 7,
            drop_count: IntRange::new(3, 1),
            ..Default::default()
        };
        let mut ctrl = DropController::new(config);
        assert_eq!(ctrl.config().seed, 7);
        assert_eq!(ctrl.config().drop_count, DropConfig::default().drop_count);

        ctrl.tick(5.0);
        assert_eq!(ctrl.state(), GameState::DropElevator);
        assert!((1..=3).contains(&ctrl.session().amount_of_drops));
    }

    #[test]
    fn test_leftover_time_carries_into_next_phase() {
        let mut ctrl = DropController::new(fixed_config(1));
        ctrl.tick(4.5);
        ctrl.tick(1.0);
        assert_eq!(ctrl.state(), GameState::DropElevator);
        assert_eq!(ctrl.snapshot().elevator_offset.y, 32.0);

        // Idle 5 s, descent 2 s, then half of the first section
        let mut ctrl = DropController::new(fixed_config(1));
        ctrl.tick(7.75);
        assert_eq!(ctrl.state(), GameState::MoveTiles);
        assert_eq!(ctrl.snapshot().active_page.offset.y, -16.0 * 32.0);
    }

    #[test]
    fn test_continuous_scroll_when_no_sections() {
        let config = DropConfig {
            drop_count: IntRange::new(1, 1),
            drop_seconds: IntRange::new(0, 0),
            ..Default::default()
        };
        let mut ctrl = DropController::new(config);
        run_until(&mut ctrl, GameState::MoveTiles, 20);
        assert_eq!(ctrl.scroller().sections_left(), 0);

        ctrl.tick(MAX_FRAME_DT);
        assert_eq!(ctrl.state(), GameState::MoveTiles);
        for _ in 0..20 {
            ctrl.tick(MAX_FRAME_DT);
        }
        assert_eq!(ctrl.state(), GameState::IdleDrop);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = DropController::new(DropConfig::default());
        let mut b = DropController::new(DropConfig::default());
        for _ in 0..400 {
            a.tick(0.1);
            b.tick(0.1);
        }
        assert_eq!(a.session(), b.session());
        assert_eq!(a.drain_events(), b.drain_events());
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(1000.0), FRAME_DT);
        assert!((clock.advance(1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(clock.advance(5000.0), MAX_FRAME_DT);
        assert_eq!(clock.advance(4000.0), 0.0);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sampled_drops_within_bounds(seed in any::<u64>()) {
                let config = DropConfig { seed, ..Default::default() };
                let range = config.drop_count;
                let mut ctrl = DropController::new(config);
                ctrl.tick(ctrl.config().idle_duration_secs);
                prop_assert_eq!(ctrl.state(), GameState::DropElevator);
                prop_assert!(range.contains(ctrl.session().amount_of_drops));
            }

            #[test]
            fn self_transition_after_any_run(seed in any::<u64>(), ticks in 0usize..200) {
                let config = DropConfig { seed, ..Default::default() };
                let mut ctrl = DropController::new(config);
                for _ in 0..ticks {
                    ctrl.tick(0.25);
                }
                ctrl.drain_events();
                let before = ctrl.session().clone();
                ctrl.change_state(ctrl.state());
                prop_assert_eq!(ctrl.session(), &before);
                prop_assert!(ctrl.drain_events().is_empty());
            }

            #[test]
            fn stake_index_never_decreases_within_session(seed in any::<u64>(), ticks in 1usize..400) {
                let config = DropConfig { seed, ..Default::default() };
                let mut ctrl = DropController::new(config);
                let mut last = 0;
                for _ in 0..ticks {
                    ctrl.tick(0.25);
                    let events = ctrl.drain_events();
                    let stake = ctrl.session().stake_index;
                    if events.contains(&DropEvent::SessionReset) {
                        prop_assert_eq!(stake, 0);
                    } else {
                        prop_assert!(stake == last || stake == last + 1);
                    }
                    last = stake;
                }
            }
        }
    }
}
