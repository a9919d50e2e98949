//! Elevator Drop entry point
//!
//! Web: runs the controller from `requestAnimationFrame` and exposes the
//! inbound calls to the page. Native: headless run of one full session.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use elevator_drop::preview::Modifiers;
    use elevator_drop::sim::{DropController, DropEvent, FrameClock};
    use elevator_drop::{DropConfig, PhoneFormat, PreviewSettings, TextureFormat};

    /// Game instance holding all state
    struct Game {
        controller: DropController,
        clock: FrameClock,
    }

    impl Game {
        fn new(seed: u64) -> Self {
            let config = DropConfig {
                seed,
                ..Default::default()
            };
            Self {
                controller: DropController::new(config).with_preview(PreviewSettings::load()),
                clock: FrameClock::new(),
            }
        }

        fn update(&mut self, time: f64) {
            let dt = self.clock.advance(time);
            self.controller.tick(dt);

            for event in self.controller.drain_events() {
                match event {
                    DropEvent::StateChanged { .. } | DropEvent::Crashed { .. } => {
                        log::info!("{:?}", event)
                    }
                    _ => log::debug!("{:?}", event),
                }
            }
        }
    }

    thread_local! {
        static GAME: RefCell<Option<Rc<RefCell<Game>>>> = const { RefCell::new(None) };
    }

    fn with_game<T>(f: impl FnOnce(&mut Game) -> T) -> Option<T> {
        GAME.with(|slot| slot.borrow().as_ref().map(|game| f(&mut game.borrow_mut())))
    }

    /// Apply a preview change and persist it if it was accepted
    fn with_preview_change(f: impl FnOnce(&mut DropController) -> bool) {
        with_game(|g| {
            if f(&mut g.controller) {
                g.controller.preview().save();
            }
        });
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Elevator Drop starting...");

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)));
        GAME.with(|slot| *slot.borrow_mut() = Some(game.clone()));

        log::info!("Game initialized with seed: {}", seed);

        // Start game loop
        request_animation_frame(game);
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            log::error!("No window, game loop not started");
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().update(time);
        request_animation_frame(game);
    }

    #[wasm_bindgen]
    pub fn place_bet() {
        with_game(|g| g.controller.place_bet());
    }

    #[wasm_bindgen]
    pub fn request_get_out() {
        with_game(|g| g.controller.request_get_out());
    }

    #[wasm_bindgen]
    pub fn select_difficulty(level: u8) {
        with_game(|g| g.controller.select_difficulty(level));
    }

    #[wasm_bindgen]
    pub fn restart() {
        with_game(|g| g.controller.restart());
    }

    #[wasm_bindgen]
    pub fn set_phone_format(index: i32) {
        let format = PhoneFormat::wrapped(index as isize);
        with_preview_change(|c| c.on_phone_format_changed(format));
    }

    #[wasm_bindgen]
    pub fn cycle_phone_format(step: i32) {
        with_preview_change(|c| c.cycle_phone_format(step as isize));
    }

    #[wasm_bindgen]
    pub fn set_texture_format(index: i32) {
        let format = TextureFormat::wrapped(index as isize);
        with_preview_change(|c| c.on_texture_format_changed(format));
    }

    #[wasm_bindgen]
    pub fn cycle_texture_format(step: i32) {
        with_preview_change(|c| c.cycle_texture_format(step as isize));
    }

    #[wasm_bindgen]
    pub fn set_scale(scale: f32) {
        with_preview_change(|c| c.on_scale_changed(scale));
    }

    #[wasm_bindgen]
    pub fn step_scale(up: bool, shift: bool, control: bool) {
        let modifiers = Modifiers { shift, control };
        with_preview_change(|c| c.step_scale(up, modifiers));
    }

    #[wasm_bindgen]
    pub fn change_tile(id: i32) {
        with_preview_change(|c| c.change_tile(id as isize));
    }

    #[wasm_bindgen]
    pub fn toggle_view() {
        with_preview_change(|c| c.toggle_view());
    }

    /// Current snapshot as JSON for the presentation layer
    #[wasm_bindgen]
    pub fn snapshot_json() -> String {
        with_game(|g| serde_json::to_string(&g.controller.snapshot()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Preview selection and control visibility as JSON
    #[wasm_bindgen]
    pub fn preview_json(center_x: f32, center_y: f32) -> String {
        with_game(|g| {
            let preview = g.controller.preview();
            let top_left = preview.top_left(glam::Vec2::new(center_x, center_y));
            serde_json::json!({
                "phone": preview.phone.as_str(),
                "texture": preview.texture.as_str(),
                "view": preview.view.as_str(),
                "scale": preview.scale,
                "tileId": preview.tile_id,
                "tileAsset": preview.tile_asset(),
                "scaleControls": preview.scale_controls_visible(),
                "tileControls": preview.tile_controls_visible(),
                "topLeft": [top_left.x, top_left.y],
            })
            .to_string()
        })
        .unwrap_or_default()
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use elevator_drop::preview::Modifiers;
    use elevator_drop::sim::{DropController, DropEvent, FrameClock};
    use elevator_drop::{DropConfig, PhoneFormat, PreviewSettings, TextureFormat};

    env_logger::init();
    log::info!("Elevator Drop (native) starting...");

    let path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = DropConfig::load(path.as_deref());
    let mut controller = DropController::new(config).with_preview(PreviewSettings::load());
    let mut clock = FrameClock::new();

    // Simulated 60 Hz frames, capped at ten minutes of game time
    let frame_ms = 1000.0 / 60.0;
    let max_frames = 60 * 60 * 10;
    let mut now_ms = 0.0;
    let mut crashed_at = None;

    for _ in 0..max_frames {
        controller.tick(clock.advance(now_ms));
        now_ms += frame_ms;

        let mut reset = false;
        for event in controller.drain_events() {
            match event {
                DropEvent::Crashed { stake_index } => crashed_at = Some(stake_index),
                DropEvent::SessionReset => reset = true,
                other => log::debug!("{:?}", other),
            }
        }
        if reset {
            break;
        }
    }

    match crashed_at {
        Some(drops) => println!(
            "Session crashed after {} drops ({:.1}s simulated)",
            drops,
            now_ms / 1000.0
        ),
        None => println!("No crash within {:.1}s", now_ms / 1000.0),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
