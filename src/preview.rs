//! Layout preview settings
//!
//! Cycles device formats, texture sets, tile scale and tile id so a layout can
//! be checked on every target phone. Scale and tile id are remembered per
//! phone/texture pair and persisted separately from game state in LocalStorage.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Target device screen formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhoneFormat {
    #[default]
    IPhoneSE,
    IPhoneXR,
    IPhone12Pro,
    IPhone14ProMax,
    Pixel7,
    SamsungGalaxyS8Plus,
    SamsungGalaxyS20Ultra,
}

impl PhoneFormat {
    pub const ALL: [PhoneFormat; 7] = [
        PhoneFormat::IPhoneSE,
        PhoneFormat::IPhoneXR,
        PhoneFormat::IPhone12Pro,
        PhoneFormat::IPhone14ProMax,
        PhoneFormat::Pixel7,
        PhoneFormat::SamsungGalaxyS8Plus,
        PhoneFormat::SamsungGalaxyS20Ultra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneFormat::IPhoneSE => "iPhone SE",
            PhoneFormat::IPhoneXR => "iPhone XR",
            PhoneFormat::IPhone12Pro => "iPhone 12 Pro",
            PhoneFormat::IPhone14ProMax => "iPhone 14 Pro Max",
            PhoneFormat::Pixel7 => "Pixel 7",
            PhoneFormat::SamsungGalaxyS8Plus => "Samsung Galaxy S8+",
            PhoneFormat::SamsungGalaxyS20Ultra => "Samsung Galaxy S20 Ultra",
        }
    }

    /// Logical screen size in CSS pixels
    pub fn dimensions(&self) -> Vec2 {
        let (w, h) = match self {
            PhoneFormat::IPhoneSE => (375.0, 667.0),
            PhoneFormat::IPhoneXR => (414.0, 896.0),
            PhoneFormat::IPhone12Pro => (390.0, 844.0),
            PhoneFormat::IPhone14ProMax => (430.0, 932.0),
            PhoneFormat::Pixel7 => (412.0, 915.0),
            PhoneFormat::SamsungGalaxyS8Plus => (360.0, 740.0),
            PhoneFormat::SamsungGalaxyS20Ultra => (412.0, 915.0),
        };
        Vec2::new(w, h)
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    /// Format at `index`, wrapping in both directions
    pub fn wrapped(index: isize) -> Self {
        Self::ALL[wrap_index(index, Self::ALL.len())]
    }
}

/// Texture sets the tiles can be drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    #[default]
    None,
    Default32,
    Scaled32To128,
}

const DEFAULT_32_PATHS: [&str; 12] = [
    "./assets/texture/32/backgroundBackTile_1.png",
    "./assets/texture/32/backgroundBackTile_2.png",
    "./assets/texture/32/backgroundBackTile_3.png",
    "./assets/texture/32/character.png",
    "./assets/texture/32/level1.png",
    "./assets/texture/32/level2.png",
    "./assets/texture/32/level3.png",
    "./assets/texture/32/level4.png",
    "./assets/texture/32/level5.png",
    "./assets/texture/32/level6.png",
    "./assets/texture/32/level7.png",
    "./assets/texture/32/level8.png",
];

const SCALED_32_TO_128_PATHS: [&str; 12] = [
    "./assets/texture/32s128/backgroundBackTile_1.png",
    "./assets/texture/32s128/backgroundBackTile_2.png",
    "./assets/texture/32s128/backgroundBackTile_3.png",
    "./assets/texture/32s128/character.png",
    "./assets/texture/32s128/level1.png",
    "./assets/texture/32s128/level2.png",
    "./assets/texture/32s128/level3.png",
    "./assets/texture/32s128/level4.png",
    "./assets/texture/32s128/level5.png",
    "./assets/texture/32s128/level6.png",
    "./assets/texture/32s128/level7.png",
    "./assets/texture/32s128/level8.png",
];

impl TextureFormat {
    pub const ALL: [TextureFormat; 3] = [
        TextureFormat::None,
        TextureFormat::Default32,
        TextureFormat::Scaled32To128,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureFormat::None => "None",
            TextureFormat::Default32 => "Default 32",
            TextureFormat::Scaled32To128 => "Scaled 32 to 128",
        }
    }

    /// Source texture size in pixels
    pub fn size_px(&self) -> f32 {
        match self {
            TextureFormat::None | TextureFormat::Default32 => 32.0,
            TextureFormat::Scaled32To128 => 128.0,
        }
    }

    /// Tile textures in tile-id order
    pub fn asset_paths(&self) -> &'static [&'static str] {
        match self {
            TextureFormat::None => &[],
            TextureFormat::Default32 => &DEFAULT_32_PATHS,
            TextureFormat::Scaled32To128 => &SCALED_32_TO_128_PATHS,
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn wrapped(index: isize) -> Self {
        Self::ALL[wrap_index(index, Self::ALL.len())]
    }
}

/// What the preview shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewType {
    /// Full playfield: tiles, elevator and characters
    #[default]
    Playfield,
    /// A single tile repeated over the whole screen
    Tiles,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Playfield => "Playfield",
            ViewType::Tiles => "Tiles",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ViewType::Playfield => ViewType::Tiles,
            ViewType::Tiles => ViewType::Playfield,
        }
    }
}

/// Held keyboard modifiers, they pick the scale step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

impl Modifiers {
    pub fn scale_increment(&self) -> f32 {
        match (self.shift, self.control) {
            (false, true) => 0.25,
            (true, false) => 0.5,
            (true, true) => 0.1,
            (false, false) => 1.0,
        }
    }
}

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 10.0;

/// Scale and tile id remembered for one phone/texture pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    pub scale: f32,
    pub tile_id: usize,
}

impl Default for SavedLayout {
    fn default() -> Self {
        Self {
            scale: 1.0,
            tile_id: 0,
        }
    }
}

const PHONE_COUNT: usize = PhoneFormat::ALL.len();
const TEXTURE_COUNT: usize = TextureFormat::ALL.len();

type SavedTable = [[SavedLayout; TEXTURE_COUNT]; PHONE_COUNT];

/// Preview selection plus the per-format memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSettings {
    pub phone: PhoneFormat,
    pub texture: TextureFormat,
    pub view: ViewType,
    pub scale: f32,
    pub tile_id: usize,
    saved: SavedTable,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            phone: PhoneFormat::default(),
            texture: TextureFormat::default(),
            view: ViewType::default(),
            scale: 1.0,
            tile_id: 0,
            saved: [[SavedLayout::default(); TEXTURE_COUNT]; PHONE_COUNT],
        }
    }
}

impl PreviewSettings {
    pub fn saved(&self, phone: PhoneFormat, texture: TextureFormat) -> SavedLayout {
        self.saved[phone.index()][texture.index()]
    }

    fn saved_mut(&mut self) -> &mut SavedLayout {
        &mut self.saved[self.phone.index()][self.texture.index()]
    }

    /// Select a phone format and restore its saved layout
    pub fn set_phone(&mut self, phone: PhoneFormat) -> bool {
        if self.phone == phone {
            return false;
        }
        self.phone = phone;
        self.restore_saved();
        true
    }

    /// Step through phone formats (wraps)
    pub fn cycle_phone(&mut self, step: isize) -> bool {
        let next = PhoneFormat::wrapped(self.phone.index() as isize + step);
        self.set_phone(next)
    }

    /// Select a texture format and restore its saved layout
    pub fn set_texture(&mut self, texture: TextureFormat) -> bool {
        if self.texture == texture {
            return false;
        }
        self.texture = texture;
        self.restore_saved();
        true
    }

    pub fn cycle_texture(&mut self, step: isize) -> bool {
        let next = TextureFormat::wrapped(self.texture.index() as isize + step);
        self.set_texture(next)
    }

    fn restore_saved(&mut self) {
        let saved = self.saved(self.phone, self.texture);
        self.change_scale(saved.scale);
        self.change_tile(saved.tile_id as isize);
    }

    /// Set scale (clamped) and remember it for the current pair
    pub fn change_scale(&mut self, scale: f32) -> bool {
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        if self.scale == scale {
            return false;
        }
        self.scale = scale;
        self.saved_mut().scale = scale;
        true
    }

    /// Nudge scale up or down by the modifier increment
    pub fn step_scale(&mut self, up: bool, modifiers: Modifiers) -> bool {
        let increment = modifiers.scale_increment();
        if up {
            self.change_scale(self.scale + increment)
        } else {
            self.change_scale(self.scale - increment)
        }
    }

    /// Set tile id, wrapping within the texture's asset list; remembered for
    /// every texture format of the current phone
    pub fn change_tile(&mut self, id: isize) -> bool {
        if self.tile_id as isize == id {
            return false;
        }
        let count = self.texture.asset_paths().len();
        if count == 0 {
            // No tile set to wrap against; the remembered ids stay as they are
            self.tile_id = id.max(0) as usize;
            return true;
        }
        self.tile_id = if id < 0 {
            count - 1
        } else if id as usize >= count {
            0
        } else {
            id as usize
        };

        let tile_id = self.tile_id;
        for layout in &mut self.saved[self.phone.index()] {
            layout.tile_id = tile_id;
        }
        true
    }

    pub fn set_view(&mut self, view: ViewType) -> bool {
        if self.view == view {
            return false;
        }
        self.view = view;
        true
    }

    pub fn toggle_view(&mut self) -> bool {
        self.set_view(self.view.toggled())
    }

    /// Scale and view controls only make sense with a texture set
    pub fn scale_controls_visible(&self) -> bool {
        self.texture != TextureFormat::None
    }

    pub fn tile_controls_visible(&self) -> bool {
        self.texture != TextureFormat::None && self.view == ViewType::Tiles
    }

    /// Current tile asset for the tile view
    pub fn tile_asset(&self) -> Option<&'static str> {
        self.texture.asset_paths().get(self.tile_id).copied()
    }

    /// On-screen size of one tile
    pub fn tile_extent(&self) -> f32 {
        self.texture.size_px() * self.scale
    }

    /// Top-left corner of the phone frame centred at `center`
    pub fn top_left(&self, center: Vec2) -> Vec2 {
        (center - self.phone.dimensions() * 0.5).abs()
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "elevator_drop_preview";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded preview settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default preview settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Preview settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

fn wrap_index(index: isize, len: usize) -> usize {
    index.rem_euclid(len as isize) as usize
}
