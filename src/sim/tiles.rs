//! Tile map guides and the double-buffered scroll sequencer
//!
//! Two pages alternate: while the active page scrolls out, the staged page
//! (already built off-screen) scrolls in beneath it. After each section the
//! pages swap by index and the now-hidden page is rebuilt for the next one.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::ScrollMode;

/// Index into the texture list of the current texture format
pub type TileId = u8;

/// Background shaft tiles (`backgroundBackTile_1..3`)
pub const BACK_TILES: [TileId; 3] = [0, 1, 2];
/// First of the eight level tiles (`level1..level8`)
pub const LEVEL_TILE_BASE: TileId = 4;
pub const LEVEL_TILE_COUNT: u32 = 8;
/// Transparent tile appended after the format's own textures
pub const EMPTY_TILE: TileId = 12;

/// Rows of open sky above the surface in the begin layout
pub const SURFACE_ROW: usize = 4;
/// Columns of the elevator shaft
pub const SHAFT_COLS: std::ops::RangeInclusive<usize> = 1..=3;

/// Level tile variant shown for a depth layer
pub fn level_tile(layer: u32) -> TileId {
    LEVEL_TILE_BASE + (layer % LEVEL_TILE_COUNT) as TileId
}

fn back_tile(row: usize) -> TileId {
    BACK_TILES[row % BACK_TILES.len()]
}

/// Named tile layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapGuide {
    /// Surface with the shaft entrance
    Begin,
    /// Shaft through solid ground
    Drop,
    /// Shaft ending at a landing
    DropStop,
}

impl MapGuide {
    /// Build a `rows x cols` grid, row-major
    pub fn build(&self, rows: usize, cols: usize, layer: u32) -> Vec<TileId> {
        let ground = level_tile(layer);
        let landing_row = rows / 2;
        let mut tiles = Vec::with_capacity(rows * cols);

        for r in 0..rows {
            for c in 0..cols {
                let in_shaft = SHAFT_COLS.contains(&c);
                let tile = match self {
                    MapGuide::Begin if r < SURFACE_ROW => EMPTY_TILE,
                    MapGuide::Begin | MapGuide::Drop if in_shaft => back_tile(r),
                    MapGuide::Begin | MapGuide::Drop => ground,
                    MapGuide::DropStop => {
                        let shaft_open = in_shaft && r <= landing_row;
                        // Corridor leading off the landing
                        let corridor = c > *SHAFT_COLS.end()
                            && r + 3 > landing_row
                            && r <= landing_row;
                        if shaft_open || corridor {
                            back_tile(r)
                        } else {
                            ground
                        }
                    }
                };
                tiles.push(tile);
            }
        }

        tiles
    }
}

/// One buffer of tiles plus its on-screen offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePage {
    pub guide: MapGuide,
    pub layer: u32,
    pub rows: usize,
    pub cols: usize,
    pub tiles: Vec<TileId>,
    pub offset: Vec2,
}

impl TilePage {
    pub fn new(guide: MapGuide, rows: usize, cols: usize, layer: u32) -> Self {
        Self {
            guide,
            layer,
            rows,
            cols,
            tiles: guide.build(rows, cols, layer),
            offset: Vec2::ZERO,
        }
    }

    /// Refill in place from a (possibly different) guide
    pub fn rebuild(&mut self, guide: MapGuide, layer: u32) {
        self.guide = guide;
        self.layer = layer;
        self.tiles = guide.build(self.rows, self.cols, layer);
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<TileId> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.tiles.get(row * self.cols + col).copied()
    }
}

/// Timed linear interpolation between two points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    pub from: Vec2,
    pub to: Vec2,
    pub duration_ms: f32,
    pub elapsed_ms: f32,
}

impl Tween {
    pub fn new(from: Vec2, to: Vec2, duration_ms: f32) -> Self {
        Self {
            from,
            to,
            duration_ms,
            elapsed_ms: 0.0,
        }
    }

    /// Advance and return true once finished
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.duration_ms);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    pub fn remaining_ms(&self) -> f32 {
        (self.duration_ms - self.elapsed_ms).max(0.0)
    }

    /// Progress in `[0, 1]`
    pub fn t(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        }
    }

    pub fn value(&self) -> Vec2 {
        self.from.lerp(self.to, self.t())
    }
}

/// Section-by-section scroll over two alternating pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileScroller {
    rows: usize,
    cols: usize,
    /// Pixel size of one tile (texture size times scale)
    tile_extent: f32,
    pages: [TilePage; 2],
    active: usize,
    sections_left: u32,
    section_ms: f32,
    layer: u32,
    tween: Option<Tween>,
}

impl TileScroller {
    pub fn new(rows: usize, cols: usize, tile_extent: f32, layer: u32) -> Self {
        Self {
            rows,
            cols,
            tile_extent,
            pages: [
                TilePage::new(MapGuide::Begin, rows, cols, layer),
                TilePage::new(MapGuide::Drop, rows, cols, layer),
            ],
            active: 0,
            sections_left: 0,
            section_ms: 0.0,
            layer,
            tween: None,
        }
    }

    /// Back to the surface layout with nothing scrolling
    pub fn reset(&mut self, layer: u32) {
        *self = Self::new(self.rows, self.cols, self.tile_extent, layer);
    }

    /// Recreate both pages for a new tile size, keeping their guides
    pub fn set_tile_extent(&mut self, tile_extent: f32) {
        self.tile_extent = tile_extent;
        let layer = self.layer;
        for page in &mut self.pages {
            let guide = page.guide;
            *page = TilePage::new(guide, self.rows, self.cols, layer);
        }

        // A running section keeps its progress but targets the new height
        let height = self.page_height();
        let y = match self.tween.as_mut() {
            Some(tween) => {
                tween.to = Vec2::new(0.0, -height);
                tween.value().y
            }
            None => 0.0,
        };
        self.place_pages(y);
    }

    pub fn tile_extent(&self) -> f32 {
        self.tile_extent
    }

    pub fn page_height(&self) -> f32 {
        self.rows as f32 * self.tile_extent
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_page(&self) -> &TilePage {
        &self.pages[self.active]
    }

    pub fn staged_page(&self) -> &TilePage {
        &self.pages[1 - self.active]
    }

    pub fn sections_left(&self) -> u32 {
        self.sections_left
    }

    pub fn is_scrolling(&self) -> bool {
        self.tween.is_some()
    }

    /// Time until the running section finishes
    pub fn remaining_ms(&self) -> f32 {
        self.tween.as_ref().map_or(0.0, Tween::remaining_ms)
    }

    /// Begin a drop's scroll
    pub fn start(&mut self, mode: ScrollMode, section_ms: f32, continuous_ms: f32, layer: u32) {
        self.layer = layer;
        match mode {
            ScrollMode::Sectioned { sections } => {
                self.sections_left = sections;
                self.section_ms = section_ms;
            }
            ScrollMode::Continuous => {
                self.sections_left = 0;
                self.section_ms = continuous_ms;
            }
        }
        self.begin_section();
    }

    /// Advance the running section; true when it just finished
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        let Some(tween) = self.tween.as_mut() else {
            return false;
        };
        let finished = tween.advance(dt_ms);
        let y = tween.value().y;
        self.place_pages(y);
        finished
    }

    /// Swap pages after a section; returns true if another section started
    pub fn complete_section(&mut self) -> bool {
        if self.tween.take().is_none() {
            return false;
        }

        self.active = 1 - self.active;
        self.place_pages(0.0);
        self.sections_left = self.sections_left.saturating_sub(1);

        if self.sections_left > 0 {
            self.begin_section();
            true
        } else {
            false
        }
    }

    fn begin_section(&mut self) {
        // Only the last (or only) section lands on a stop layout
        let guide = if self.sections_left > 1 {
            MapGuide::Drop
        } else {
            MapGuide::DropStop
        };
        let layer = self.layer;
        self.pages[1 - self.active].rebuild(guide, layer);
        self.place_pages(0.0);
        self.tween = Some(Tween::new(
            Vec2::ZERO,
            Vec2::new(0.0, -self.page_height()),
            self.section_ms,
        ));
    }

    fn place_pages(&mut self, active_y: f32) {
        let height = self.page_height();
        self.pages[self.active].offset = Vec2::new(0.0, active_y);
        self.pages[1 - self.active].offset = Vec2::new(0.0, active_y + height);
    }
}
