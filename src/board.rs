// CPU-side visual state of materialized tiles, drawn by the renderer as sprites

use std::collections::HashMap;

use glam::Vec2;

use crate::constants::{ENTRANCE_LIFT, ENTRANCE_SCALE, HOVER_SCALE, IMAGE_ZOOM};
use crate::grid::{CellAddress, Rect};
use crate::tween::{Timing, Tween};
use crate::virtualizer::{TilePresenter, TileSpec};

/// Handle of a tile on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(u64);

/// Lifecycle of a materialized tile; released tiles simply disappear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Entrance running or image not yet requested
    Pending,
    Visible,
    Hovered,
    /// Hidden while its content is shown by the expansion
    Expanded,
}

#[derive(Debug, Clone, Copy)]
struct Entrance {
    opacity: Tween,
    lift: Tween,
    scale: Tween,
}

impl Entrance {
    fn is_done(&self, now_ms: f64) -> bool {
        self.opacity.is_done(now_ms) && self.lift.is_done(now_ms) && self.scale.is_done(now_ms)
    }
}

#[derive(Debug, Clone, Copy)]
enum Image {
    Unloaded,
    Loaded { fade: Tween, zoom: Tween },
}

#[derive(Debug, Clone)]
struct TileVisual {
    address: CellAddress,
    origin: Vec2,
    width: f32,
    height: f32,
    image_index: u32,
    entrance: Option<Entrance>,
    hover: Tween,
    hovered: bool,
    backdrop: Tween,
    image: Image,
    hidden: bool,
}

impl TileVisual {
    fn state(&self, now_ms: f64) -> TileState {
        if self.hidden {
            TileState::Expanded
        } else if self.entrance.is_some_and(|e| !e.is_done(now_ms))
            || matches!(self.image, Image::Unloaded)
        {
            TileState::Pending
        } else if self.hovered {
            TileState::Hovered
        } else {
            TileState::Visible
        }
    }
}

/// One quad to draw, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub rect: Rect,
    pub color: [f32; 4],
}

const PLACEHOLDER: [f32; 3] = [0.09, 0.09, 0.1];

/// Procedural stand-in for image content: a muted tone per image index
pub fn image_color(image_index: u32) -> [f32; 3] {
    let step = ((image_index.wrapping_mul(7)) % 20) as f32 / 19.0;
    let tone = 0.22 + 0.6 * step;
    [tone, tone * 0.97, tone * 0.92]
}

/// Tile presenter backed by plain data; the renderer turns it into sprites
#[derive(Debug, Default)]
pub struct TileBoard {
    next_id: u64,
    tiles: HashMap<TileId, TileVisual>,
}

impl TileBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn state(&self, id: TileId, now_ms: f64) -> Option<TileState> {
        self.tiles.get(&id).map(|tile| tile.state(now_ms))
    }

    /// Sprites for every visible tile in row-major order.
    /// `screen_origin` is where world (0, 0) sits on screen.
    pub fn sprites(&self, screen_origin: Vec2, now_ms: f64) -> Vec<Sprite> {
        let mut tiles: Vec<&TileVisual> = self
            .tiles
            .values()
            .filter(|tile| tile.state(now_ms) != TileState::Expanded)
            .collect();
        tiles.sort_by_key(|tile| tile.address);

        let mut sprites = Vec::with_capacity(tiles.len() * 2);
        for tile in tiles {
            let (mut opacity, mut scale, mut lift) = (1.0, 1.0, 0.0);
            if let Some(entrance) = tile.entrance {
                opacity = entrance.opacity.sample(now_ms);
                scale = entrance.scale.sample(now_ms);
                lift = entrance.lift.sample(now_ms);
            }
            scale *= tile.hover.sample(now_ms);
            opacity *= tile.backdrop.sample(now_ms);
            if opacity <= 0.0 {
                continue;
            }

            let rect = Rect::new(
                tile.origin.x + screen_origin.x,
                tile.origin.y + screen_origin.y + lift,
                tile.width,
                tile.height,
            )
            .scale_about_center(scale);

            let [r, g, b] = PLACEHOLDER;
            sprites.push(Sprite { rect, color: [r, g, b, opacity] });

            if let Image::Loaded { fade, zoom } = tile.image {
                let [r, g, b] = image_color(tile.image_index);
                sprites.push(Sprite {
                    rect: rect.scale_about_center(zoom.sample(now_ms)),
                    color: [r, g, b, opacity * fade.sample(now_ms)],
                });
            }
        }
        sprites
    }
}

impl TilePresenter for TileBoard {
    type Handle = TileId;

    fn materialize(&mut self, tile: TileSpec, now_ms: f64) -> TileId {
        self.next_id += 1;
        let id = TileId(self.next_id);
        let entrance = tile.entrance.map(|timing| Entrance {
            opacity: timing.tween(0.0, 1.0, now_ms),
            lift: timing.tween(ENTRANCE_LIFT, 0.0, now_ms),
            scale: timing.tween(ENTRANCE_SCALE, 1.0, now_ms),
        });
        self.tiles.insert(
            id,
            TileVisual {
                address: tile.address,
                origin: tile.origin,
                width: tile.width,
                height: tile.height,
                image_index: tile.image_index,
                entrance,
                hover: Tween::settled(1.0),
                hovered: false,
                backdrop: Tween::settled(1.0),
                image: Image::Unloaded,
                hidden: false,
            },
        );
        id
    }

    fn release(&mut self, handle: TileId) {
        if let Some(tile) = self.tiles.remove(&handle) {
            log::trace!("Released tile {} (image {})", tile.address, tile.image_index);
        }
    }

    fn load_image(&mut self, handle: &TileId, timing: Timing, now_ms: f64) -> bool {
        let Some(tile) = self.tiles.get_mut(handle) else {
            return false;
        };
        if matches!(tile.image, Image::Loaded { .. }) {
            return false;
        }
        tile.image = Image::Loaded {
            fade: timing.tween(0.0, 1.0, now_ms),
            zoom: timing.tween(IMAGE_ZOOM, 1.0, now_ms),
        };
        true
    }

    fn set_hovered(&mut self, handle: &TileId, hovered: bool, timing: Timing, now_ms: f64) {
        if let Some(tile) = self.tiles.get_mut(handle) {
            tile.hovered = hovered;
            let scale = if hovered { HOVER_SCALE } else { 1.0 };
            tile.hover.retarget(now_ms, scale, &timing);
        }
    }

    fn set_dimmed(&mut self, handle: &TileId, dimmed: bool, timing: Timing, now_ms: f64) {
        if let Some(tile) = self.tiles.get_mut(handle) {
            tile.backdrop.retarget(now_ms, if dimmed { 0.0 } else { 1.0 }, &timing);
        }
    }

    fn set_hidden(&mut self, handle: &TileId, hidden: bool) {
        if let Some(tile) = self.tiles.get_mut(handle) {
            tile.hidden = hidden;
        }
    }

    fn hover_scale(&self, handle: &TileId, now_ms: f64) -> f32 {
        self.tiles
            .get(handle)
            .map_or(1.0, |tile| tile.hover.sample(now_ms))
    }

    fn take_settled(&mut self, now_ms: f64) -> bool {
        let mut settled = false;
        for tile in self.tiles.values_mut() {
            if tile.entrance.is_some_and(|entrance| entrance.is_done(now_ms)) {
                tile.entrance = None;
                settled = true;
            }
        }
        settled
    }
}
