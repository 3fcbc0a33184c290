//! Click-to-expand flow.
//!
//! Stages advance only when the previous stage has completed:
//!
//! ```text
//! Idle -> Opening -> Open -> TitleExit -> Returning -> Idle
//! ```
//!
//! The scene reacts to the three [`ExpansionEvent`]s: it locks motion and
//! pins the tile on `Started`, restores the backdrop on `ReturnStarted` and
//! unlocks everything on `Ended`.

use glam::Vec2;

use crate::grid::{parse_image_index, CellAddress, Rect};
use crate::strategy::{Choreography, Transition};
use crate::tween::{Timing, Tween};

/// Titles cycled through by image index
pub const TITLES: [&str; 20] = [
    "Silent Shadows",
    "Lonely Light",
    "Quiet Void",
    "Fading Contrast",
    "Empty Horizon",
    "Monochrome Silence",
    "Dark Whisper",
    "Pale Echo",
    "Stark Solitude",
    "Bleak Reflection",
    "Isolated Shade",
    "Muted Dusk",
    "Grey Emptiness",
    "Cold Absence",
    "Bare Twilight",
    "Still Dusk",
    "Vacant Gloom",
    "Quiet Eclipse",
    "Dim Silence",
    "Hollow Night",
];

pub fn title_for(image_index: u32) -> &'static str {
    TITLES[(image_index.max(1) - 1) as usize % TITLES.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionConfig {
    /// Expanded height as a fraction of the viewport height
    pub height_fraction: f32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self { height_fraction: 0.85 }
    }
}

/// What the scene hands over when a tile is activated
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub address: CellAddress,
    /// Unscaled tile rect on screen
    pub screen_rect: Rect,
    /// Hover scale at the moment of the click
    pub scale: f32,
    pub image_source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Opening,
    Open,
    TitleExit,
    Returning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionEvent {
    Started(CellAddress),
    ReturnStarted(CellAddress),
    Ended(CellAddress),
}

#[derive(Debug, Clone, Copy)]
struct Flight {
    from: Rect,
    to: Rect,
    progress: Tween,
}

impl Flight {
    fn new(from: Rect, to: Rect, timing: Timing, now_ms: f64) -> Self {
        Self {
            from,
            to,
            progress: timing.tween(0.0, 1.0, now_ms),
        }
    }

    fn rect(&self, now_ms: f64) -> Rect {
        if self.is_done(now_ms) {
            return self.to;
        }
        self.from.lerp(&self.to, self.progress.sample(now_ms))
    }

    fn is_done(&self, now_ms: f64) -> bool {
        self.progress.is_done(now_ms)
    }

    /// Steer toward a new destination, arriving when the current flight would have
    fn redirect(&mut self, to: Rect, now_ms: f64) {
        let from = self.rect(now_ms);
        let timing = Timing::new(self.progress.remaining_ms(now_ms), self.progress.easing());
        *self = Flight::new(from, to, timing, now_ms);
    }
}

/// Word-by-word title reveal. Offsets are in line heights: 1 below, 0 in place, -1 above.
#[derive(Debug, Clone)]
pub struct TitleReveal {
    words: Vec<String>,
    offsets: Vec<Tween>,
}

impl TitleReveal {
    fn new(title: &str) -> Self {
        let words: Vec<String> = title.split_whitespace().map(str::to_string).collect();
        let offsets = vec![Tween::settled(1.0); words.len()];
        Self { words, offsets }
    }

    fn animate_to(&mut self, offset: f32, timing: Timing, now_ms: f64) {
        for (index, tween) in self.offsets.iter_mut().enumerate() {
            tween.retarget(now_ms, offset, &timing.nth(index));
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn offsets(&self, now_ms: f64) -> Vec<f32> {
        self.offsets.iter().map(|tween| tween.sample(now_ms)).collect()
    }

    pub fn is_done(&self, now_ms: f64) -> bool {
        self.offsets.iter().all(|tween| tween.is_done(now_ms))
    }
}

#[derive(Debug, Clone)]
struct Active {
    address: CellAddress,
    image_index: u32,
    /// Where the tile returns to on collapse
    home: Rect,
    flight: Flight,
    title: TitleReveal,
}

#[derive(Debug, Clone)]
pub struct Expansion {
    config: ExpansionConfig,
    stage: Stage,
    active: Option<Active>,
}

impl Expansion {
    pub fn new(config: ExpansionConfig) -> Self {
        Self {
            config,
            stage: Stage::Idle,
            active: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn address(&self) -> Option<CellAddress> {
        self.active.as_ref().map(|active| active.address)
    }

    pub fn image_index(&self) -> Option<u32> {
        self.active.as_ref().map(|active| active.image_index)
    }

    pub fn title(&self) -> Option<&'static str> {
        self.image_index().map(title_for)
    }

    pub fn title_reveal(&self) -> Option<&TitleReveal> {
        self.active.as_ref().map(|active| &active.title)
    }

    /// Current on-screen rect of the flying tile
    pub fn current_rect(&self, now_ms: f64) -> Option<Rect> {
        self.active.as_ref().map(|active| active.flight.rect(now_ms))
    }

    /// Centered rect the tile grows into, keeping the tile aspect ratio
    pub fn target_rect(&self, viewport: Vec2, aspect: f32) -> Rect {
        let height = viewport.y * self.config.height_fraction;
        Rect::centered(viewport * 0.5, height * aspect, height)
    }

    /// Start expanding a tile. Ignored unless idle.
    pub fn open(
        &mut self,
        request: OpenRequest,
        viewport: Vec2,
        choreography: &dyn Choreography,
        now_ms: f64,
    ) -> Option<ExpansionEvent> {
        if self.stage != Stage::Idle {
            return None;
        }

        let image_index = parse_image_index(&request.image_source);
        let home = request.screen_rect;
        let aspect = home.width / home.height;
        let from = home.scale_about_center(request.scale);
        let to = self.target_rect(viewport, aspect);

        let mut title = TitleReveal::new(title_for(image_index));
        title.animate_to(0.0, choreography.timing(Transition::TitleIn), now_ms);

        log::info!(
            "Expanding {} \"{}\" (image {})",
            request.address,
            title_for(image_index),
            image_index
        );

        self.active = Some(Active {
            address: request.address,
            image_index,
            home,
            flight: Flight::new(from, to, choreography.timing(Transition::Flight), now_ms),
            title,
        });
        self.stage = Stage::Opening;
        Some(ExpansionEvent::Started(request.address))
    }

    /// Begin collapsing. Accepted while opening or open.
    pub fn close(&mut self, choreography: &dyn Choreography, now_ms: f64) -> bool {
        if !matches!(self.stage, Stage::Opening | Stage::Open) {
            return false;
        }
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active
            .title
            .animate_to(-1.0, choreography.timing(Transition::TitleOut), now_ms);
        self.stage = Stage::TitleExit;
        log::debug!("Collapsing {}", active.address);
        true
    }

    /// Viewport changed: refit the expanded rect and move the return slot
    pub fn resize(
        &mut self,
        viewport: Vec2,
        home: Rect,
        choreography: &dyn Choreography,
        now_ms: f64,
    ) {
        let target = self.target_rect(viewport, home.width / home.height);
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.home = home;
        match self.stage {
            Stage::Idle => {}
            Stage::Opening | Stage::Open | Stage::TitleExit => {
                let from = active.flight.rect(now_ms);
                active.flight = Flight::new(from, target, choreography.timing(Transition::Refit), now_ms);
            }
            Stage::Returning => active.flight.redirect(home, now_ms),
        }
    }

    /// Advance to the next stage when the current one has completed
    pub fn tick(&mut self, choreography: &dyn Choreography, now_ms: f64) -> Option<ExpansionEvent> {
        let active = self.active.as_mut()?;
        match self.stage {
            Stage::Idle | Stage::Open => None,
            Stage::Opening => {
                if active.flight.is_done(now_ms) {
                    self.stage = Stage::Open;
                }
                None
            }
            Stage::TitleExit => {
                if !active.title.is_done(now_ms) {
                    return None;
                }
                let from = active.flight.rect(now_ms);
                active.flight = Flight::new(
                    from,
                    active.home,
                    choreography.timing(Transition::Flight),
                    now_ms,
                );
                self.stage = Stage::Returning;
                Some(ExpansionEvent::ReturnStarted(active.address))
            }
            Stage::Returning => {
                if !active.flight.is_done(now_ms) {
                    return None;
                }
                let address = active.address;
                self.active = None;
                self.stage = Stage::Idle;
                Some(ExpansionEvent::Ended(address))
            }
        }
    }
}
