// Shared library code for both desktop and web versions

pub mod board;
pub mod expansion;
pub mod grid;
pub mod lazy;
pub mod motion;
pub mod nav;
pub mod render;
pub mod scene;
pub mod strategy;
pub mod tween;
pub mod virtualizer;

#[cfg(target_arch = "wasm32")]
pub mod web;

use expansion::ExpansionConfig;
use grid::GridLayout;
use motion::MotionConfig;
use virtualizer::VirtualizerConfig;

/// Global constants that can be tuned
pub mod constants {
    /// Default window dimensions
    pub const DEFAULT_WIDTH: u32 = 1280;
    pub const DEFAULT_HEIGHT: u32 = 960;

    /// Tile size and spacing in pixels
    pub const DEFAULT_TILE_WIDTH: f32 = 120.0;
    pub const DEFAULT_TILE_HEIGHT: f32 = 160.0;
    pub const DEFAULT_GAP: f32 = 150.0;

    /// Row stride of the image assignment
    pub const DEFAULT_COLUMNS: i32 = 4;

    /// Number of distinct images, named 1.jpg ..= N.jpg
    pub const DEFAULT_ITEM_COUNT: u32 = 20;
    pub const DEFAULT_IMAGE_DIR: &str = "public";

    /// Margin around the viewport inside which images start loading
    pub const DEFAULT_LAZY_MARGIN: f32 = 150.0;

    pub const HOVER_SCALE: f32 = 1.2;

    /// Entrance start state: pushed down and enlarged
    pub const ENTRANCE_LIFT: f32 = 64.0;
    pub const ENTRANCE_SCALE: f32 = 1.5;

    /// Image zoom at the start of its fade-in
    pub const IMAGE_ZOOM: f32 = 1.1;

    /// Navigation label revealed at startup
    pub const DEFAULT_NAV_LABEL: &str = "Infinigrid";

    /// Window size limits (desktop only)
    pub const MIN_WINDOW_SIZE: u32 = 320;
    pub const MAX_WINDOW_SIZE: u32 = 8192;
}

/// Errors surfaced to the binary and to JavaScript
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration validation failed:\n• {}", .0.join("\n• "))]
    InvalidConfig(Vec<String>),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Gallery configuration.
/// This is a plain struct without CLI dependencies, usable from both desktop and web
#[derive(Debug, Clone)]
pub struct Config {
    /// Window width in pixels
    pub width: u32,

    /// Window height in pixels
    pub height: u32,

    /// Start in fullscreen mode
    pub fullscreen: bool,

    /// Use the animated choreography when the host allows it
    pub animations: bool,

    pub layout: GridLayout,
    pub motion: MotionConfig,
    pub virtualizer: VirtualizerConfig,
    pub expansion: ExpansionConfig,

    /// Margin around the viewport, in pixels, inside which images load
    pub lazy_margin: f32,

    /// Navigation label; empty for none
    pub nav_label: String,
}

impl Config {
    /// Validate all configuration parameters
    /// Returns Ok(()) if valid, or Err with a list of validation errors
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Window width/height validation: only for desktop
        // On web, canvas size is determined by the browser
        #[cfg(not(target_arch = "wasm32"))]
        {
            use constants::{MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};
            for (name, value) in [("width", self.width), ("height", self.height)] {
                if value < MIN_WINDOW_SIZE {
                    errors.push(format!("{} must be at least {} (got {})", name, MIN_WINDOW_SIZE, value));
                }
                if value > MAX_WINDOW_SIZE {
                    errors.push(format!("{} must be at most {} (got {})", name, MAX_WINDOW_SIZE, value));
                }
            }
        }

        let layout = &self.layout;
        if !(layout.tile_width > 0.0) {
            errors.push(format!("tile_width must be positive (got {})", layout.tile_width));
        }
        if !(layout.tile_height > 0.0) {
            errors.push(format!("tile_height must be positive (got {})", layout.tile_height));
        }
        if !(layout.gap >= 0.0) {
            errors.push(format!("gap cannot be negative (got {})", layout.gap));
        }
        if layout.columns < 1 {
            errors.push(format!("columns must be at least 1 (got {})", layout.columns));
        }
        if layout.item_count == 0 {
            errors.push("item_count must be at least 1".to_string());
        }

        let motion = &self.motion;
        if !(motion.ease_factor > 0.0 && motion.ease_factor <= 1.0) {
            errors.push(format!("ease_factor must be in (0, 1] (got {})", motion.ease_factor));
        }
        if !(motion.pan_ease > 0.0 && motion.pan_ease <= 1.0) {
            errors.push(format!("pan_ease must be in (0, 1] (got {})", motion.pan_ease));
        }
        if !(motion.min_drag_interval_ms > 0.0) {
            errors.push(format!(
                "min_drag_interval_ms must be positive (got {})",
                motion.min_drag_interval_ms
            ));
        }

        let virtualizer = &self.virtualizer;
        let non_negative = [
            ("scroll_speed", motion.scroll_speed),
            ("momentum_factor", motion.momentum_factor),
            ("momentum_threshold", motion.momentum_threshold),
            ("pan_strength", motion.pan_strength),
            ("pan_range", motion.pan_range),
            ("drag_threshold", motion.drag_threshold),
            ("unfreeze_threshold", motion.unfreeze_threshold),
            ("buffer_factor", virtualizer.buffer_factor),
            ("directional_buffer", virtualizer.directional_buffer),
            ("refresh_distance", virtualizer.refresh_distance),
            ("initial_buffer", virtualizer.initial_buffer),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                errors.push(format!("{} cannot be negative (got {})", name, value));
            }
        }
        for (name, value) in [
            ("pan_session_ms", motion.pan_session_ms),
            ("refresh_interval_ms", virtualizer.refresh_interval_ms),
        ] {
            if !(value >= 0.0) {
                errors.push(format!("{} cannot be negative (got {})", name, value));
            }
        }

        let fraction = self.expansion.height_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            errors.push(format!("height_fraction must be in (0, 1] (got {})", fraction));
        }

        if !(self.lazy_margin >= 0.0) {
            errors.push(format!("lazy_margin cannot be negative (got {})", self.lazy_margin));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: constants::DEFAULT_WIDTH,
            height: constants::DEFAULT_HEIGHT,
            fullscreen: false,
            animations: true,
            layout: GridLayout::default(),
            motion: MotionConfig::default(),
            virtualizer: VirtualizerConfig::default(),
            expansion: ExpansionConfig::default(),
            lazy_margin: constants::DEFAULT_LAZY_MARGIN,
            nav_label: constants::DEFAULT_NAV_LABEL.to_string(),
        }
    }
}
