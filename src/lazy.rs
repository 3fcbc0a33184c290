use glam::Vec2;

use crate::grid::Rect;
use crate::virtualizer::{TilePresenter, Virtualizer};
use crate::tween::Timing;

/// Starts image loads for tiles near the visible viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LazyLoader {
    /// Margin around the viewport, in pixels, inside which images load
    pub margin: f32,
}

impl Default for LazyLoader {
    fn default() -> Self {
        Self {
            margin: crate::constants::DEFAULT_LAZY_MARGIN,
        }
    }
}

impl LazyLoader {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    pub fn in_range(&self, screen_rect: &Rect, viewport: Vec2) -> bool {
        let area = Rect::new(0.0, 0.0, viewport.x, viewport.y).inflate(self.margin);
        screen_rect.intersects(&area)
    }

    /// Request images of every materialized tile in range.
    /// `screen_origin` is where world (0, 0) currently sits on screen.
    /// Returns how many loads were started.
    pub fn scan<H, P>(
        &self,
        virtualizer: &Virtualizer<H>,
        presenter: &mut P,
        screen_origin: Vec2,
        viewport: Vec2,
        timing: Timing,
        now_ms: f64,
    ) -> usize
    where
        P: TilePresenter<Handle = H>,
    {
        let layout = virtualizer.layout();
        let mut started = 0;
        for (address, handle) in virtualizer.iter() {
            let rect = layout.tile_rect(address).translate(screen_origin);
            if self.in_range(&rect, viewport) && presenter.load_image(handle, timing, now_ms) {
                started += 1;
            }
        }
        if started > 0 {
            log::trace!("Lazy loader started {} image loads", started);
        }
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellAddress, GridLayout};
    use crate::motion::Camera;
    use crate::strategy::Immediate;
    use crate::virtualizer::testing::RecordingPresenter;
    use crate::virtualizer::VirtualizerConfig;

    #[test]
    fn margin_extends_the_viewport() {
        let loader = LazyLoader::new(150.0);
        let viewport = Vec2::new(800.0, 600.0);
        assert!(loader.in_range(&Rect::new(900.0, 10.0, 50.0, 50.0), viewport));
        assert!(!loader.in_range(&Rect::new(950.0, 10.0, 50.0, 50.0), viewport));
        assert!(loader.in_range(&Rect::new(-190.0, -190.0, 50.0, 50.0), viewport));
        assert!(!loader.in_range(&Rect::new(-200.0, 0.0, 50.0, 50.0), viewport));
    }

    #[test]
    fn scan_loads_only_nearby_tiles_once() {
        let layout = GridLayout {
            tile_width: 100.0,
            tile_height: 100.0,
            gap: 100.0,
            ..GridLayout::default()
        };
        let mut virtualizer = Virtualizer::new(VirtualizerConfig::default(), layout);
        let mut presenter = RecordingPresenter::default();
        let viewport = Vec2::new(400.0, 400.0);
        virtualizer.refresh(&Camera::default(), viewport, &mut presenter, &Immediate, 0.0);

        let loader = LazyLoader::new(0.0);
        let started = loader.scan(&virtualizer, &mut presenter, Vec2::ZERO, viewport, Timing::IMMEDIATE, 0.0);
        // Screen [0, 400): tiles at 0 and 200 on each axis
        assert_eq!(started, 4);
        assert!(presenter.is_loaded(CellAddress::new(1, 1)));
        assert!(!presenter.is_loaded(CellAddress::new(-1, 0)));

        let again = loader.scan(&virtualizer, &mut presenter, Vec2::ZERO, viewport, Timing::IMMEDIATE, 5.0);
        assert_eq!(again, 0);
    }
}
