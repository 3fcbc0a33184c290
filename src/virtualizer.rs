use std::collections::HashMap;

use glam::Vec2;

use crate::grid::{CellAddress, CellRange, GridLayout};
use crate::motion::{Camera, Heading};
use crate::strategy::{Choreography, Transition};
use crate::tween::Timing;

/// Window sizing and refresh throttling
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualizerConfig {
    /// Extra viewport fraction preloaded around the visible area (1.5 = window is 2.5x the viewport)
    pub buffer_factor: f32,
    /// Pixels the window shifts toward the direction of travel
    pub directional_buffer: f32,
    /// Camera travel since the last refresh that forces a new one
    pub refresh_distance: f32,
    /// Maximum time between refreshes
    pub refresh_interval_ms: f64,
    /// Viewport multiple covered by the initial reveal
    pub initial_buffer: f32,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            buffer_factor: 1.5,
            directional_buffer: 200.0,
            refresh_distance: 80.0,
            refresh_interval_ms: 100.0,
            initial_buffer: 1.0,
        }
    }
}

/// Everything a presenter needs to materialize one tile
#[derive(Debug, Clone, PartialEq)]
pub struct TileSpec {
    pub address: CellAddress,
    /// Top-left corner in world pixels
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
    pub image_index: u32,
    pub image_source: String,
    /// Entrance animation, `None` to appear in place
    pub entrance: Option<Timing>,
}

/// Visual side of the grid: owns whatever a materialized tile is made of
pub trait TilePresenter {
    type Handle: std::fmt::Debug;

    fn materialize(&mut self, tile: TileSpec, now_ms: f64) -> Self::Handle;

    /// Detach the tile and drop its image
    fn release(&mut self, handle: Self::Handle);

    /// Begin loading the tile's image. Returns false when already requested.
    fn load_image(&mut self, handle: &Self::Handle, timing: Timing, now_ms: f64) -> bool;

    fn set_hovered(&mut self, handle: &Self::Handle, hovered: bool, timing: Timing, now_ms: f64);

    /// Fade a tile out of (or back into) the backdrop of an expansion
    fn set_dimmed(&mut self, handle: &Self::Handle, dimmed: bool, timing: Timing, now_ms: f64);

    /// Hide the tile whose content is shown by the expansion flight
    fn set_hidden(&mut self, handle: &Self::Handle, hidden: bool);

    /// Current hover scale of the tile (1.0 when resting)
    fn hover_scale(&self, handle: &Self::Handle, now_ms: f64) -> f32;

    /// True when entrance animations finished since the last call
    fn take_settled(&mut self, _now_ms: f64) -> bool {
        false
    }
}

/// Outcome of one recomputation, in the order the presenter saw it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub created: Vec<CellAddress>,
    pub released: Vec<CellAddress>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.released.is_empty()
    }
}

/// Buffered, direction-biased window in world pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldWindow {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Keeps exactly the tiles covering the buffered viewport materialized
#[derive(Debug)]
pub struct Virtualizer<H> {
    config: VirtualizerConfig,
    layout: GridLayout,
    tiles: HashMap<CellAddress, H>,
    pinned: Option<CellAddress>,
    last_refresh: Option<(Vec2, f64)>,
    entrance_enabled: bool,
}

impl<H> Virtualizer<H> {
    pub fn new(config: VirtualizerConfig, layout: GridLayout) -> Self {
        Self {
            config,
            layout,
            tiles: HashMap::new(),
            pinned: None,
            last_refresh: None,
            entrance_enabled: false,
        }
    }

    pub fn config(&self) -> &VirtualizerConfig {
        &self.config
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, address: CellAddress) -> bool {
        self.tiles.contains_key(&address)
    }

    pub fn handle(&self, address: CellAddress) -> Option<&H> {
        self.tiles.get(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &H)> {
        self.tiles.iter().map(|(address, handle)| (*address, handle))
    }

    /// Materialized addresses in row-major order
    pub fn addresses(&self) -> Vec<CellAddress> {
        let mut addresses: Vec<_> = self.tiles.keys().copied().collect();
        addresses.sort();
        addresses
    }

    pub fn pinned(&self) -> Option<CellAddress> {
        self.pinned
    }

    /// Exempt `address` from creation and release until [`Self::unpin`]
    pub fn pin(&mut self, address: CellAddress) {
        self.pinned = Some(address);
    }

    pub fn unpin(&mut self) {
        self.pinned = None;
    }

    /// Whether tiles created from now on get an entrance animation
    pub fn set_entrance_enabled(&mut self, enabled: bool) {
        self.entrance_enabled = enabled;
    }

    /// Force the next [`Self::needs_refresh`] to report true
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
    }

    pub fn window_edges(&self, camera: &Camera, viewport: Vec2) -> WorldWindow {
        let view_width = viewport.x * (1.0 + self.config.buffer_factor);
        let view_height = viewport.y * (1.0 + self.config.buffer_factor);

        // Moving toward +x reveals world content on the left, so the window leans left
        let lean = |heading: Heading| match heading {
            Heading::Positive => -self.config.directional_buffer,
            Heading::Negative => self.config.directional_buffer,
            Heading::Still => 0.0,
        };
        let shift_x = lean(camera.heading_x());
        let shift_y = lean(camera.heading_y());

        let center_x = -camera.current.x;
        let center_y = -camera.current.y;
        WorldWindow {
            left: center_x - view_width / 2.0 + shift_x,
            right: center_x + view_width / 2.0 + shift_x,
            top: center_y - view_height / 2.0 + shift_y,
            bottom: center_y + view_height / 2.0 + shift_y,
        }
    }

    /// Inclusive cell range that must be materialized for this camera
    pub fn window(&self, camera: &Camera, viewport: Vec2) -> CellRange {
        let edges = self.window_edges(camera, viewport);
        let pitch_x = self.layout.pitch_x();
        let pitch_y = self.layout.pitch_y();
        CellRange {
            min_col: (edges.left / pitch_x).floor() as i32,
            max_col: (edges.right / pitch_x).ceil() as i32,
            min_row: (edges.top / pitch_y).floor() as i32,
            max_row: (edges.bottom / pitch_y).ceil() as i32,
        }
    }

    /// Symmetric range around the origin used for the initial reveal
    pub fn initial_window(&self, viewport: Vec2) -> CellRange {
        let reach_x = viewport.x * self.config.initial_buffer;
        let reach_y = viewport.y * self.config.initial_buffer;
        CellRange {
            min_col: (-reach_x / self.layout.pitch_x()).floor() as i32,
            max_col: (reach_x / self.layout.pitch_x()).ceil() as i32,
            min_row: (-reach_y / self.layout.pitch_y()).floor() as i32,
            max_row: (reach_y / self.layout.pitch_y()).ceil() as i32,
        }
    }

    /// Throttle: refresh after enough camera travel or enough time
    pub fn needs_refresh(&self, camera: &Camera, now_ms: f64) -> bool {
        match self.last_refresh {
            None => true,
            Some((position, at_ms)) => {
                (camera.current - position).length() > self.config.refresh_distance
                    || now_ms - at_ms > self.config.refresh_interval_ms
            }
        }
    }

    pub fn refresh_if_needed<P>(
        &mut self,
        camera: &Camera,
        viewport: Vec2,
        presenter: &mut P,
        choreography: &dyn Choreography,
        now_ms: f64,
    ) -> Option<RefreshReport>
    where
        P: TilePresenter<Handle = H>,
    {
        if !self.needs_refresh(camera, now_ms) {
            return None;
        }
        Some(self.refresh(camera, viewport, presenter, choreography, now_ms))
    }

    /// Recompute the window and diff it against the materialized set
    pub fn refresh<P>(
        &mut self,
        camera: &Camera,
        viewport: Vec2,
        presenter: &mut P,
        choreography: &dyn Choreography,
        now_ms: f64,
    ) -> RefreshReport
    where
        P: TilePresenter<Handle = H>,
    {
        let range = self.window(camera, viewport);
        let entrance = self
            .entrance_enabled
            .then(|| choreography.timing(Transition::Entrance));
        let pinned = self.pinned;

        let mut report = RefreshReport::default();
        for address in range.iter() {
            if self.tiles.contains_key(&address) || pinned == Some(address) {
                continue;
            }
            let handle = presenter.materialize(self.spec_for(address, entrance), now_ms);
            self.tiles.insert(address, handle);
            report.created.push(address);
        }

        let mut stale: Vec<CellAddress> = self
            .tiles
            .keys()
            .copied()
            .filter(|address| !range.contains(*address) && pinned != Some(*address))
            .collect();
        stale.sort();
        for address in &stale {
            self.release(*address, presenter);
        }
        report.released = stale;

        self.last_refresh = Some((camera.current, now_ms));

        if !report.is_empty() {
            log::debug!(
                "Virtualizer: window cols {}..={} rows {}..={}, +{} -{} (live={})",
                range.min_col,
                range.max_col,
                range.min_row,
                range.max_row,
                report.created.len(),
                report.released.len(),
                self.tiles.len()
            );
        }
        report
    }

    /// Materialize the initial reveal. Returns the time at which the reveal finishes.
    pub fn seed<P>(
        &mut self,
        viewport: Vec2,
        presenter: &mut P,
        choreography: &dyn Choreography,
        now_ms: f64,
    ) -> f64
    where
        P: TilePresenter<Handle = H>,
    {
        let range = self.initial_window(viewport);
        let reveal = choreography.timing(Transition::InitialReveal);

        let mut count = 0;
        for address in range.iter() {
            if self.tiles.contains_key(&address) {
                continue;
            }
            let handle = presenter.materialize(self.spec_for(address, Some(reveal.nth(count))), now_ms);
            self.tiles.insert(address, handle);
            count += 1;
        }

        log::info!(
            "Initial reveal: {} tiles (cols {}..={}, rows {}..={})",
            count,
            range.min_col,
            range.max_col,
            range.min_row,
            range.max_row
        );
        reveal.group_end_ms(now_ms, count)
    }

    /// Release one tile. Releasing an absent address is a no-op.
    fn release<P>(&mut self, address: CellAddress, presenter: &mut P) -> bool
    where
        P: TilePresenter<Handle = H>,
    {
        match self.tiles.remove(&address) {
            Some(handle) => {
                presenter.release(handle);
                true
            }
            None => false,
        }
    }

    fn spec_for(&self, address: CellAddress, entrance: Option<Timing>) -> TileSpec {
        let image_index = self.layout.image_index(address);
        TileSpec {
            address,
            origin: self.layout.tile_origin(address),
            width: self.layout.tile_width,
            height: self.layout.tile_height,
            image_index,
            image_source: self.layout.image_source(image_index),
            entrance,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingPresenter;
    use super::*;
    use crate::strategy::{Animated, Immediate};

    const VIEWPORT: Vec2 = Vec2::new(1024.0, 768.0);

    fn virtualizer() -> Virtualizer<u32> {
        let layout = GridLayout {
            tile_width: 120.0,
            tile_height: 160.0,
            gap: 150.0,
            columns: 4,
            item_count: 20,
            image_dir: "public".to_string(),
        };
        Virtualizer::new(VirtualizerConfig::default(), layout)
    }

    fn expected_set(range: CellRange) -> Vec<CellAddress> {
        range.iter().collect()
    }

    #[test]
    fn stationary_origin_window() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        let camera = Camera::default();

        let range = virtualizer.window(&camera, VIEWPORT);
        assert_eq!(
            range,
            CellRange { min_col: -5, max_col: 5, min_row: -4, max_row: 4 }
        );

        let report = virtualizer.refresh(&camera, VIEWPORT, &mut presenter, &Immediate, 0.0);
        assert_eq!(report.created.len(), 99);
        assert!(report.released.is_empty());
        assert_eq!(report.created, expected_set(range));
        assert_eq!(presenter.created, report.created);
        assert_eq!(virtualizer.addresses(), expected_set(range));
    }

    #[test]
    fn second_refresh_is_idempotent() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        let camera = Camera::at(Vec2::new(-431.5, 902.25));

        virtualizer.refresh(&camera, VIEWPORT, &mut presenter, &Immediate, 0.0);
        let report = virtualizer.refresh(&camera, VIEWPORT, &mut presenter, &Immediate, 5.0);
        assert!(report.is_empty());
    }

    #[test]
    fn panning_releases_trailing_tiles() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();

        virtualizer.refresh(&Camera::default(), VIEWPORT, &mut presenter, &Immediate, 0.0);
        let moved = Camera::at(Vec2::new(-1000.0, 0.0));
        let report = virtualizer.refresh(&moved, VIEWPORT, &mut presenter, &Immediate, 16.0);

        let range = virtualizer.window(&moved, VIEWPORT);
        assert_eq!(virtualizer.addresses(), expected_set(range));
        assert!(report.released.iter().all(|address| address.col < range.min_col));
        assert!(report.created.iter().all(|address| address.col > 5));
        // Releases are reported row-major
        let mut sorted = report.released.clone();
        sorted.sort();
        assert_eq!(sorted, report.released);
        assert_eq!(presenter.released, report.released);
        assert_eq!(presenter.live.len(), virtualizer.len());
    }

    #[test]
    fn window_leans_toward_travel() {
        let virtualizer = virtualizer();
        let still = Camera::default();
        let base = virtualizer.window_edges(&still, VIEWPORT);
        let base_range = virtualizer.window(&still, VIEWPORT);

        let right = Camera { current: Vec2::ZERO, target: Vec2::new(50.0, 0.0) };
        let edges = virtualizer.window_edges(&right, VIEWPORT);
        assert!(edges.left < base.left && edges.right < base.right);
        assert_eq!((edges.top, edges.bottom), (base.top, base.bottom));
        let range = virtualizer.window(&right, VIEWPORT);
        assert_eq!((range.min_col, range.max_col), (-6, 4));
        assert!(range.min_col < base_range.min_col && range.max_col < base_range.max_col);

        let left = Camera { current: Vec2::ZERO, target: Vec2::new(-50.0, 0.0) };
        let edges = virtualizer.window_edges(&left, VIEWPORT);
        assert!(edges.left > base.left && edges.right > base.right);

        let down = Camera { current: Vec2::ZERO, target: Vec2::new(0.0, 50.0) };
        let edges = virtualizer.window_edges(&down, VIEWPORT);
        assert!(edges.top < base.top && edges.bottom < base.bottom);

        let up = Camera { current: Vec2::ZERO, target: Vec2::new(0.0, -50.0) };
        let edges = virtualizer.window_edges(&up, VIEWPORT);
        assert!(edges.top > base.top && edges.bottom > base.bottom);
    }

    #[test]
    fn pinned_tile_survives_and_is_not_recreated() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        virtualizer.refresh(&Camera::default(), VIEWPORT, &mut presenter, &Immediate, 0.0);

        let pinned = CellAddress::new(0, 0);
        virtualizer.pin(pinned);
        let far = Camera::at(Vec2::new(-10_000.0, -10_000.0));
        let report = virtualizer.refresh(&far, VIEWPORT, &mut presenter, &Immediate, 16.0);
        assert!(!report.released.contains(&pinned));
        assert!(virtualizer.contains(pinned));

        let mut expected = expected_set(virtualizer.window(&far, VIEWPORT));
        expected.push(pinned);
        expected.sort();
        assert_eq!(virtualizer.addresses(), expected);

        virtualizer.unpin();
        let report = virtualizer.refresh(&far, VIEWPORT, &mut presenter, &Immediate, 32.0);
        assert_eq!(report.released, vec![pinned]);
        assert!(report.created.is_empty());
    }

    #[test]
    fn pinned_address_is_never_created() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        let pinned = CellAddress::new(1, 1);
        virtualizer.pin(pinned);
        virtualizer.refresh(&Camera::default(), VIEWPORT, &mut presenter, &Immediate, 0.0);
        assert!(!virtualizer.contains(pinned));
        assert_eq!(virtualizer.len(), 98);
    }

    #[test]
    fn release_is_idempotent() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        virtualizer.refresh(&Camera::default(), VIEWPORT, &mut presenter, &Immediate, 0.0);

        let address = CellAddress::new(2, 2);
        assert!(virtualizer.release(address, &mut presenter));
        assert!(!virtualizer.release(address, &mut presenter));
        assert!(!virtualizer.release(CellAddress::new(400, 400), &mut presenter));
        assert_eq!(presenter.released, vec![address]);
    }

    #[test]
    fn refresh_is_throttled_by_distance_and_time() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        let camera = Camera::default();
        assert!(virtualizer.needs_refresh(&camera, 0.0));
        virtualizer.refresh(&camera, VIEWPORT, &mut presenter, &Immediate, 0.0);

        assert!(!virtualizer.needs_refresh(&camera, 50.0));
        assert!(virtualizer.needs_refresh(&camera, 100.5));
        assert!(!virtualizer.needs_refresh(&Camera::at(Vec2::new(60.0, 50.0)), 50.0));
        assert!(virtualizer.needs_refresh(&Camera::at(Vec2::new(60.0, 60.0)), 50.0));

        assert!(virtualizer
            .refresh_if_needed(&camera, VIEWPORT, &mut presenter, &Immediate, 20.0)
            .is_none());
        virtualizer.invalidate();
        assert!(virtualizer
            .refresh_if_needed(&camera, VIEWPORT, &mut presenter, &Immediate, 20.0)
            .is_some());
    }

    #[test]
    fn entrance_follows_reveal_state() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        virtualizer.refresh(&Camera::default(), VIEWPORT, &mut presenter, &Animated, 0.0);
        assert!(presenter.live.values().all(|tile| tile.entrance.is_none()));

        virtualizer.set_entrance_enabled(true);
        virtualizer.refresh(&Camera::at(Vec2::new(-2000.0, 0.0)), VIEWPORT, &mut presenter, &Animated, 16.0);
        let fresh: Vec<_> = presenter
            .live
            .values()
            .filter(|tile| tile.address.col > 5)
            .collect();
        assert!(!fresh.is_empty());
        assert!(fresh.iter().all(|tile| tile.entrance == Some(Animated.timing(Transition::Entrance))));
    }

    #[test]
    fn seed_staggers_the_initial_window() {
        let mut virtualizer = virtualizer();
        let mut presenter = RecordingPresenter::default();
        let finish = virtualizer.seed(VIEWPORT, &mut presenter, &Animated, 100.0);

        let range = virtualizer.initial_window(VIEWPORT);
        assert_eq!(range, CellRange { min_col: -4, max_col: 4, min_row: -3, max_row: 3 });
        assert_eq!(virtualizer.len(), 63);
        assert_eq!(finish, 100.0 + 15.0 * 62.0 + 1300.0);

        let first = &presenter.live[&1];
        let last = &presenter.live[&63];
        assert_eq!(first.entrance.map(|t| t.delay_ms), Some(0.0));
        assert_eq!(last.entrance.map(|t| t.delay_ms), Some(15.0 * 62.0));
        assert_eq!(first.image_source, format!("public/{}.jpg", first.image_index));
    }
}
