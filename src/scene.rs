use glam::Vec2;

use crate::expansion::{Expansion, ExpansionEvent, OpenRequest, Stage};
use crate::grid::CellAddress;
use crate::lazy::LazyLoader;
use crate::motion::MotionModel;
use crate::nav::NavReveal;
use crate::strategy::{Choreography, Transition};
use crate::tween::Timing;
use crate::virtualizer::{RefreshReport, TilePresenter, Virtualizer};
use crate::Config;

/// What happened during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub refresh: Option<RefreshReport>,
    pub loads_started: usize,
    pub expansion: Option<ExpansionEvent>,
}

/// All gallery state, owned in one place and driven by the host's event loop.
///
/// World (0, 0) sits at the viewport center when the camera is at rest at the origin;
/// [`Scene::screen_origin`] gives its current screen position.
#[derive(Debug)]
pub struct Scene<P: TilePresenter> {
    choreography: Box<dyn Choreography>,
    motion: MotionModel,
    virtualizer: Virtualizer<P::Handle>,
    presenter: P,
    expansion: Expansion,
    loader: LazyLoader,
    nav: NavReveal,
    viewport: Vec2,
    pointer: Vec2,
    press: Option<Vec2>,
    hovered: Option<CellAddress>,
    reveal_until_ms: Option<f64>,
}

impl<P: TilePresenter> Scene<P> {
    /// Build the scene and start the initial and nav reveals
    pub fn new(
        config: &Config,
        choreography: Box<dyn Choreography>,
        presenter: P,
        viewport: Vec2,
        now_ms: f64,
    ) -> Self {
        let nav = NavReveal::new(&config.nav_label, &*choreography, now_ms);
        let mut scene = Self {
            choreography,
            motion: MotionModel::new(config.motion.clone()),
            virtualizer: Virtualizer::new(config.virtualizer.clone(), config.layout.clone()),
            presenter,
            expansion: Expansion::new(config.expansion.clone()),
            loader: LazyLoader::new(config.lazy_margin),
            nav,
            viewport,
            pointer: viewport * 0.5,
            press: None,
            hovered: None,
            reveal_until_ms: None,
        };

        let reveal_end = scene
            .virtualizer
            .seed(viewport, &mut scene.presenter, &*scene.choreography, now_ms);
        scene.reveal_until_ms = Some(reveal_end);
        scene.scan_images(now_ms);
        scene
    }

    pub fn choreography(&self) -> &dyn Choreography {
        &*self.choreography
    }

    pub fn motion(&self) -> &MotionModel {
        &self.motion
    }

    pub fn virtualizer(&self) -> &Virtualizer<P::Handle> {
        &self.virtualizer
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    pub fn nav(&self) -> &NavReveal {
        &self.nav
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn hovered(&self) -> Option<CellAddress> {
        self.hovered
    }

    /// True once the initial reveal has finished
    pub fn is_revealed(&self) -> bool {
        self.reveal_until_ms.is_none()
    }

    /// Screen position of world (0, 0)
    pub fn screen_origin(&self) -> Vec2 {
        self.viewport * 0.5 + self.motion.render_offset()
    }

    pub fn world_at(&self, screen: Vec2) -> Vec2 {
        screen - self.screen_origin()
    }

    pub fn pointer_down(&mut self, position: Vec2, now_ms: f64) {
        self.pointer = position;
        self.press = Some(position);
        self.motion.pointer_down(position, now_ms);
    }

    pub fn pointer_move(&mut self, position: Vec2, now_ms: f64) {
        self.pointer = position;
        self.motion
            .pointer_move(position, self.viewport, now_ms, &*self.choreography);
        self.update_hover(now_ms);
    }

    /// Release the pointer. A release close to its press is a tap and activates the tile
    /// under it (or collapses the expanded one). Returns true on activation.
    pub fn pointer_up(&mut self, position: Vec2, now_ms: f64) -> bool {
        self.pointer = position;
        let press = self.press.take();
        let dragged = self.motion.is_dragging() && self.motion.has_moved();
        self.motion.pointer_up();

        let threshold = self.motion.config().drag_threshold;
        let tapped = press.is_some_and(|origin| {
            let travel = position - origin;
            travel.x.abs() <= threshold && travel.y.abs() <= threshold
        });
        if !tapped || dragged {
            return false;
        }
        self.activate(now_ms)
    }

    pub fn pointer_left(&mut self, now_ms: f64) {
        if self.motion.is_dragging() || self.motion.is_locked() {
            return;
        }
        self.set_hovered(None, now_ms);
    }

    pub fn touch_start(&mut self, position: Vec2, now_ms: f64) {
        self.pointer_down(position, now_ms);
    }

    pub fn touch_move(&mut self, position: Vec2, now_ms: f64) {
        self.pointer = position;
        self.motion
            .pointer_move(position, self.viewport, now_ms, &*self.choreography);
    }

    pub fn touch_end(&mut self, position: Vec2, now_ms: f64) -> bool {
        self.pointer_up(position, now_ms)
    }

    /// Returns true when the wheel was consumed
    pub fn wheel(&mut self, delta: Vec2) -> bool {
        self.motion.wheel(delta)
    }

    pub fn recenter(&mut self) {
        self.motion.recenter();
    }

    /// Collapse the expanded tile, if any
    pub fn dismiss(&mut self, now_ms: f64) -> bool {
        self.expansion.close(&*self.choreography, now_ms)
    }

    pub fn resize(&mut self, viewport: Vec2, now_ms: f64) {
        self.viewport = viewport;
        log::debug!("Viewport resized to {}x{}", viewport.x, viewport.y);

        if self.expansion.is_active() {
            if let Some(address) = self.expansion.address() {
                let home = self
                    .virtualizer
                    .layout()
                    .tile_rect(address)
                    .translate(self.screen_origin());
                self.expansion
                    .resize(viewport, home, &*self.choreography, now_ms);
            }
            return;
        }

        self.virtualizer.refresh(
            self.motion.camera(),
            self.viewport,
            &mut self.presenter,
            &*self.choreography,
            now_ms,
        );
        self.scan_images(now_ms);
    }

    /// One animation frame: expansion stage, camera easing, throttled virtualization,
    /// then lazy loading. Easing always precedes virtualization.
    pub fn frame(&mut self, now_ms: f64) -> FrameReport {
        let mut report = FrameReport {
            expansion: self.expansion.tick(&*self.choreography, now_ms),
            ..FrameReport::default()
        };
        if let Some(event) = report.expansion {
            self.on_expansion_event(event, now_ms);
        }

        self.motion.step(now_ms);

        if !self.motion.is_locked() {
            report.refresh = self.virtualizer.refresh_if_needed(
                self.motion.camera(),
                self.viewport,
                &mut self.presenter,
                &*self.choreography,
                now_ms,
            );
        }

        let mut scan = report.refresh.is_some();
        if self.reveal_until_ms.is_some_and(|until| now_ms >= until) {
            self.reveal_until_ms = None;
            self.virtualizer.set_entrance_enabled(true);
            log::info!("Initial reveal complete");
            scan = true;
        }
        if self.presenter.take_settled(now_ms) {
            scan = true;
        }
        if scan {
            report.loads_started = self.scan_images(now_ms);
        }
        report
    }

    fn scan_images(&mut self, now_ms: f64) -> usize {
        let origin = self.screen_origin();
        let timing = self.choreography.timing(Transition::ImageFade);
        self.loader.scan(
            &self.virtualizer,
            &mut self.presenter,
            origin,
            self.viewport,
            timing,
            now_ms,
        )
    }

    /// Materialized tile under a screen point; the hovered tile wins with its scaled bounds
    fn tile_under(&self, screen: Vec2, now_ms: f64) -> Option<CellAddress> {
        let layout = self.virtualizer.layout();
        let origin = self.screen_origin();

        if let Some(address) = self.hovered {
            if let Some(handle) = self.virtualizer.handle(address) {
                let scale = self.presenter.hover_scale(handle, now_ms);
                let rect = layout.tile_rect(address).translate(origin).scale_about_center(scale);
                if rect.contains(screen) {
                    return Some(address);
                }
            }
        }

        layout
            .cell_at(screen - origin)
            .filter(|address| self.virtualizer.contains(*address))
    }

    fn update_hover(&mut self, now_ms: f64) {
        if self.motion.is_dragging() || self.motion.is_locked() || self.expansion.is_active() {
            return;
        }
        let under = self.tile_under(self.pointer, now_ms);
        self.set_hovered(under, now_ms);
    }

    fn set_hovered(&mut self, address: Option<CellAddress>, now_ms: f64) {
        if self.hovered == address {
            return;
        }
        let timing = self.choreography.timing(Transition::Hover);
        if let Some(handle) = self.hovered.and_then(|old| self.virtualizer.handle(old)) {
            self.presenter.set_hovered(handle, false, timing, now_ms);
        }
        if let Some(handle) = address.and_then(|new| self.virtualizer.handle(new)) {
            self.presenter.set_hovered(handle, true, timing, now_ms);
        }
        self.hovered = address;
    }

    fn activate(&mut self, now_ms: f64) -> bool {
        if self.expansion.is_active() {
            return self.dismiss(now_ms);
        }

        let Some(address) = self.tile_under(self.pointer, now_ms) else {
            return false;
        };
        let Some(handle) = self.virtualizer.handle(address) else {
            return false;
        };

        let layout = self.virtualizer.layout();
        let request = OpenRequest {
            address,
            screen_rect: layout.tile_rect(address).translate(self.screen_origin()),
            scale: self.presenter.hover_scale(handle, now_ms),
            image_source: layout.image_source(layout.image_index(address)),
        };

        match self
            .expansion
            .open(request, self.viewport, &*self.choreography, now_ms)
        {
            Some(event) => {
                self.on_expansion_event(event, now_ms);
                true
            }
            None => false,
        }
    }

    fn on_expansion_event(&mut self, event: ExpansionEvent, now_ms: f64) {
        let backdrop = self.choreography.timing(Transition::Backdrop);
        match event {
            ExpansionEvent::Started(address) => {
                self.motion.expansion_started();
                self.virtualizer.pin(address);
                self.hovered = None;
                for (other, handle) in self.virtualizer.iter() {
                    if other == address {
                        self.presenter.set_hidden(handle, true);
                    } else {
                        self.presenter.set_dimmed(handle, true, backdrop, now_ms);
                    }
                }
            }
            ExpansionEvent::ReturnStarted(address) => {
                for (other, handle) in self.virtualizer.iter() {
                    if other != address {
                        self.presenter.set_dimmed(handle, false, backdrop, now_ms);
                    }
                }
            }
            ExpansionEvent::Ended(address) => {
                if let Some(handle) = self.virtualizer.handle(address) {
                    self.presenter.set_hidden(handle, false);
                    self.presenter.set_hovered(handle, false, Timing::IMMEDIATE, now_ms);
                }
                self.hovered = None;
                self.virtualizer.unpin();
                self.virtualizer.invalidate();
                self.motion.expansion_ended(self.pointer);
                log::debug!("Expansion of {} ended", address);
            }
        }
    }

    /// Stage of the expansion flow
    pub fn expansion_stage(&self) -> Stage {
        self.expansion.stage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Rect;
    use crate::strategy::{Animated, Immediate};
    use crate::virtualizer::testing::RecordingPresenter;

    const VIEWPORT: Vec2 = Vec2::new(1024.0, 768.0);

    fn scene(choreography: Box<dyn Choreography>) -> Scene<RecordingPresenter> {
        Scene::new(
            &Config::default(),
            choreography,
            RecordingPresenter::default(),
            VIEWPORT,
            0.0,
        )
    }

    /// Screen point inside the tile at `address` while the camera rests at the origin
    fn point_on(address: CellAddress) -> Vec2 {
        Vec2::new(
            512.0 + address.col as f32 * 270.0 + 60.0,
            384.0 + address.row as f32 * 310.0 + 80.0,
        )
    }

    fn handle_of(scene: &Scene<RecordingPresenter>, address: CellAddress) -> u32 {
        *scene.virtualizer().handle(address).unwrap()
    }

    #[test]
    fn startup_seeds_and_loads_visible_images() {
        let scene = scene(Box::new(Animated));
        assert_eq!(scene.virtualizer().len(), 63);
        assert!(!scene.is_revealed());
        // Screen spans world [-512, 512) x [-384, 384) plus a 150px margin
        assert!(scene.presenter().is_loaded(CellAddress::new(0, 0)));
        assert!(scene.presenter().is_loaded(CellAddress::new(-2, -1)));
        assert!(!scene.presenter().is_loaded(CellAddress::new(4, 0)));
    }

    #[test]
    fn nav_label_reveals_alongside_the_grid() {
        let scene = scene(Box::new(Animated));
        assert_eq!(scene.nav().label(), "Infinigrid");
        assert!(scene.nav().glyphs(0.0).iter().all(|g| g.opacity == 0.0));
        assert!(scene.nav().is_done(200.0 + 80.0 * 9.0 + 500.0));

        let config = Config {
            nav_label: String::new(),
            ..Config::default()
        };
        let bare = Scene::new(&config, Box::new(Immediate), RecordingPresenter::default(), VIEWPORT, 0.0);
        assert!(bare.nav().is_empty());
    }

    #[test]
    fn first_frame_fills_the_window_then_reveal_enables_entrances() {
        let mut scene = scene(Box::new(Animated));
        let report = scene.frame(16.0);
        let refresh = report.refresh.unwrap();
        assert_eq!(scene.virtualizer().len(), 99);
        assert_eq!(refresh.created.len(), 36);
        assert!(refresh.released.is_empty());
        let created = refresh.created[0];
        let handle = handle_of(&scene, created);
        assert_eq!(scene.presenter().live[&handle].entrance, None);

        scene.frame(15.0 * 62.0 + 1300.0);
        assert!(scene.is_revealed());
    }

    #[test]
    fn visible_set_tracks_the_window_while_panning() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);

        scene.pointer_down(Vec2::new(500.0, 400.0), 10.0);
        scene.pointer_move(Vec2::new(100.0, 100.0), 30.0);
        scene.pointer_up(Vec2::new(100.0, 100.0), 40.0);

        let mut now = 40.0;
        for _ in 0..200 {
            now += 16.0;
            scene.frame(now);
        }
        // Settle the throttle and compare with the window of the final camera
        scene.frame(now + 500.0);
        let camera = *scene.motion().camera();
        let mut expected: Vec<_> = scene.virtualizer().window(&camera, VIEWPORT).iter().collect();
        expected.sort();
        assert_eq!(scene.virtualizer().addresses(), expected);
        assert_eq!(scene.presenter().live.len(), expected.len());
    }

    #[test]
    fn tap_expands_and_drag_does_not() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        let target = CellAddress::new(0, 0);

        scene.pointer_down(point_on(target), 10.0);
        scene.pointer_move(point_on(target) + Vec2::new(40.0, 0.0), 20.0);
        assert!(!scene.pointer_up(point_on(target) + Vec2::new(40.0, 0.0), 30.0));
        assert!(!scene.expansion().is_active());

        let mut scene = self::scene(Box::new(Immediate));
        scene.frame(0.0);
        scene.pointer_down(point_on(target), 10.0);
        assert!(scene.pointer_up(point_on(target) + Vec2::new(2.0, 1.0), 30.0));
        assert_eq!(scene.expansion().address(), Some(target));
        assert!(scene.motion().is_locked());
        assert_eq!(scene.virtualizer().pinned(), Some(target));

        let handle = handle_of(&scene, target);
        assert!(scene.presenter().hidden.contains(&handle));
        assert_eq!(scene.presenter().dimmed.len(), scene.virtualizer().len() - 1);
        assert!(!scene.presenter().dimmed.contains(&handle));
    }

    #[test]
    fn tap_on_gap_does_nothing() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        let gap = Vec2::new(512.0 + 130.0, 384.0 + 10.0);
        scene.pointer_down(gap, 0.0);
        assert!(!scene.pointer_up(gap, 5.0));
        assert!(!scene.expansion().is_active());
    }

    #[test]
    fn expansion_cycle_restores_everything() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        let target = CellAddress::new(-1, 0);
        scene.pointer_down(point_on(target), 10.0);
        scene.pointer_up(point_on(target), 12.0);

        // Input is ignored while expanded
        assert!(!scene.wheel(Vec2::new(0.0, 100.0)));
        let report = scene.frame(20.0);
        assert_eq!(report.refresh, None);
        assert_eq!(scene.expansion_stage(), Stage::Open);

        // Tapping anywhere collapses
        scene.pointer_down(Vec2::new(5.0, 5.0), 30.0);
        assert!(scene.pointer_up(Vec2::new(5.0, 5.0), 31.0));
        assert_eq!(scene.expansion_stage(), Stage::TitleExit);

        let report = scene.frame(40.0);
        assert_eq!(report.expansion, Some(ExpansionEvent::ReturnStarted(target)));
        assert!(scene.presenter().dimmed.is_empty());

        let report = scene.frame(50.0);
        assert_eq!(report.expansion, Some(ExpansionEvent::Ended(target)));
        assert!(!scene.motion().is_locked());
        assert_eq!(scene.virtualizer().pinned(), None);
        assert!(scene.presenter().hidden.is_empty());
        assert!(report.refresh.is_some());
        assert!(scene.wheel(Vec2::new(0.0, 100.0)));
    }

    #[test]
    fn pan_is_frozen_through_an_expansion() {
        let mut scene = scene(Box::new(Animated));
        scene.frame(0.0);
        scene.pointer_move(Vec2::new(900.0, 700.0), 10.0);
        for frame in 1..20 {
            scene.frame(10.0 + frame as f64 * 16.0);
        }
        let target = CellAddress::new(0, 0);
        let tap = point_on(target) + scene.motion().pan().current();
        scene.pointer_move(tap, 400.0);
        scene.frame(416.0);
        let before = scene.motion().pan().current();

        scene.pointer_down(tap, 420.0);
        assert!(scene.pointer_up(tap, 425.0));
        scene.frame(441.0);
        assert_eq!(scene.motion().pan().current(), before);
        assert_eq!(scene.motion().pan().effective(), before);

        assert!(scene.dismiss(2_000.0));
        let mut now = 2_000.0;
        while scene.expansion().is_active() {
            now += 16.0;
            scene.frame(now);
        }
        scene.frame(now + 16.0);
        assert_eq!(scene.motion().pan().current(), before);

        scene.pointer_move(tap + Vec2::new(3.0, 0.0), now + 20.0);
        scene.frame(now + 36.0);
        assert_eq!(scene.motion().pan().current(), before);

        scene.pointer_move(tap + Vec2::new(30.0, 0.0), now + 40.0);
        scene.frame(now + 200.0);
        assert_ne!(scene.motion().pan().current(), before);
    }

    #[test]
    fn hover_follows_pointer_but_not_drags() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        let first = CellAddress::new(0, 0);
        let second = CellAddress::new(1, 0);

        scene.pointer_move(point_on(first), 10.0);
        assert_eq!(scene.hovered(), Some(first));
        let first_handle = handle_of(&scene, first);
        assert!(scene.presenter().hovered.contains(&first_handle));

        scene.pointer_down(point_on(first), 20.0);
        scene.pointer_move(point_on(second), 30.0);
        assert_eq!(scene.hovered(), Some(first));

        scene.pointer_up(point_on(second), 40.0);
        scene.pointer_left(50.0);
        assert_eq!(scene.hovered(), None);
        assert!(scene.presenter().hovered.is_empty());
    }

    #[test]
    fn resize_refreshes_the_window() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        let before = scene.virtualizer().len();
        scene.resize(Vec2::new(2048.0, 1536.0), 5.0);
        assert!(scene.virtualizer().len() > before);
        let camera = *scene.motion().camera();
        let window = scene.virtualizer().window(&camera, Vec2::new(2048.0, 1536.0));
        assert_eq!(scene.virtualizer().len(), window.len());
    }

    #[test]
    fn resize_during_return_lands_on_the_moved_slot() {
        let mut scene = scene(Box::new(Animated));
        scene.frame(0.0);
        let target = CellAddress::new(0, 0);
        scene.pointer_down(point_on(target), 10.0);
        assert!(scene.pointer_up(point_on(target), 12.0));

        let mut now = 12.0;
        while scene.expansion_stage() != Stage::Open {
            now += 16.0;
            scene.frame(now);
        }
        assert!(scene.dismiss(now));
        while scene.expansion_stage() != Stage::Returning {
            now += 16.0;
            scene.frame(now);
        }

        now += 200.0;
        let viewport = Vec2::new(1600.0, 1000.0);
        scene.resize(viewport, now);
        let slot = scene
            .virtualizer()
            .layout()
            .tile_rect(target)
            .translate(scene.screen_origin());
        assert_eq!(slot, Rect::new(800.0, 500.0, 120.0, 160.0));
        assert_eq!(scene.expansion().current_rect(now + 10_000.0), Some(slot));

        while scene.expansion().is_active() {
            now += 16.0;
            scene.frame(now);
        }
        assert!(!scene.motion().is_locked());
    }

    #[test]
    fn settled_entrances_trigger_a_load_scan_between_refreshes() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        let entering = CellAddress::new(-3, 0);
        assert!(scene.virtualizer().contains(entering));
        assert!(!scene.presenter().is_loaded(entering));

        // Camera eases right by less than the refresh distance, within the interval
        assert!(scene.wheel(Vec2::new(-125.0, 0.0)));
        for step in 1..=7 {
            let report = scene.frame(step as f64 * 10.0);
            assert_eq!(report.refresh, None);
            assert_eq!(report.loads_started, 0);
        }
        assert!(!scene.presenter().is_loaded(entering));

        scene.presenter.settled = true;
        let report = scene.frame(80.0);
        assert_eq!(report.refresh, None);
        assert!(report.loads_started > 0);
        assert!(scene.presenter().is_loaded(entering));
    }

    #[test]
    fn touch_drag_pans_the_camera() {
        let mut scene = scene(Box::new(Immediate));
        scene.frame(0.0);
        scene.touch_start(Vec2::new(300.0, 300.0), 0.0);
        scene.touch_move(Vec2::new(250.0, 280.0), 50.0);
        // Holding still before lifting kills the release velocity
        scene.touch_move(Vec2::new(250.0, 280.0), 500.0);
        assert!(!scene.touch_end(Vec2::new(250.0, 280.0), 60.0));
        assert_eq!(scene.motion().camera().target, Vec2::new(-50.0, -20.0));
    }
}
