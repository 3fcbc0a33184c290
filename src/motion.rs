use glam::Vec2;
use crate::strategy::{Choreography, Transition};
use crate::tween::Tween;

/// Tuning of drag, momentum, wheel and ambient pan
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Fraction of the remaining distance the camera covers each frame
    pub ease_factor: f32,
    /// Displacement from the press point beyond which a press is a drag, not a tap
    pub drag_threshold: f32,
    /// Floor on the time between drag samples when computing velocity
    pub min_drag_interval_ms: f64,
    /// Release velocity (px/ms, either axis) above which momentum is applied
    pub momentum_threshold: f32,
    /// Momentum projection: target jumps by velocity * momentum_factor on release
    pub momentum_factor: f32,
    /// Whether wheel input pans the canvas
    pub wheel_enabled: bool,
    pub scroll_speed: f32,
    pub pan_strength: f32,
    /// Full ambient pan travel across the viewport, before strength
    pub pan_range: f32,
    pub pan_ease: f32,
    /// Lifetime of one ambient pan session after it is (re)started
    pub pan_session_ms: f64,
    /// Pointer travel required after a collapse before ambient pan resumes
    pub unfreeze_threshold: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            ease_factor: 0.075,
            drag_threshold: 5.0,
            min_drag_interval_ms: 10.0,
            momentum_threshold: 0.1,
            momentum_factor: 200.0,
            wheel_enabled: true,
            scroll_speed: 0.8,
            pan_strength: 0.4,
            pan_range: 250.0,
            pan_ease: 0.08,
            pan_session_ms: 2000.0,
            unfreeze_threshold: 5.0,
        }
    }
}

/// Direction of travel on one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Negative,
    Still,
    Positive,
}

impl Heading {
    fn between(current: f32, target: f32) -> Heading {
        if target > current {
            Heading::Positive
        } else if target < current {
            Heading::Negative
        } else {
            Heading::Still
        }
    }
}

/// Primary canvas translation: `current` eases toward `target`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    pub current: Vec2,
    pub target: Vec2,
}

impl Camera {
    /// Camera resting at `position`
    pub fn at(position: Vec2) -> Self {
        Self {
            current: position,
            target: position,
        }
    }

    pub fn heading_x(&self) -> Heading {
        Heading::between(self.current.x, self.target.x)
    }

    pub fn heading_y(&self) -> Heading {
        Heading::between(self.current.y, self.target.y)
    }

    fn ease(&mut self, factor: f32) {
        self.current.x += (self.target.x - self.current.x) * factor;
        self.current.y += (self.target.y - self.current.y) * factor;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Idle,
    Active { origin: Vec2, last: Vec2, last_ms: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Resume {
    Live,
    /// Frozen after a collapse until the pointer leaves `anchor`
    AwaitingPointer { anchor: Vec2 },
}

/// Secondary pointer-driven offset layered on the camera
#[derive(Debug, Clone)]
pub struct AmbientPan {
    current: Vec2,
    target: Vec2,
    frozen: Option<Vec2>,
    session_until_ms: Option<f64>,
    settle: Option<[Tween; 2]>,
    resume: Resume,
}

impl AmbientPan {
    fn new() -> Self {
        Self {
            current: Vec2::ZERO,
            target: Vec2::ZERO,
            frozen: None,
            session_until_ms: None,
            settle: None,
            resume: Resume::Live,
        }
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn is_settling(&self) -> bool {
        self.settle.is_some()
    }

    /// Offset to render with: the frozen value while frozen, the live one otherwise
    pub fn effective(&self) -> Vec2 {
        self.frozen.unwrap_or(self.current)
    }

    pub fn session_active(&self, now_ms: f64) -> bool {
        self.session_until_ms.is_some_and(|until| now_ms < until)
    }

    fn cancel(&mut self) {
        self.session_until_ms = None;
        self.settle = None;
    }

    fn tick(&mut self, now_ms: f64, ease: f32, suppressed: bool) {
        if let Some([tween_x, tween_y]) = self.settle {
            self.current = Vec2::new(tween_x.sample(now_ms), tween_y.sample(now_ms));
            if tween_x.is_done(now_ms) && tween_y.is_done(now_ms) {
                self.settle = None;
            }
            return;
        }

        match self.session_until_ms {
            Some(until) if now_ms < until => {}
            Some(_) => {
                self.session_until_ms = None;
                return;
            }
            None => return,
        }

        if suppressed || self.frozen.is_some() {
            return;
        }
        self.current.x += (self.target.x - self.current.x) * ease;
        self.current.y += (self.target.y - self.current.y) * ease;
    }
}

/// Turns raw pointer, touch and wheel input into an eased camera offset
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionConfig,
    camera: Camera,
    drag: Drag,
    velocity: Vec2,
    has_moved: bool,
    locked: bool,
    pan: AmbientPan,
}

impl MotionModel {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            camera: Camera::default(),
            drag: Drag::Idle,
            velocity: Vec2::ZERO,
            has_moved: false,
            locked: false,
            pan: AmbientPan::new(),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn pan(&self) -> &AmbientPan {
        &self.pan
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, Drag::Active { .. })
    }

    /// True once the current (or last) press travelled past the drag threshold
    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// Input is locked while an item is expanded
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Final translation of the canvas: camera plus ambient pan
    pub fn render_offset(&self) -> Vec2 {
        self.camera.current + self.pan.effective()
    }

    /// Begin a drag. Returns false when input is locked.
    pub fn pointer_down(&mut self, position: Vec2, now_ms: f64) -> bool {
        if self.locked {
            return false;
        }
        self.drag = Drag::Active {
            origin: position,
            last: position,
            last_ms: now_ms,
        };
        self.has_moved = false;
        self.velocity = Vec2::ZERO;
        true
    }

    pub fn pointer_move(
        &mut self,
        position: Vec2,
        viewport: Vec2,
        now_ms: f64,
        choreography: &dyn Choreography,
    ) {
        self.check_resume(position, viewport, now_ms, choreography);

        if self.is_dragging() {
            if !self.locked {
                self.drag_to(position, now_ms);
            }
            return;
        }

        if self.locked || self.pan.is_frozen() {
            return;
        }

        self.pan.target = self.pan_offset_for(position, viewport);
        if !self.pan.session_active(now_ms) {
            // Single session at a time: a new one replaces whatever was running
            self.pan.session_until_ms = Some(now_ms + self.config.pan_session_ms);
        }
    }

    /// End a drag, projecting momentum. Returns true if a drag was active.
    pub fn pointer_up(&mut self) -> bool {
        if !self.is_dragging() {
            return false;
        }
        self.drag = Drag::Idle;

        let threshold = self.config.momentum_threshold;
        if !self.locked && (self.velocity.x.abs() > threshold || self.velocity.y.abs() > threshold) {
            self.camera.target += self.velocity * self.config.momentum_factor;
        }
        true
    }

    /// Apply a wheel delta. Returns true when consumed (host should suppress default scrolling).
    pub fn wheel(&mut self, delta: Vec2) -> bool {
        if !self.config.wheel_enabled || self.locked {
            return false;
        }
        self.camera.target.x -= delta.x * self.config.scroll_speed;
        self.camera.target.y -= delta.y * self.config.scroll_speed;
        true
    }

    /// Per-frame update: camera easing, then the ambient pan tick
    pub fn step(&mut self, now_ms: f64) {
        if !self.locked {
            self.camera.ease(self.config.ease_factor);
        }
        let suppressed = self.locked || self.is_dragging();
        self.pan.tick(now_ms, self.config.pan_ease, suppressed);
    }

    pub fn recenter(&mut self) {
        if !self.locked {
            self.camera.target = Vec2::ZERO;
        }
    }

    /// Expansion began: lock input and freeze the ambient pan where it is
    pub fn expansion_started(&mut self) {
        self.locked = true;
        self.drag = Drag::Idle;
        self.pan.frozen = Some(self.pan.current);
        self.pan.target = Vec2::ZERO;
        self.pan.resume = Resume::Live;
        self.pan.cancel();
    }

    /// Expansion ended: unlock input; the pan stays frozen until the pointer leaves `pointer`
    pub fn expansion_ended(&mut self, pointer: Vec2) {
        self.locked = false;
        self.velocity = Vec2::ZERO;
        self.pan.target = Vec2::ZERO;
        if self.pan.frozen.is_some() {
            self.pan.resume = Resume::AwaitingPointer { anchor: pointer };
        }
    }

    fn pan_offset_for(&self, position: Vec2, viewport: Vec2) -> Vec2 {
        let amplitude = self.config.pan_range * self.config.pan_strength;
        let fraction = |p: f32, extent: f32| if extent > 0.0 { p / extent } else { 0.5 };
        Vec2::new(
            (fraction(position.x, viewport.x) - 0.5) * amplitude,
            (fraction(position.y, viewport.y) - 0.5) * amplitude,
        )
    }

    fn check_resume(
        &mut self,
        position: Vec2,
        viewport: Vec2,
        now_ms: f64,
        choreography: &dyn Choreography,
    ) {
        let Resume::AwaitingPointer { anchor } = self.pan.resume else {
            return;
        };
        let moved = position - anchor;
        let threshold = self.config.unfreeze_threshold;
        if moved.x.abs() <= threshold && moved.y.abs() <= threshold {
            return;
        }

        self.pan.resume = Resume::Live;
        self.pan.frozen = None;

        let value = self.pan_offset_for(position, viewport);
        let timing = choreography.timing(Transition::PanSettle);
        let current = self.pan.current;
        self.pan.settle = Some([
            timing.tween(current.x, value.x, now_ms),
            timing.tween(current.y, value.y, now_ms),
        ]);
        self.pan.target = value;
        log::debug!("Ambient pan resumed toward ({:.1}, {:.1})", value.x, value.y);
    }

    fn drag_to(&mut self, position: Vec2, now_ms: f64) {
        let Drag::Active { origin, last, last_ms } = self.drag else {
            return;
        };

        let delta = position - last;
        let travelled = position - origin;
        let threshold = self.config.drag_threshold;
        if travelled.x.abs() > threshold || travelled.y.abs() > threshold {
            self.has_moved = true;
        }

        let elapsed = (now_ms - last_ms).max(self.config.min_drag_interval_ms) as f32;
        self.velocity = Vec2::new(delta.x / elapsed, delta.y / elapsed);
        self.camera.target += delta;

        self.drag = Drag::Active {
            origin,
            last: position,
            last_ms: now_ms,
        };
    }
}
