// Time-based interpolation used by every choreographed transition

/// Easing curves available to transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    Power2Out,
    Power3Out,
    /// Cubic bezier (0.9, 0, 0.1, 1): slow start, fast middle, soft landing
    Hop,
}

impl Easing {
    /// Map normalized time `t` in [0, 1] to progress in [0, 1]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Power2Out => 1.0 - (1.0 - t).powi(2),
            Easing::Power3Out => 1.0 - (1.0 - t).powi(3),
            Easing::Hop => cubic_bezier(0.9, 0.0, 0.1, 1.0, t),
        }
    }
}

/// Evaluate a CSS-style cubic bezier timing function at time `t`
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, t: f32) -> f32 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }

    let bezier = |a: f32, b: f32, s: f32| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * a + 3.0 * inv * s * s * b + s * s * s
    };
    let slope = |a: f32, b: f32, s: f32| {
        let inv = 1.0 - s;
        3.0 * inv * inv * a + 6.0 * inv * s * (b - a) + 3.0 * s * s * (1.0 - b)
    };

    // Newton iterations on x(s) = t, falling back to bisection on flat slopes
    let mut s = t;
    for _ in 0..8 {
        let err = bezier(x1, x2, s) - t;
        if err.abs() < 1e-5 {
            return bezier(y1, y2, s);
        }
        let d = slope(x1, x2, s);
        if d.abs() < 1e-6 {
            break;
        }
        s = (s - err / d).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    s = t;
    for _ in 0..32 {
        let x = bezier(x1, x2, s);
        if (x - t).abs() < 1e-5 {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    bezier(y1, y2, s)
}

/// Duration, delay and curve of one transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub duration_ms: f64,
    pub delay_ms: f64,
    /// Extra delay per element for staggered groups
    pub stagger_ms: f64,
    pub easing: Easing,
}

impl Timing {
    pub const IMMEDIATE: Timing = Timing {
        duration_ms: 0.0,
        delay_ms: 0.0,
        stagger_ms: 0.0,
        easing: Easing::Linear,
    };

    pub const fn new(duration_ms: f64, easing: Easing) -> Self {
        Self {
            duration_ms,
            delay_ms: 0.0,
            stagger_ms: 0.0,
            easing,
        }
    }

    pub const fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub const fn with_stagger(mut self, stagger_ms: f64) -> Self {
        self.stagger_ms = stagger_ms;
        self
    }

    /// Timing of the `index`-th element of a staggered group
    pub fn nth(&self, index: usize) -> Timing {
        Timing {
            delay_ms: self.delay_ms + self.stagger_ms * index as f64,
            stagger_ms: 0.0,
            ..*self
        }
    }

    /// Time at which a staggered group of `count` elements has fully finished
    pub fn group_end_ms(&self, start_ms: f64, count: usize) -> f64 {
        let last = count.saturating_sub(1) as f64;
        start_ms + self.delay_ms + self.stagger_ms * last + self.duration_ms
    }

    pub fn tween(&self, from: f32, to: f32, now_ms: f64) -> Tween {
        Tween {
            from,
            to,
            start_ms: now_ms + self.delay_ms,
            duration_ms: self.duration_ms,
            easing: self.easing,
        }
    }
}

/// A single scalar animated from `from` to `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    start_ms: f64,
    duration_ms: f64,
    easing: Easing,
}

impl Tween {
    /// A tween already resting at `value`
    pub fn settled(value: f32) -> Self {
        Self {
            from: value,
            to: value,
            start_ms: 0.0,
            duration_ms: 0.0,
            easing: Easing::Linear,
        }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn is_done(&self, now_ms: f64) -> bool {
        now_ms >= self.start_ms + self.duration_ms
    }

    /// Time left until the tween rests at its target, delay included
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        (self.start_ms + self.duration_ms - now_ms).max(0.0)
    }

    pub fn sample(&self, now_ms: f64) -> f32 {
        if self.is_done(now_ms) {
            return self.to;
        }
        if now_ms <= self.start_ms {
            return self.from;
        }
        let t = ((now_ms - self.start_ms) / self.duration_ms) as f32;
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    /// Restart from the current sampled value toward a new target
    pub fn retarget(&mut self, now_ms: f64, to: f32, timing: &Timing) {
        let current = self.sample(now_ms);
        *self = timing.tween(current, to, now_ms);
    }
}
