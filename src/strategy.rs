//! Animation capability, negotiated once at startup.
//!
//! Every transition in the gallery asks the active [`Choreography`] for its
//! [`Timing`]. The animated strategy returns the full motion design; the
//! immediate strategy collapses everything to zero-length transitions so the
//! gallery keeps panning, virtualizing and expanding without any tweening.

use std::fmt;

use crate::tween::{Easing, Timing};

/// Every choreographed transition in the gallery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Staggered reveal of the tiles present at startup
    InitialReveal,
    /// Tiles materialized after the initial reveal
    Entrance,
    /// Hover scale in and out
    Hover,
    /// Lazy image fade-in
    ImageFade,
    /// Fading the other tiles out and back in around an expansion
    Backdrop,
    /// Tile flight between its grid slot and the expanded rect
    Flight,
    /// Resizing the expanded tile after the viewport changed
    Refit,
    /// Title words rising in
    TitleIn,
    /// Title words leaving
    TitleOut,
    /// Re-converging the ambient pan after an expansion
    PanSettle,
    /// Navigation label characters rising in at startup
    NavReveal,
}

pub trait Choreography: fmt::Debug {
    fn name(&self) -> &'static str;

    fn is_animated(&self) -> bool;

    fn timing(&self, transition: Transition) -> Timing;
}

/// Full motion design
#[derive(Debug, Clone, Copy, Default)]
pub struct Animated;

impl Choreography for Animated {
    fn name(&self) -> &'static str {
        "animated"
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn timing(&self, transition: Transition) -> Timing {
        match transition {
            Transition::InitialReveal => Timing::new(1300.0, Easing::Hop).with_stagger(15.0),
            Transition::Entrance => Timing::new(400.0, Easing::Hop),
            Transition::Hover => Timing::new(300.0, Easing::Power2Out),
            Transition::ImageFade => Timing::new(500.0, Easing::Power2Out),
            Transition::Backdrop => Timing::new(300.0, Easing::Power2Out),
            Transition::Flight => Timing::new(1000.0, Easing::Hop),
            Transition::Refit => Timing::new(300.0, Easing::Power2Out),
            Transition::TitleIn => Timing::new(800.0, Easing::Power3Out)
                .with_delay(500.0)
                .with_stagger(80.0),
            Transition::TitleOut => Timing::new(800.0, Easing::Power3Out).with_stagger(80.0),
            Transition::PanSettle => Timing::new(500.0, Easing::Power2Out),
            Transition::NavReveal => Timing::new(500.0, Easing::Power3Out)
                .with_delay(200.0)
                .with_stagger(80.0),
        }
    }
}

/// No-animation fallback: every transition completes instantly
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Choreography for Immediate {
    fn name(&self) -> &'static str {
        "immediate"
    }

    fn is_animated(&self) -> bool {
        false
    }

    fn timing(&self, _transition: Transition) -> Timing {
        Timing::IMMEDIATE
    }
}

/// Pick the strategy for this session.
/// `reduced_motion` is whatever the host reports (e.g. a media query on the web).
pub fn select(animations_enabled: bool, reduced_motion: bool) -> Box<dyn Choreography> {
    let choreography: Box<dyn Choreography> = if animations_enabled && !reduced_motion {
        Box::new(Animated)
    } else {
        Box::new(Immediate)
    };
    log::info!(
        "Choreography: {} (animations_enabled={}, reduced_motion={})",
        choreography.name(),
        animations_enabled,
        reduced_motion
    );
    choreography
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_falls_back_to_immediate() {
        assert!(select(true, false).is_animated());
        assert!(!select(false, false).is_animated());
        assert!(!select(true, true).is_animated());
    }

    #[test]
    fn immediate_has_no_duration() {
        for transition in [Transition::TitleIn, Transition::NavReveal] {
            let timing = Immediate.timing(transition);
            assert_eq!(timing.duration_ms, 0.0);
            assert_eq!(timing.delay_ms, 0.0);
            assert_eq!(timing.stagger_ms, 0.0);
        }
    }
}
