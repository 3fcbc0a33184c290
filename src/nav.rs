// Startup reveal of the navigation label, one character at a time

use crate::strategy::{Choreography, Transition};
use crate::tween::Tween;

/// One character of the label as drawn this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    /// Vertical offset in line heights: 1 is a full line below, 0 in place
    pub rise: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy)]
struct Character {
    ch: char,
    rise: Tween,
    opacity: Tween,
}

/// Characters rise into place from one line below while fading in, staggered
/// left to right. Whitespace keeps its slot but takes no part in the stagger.
#[derive(Debug, Clone)]
pub struct NavReveal {
    characters: Vec<Character>,
    end_ms: f64,
}

impl NavReveal {
    pub fn new(label: &str, choreography: &dyn Choreography, now_ms: f64) -> Self {
        let timing = choreography.timing(Transition::NavReveal);
        let mut visible = 0;
        let characters = label
            .chars()
            .map(|ch| {
                if ch.is_whitespace() {
                    return Character {
                        ch,
                        rise: Tween::settled(0.0),
                        opacity: Tween::settled(1.0),
                    };
                }
                let nth = timing.nth(visible);
                visible += 1;
                Character {
                    ch,
                    rise: nth.tween(1.0, 0.0, now_ms),
                    opacity: nth.tween(0.0, 1.0, now_ms),
                }
            })
            .collect();

        let end_ms = if visible == 0 {
            now_ms
        } else {
            timing.group_end_ms(now_ms, visible)
        };
        log::debug!("Nav reveal: {} characters, done at {:.0}ms", visible, end_ms);
        Self { characters, end_ms }
    }

    pub fn label(&self) -> String {
        self.characters.iter().map(|c| c.ch).collect()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn is_done(&self, now_ms: f64) -> bool {
        now_ms >= self.end_ms
    }

    pub fn glyphs(&self, now_ms: f64) -> Vec<Glyph> {
        self.characters
            .iter()
            .map(|c| Glyph {
                ch: c.ch,
                rise: c.rise.sample(now_ms),
                opacity: c.opacity.sample(now_ms),
            })
            .collect()
    }
}
