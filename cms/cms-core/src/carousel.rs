//! Carousel - slide position for the marketing slider and testimonials
//!
//! Pure state; the host calls [`Carousel::tick`] every
//! `CAROUSEL_INTERVAL_MS` and forwards clicks and video events.

use serde::{Deserialize, Serialize};

/// Slide position and auto-advance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carousel {
    len: usize,
    current: usize,
    auto_playing: bool,
    video_playing: bool,
    pause_on_manual: bool,
}

impl Carousel {
    /// Slider that stops auto-advancing once the visitor navigates by hand.
    #[must_use]
    pub fn slider(len: usize) -> Self {
        Self {
            len,
            current: 0,
            auto_playing: true,
            video_playing: false,
            pause_on_manual: true,
        }
    }

    /// Rotator that keeps auto-advancing regardless of manual navigation.
    #[must_use]
    pub fn rotator(len: usize) -> Self {
        Self {
            pause_on_manual: false,
            ..Self::slider(len)
        }
    }

    /// Current slide.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of slides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no slides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next tick will advance.
    #[must_use]
    pub fn is_auto_playing(&self) -> bool {
        self.auto_playing && !self.video_playing && self.len > 0
    }

    /// Interval elapsed. Returns whether the slide changed.
    pub fn tick(&mut self) -> bool {
        if !self.is_auto_playing() {
            return false;
        }
        self.advance();
        true
    }

    /// Next slide, wrapping.
    pub fn next(&mut self) {
        self.advance();
        self.manual();
    }

    /// Previous slide, wrapping.
    pub fn prev(&mut self) {
        if self.len > 0 {
            self.current = (self.current + self.len - 1) % self.len;
        }
        self.manual();
    }

    /// Jump to a slide. Returns `false` if out of range.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.current = index;
        self.manual();
        true
    }

    /// A video slide started playing; ticks are ignored until it ends.
    pub fn video_started(&mut self) {
        self.video_playing = true;
    }

    /// The playing video ended; move on.
    pub fn video_ended(&mut self) {
        self.video_playing = false;
        self.advance();
    }

    fn advance(&mut self) {
        if self.len > 0 {
            self.current = (self.current + 1) % self.len;
        }
    }

    fn manual(&mut self) {
        if self.pause_on_manual {
            self.auto_playing = false;
        }
    }
}
