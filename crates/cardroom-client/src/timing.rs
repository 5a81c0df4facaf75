//! Transition timing for staggered seat animations.
//!
//! A view plays its transitions seat by seat, each starting `stagger`
//! after the previous one. The final state of the view is applied once,
//! after [`TransitionTiming::settle_delay`], instead of being re-applied
//! on every animation frame.

use std::time::Duration;

/// Durations of the seat transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTiming {
    /// A card landing on the table.
    pub throw: Duration,
    /// A card turning face up.
    pub flip: Duration,
    /// Offset between consecutive seats.
    pub stagger: Duration,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            throw: Duration::from_millis(500),
            flip: Duration::from_millis(600),
            stagger: Duration::from_millis(100),
        }
    }
}

impl TransitionTiming {
    /// No animation at all; views settle immediately.
    pub const INSTANT: Self = Self {
        throw: Duration::ZERO,
        flip: Duration::ZERO,
        stagger: Duration::ZERO,
    };

    /// When the `index`-th animated seat starts.
    pub fn start_offset(&self, index: usize) -> Duration {
        self.stagger.saturating_mul(saturating_u32(index))
    }

    /// Time until a transition over `animated` seats has finished:
    /// the last seat's start offset plus the longest single transition.
    pub fn settle_delay(&self, animated: usize) -> Duration {
        match animated {
            0 => Duration::ZERO,
            n => self
                .start_offset(n - 1)
                .saturating_add(self.throw.max(self.flip)),
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
