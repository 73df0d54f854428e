use std::collections::VecDeque;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfirmerError {
    #[error("temporal window must hold at least one frame")]
    EmptyWindow,
    #[error("confirm_frames ({confirm_frames}) cannot exceed the window ({window})")]
    UnreachableThreshold { window: usize, confirm_frames: usize },
}

/// Sliding-window debounce over per-frame hit flags.
///
/// Keeps the last `window` flags. A frame confirms when at least
/// `confirm_frames` of them are hits, and a confirmation empties the window,
/// so one sustained event fires once and the window must refill before the
/// next confirmation. With `confirm_frames == 0` every call confirms.
#[derive(Clone, Debug)]
pub struct TemporalConfirmer {
    flags: VecDeque<bool>,
    window: usize,
    confirm_frames: usize,
}

impl TemporalConfirmer {
    pub fn new(window: usize, confirm_frames: usize) -> Result<Self, ConfirmerError> {
        if window == 0 {
            return Err(ConfirmerError::EmptyWindow);
        }
        if confirm_frames > window {
            return Err(ConfirmerError::UnreachableThreshold {
                window,
                confirm_frames,
            });
        }
        Ok(Self {
            flags: VecDeque::with_capacity(window + 1),
            window,
            confirm_frames,
        })
    }

    /// Records one frame's hit flag and reports whether the event is confirmed.
    pub fn observe(&mut self, hit: bool) -> bool {
        self.flags.push_back(hit);
        if self.flags.len() > self.window {
            self.flags.pop_front();
        }

        let confirmed = self.hits() >= self.confirm_frames;
        if confirmed {
            self.flags.clear();
        }
        confirmed
    }

    /// Number of hits currently in the window.
    pub fn hits(&self) -> usize {
        self.flags.iter().filter(|&&hit| hit).count()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window
    }

    pub fn confirm_frames(&self) -> usize {
        self.confirm_frames
    }

    pub fn reset(&mut self) {
        self.flags.clear();
    }
}
