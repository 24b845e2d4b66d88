use parking_lot::Mutex;

use crate::comment::Comment;

pub trait Playhead: Send + Sync {
    fn position(&self) -> f64;
    fn seek(&self, seconds: f64);
    fn pause(&self);
    fn is_paused(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PlayheadState {
    position: f64,
    paused: bool,
}

#[derive(Debug)]
pub struct ManualPlayhead {
    state: Mutex<PlayheadState>,
}

impl ManualPlayhead {
    pub fn at(seconds: f64) -> Self {
        Self {
            state: Mutex::new(PlayheadState {
                position: seconds.max(0.0),
                paused: false,
            }),
        }
    }

    pub fn play(&self) {
        self.state.lock().paused = false;
    }
}

impl Default for ManualPlayhead {
    fn default() -> Self {
        Self::at(0.0)
    }
}

impl Playhead for ManualPlayhead {
    fn position(&self) -> f64 {
        self.state.lock().position
    }

    fn seek(&self, seconds: f64) {
        self.state.lock().position = seconds.max(0.0);
    }

    fn pause(&self) {
        self.state.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}

// Click-to-seek. General comments have no anchor and leave the player alone.
pub fn seek_to_comment(playhead: &dyn Playhead, comment: &Comment) -> Option<f64> {
    if comment.is_general() {
        return None;
    }
    playhead.pause();
    playhead.seek(comment.timestamp);
    Some(comment.timestamp)
}
