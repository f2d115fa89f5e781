//! Frame timing.
//!
//! [`FrameClock`] turns a monotonically increasing elapsed time into one
//! `(elapsed, delta)` pair per frame. The wall clock lives in [`Stopwatch`]
//! so the arithmetic can be driven with synthetic timestamps.

use instant::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Time since the loop started.
    pub elapsed: Duration,
    /// Time since the previous frame.
    pub delta: Duration,
}

#[derive(Debug, Default)]
pub struct FrameClock {
    last_elapsed: Duration,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `elapsed`. A timestamp older than the previous one
    /// yields a zero delta instead of going backwards.
    pub fn advance(&mut self, elapsed: Duration) -> FrameTime {
        let elapsed = elapsed.max(self.last_elapsed);
        let delta = elapsed - self.last_elapsed;
        self.last_elapsed = elapsed;
        self.frames += 1;
        FrameTime { elapsed, delta }
    }

    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Wall-clock source for [`FrameClock::advance`].
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}
