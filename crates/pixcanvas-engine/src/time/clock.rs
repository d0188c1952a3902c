use std::time::{Duration, Instant};

/// Timing of one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Seconds since the clock started, summed from clamped deltas.
    pub elapsed: f64,
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

impl FrameTime {
    /// Whole steps of a `rate_hz` timer since the clock started.
    ///
    /// Feed this to [`AnimationHandle::frame`](crate::sheet::AnimationHandle::frame)
    /// for animations that play at a fixed rate regardless of the display rate.
    #[inline]
    pub fn ticks(&self, rate_hz: f64) -> usize {
        if rate_hz <= 0.0 || !rate_hz.is_finite() {
            return 0;
        }
        (self.elapsed * rate_hz).floor() as usize
    }
}

/// Produces a [`FrameTime`] per presented frame.
///
/// Deltas are clamped so a debugger pause or a minimized window does not make
/// animations jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            last: now,
            elapsed: 0.0,
            frame_index: 0,
            dt_max: Duration::from_millis(250),
        }
    }

    /// Re-bases the clock, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now.saturating_duration_since(self.last).min(self.dt_max);
        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_count_frames_and_time() {
        let t0 = Instant::now();
        let mut c = FrameClock::starting_at(t0);
        let a = c.tick_at(t0 + Duration::from_millis(100));
        let b = c.tick_at(t0 + Duration::from_millis(150));
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!((b.elapsed - 0.15).abs() < 1e-9);
        assert!((b.dt - 0.05).abs() < 1e-6);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let t0 = Instant::now();
        let mut c = FrameClock::starting_at(t0);
        let ft = c.tick_at(t0 + Duration::from_secs(10));
        assert!((ft.dt - 0.25).abs() < 1e-6);
        assert!((ft.elapsed - 0.25).abs() < 1e-9);
    }

    #[test]
    fn fixed_rate_ticks() {
        let ft = FrameTime { dt: 0.016, elapsed: 1.26, frame_index: 75 };
        assert_eq!(ft.ticks(10.0), 12);
        assert_eq!(ft.ticks(0.0), 0);
        assert_eq!(ft.ticks(f64::NAN), 0);
    }
}
