//! Detection rate limiting

use std::time::Duration;

use ringside_core::FrameTime;

/// Admits at most one frame per `min_interval`
///
/// Frames arriving too early are dropped, not queued; the most recent
/// frame always wins. A timestamp earlier than the last admitted one means
/// the host clock restarted, and re-arms the gate.
#[derive(Clone, Debug)]
pub struct RateGate {
    min_interval: Duration,
    last: Option<FrameTime>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Admit a frame at `now`, recording it as the last processed frame
    pub fn admit(&mut self, now: FrameTime) -> bool {
        match self.last {
            Some(last) if now >= last && now - last < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Fraction of the interval elapsed since the last admitted frame, in [0, 1]
    pub fn progress(&self, now: FrameTime) -> f32 {
        let Some(last) = self.last else {
            return 1.0;
        };
        if self.min_interval.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_since(last).as_secs_f64();
        (elapsed / self.min_interval.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    pub fn last_admitted(&self) -> Option<FrameTime> {
        self.last
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_frame_admitted() {
        let mut gate = RateGate::new(Duration::from_millis(33));
        assert!(gate.admit(FrameTime::from_millis(5)));
        assert_eq!(gate.last_admitted(), Some(FrameTime::from_millis(5)));
    }

    #[test]
    fn test_early_frames_dropped() {
        let mut gate = RateGate::new(Duration::from_millis(100));
        assert!(gate.admit(FrameTime::from_millis(0)));
        assert!(!gate.admit(FrameTime::from_millis(50)));
        assert!(!gate.admit(FrameTime::from_millis(99)));
        assert!(gate.admit(FrameTime::from_millis(100)));
        assert_eq!(gate.last_admitted(), Some(FrameTime::from_millis(100)));
    }

    #[test]
    fn test_clock_restart_rearms() {
        let mut gate = RateGate::new(Duration::from_millis(10));
        assert!(gate.admit(FrameTime::from_millis(5000)));
        assert!(gate.admit(FrameTime::from_millis(20)));
        assert_eq!(gate.last_admitted(), Some(FrameTime::from_millis(20)));
        assert!(!gate.admit(FrameTime::from_millis(25)));
        assert!(gate.admit(FrameTime::from_millis(30)));
    }

    #[test]
    fn test_progress() {
        let mut gate = RateGate::new(Duration::from_millis(100));
        assert_eq!(gate.progress(FrameTime::ZERO), 1.0);
        gate.admit(FrameTime::ZERO);
        assert!((gate.progress(FrameTime::from_millis(25)) - 0.25).abs() < 1e-6);
        assert_eq!(gate.progress(FrameTime::from_millis(400)), 1.0);
        gate.reset();
        assert_eq!(gate.last_admitted(), None);
    }

    proptest! {
        #[test]
        fn prop_admitted_frames_bounded(
            min_ms in 1u64..200,
            step_ms in 1u64..200,
            count in 1usize..200,
        ) {
            let mut gate = RateGate::new(Duration::from_millis(min_ms));
            let admitted = (0..count)
                .filter(|i| gate.admit(FrameTime::from_millis((*i as u64 * step_ms) as i64)))
                .count();
            let elapsed = (count as u64 - 1) * step_ms;
            prop_assert!(admitted as u64 <= elapsed / min_ms + 1);
        }
    }
}
