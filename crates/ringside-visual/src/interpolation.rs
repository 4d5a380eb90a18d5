//! Temporal interpolation between detection frames
//!
//! When full detection only runs on some display frames, the frames in
//! between are filled by interpolating between the last two fused results.
//! Hand state is discrete and never blended. Pose semantics are not
//! interpolated at all.

use ringside_core::lerp;

use crate::{HandPose, HeadPose, StabilizedLandmarks};

/// Interpolate between two stabilized frames
///
/// `t` is clamped to `[0, 1]`. Every coordinate lies between the two
/// inputs. Hand state is taken from `from` until `t` reaches 1.
pub fn interpolate_landmarks(
    from: &StabilizedLandmarks,
    to: &StabilizedLandmarks,
    t: f32,
) -> StabilizedLandmarks {
    let t = t.clamp(0.0, 1.0);

    StabilizedLandmarks {
        head: interpolate_head(&from.head, &to.head, t),
        left_hand: interpolate_hand(&from.left_hand, &to.left_hand, t),
        right_hand: interpolate_hand(&from.right_hand, &to.right_hand, t),
    }
}

fn interpolate_head(from: &HeadPose, to: &HeadPose, t: f32) -> HeadPose {
    HeadPose {
        position: from.position.lerp(&to.position, t),
        rotation: [
            lerp(from.rotation[0], to.rotation[0], t),
            lerp(from.rotation[1], to.rotation[1], t),
            lerp(from.rotation[2], to.rotation[2], t),
        ],
    }
}

fn interpolate_hand(from: &HandPose, to: &HandPose, t: f32) -> HandPose {
    let center = match (from.center, to.center) {
        (Some(a), Some(b)) => Some(a.lerp(&b, t)),
        // Hand came into view: show it right away
        (None, Some(b)) => Some(b),
        (Some(a), None) => {
            if t < 1.0 {
                Some(a)
            } else {
                None
            }
        }
        (None, None) => None,
    };

    HandPose {
        center,
        rotation: [
            lerp(from.rotation[0], to.rotation[0], t),
            lerp(from.rotation[1], to.rotation[1], t),
        ],
        state: if t < 1.0 { from.state } else { to.state },
    }
}

/// Holds the last two detection results and samples between them
#[derive(Debug, Clone, Default)]
pub struct LandmarkInterpolator {
    /// Detection before the latest one
    previous: Option<StabilizedLandmarks>,
    /// Most recent detection
    latest: Option<StabilizedLandmarks>,
}

impl LandmarkInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly fused detection
    pub fn push(&mut self, stable: StabilizedLandmarks) {
        self.previous = self.latest.take();
        self.latest = Some(stable);
    }

    /// Blend from `from` (usually what is on screen) toward `target`
    pub fn retarget(&mut self, from: StabilizedLandmarks, target: StabilizedLandmarks) {
        self.previous = Some(from);
        self.latest = Some(target);
    }

    /// Sample at `t` in `[0, 1]` from the previous to the latest detection
    ///
    /// With a single detection recorded, that detection is returned as is.
    pub fn sample(&self, t: f32) -> Option<StabilizedLandmarks> {
        let latest = self.latest.as_ref()?;
        match self.previous.as_ref() {
            Some(previous) => Some(interpolate_landmarks(previous, latest, t)),
            None => Some(*latest),
        }
    }

    pub fn latest(&self) -> Option<&StabilizedLandmarks> {
        self.latest.as_ref()
    }

    pub fn clear(&mut self) {
        self.previous = None;
        self.latest = None;
    }

    /// Is there anything to sample?
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}
