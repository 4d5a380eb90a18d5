//! Landmark fusion
//!
//! Combines one frame of raw detections with the previous stabilized frame:
//! fallback to last-valid values, movement gating, left/right assignment.
//!
//! Laterality assumes a mirrored (selfie) view: the hand with the smaller
//! screen x is the user's left.

use serde::{Deserialize, Serialize};

use ringside_core::Point3;

use crate::geometry::{
    hand_center, hand_state, head_rotation_2d, is_valid_movement, skeleton_rotation,
    HAND_MAX_MOVEMENT, HEAD_MAX_MOVEMENT,
};
use crate::landmarks::face_index;
use crate::{
    HandLandmarks, HandPose, HandState, HeadPose, LastValidLandmarks, PoseSemantics,
    RawFrameDetections, StabilizedLandmarks,
};

/// Fusion configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Movement gate ceiling for the head
    pub head_max_movement: f32,
    /// Movement gate ceiling for each hand
    pub hand_max_movement: f32,
    /// Screen x below which a lone hand is taken as the right hand
    pub single_hand_split_x: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            head_max_movement: HEAD_MAX_MOVEMENT,
            hand_max_movement: HAND_MAX_MOVEMENT,
            single_hand_split_x: 0.5,
        }
    }
}

/// Result of fusing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOutput {
    pub stable: StabilizedLandmarks,
    /// Absent when no body was detected this frame
    pub pose: Option<PoseSemantics>,
    pub last_valid: LastValidLandmarks,
}

/// A hand slot before it has been assigned a side
#[derive(Debug, Clone, Copy)]
struct ProvisionalHand {
    pose: HandPose,
    /// Backed by a skeleton from this frame, not carried over
    detected: bool,
}

/// Fuse one frame of detections
///
/// Total and pure: the output depends only on the arguments, and every
/// field of `stable` is populated (possibly stale or zero).
pub fn fuse(
    raw: &RawFrameDetections,
    prev: Option<&StabilizedLandmarks>,
    last_valid: &LastValidLandmarks,
    config: &FusionConfig,
) -> FusionOutput {
    // Head
    let head = detect_head(&raw.face)
        .or(last_valid.head)
        .unwrap_or_default();

    // Hands, detector slot order
    let slot_fallbacks = [last_valid.left_hand, last_valid.right_hand];
    let mut slots =
        [0usize, 1].map(|i| provisional_hand(raw.hands.get(i), slot_fallbacks[i].as_ref()));

    // Movement gate
    let head = match prev {
        Some(prev) => gate_head(head, &prev.head, config.head_max_movement),
        None => head,
    };
    if let Some(prev) = prev {
        let prev_hands = [prev.left_hand, prev.right_hand];
        for (slot, prev_hand) in slots.iter_mut().zip(prev_hands.iter()) {
            slot.pose = gate_hand(slot.pose, prev_hand, config.hand_max_movement);
        }
    }

    // Laterality
    let (left_hand, right_hand) = assign_sides(slots, config.single_hand_split_x);

    let stable = StabilizedLandmarks {
        head,
        left_hand,
        right_hand,
    };

    let pose = PoseSemantics::from_pose_points(&raw.pose);

    let mut last_valid = *last_valid;
    last_valid.update(&stable);

    FusionOutput {
        stable,
        pose,
        last_valid,
    }
}

fn detect_head(face: &[Point3]) -> Option<HeadPose> {
    let position = face
        .get(face_index::NOSE_BRIDGE)
        .copied()
        .filter(Point3::is_finite)?;
    Some(HeadPose::new(position, head_rotation_2d(face)))
}

fn provisional_hand(hand: Option<&HandLandmarks>, fallback: Option<&HandPose>) -> ProvisionalHand {
    let Some(hand) = hand else {
        return ProvisionalHand {
            pose: fallback.copied().unwrap_or_else(HandPose::zero),
            detected: false,
        };
    };

    let center = hand_center(hand)
        .or_else(|| fallback.and_then(|f| f.center))
        .unwrap_or(Point3::ZERO);
    let rotation = skeleton_rotation(hand)
        .or_else(|| fallback.map(|f| f.rotation))
        .unwrap_or([0.0, 0.0]);
    let state = hand_state(hand)
        .or_else(|| fallback.map(|f| f.state))
        .unwrap_or(HandState::Open);

    ProvisionalHand {
        pose: HandPose::new(center, rotation, state),
        detected: true,
    }
}

fn gate_head(new: HeadPose, prev: &HeadPose, max_distance: f32) -> HeadPose {
    if is_valid_movement(Some(prev.position), Some(new.position), max_distance) {
        new
    } else {
        *prev
    }
}

fn gate_hand(new: HandPose, prev: &HandPose, max_distance: f32) -> HandPose {
    if is_valid_movement(prev.center, new.center, max_distance) {
        new
    } else {
        *prev
    }
}

/// Turn detector slots into (left, right)
///
/// Two fresh hands are ordered by screen x. A single fresh hand is placed
/// by the split threshold and the other side becomes the placeholder.
/// Without fresh hands the carried-over values keep their sides.
fn assign_sides(slots: [ProvisionalHand; 2], split_x: f32) -> (HandPose, HandPose) {
    let fresh: Vec<(HandPose, Point3)> = slots
        .iter()
        .filter(|s| s.detected)
        .filter_map(|s| s.pose.center.map(|c| (s.pose, c)))
        .collect();

    match fresh.as_slice() {
        [(a, ca), (b, cb)] => {
            let a_first = ca
                .x
                .total_cmp(&cb.x)
                .then(ca.y.total_cmp(&cb.y))
                .then(ca.z.total_cmp(&cb.z))
                .is_le();
            if a_first {
                (*a, *b)
            } else {
                (*b, *a)
            }
        }
        [(only, center)] => {
            if center.x < split_x {
                (HandPose::placeholder(), *only)
            } else {
                (*only, HandPose::placeholder())
            }
        }
        _ => (slots[0].pose, slots[1].pose),
    }
}

/// Per-session fusion state
///
/// Owns the previous stabilized frame and the last-valid shadow copy so
/// that each capture session carries its own history.
#[derive(Debug, Clone, Default)]
pub struct FusionSession {
    config: FusionConfig,
    prev: Option<StabilizedLandmarks>,
    last_valid: LastValidLandmarks,
    frames: u64,
}

impl FusionSession {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            prev: None,
            last_valid: LastValidLandmarks::default(),
            frames: 0,
        }
    }

    /// Fuse one frame and advance the session
    pub fn step(&mut self, raw: &RawFrameDetections) -> FusionOutput {
        let output = fuse(raw, self.prev.as_ref(), &self.last_valid, &self.config);
        self.prev = Some(output.stable);
        self.last_valid = output.last_valid;
        self.frames += 1;
        output
    }

    /// Forget all history, as at the start of a new capture session
    pub fn reset(&mut self) {
        self.prev = None;
        self.last_valid = LastValidLandmarks::default();
        self.frames = 0;
    }

    pub fn previous(&self) -> Option<&StabilizedLandmarks> {
        self.prev.as_ref()
    }

    pub fn last_valid(&self) -> &LastValidLandmarks {
        &self.last_valid
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Frames fused since the last reset
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
