//! Geometry utilities
//!
//! Pure functions over detector points: distances, the movement gate,
//! head and hand rotation, hand center and open/fist classification.

use ringside_core::Point3;

use crate::landmarks::{face_index, hand_index};
use crate::{HandLandmarks, HandState};

/// Largest plausible head displacement between two processed frames
pub const HEAD_MAX_MOVEMENT: f32 = 0.8;

/// Largest plausible hand displacement between two processed frames
pub const HAND_MAX_MOVEMENT: f32 = 2.9;

/// Fingertip-to-wrist distance below which a finger counts as curled
pub const FIST_THRESHOLD: f32 = 0.1;

/// Euclidean distance between two points
pub fn distance_3d(a: impl Into<Point3>, b: impl Into<Point3>) -> f32 {
    a.into().distance(&b.into())
}

/// Movement gate
///
/// True when either point is unknown, otherwise true iff the displacement
/// stays within `max_distance`.
pub fn is_valid_movement(prev: Option<Point3>, current: Option<Point3>, max_distance: f32) -> bool {
    match (prev, current) {
        (Some(prev), Some(current)) => distance_3d(prev, current) <= max_distance,
        _ => true,
    }
}

/// Head rotation `[0, yaw_deg, roll_deg]` from the eye-corner pair
///
/// Yaw and roll are both taken from the eye-to-eye angle. Avatar rigs
/// downstream are tuned against this, so roll is not derived separately.
pub fn head_rotation_2d(face: &[Point3]) -> [f32; 3] {
    let eye = |index: usize| face.get(index).copied().filter(Point3::is_finite);
    let (Some(left), Some(right)) = (eye(face_index::LEFT_EYE), eye(face_index::RIGHT_EYE)) else {
        return [0.0, 0.0, 0.0];
    };

    let angle = (right.y - left.y).atan2(right.x - left.x).to_degrees();
    [0.0, angle, angle]
}

/// Hand rotation `[pitch, yaw]` in radians
pub fn hand_rotation(wrist: Point3, index_mcp: Point3, pinky_mcp: Point3, middle_pip: Point3) -> [f32; 2] {
    let pitch = (middle_pip.y - wrist.y).atan2(middle_pip.x - wrist.x);
    let yaw = (index_mcp.x - pinky_mcp.x).atan2(index_mcp.y - pinky_mcp.y);
    [pitch, yaw]
}

/// Hand rotation looked up from a skeleton, `None` if a joint is missing
pub fn skeleton_rotation(hand: &HandLandmarks) -> Option<[f32; 2]> {
    Some(hand_rotation(
        hand.get(hand_index::WRIST)?,
        hand.get(hand_index::INDEX_MCP)?,
        hand.get(hand_index::PINKY_MCP)?,
        hand.get(hand_index::MIDDLE_PIP)?,
    ))
}

/// Hand anchor: midpoint of index MCP and pinky PIP
///
/// Anchoring away from the wrist keeps wrist rotation from showing up as
/// positional jitter.
pub fn hand_center(hand: &HandLandmarks) -> Option<Point3> {
    let index_mcp = hand.get(hand_index::INDEX_MCP)?;
    let pinky_pip = hand.get(hand_index::PINKY_PIP)?;
    Some(index_mcp.midpoint(&pinky_pip))
}

/// Open / fist-front / fist-back classification
///
/// A fist needs all five fingertips within `FIST_THRESHOLD` of the wrist.
/// Front versus back is decided by the angle between the wrist-to-index-MCP
/// vector and the z axis. `None` if a required joint is missing.
pub fn hand_state(hand: &HandLandmarks) -> Option<HandState> {
    let wrist = hand.get(hand_index::WRIST)?;

    let mut is_fist = true;
    for &tip in &hand_index::FINGERTIPS {
        if distance_3d(hand.get(tip)?, wrist) >= FIST_THRESHOLD {
            is_fist = false;
        }
    }
    if !is_fist {
        return Some(HandState::Open);
    }

    let knuckle = hand.get(hand_index::INDEX_MCP)? - wrist;
    // NaN for a zero-length vector, which lands on FistBack
    let angle = (knuckle.z / knuckle.length()).acos().to_degrees();

    if angle < 90.0 {
        Some(HandState::FistFront)
    } else {
        Some(HandState::FistBack)
    }
}
