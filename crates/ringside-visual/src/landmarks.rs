//! Landmark data model
//!
//! Raw per-frame detector output on one side, the stabilized semantic
//! record (head, left hand, right hand) on the other.

use ringside_core::Point3;

/// Face mesh indices with fixed meaning
pub mod face_index {
    /// Nose-bridge proxy used as the head position
    pub const NOSE_BRIDGE: usize = 1;
    pub const LEFT_EYE: usize = 33;
    pub const RIGHT_EYE: usize = 263;
}

/// Hand skeleton indices (21-point hand model)
pub mod hand_index {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

    /// Points per hand skeleton
    pub const COUNT: usize = 21;
}

/// Body pose landmarks carried in the pose semantics block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    Nose,
    RightEye,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftIndex,
    RightIndex,
}

impl PoseLandmark {
    /// All landmarks in wire order
    pub fn all() -> &'static [PoseLandmark] {
        &[
            PoseLandmark::Nose,
            PoseLandmark::RightEye,
            PoseLandmark::LeftShoulder,
            PoseLandmark::RightShoulder,
            PoseLandmark::LeftElbow,
            PoseLandmark::RightElbow,
            PoseLandmark::LeftWrist,
            PoseLandmark::RightWrist,
            PoseLandmark::LeftIndex,
            PoseLandmark::RightIndex,
        ]
    }

    /// Number of landmarks
    pub fn count() -> usize {
        10
    }

    /// Index into the body pose detector output
    pub fn source_index(self) -> usize {
        match self {
            PoseLandmark::Nose => 0,
            PoseLandmark::RightEye => 2,
            PoseLandmark::LeftShoulder => 11,
            PoseLandmark::RightShoulder => 12,
            PoseLandmark::LeftElbow => 13,
            PoseLandmark::RightElbow => 14,
            PoseLandmark::LeftWrist => 15,
            PoseLandmark::RightWrist => 16,
            PoseLandmark::LeftIndex => 19,
            PoseLandmark::RightIndex => 20,
        }
    }
}

/// One detected hand skeleton
///
/// The detector's handedness label is not trusted, so a skeleton carries
/// no identity. Points are addressed by `hand_index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandLandmarks {
    points: Vec<Point3>,
}

impl HandLandmarks {
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Point at `index`; non-finite coordinates count as missing
    pub fn get(&self, index: usize) -> Option<Point3> {
        self.points.get(index).copied().filter(Point3::is_finite)
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }
}

impl From<Vec<Point3>> for HandLandmarks {
    fn from(points: Vec<Point3>) -> Self {
        Self::new(points)
    }
}

/// One frame of raw detector output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFrameDetections {
    /// Face mesh points, empty if no face was found
    pub face: Vec<Point3>,
    /// Zero to two hand skeletons in arbitrary order
    pub hands: Vec<HandLandmarks>,
    /// First detected body's pose points, empty if no body was found
    pub pose: Vec<Point3>,
}

impl RawFrameDetections {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.face.is_empty() && self.hands.is_empty() && self.pose.is_empty()
    }
}

/// Head position and rotation `[0, yaw_deg, roll_deg]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadPose {
    pub position: Point3,
    pub rotation: [f32; 3],
}

impl HeadPose {
    pub fn new(position: Point3, rotation: [f32; 3]) -> Self {
        Self { position, rotation }
    }
}

/// Open / closed classification of a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HandState {
    /// Open hand or unknown
    #[default]
    Open = 0,
    /// Fist with knuckles facing the camera
    FistFront = 1,
    /// Fist with the back of the hand facing the camera
    FistBack = 2,
}

impl HandState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HandState::Open),
            1 => Some(HandState::FistFront),
            2 => Some(HandState::FistBack),
            _ => None,
        }
    }
}

/// Hand center, rotation `[pitch, yaw]` (radians) and state
///
/// A `None` center marks the placeholder used for the unseen side when only
/// one hand is visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub center: Option<Point3>,
    pub rotation: [f32; 2],
    pub state: HandState,
}

impl HandPose {
    pub fn new(center: Point3, rotation: [f32; 2], state: HandState) -> Self {
        Self {
            center: Some(center),
            rotation,
            state,
        }
    }

    /// Zero default used when nothing better is known
    pub fn zero() -> Self {
        Self::new(Point3::ZERO, [0.0, 0.0], HandState::Open)
    }

    /// Explicit "this hand is not visible" marker
    pub fn placeholder() -> Self {
        Self {
            center: None,
            rotation: [0.0, 0.0],
            state: HandState::Open,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.center.is_none()
    }
}

impl Default for HandPose {
    fn default() -> Self {
        Self::zero()
    }
}

/// Which side a hand has been assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Laterality {
    Left,
    Right,
}

/// Stabilized head and hand state for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StabilizedLandmarks {
    pub head: HeadPose,
    pub left_hand: HandPose,
    pub right_hand: HandPose,
}

impl StabilizedLandmarks {
    pub fn hand(&self, side: Laterality) -> &HandPose {
        match side {
            Laterality::Left => &self.left_hand,
            Laterality::Right => &self.right_hand,
        }
    }

    /// Number of hands with a known position
    pub fn visible_hands(&self) -> usize {
        [&self.left_hand, &self.right_hand]
            .iter()
            .filter(|h| !h.is_placeholder())
            .count()
    }
}

/// Most recent non-degenerate value of each feature
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastValidLandmarks {
    pub head: Option<HeadPose>,
    pub left_hand: Option<HandPose>,
    pub right_hand: Option<HandPose>,
}

impl LastValidLandmarks {
    /// Record every non-placeholder field of `stable`
    ///
    /// Placeholder hands leave the previous entry untouched.
    pub fn update(&mut self, stable: &StabilizedLandmarks) {
        self.head = Some(stable.head);
        if !stable.left_hand.is_placeholder() {
            self.left_hand = Some(stable.left_hand);
        }
        if !stable.right_hand.is_placeholder() {
            self.right_hand = Some(stable.right_hand);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.left_hand.is_none() && self.right_hand.is_none()
    }
}

/// Body pose subset copied verbatim from the pose detector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseSemantics {
    pub nose: Point3,
    pub right_eye: Point3,
    pub left_shoulder: Point3,
    pub right_shoulder: Point3,
    pub left_elbow: Point3,
    pub right_elbow: Point3,
    pub left_wrist: Point3,
    pub right_wrist: Point3,
    pub left_index: Point3,
    pub right_index: Point3,
}

impl PoseSemantics {
    /// Extract the fixed-index subset, `None` if any point is missing or
    /// non-finite
    pub fn from_pose_points(points: &[Point3]) -> Option<Self> {
        let at = |landmark: PoseLandmark| {
            points
                .get(landmark.source_index())
                .copied()
                .filter(Point3::is_finite)
        };
        Some(PoseSemantics {
            nose: at(PoseLandmark::Nose)?,
            right_eye: at(PoseLandmark::RightEye)?,
            left_shoulder: at(PoseLandmark::LeftShoulder)?,
            right_shoulder: at(PoseLandmark::RightShoulder)?,
            left_elbow: at(PoseLandmark::LeftElbow)?,
            right_elbow: at(PoseLandmark::RightElbow)?,
            left_wrist: at(PoseLandmark::LeftWrist)?,
            right_wrist: at(PoseLandmark::RightWrist)?,
            left_index: at(PoseLandmark::LeftIndex)?,
            right_index: at(PoseLandmark::RightIndex)?,
        })
    }

    /// Build from points in wire order
    pub fn from_ordered(points: [Point3; 10]) -> Self {
        let [
            nose,
            right_eye,
            left_shoulder,
            right_shoulder,
            left_elbow,
            right_elbow,
            left_wrist,
            right_wrist,
            left_index,
            right_index,
        ] = points;
        PoseSemantics {
            nose,
            right_eye,
            left_shoulder,
            right_shoulder,
            left_elbow,
            right_elbow,
            left_wrist,
            right_wrist,
            left_index,
            right_index,
        }
    }

    /// Points in wire order
    pub fn to_ordered(&self) -> [Point3; 10] {
        [
            self.nose,
            self.right_eye,
            self.left_shoulder,
            self.right_shoulder,
            self.left_elbow,
            self.right_elbow,
            self.left_wrist,
            self.right_wrist,
            self.left_index,
            self.right_index,
        ]
    }

    pub fn get(&self, landmark: PoseLandmark) -> Point3 {
        match landmark {
            PoseLandmark::Nose => self.nose,
            PoseLandmark::RightEye => self.right_eye,
            PoseLandmark::LeftShoulder => self.left_shoulder,
            PoseLandmark::RightShoulder => self.right_shoulder,
            PoseLandmark::LeftElbow => self.left_elbow,
            PoseLandmark::RightElbow => self.right_elbow,
            PoseLandmark::LeftWrist => self.left_wrist,
            PoseLandmark::RightWrist => self.right_wrist,
            PoseLandmark::LeftIndex => self.left_index,
            PoseLandmark::RightIndex => self.right_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_pose_semantics_from_fixed_indices() {
        let pose = PoseSemantics::from_pose_points(&body(33)).unwrap();

        for &landmark in PoseLandmark::all() {
            assert_eq!(pose.get(landmark).x, landmark.source_index() as f32);
        }
    }

    #[test]
    fn test_pose_semantics_short_body() {
        assert!(PoseSemantics::from_pose_points(&body(20)).is_none());
        assert!(PoseSemantics::from_pose_points(&[]).is_none());
    }

    #[test]
    fn test_ordered_matches_landmark_order() {
        let pose = PoseSemantics::from_pose_points(&body(33)).unwrap();
        let ordered = pose.to_ordered();
        for (i, &landmark) in PoseLandmark::all().iter().enumerate() {
            assert_eq!(ordered[i], pose.get(landmark));
        }
        assert_eq!(PoseSemantics::from_ordered(ordered), pose);
        assert_eq!(PoseLandmark::all().len(), PoseLandmark::count());
    }

    #[test]
    fn test_hand_state_codes() {
        for state in [HandState::Open, HandState::FistFront, HandState::FistBack] {
            assert_eq!(HandState::from_code(state.code()), Some(state));
        }
        assert_eq!(HandState::from_code(3), None);
    }

    #[test]
    fn test_last_valid_keeps_entry_for_placeholder() {
        let mut last = LastValidLandmarks::default();
        let seen = HandPose::new(Point3::new(0.7, 0.4, 0.0), [0.1, 0.2], HandState::FistFront);

        last.update(&StabilizedLandmarks {
            head: HeadPose::default(),
            left_hand: seen,
            right_hand: HandPose::zero(),
        });
        last.update(&StabilizedLandmarks {
            head: HeadPose::default(),
            left_hand: HandPose::placeholder(),
            right_hand: HandPose::zero(),
        });

        assert_eq!(last.left_hand, Some(seen));
        assert!(last.head.is_some());
    }

    #[test]
    fn test_visible_hands() {
        let stable = StabilizedLandmarks {
            left_hand: HandPose::placeholder(),
            ..Default::default()
        };
        assert_eq!(stable.visible_hands(), 1);
        assert!(stable.hand(Laterality::Left).is_placeholder());
    }
}
