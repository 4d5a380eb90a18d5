//! Landmark encoding - fixed-width layout for the shared result buffer
//!
//! Every encoded frame is exactly 50 scalars:
//!
//! ```text
//! [0]       landmarks present (0|1)
//! [1..3]    head position        [4..6]   head rotation (0, yaw, roll)
//! [7..9]    left hand position   [10..11] left hand rotation  [12] state
//! [13..15]  right hand position  [16..17] right hand rotation [18] state
//! [19]      pose present (0|1)
//! [20..49]  10 pose points, zero-filled when absent
//! ```
//!
//! A placeholder hand position travels as a NaN triple.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use ringside_core::{Point3, RingsideError};

use crate::{HandPose, HandState, HeadPose, PoseSemantics, StabilizedLandmarks};

/// Scalars per encoded frame
pub const ENCODED_FRAME_LEN: usize = 50;

/// Bytes per encoded frame on the peer link (little-endian f32)
pub const ENCODED_FRAME_BYTES: usize = ENCODED_FRAME_LEN * 4;

/// Slot offsets
pub mod layout {
    pub const LANDMARKS_PRESENT: usize = 0;
    pub const HEAD: usize = 1;
    pub const LEFT_HAND: usize = 7;
    pub const RIGHT_HAND: usize = 13;
    pub const POSE_PRESENT: usize = 19;
    pub const POSE: usize = 20;
}

/// Encoding error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Invalid presence flag {value} at slot {slot}")]
    InvalidFlag { slot: usize, value: f32 },

    #[error("Invalid hand state {value} at slot {slot}")]
    InvalidHandState { slot: usize, value: f32 },

    #[error("Non-finite value at slot {slot}")]
    NonFinite { slot: usize },
}

impl From<EncodingError> for RingsideError {
    fn from(err: EncodingError) -> Self {
        match err {
            EncodingError::BufferTooSmall { expected, actual } => {
                RingsideError::BufferTooShort { expected, actual }
            }
            other => RingsideError::InvalidWireFormat(other.to_string()),
        }
    }
}

/// One encoded frame
#[derive(Debug, Clone, Copy)]
pub struct EncodedFrame {
    slots: [f32; ENCODED_FRAME_LEN],
}

impl EncodedFrame {
    pub fn zeroed() -> Self {
        Self {
            slots: [0.0; ENCODED_FRAME_LEN],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.slots
    }

    /// Serialize for the peer link
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENCODED_FRAME_BYTES);
        for &value in &self.slots {
            buf.put_f32_le(value);
        }
        buf.freeze()
    }

    /// Parse from the peer link
    pub fn from_bytes(mut data: &[u8]) -> Result<Self, EncodingError> {
        if data.len() < ENCODED_FRAME_BYTES {
            return Err(EncodingError::BufferTooSmall {
                expected: ENCODED_FRAME_BYTES,
                actual: data.len(),
            });
        }

        let mut frame = Self::zeroed();
        for slot in frame.slots.iter_mut() {
            *slot = data.get_f32_le();
        }
        Ok(frame)
    }

    /// Decode this frame, `None` if it is malformed
    pub fn decode(&self) -> Option<DecodedFrame> {
        LandmarkCodec::decode(&self.slots)
    }
}

impl Default for EncodedFrame {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Parsed contents of an encoded frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecodedFrame {
    pub landmarks: Option<StabilizedLandmarks>,
    pub pose: Option<PoseSemantics>,
}

/// Landmark codec
pub struct LandmarkCodec;

impl LandmarkCodec {
    /// Encode a stabilized record and optional pose semantics
    pub fn encode(landmarks: Option<&StabilizedLandmarks>, pose: Option<&PoseSemantics>) -> EncodedFrame {
        let mut frame = EncodedFrame::zeroed();
        Self::write(landmarks, pose, &mut frame.slots);
        frame
    }

    /// Encode into the head of a larger shared buffer
    ///
    /// Returns the number of scalars written.
    pub fn encode_into(
        landmarks: Option<&StabilizedLandmarks>,
        pose: Option<&PoseSemantics>,
        out: &mut [f32],
    ) -> Result<usize, EncodingError> {
        let actual = out.len();
        let slots = out
            .get_mut(..ENCODED_FRAME_LEN)
            .ok_or(EncodingError::BufferTooSmall {
                expected: ENCODED_FRAME_LEN,
                actual,
            })?;
        Self::write(landmarks, pose, slots);
        Ok(ENCODED_FRAME_LEN)
    }

    fn write(landmarks: Option<&StabilizedLandmarks>, pose: Option<&PoseSemantics>, slots: &mut [f32]) {
        slots.fill(0.0);
        let mut w = SlotWriter { slots, pos: 0 };

        match landmarks {
            Some(l) => {
                w.put(1.0);
                w.put_point(Some(l.head.position));
                w.put_all(&l.head.rotation);
                for hand in [&l.left_hand, &l.right_hand] {
                    w.put_point(hand.center);
                    w.put_all(&hand.rotation);
                    w.put(hand.state.code() as f32);
                }
            }
            None => {
                w.put(0.0);
                w.skip(layout::POSE_PRESENT - 1);
            }
        }

        match pose {
            Some(p) => {
                w.put(1.0);
                for point in p.to_ordered() {
                    w.put_point(Some(point));
                }
            }
            None => w.put(0.0),
        }
    }

    /// Decode, reporting why a buffer is malformed
    pub fn try_decode(buf: &[f32]) -> Result<DecodedFrame, EncodingError> {
        if buf.len() < ENCODED_FRAME_LEN {
            return Err(EncodingError::BufferTooSmall {
                expected: ENCODED_FRAME_LEN,
                actual: buf.len(),
            });
        }

        let mut r = SlotReader { slots: buf, pos: 0 };

        let landmarks = if r.flag()? {
            let head = HeadPose {
                position: r.point()?,
                rotation: [r.finite()?, r.finite()?, r.finite()?],
            };
            let left_hand = r.hand()?;
            let right_hand = r.hand()?;
            Some(StabilizedLandmarks {
                head,
                left_hand,
                right_hand,
            })
        } else {
            r.pos = layout::POSE_PRESENT;
            None
        };

        let pose = if r.flag()? {
            let mut points = [Point3::ZERO; 10];
            for point in points.iter_mut() {
                *point = r.point()?;
            }
            Some(PoseSemantics::from_ordered(points))
        } else {
            None
        };

        Ok(DecodedFrame { landmarks, pose })
    }

    /// Decode, treating anything malformed as "no data this frame"
    pub fn decode(buf: &[f32]) -> Option<DecodedFrame> {
        Self::try_decode(buf).ok()
    }
}

struct SlotWriter<'a> {
    slots: &'a mut [f32],
    pos: usize,
}

impl SlotWriter<'_> {
    fn put(&mut self, value: f32) {
        self.slots[self.pos] = value;
        self.pos += 1;
    }

    fn put_all(&mut self, values: &[f32]) {
        for &v in values {
            self.put(v);
        }
    }

    fn put_point(&mut self, point: Option<Point3>) {
        match point {
            Some(p) => self.put_all(&p.to_array()),
            None => self.put_all(&[f32::NAN; 3]),
        }
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }
}

/// Reader over a buffer already checked to hold a full frame
struct SlotReader<'a> {
    slots: &'a [f32],
    pos: usize,
}

impl SlotReader<'_> {
    fn raw(&mut self) -> f32 {
        let v = self.slots[self.pos];
        self.pos += 1;
        v
    }

    fn finite(&mut self) -> Result<f32, EncodingError> {
        let slot = self.pos;
        let v = self.raw();
        if v.is_finite() {
            Ok(v)
        } else {
            Err(EncodingError::NonFinite { slot })
        }
    }

    fn flag(&mut self) -> Result<bool, EncodingError> {
        let slot = self.pos;
        match self.raw() {
            v if v == 1.0 => Ok(true),
            v if v == 0.0 => Ok(false),
            value => Err(EncodingError::InvalidFlag { slot, value }),
        }
    }

    fn point(&mut self) -> Result<Point3, EncodingError> {
        Ok(Point3::new(self.finite()?, self.finite()?, self.finite()?))
    }

    /// Position that may be the NaN placeholder
    fn optional_point(&mut self) -> Result<Option<Point3>, EncodingError> {
        let slot = self.pos;
        let values = [self.raw(), self.raw(), self.raw()];
        if values.iter().all(|v| v.is_nan()) {
            return Ok(None);
        }
        match values.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(EncodingError::NonFinite { slot: slot + i }),
            None => Ok(Some(Point3::from(values))),
        }
    }

    fn state(&mut self) -> Result<HandState, EncodingError> {
        let slot = self.pos;
        let value = self.raw();
        let code = ((0.0..=2.0).contains(&value) && value.fract() == 0.0).then_some(value as u8);
        code.and_then(HandState::from_code)
            .ok_or(EncodingError::InvalidHandState { slot, value })
    }

    fn hand(&mut self) -> Result<HandPose, EncodingError> {
        Ok(HandPose {
            center: self.optional_point()?,
            rotation: [self.finite()?, self.finite()?],
            state: self.state()?,
        })
    }
}
