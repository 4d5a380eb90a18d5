//! Detector capability
//!
//! The landmark models are an external black box: constructed once per
//! session, then called per frame with an image and a monotonic timestamp.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ringside_core::{FrameTime, Point3, RingsideError, RingsideResult};
use ringside_visual::{HandLandmarks, RawFrameDetections};

/// One RGBA video frame
#[derive(Clone, Debug, Default)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Blank frame sized for `width` x `height`
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; Self::byte_len(width, height)])
    }

    /// Bytes needed for an RGBA frame
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}

/// Landmark detector for face, hands and body pose
pub trait LandmarkDetector: Send {
    fn detect_face(&mut self, frame: &VideoFrame, timestamp: FrameTime) -> RingsideResult<Vec<Point3>>;

    fn detect_hands(
        &mut self,
        frame: &VideoFrame,
        timestamp: FrameTime,
    ) -> RingsideResult<Vec<HandLandmarks>>;

    fn detect_pose(&mut self, frame: &VideoFrame, timestamp: FrameTime) -> RingsideResult<Vec<Point3>>;
}

/// Run all three detectors on one frame
pub fn detect_all(
    detector: &mut dyn LandmarkDetector,
    frame: &VideoFrame,
    timestamp: FrameTime,
) -> RingsideResult<RawFrameDetections> {
    Ok(RawFrameDetections {
        face: detector.detect_face(frame, timestamp)?,
        hands: detector.detect_hands(frame, timestamp)?,
        pose: detector.detect_pose(frame, timestamp)?,
    })
}

/// Builds a detector at session start
///
/// Construction may be slow (model loading), so it runs off the async
/// executor. A failure here is fatal to the session.
pub trait DetectorFactory: Send + Sync + 'static {
    fn create(&self) -> RingsideResult<Box<dyn LandmarkDetector>>;
}

impl<F> DetectorFactory for F
where
    F: Fn() -> RingsideResult<Box<dyn LandmarkDetector>> + Send + Sync + 'static,
{
    fn create(&self) -> RingsideResult<Box<dyn LandmarkDetector>> {
        self()
    }
}

/// One scripted detector response
#[derive(Clone, Debug)]
pub enum ScriptedFrame {
    Detections(RawFrameDetections),
    Failure(String),
}

/// Detector double that replays scripted detections
///
/// Each frame consumes one script entry, taken on the face call. An
/// exhausted script yields empty detections.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: VecDeque<ScriptedFrame>,
    current: RawFrameDetections,
    frames: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(script: impl IntoIterator<Item = ScriptedFrame>) -> Self {
        Self {
            script: script.into_iter().collect(),
            current: RawFrameDetections::empty(),
            frames: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script that returns the same detections forever
    pub fn repeating(detections: RawFrameDetections, frames: usize) -> Self {
        Self::new(std::iter::repeat(ScriptedFrame::Detections(detections)).take(frames))
    }

    /// Counter of frames this detector has been asked to process
    pub fn frame_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.frames)
    }
}

impl LandmarkDetector for ScriptedDetector {
    fn detect_face(&mut self, _frame: &VideoFrame, _timestamp: FrameTime) -> RingsideResult<Vec<Point3>> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        match self.script.pop_front() {
            Some(ScriptedFrame::Detections(detections)) => {
                self.current = detections;
                Ok(self.current.face.clone())
            }
            Some(ScriptedFrame::Failure(reason)) => {
                self.current = RawFrameDetections::empty();
                Err(RingsideError::DetectorFailed(reason))
            }
            None => {
                self.current = RawFrameDetections::empty();
                Ok(Vec::new())
            }
        }
    }

    fn detect_hands(
        &mut self,
        _frame: &VideoFrame,
        _timestamp: FrameTime,
    ) -> RingsideResult<Vec<HandLandmarks>> {
        Ok(self.current.hands.clone())
    }

    fn detect_pose(&mut self, _frame: &VideoFrame, _timestamp: FrameTime) -> RingsideResult<Vec<Point3>> {
        Ok(self.current.pose.clone())
    }
}
