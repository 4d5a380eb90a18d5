//! Capture session: rate gate, detection and fusion for one video stream

use std::sync::Arc;
use std::time::{Duration, Instant};

use ringside_core::{FrameTime, RingsideError, RingsideResult, SessionId};
use ringside_visual::{
    FusionSession, LandmarkInterpolator, PoseSemantics, RawFrameDetections, StabilizedLandmarks,
};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::detector::{detect_all, DetectorFactory, LandmarkDetector, VideoFrame};
use crate::pacing::RateGate;

/// Per-session counters
#[derive(Clone, Debug, Default)]
pub struct CaptureStats {
    pub frames_submitted: u64,
    pub frames_processed: u64,
    pub frames_rate_limited: u64,
    pub detection_failures: u64,
    pub frames_interpolated: u64,
    pub last_processing_duration: Duration,
}

/// Landmarks produced for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameResult {
    pub timestamp: FrameTime,
    pub landmarks: StabilizedLandmarks,
    pub pose: Option<PoseSemantics>,
    /// No detection ran for this frame
    pub interpolated: bool,
}

/// One capture session
///
/// Owns the detector and all temporal state. Sessions are independent;
/// nothing is shared between them.
pub struct CaptureSession {
    id: SessionId,
    detector: Box<dyn LandmarkDetector>,
    fusion: FusionSession,
    gate: RateGate,
    stats: CaptureStats,
}

impl CaptureSession {
    pub fn new(config: &CaptureConfig, detector: Box<dyn LandmarkDetector>) -> Self {
        Self {
            id: SessionId::next(),
            detector,
            fusion: FusionSession::new(config.fusion),
            gate: RateGate::new(config.min_frame_interval()),
            stats: CaptureStats::default(),
        }
    }

    /// Build the detector off the async executor and start a session
    pub async fn initialize(
        config: &CaptureConfig,
        factory: Arc<dyn DetectorFactory>,
    ) -> RingsideResult<Self> {
        config.validate()?;
        let created = match tokio::task::spawn_blocking(move || factory.create()).await {
            Ok(created) => created,
            Err(e) => Err(RingsideError::DetectorUnavailable(format!(
                "detector init aborted: {}",
                e
            ))),
        };
        let detector = created.map_err(|e| {
            warn!("detector initialization failed: {}", e);
            match e {
                RingsideError::DetectorUnavailable(_) => e,
                other => RingsideError::DetectorUnavailable(other.to_string()),
            }
        })?;

        let session = Self::new(config, detector);
        info!(
            session = %session.id,
            rate_hz = config.detection_rate_hz,
            min_interval = %humantime::format_duration(config.min_frame_interval()),
            "capture session initialized"
        );
        Ok(session)
    }

    /// Submit a frame
    ///
    /// Returns `None` when the rate gate drops the frame; no state changes
    /// in that case apart from the counters.
    pub fn submit_frame(&mut self, frame: &VideoFrame, timestamp: FrameTime) -> Option<FrameResult> {
        self.stats.frames_submitted += 1;
        if !self.gate.admit(timestamp) {
            self.stats.frames_rate_limited += 1;
            return None;
        }
        Some(self.process(frame, timestamp))
    }

    /// Submit a frame and hand any result to `on_result`
    pub fn submit_frame_with<F>(&mut self, frame: &VideoFrame, timestamp: FrameTime, on_result: F) -> bool
    where
        F: FnOnce(&FrameResult),
    {
        match self.submit_frame(frame, timestamp) {
            Some(result) => {
                on_result(&result);
                true
            }
            None => false,
        }
    }

    fn process(&mut self, frame: &VideoFrame, timestamp: FrameTime) -> FrameResult {
        let start = Instant::now();

        let raw = match detect_all(self.detector.as_mut(), frame, timestamp) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(session = %self.id, ?timestamp, "detection failed: {}", e);
                self.stats.detection_failures += 1;
                RawFrameDetections::empty()
            }
        };
        let output = self.fusion.step(&raw);

        self.stats.frames_processed += 1;
        self.stats.last_processing_duration = start.elapsed();

        FrameResult {
            timestamp,
            landmarks: output.stable,
            pose: output.pose,
            interpolated: false,
        }
    }

    /// Forget temporal state; the detector is kept
    pub fn reset(&mut self) {
        self.fusion.reset();
        self.gate.reset();
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn fusion(&self) -> &FusionSession {
        &self.fusion
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("frames", &self.fusion.frames())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Single-thread host
///
/// Runs detection on the caller's thread at the session's rate. The
/// landmarks shown trail detection by one interval: each detection becomes
/// the new target, and the frames until the next one blend from whatever
/// was last shown toward it. Output never moves back toward an older
/// detection.
#[derive(Debug)]
pub struct MainThreadHost {
    session: CaptureSession,
    interpolator: LandmarkInterpolator,
    shown: Option<StabilizedLandmarks>,
}

impl MainThreadHost {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            session,
            interpolator: LandmarkInterpolator::new(),
            shown: None,
        }
    }

    pub async fn initialize(
        config: &CaptureConfig,
        factory: Arc<dyn DetectorFactory>,
    ) -> RingsideResult<Self> {
        Ok(Self::new(CaptureSession::initialize(config, factory).await?))
    }

    /// Handle one rendered frame
    ///
    /// Calls `on_result` once per frame that has something to show.
    /// Returns false when nothing could be produced yet.
    pub fn on_frame<F>(&mut self, frame: &VideoFrame, timestamp: FrameTime, on_result: F) -> bool
    where
        F: FnOnce(&FrameResult),
    {
        if let Some(result) = self.session.submit_frame(frame, timestamp) {
            let landmarks = match self.shown {
                Some(shown) => {
                    self.interpolator.retarget(shown, result.landmarks);
                    shown
                }
                None => {
                    self.interpolator.push(result.landmarks);
                    result.landmarks
                }
            };
            self.shown = Some(landmarks);
            on_result(&FrameResult {
                landmarks,
                ..result
            });
            return true;
        }

        let t = self.session.gate().progress(timestamp);
        let Some(landmarks) = self.interpolator.sample(t) else {
            return false;
        };
        self.session.stats.frames_interpolated += 1;
        self.shown = Some(landmarks);
        on_result(&FrameResult {
            timestamp,
            landmarks,
            pose: None,
            interpolated: true,
        });
        true
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{ScriptedDetector, ScriptedFrame};
    use ringside_core::Point3;
    use ringside_visual::face_index;
    use std::sync::atomic::Ordering;

    fn face_at(x: f32, y: f32) -> RawFrameDetections {
        let mut face = vec![Point3::new(0.5, 0.5, 0.0); 300];
        face[face_index::NOSE_BRIDGE] = Point3::new(x, y, 0.0);
        RawFrameDetections {
            face,
            ..Default::default()
        }
    }

    fn session(config: &CaptureConfig, script: Vec<ScriptedFrame>) -> CaptureSession {
        CaptureSession::new(config, Box::new(ScriptedDetector::new(script)))
    }

    fn frame() -> VideoFrame {
        VideoFrame::blank(2, 2)
    }

    #[test]
    fn test_submit_runs_fusion() {
        let config = CaptureConfig::background_thread();
        let mut session = session(&config, vec![ScriptedFrame::Detections(face_at(0.4, 0.3))]);

        let result = session.submit_frame(&frame(), FrameTime::ZERO).unwrap();
        assert_eq!(result.landmarks.head.position, Point3::new(0.4, 0.3, 0.0));
        assert!(!result.interpolated);
        assert_eq!(session.stats().frames_processed, 1);
    }

    #[test]
    fn test_rate_limited_frame_changes_nothing() {
        let config = CaptureConfig::background_thread();
        let mut session = session(
            &config,
            vec![
                ScriptedFrame::Detections(face_at(0.4, 0.3)),
                ScriptedFrame::Detections(face_at(0.5, 0.3)),
            ],
        );

        session.submit_frame(&frame(), FrameTime::ZERO).unwrap();
        let before = *session.fusion().previous().unwrap();
        assert!(session.submit_frame(&frame(), FrameTime::from_millis(10)).is_none());
        assert_eq!(session.fusion().previous(), Some(&before));
        assert_eq!(session.stats().frames_rate_limited, 1);

        let result = session.submit_frame(&frame(), FrameTime::from_millis(40)).unwrap();
        assert_eq!(result.landmarks.head.position.x, 0.5);
    }

    #[test]
    fn test_detection_failure_treated_as_empty() {
        let config = CaptureConfig::background_thread();
        let mut session = session(
            &config,
            vec![
                ScriptedFrame::Detections(face_at(0.4, 0.3)),
                ScriptedFrame::Failure("inference error".into()),
            ],
        );

        session.submit_frame(&frame(), FrameTime::ZERO).unwrap();
        let result = session.submit_frame(&frame(), FrameTime::from_millis(50)).unwrap();
        assert_eq!(result.landmarks.head.position, Point3::new(0.4, 0.3, 0.0));
        assert_eq!(session.stats().detection_failures, 1);
        assert_eq!(session.stats().frames_processed, 2);
    }

    #[test]
    fn test_callback_shape() {
        let config = CaptureConfig::background_thread();
        let mut session = session(&config, vec![ScriptedFrame::Detections(face_at(0.4, 0.3))]);

        let mut seen = None;
        assert!(session.submit_frame_with(&frame(), FrameTime::ZERO, |r| seen = Some(r.timestamp)));
        assert_eq!(seen, Some(FrameTime::ZERO));
        assert!(!session.submit_frame_with(&frame(), FrameTime::from_millis(1), |_| panic!()));
    }

    #[test]
    fn test_main_thread_output_never_moves_away_from_target() {
        let config = CaptureConfig::main_thread();
        let detector = ScriptedDetector::new([
            ScriptedFrame::Detections(face_at(0.2, 0.5)),
            ScriptedFrame::Detections(face_at(0.6, 0.5)),
            ScriptedFrame::Detections(face_at(0.4, 0.5)),
        ]);
        let calls = detector.frame_counter();
        let mut host = MainThreadHost::new(CaptureSession::new(&config, Box::new(detector)));

        // (display time, latest detected x at that time)
        let frames = [
            (0, 0.2),
            (50, 0.2),
            (100, 0.6),
            (116, 0.6),
            (150, 0.6),
            (183, 0.6),
            (200, 0.4),
            (250, 0.4),
        ];
        let mut results = Vec::new();
        for (ms, _) in frames {
            host.on_frame(&frame(), FrameTime::from_millis(ms), |r| results.push(*r));
        }

        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(results.len(), frames.len());
        let xs: Vec<f32> = results.iter().map(|r| r.landmarks.head.position.x).collect();
        for i in 1..xs.len() {
            let target = frames[i].1;
            let (lo, hi) = (xs[i - 1].min(target), xs[i - 1].max(target));
            assert!(
                xs[i] >= lo - 1e-6 && xs[i] <= hi + 1e-6,
                "frame {} moved away from {}: {:?}",
                i,
                target,
                xs
            );
        }

        let expected = [0.2, 0.2, 0.2, 0.264, 0.4, 0.532, 0.532, 0.466];
        for (x, want) in xs.iter().zip(expected) {
            assert!((x - want).abs() < 1e-4, "got {:?}", xs);
        }

        let detected: Vec<bool> = results.iter().map(|r| !r.interpolated).collect();
        assert_eq!(detected, [true, false, true, false, false, false, true, false]);
        assert!(results.iter().filter(|r| r.interpolated).all(|r| r.pose.is_none()));
        assert_eq!(host.session().stats().frames_interpolated, 5);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_fatal() {
        let factory: Arc<dyn DetectorFactory> = Arc::new(|| -> RingsideResult<Box<dyn LandmarkDetector>> {
            Err(RingsideError::DetectorFailed("model missing".into()))
        });
        let err = CaptureSession::initialize(&CaptureConfig::default(), factory)
            .await
            .unwrap_err();
        assert!(matches!(err, RingsideError::DetectorUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_initialize_success() {
        let factory: Arc<dyn DetectorFactory> = Arc::new(|| -> RingsideResult<Box<dyn LandmarkDetector>> {
            Ok(Box::new(ScriptedDetector::default()))
        });
        let host = MainThreadHost::initialize(&CaptureConfig::main_thread(), factory)
            .await
            .unwrap();
        assert_eq!(host.session().stats().frames_submitted, 0);
    }
}
