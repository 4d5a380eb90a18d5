//! Background worker host
//!
//! The host thread copies frames into a shared slot and returns at once.
//! A tokio task picks up the newest frame, runs detection on the blocking
//! pool, writes the encoded result into a second shared slot and sends a
//! small "ready" notification. Readers decode the slot at fixed offsets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use ringside_core::{FrameTime, RingsideError, RingsideResult, SessionId};
use ringside_visual::{DecodedFrame, EncodedFrame, LandmarkCodec, ENCODED_FRAME_LEN};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::config::CaptureConfig;
use crate::detector::{DetectorFactory, VideoFrame};
use crate::session::{CaptureSession, CaptureStats};

/// Notification that a new result is in the result slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LandmarksReady {
    /// Timestamp of the frame the result was computed from
    pub timestamp: FrameTime,
    /// Number of f32 slots written
    pub encoded_len: usize,
    /// Monotonic result counter, starting at 1
    pub sequence: u64,
}

struct FrameSlot {
    pixels: Vec<u8>,
    timestamp: FrameTime,
    fresh: bool,
}

struct ResultSlot {
    frame: EncodedFrame,
    timestamp: FrameTime,
    sequence: u64,
}

struct Shared {
    frame: Mutex<FrameSlot>,
    result: Mutex<ResultSlot>,
    frame_ready: Notify,
    alive: AtomicBool,
}

/// Host side of a background capture session
pub struct WorkerHost {
    id: SessionId,
    width: u32,
    height: u32,
    shared: Arc<Shared>,
    ready_rx: mpsc::Receiver<LandmarksReady>,
    worker: Option<JoinHandle<Option<CaptureStats>>>,
}

impl WorkerHost {
    /// Start a session for frames of `width` x `height`
    ///
    /// Fails with `DetectorUnavailable` if the detector cannot be built;
    /// no further frames can be processed in that case.
    pub async fn initialize(
        config: CaptureConfig,
        factory: Arc<dyn DetectorFactory>,
        width: u32,
        height: u32,
    ) -> RingsideResult<Self> {
        let session = CaptureSession::initialize(&config, factory).await?;
        let id = session.id();
        let frame_len = VideoFrame::byte_len(width, height);

        let shared = Arc::new(Shared {
            frame: Mutex::new(FrameSlot {
                pixels: vec![0; frame_len],
                timestamp: FrameTime::ZERO,
                fresh: false,
            }),
            result: Mutex::new(ResultSlot {
                frame: EncodedFrame::zeroed(),
                timestamp: FrameTime::ZERO,
                sequence: 0,
            }),
            frame_ready: Notify::new(),
            alive: AtomicBool::new(true),
        });

        let (ready_tx, ready_rx) = mpsc::channel(config.notification_capacity);
        let worker = tokio::spawn(run_worker(
            session,
            Arc::clone(&shared),
            ready_tx,
            VideoFrame::blank(width, height),
        ));

        info!(session = %id, width, height, "worker host started");

        Ok(Self {
            id,
            width,
            height,
            shared,
            ready_rx,
            worker: Some(worker),
        })
    }

    /// Hand a frame to the worker without waiting for detection
    ///
    /// A frame not yet picked up by the worker is overwritten.
    pub fn submit_frame(&self, pixels: &[u8], timestamp: FrameTime) -> RingsideResult<()> {
        if !self.is_alive() {
            return Err(RingsideError::SessionClosed);
        }
        let expected = VideoFrame::byte_len(self.width, self.height);
        if pixels.len() < expected {
            return Err(RingsideError::BufferTooShort {
                expected,
                actual: pixels.len(),
            });
        }

        {
            let mut slot = self.shared.frame.lock();
            slot.pixels.copy_from_slice(&pixels[..expected]);
            slot.timestamp = timestamp;
            slot.fresh = true;
        }
        self.shared.frame_ready.notify_one();
        Ok(())
    }

    /// Wait for the next result notification
    ///
    /// Returns `None` once the worker has stopped and all pending
    /// notifications are drained.
    pub async fn recv_ready(&mut self) -> Option<LandmarksReady> {
        self.ready_rx.recv().await
    }

    /// Take a pending notification without waiting
    pub fn try_recv_ready(&mut self) -> Option<LandmarksReady> {
        self.ready_rx.try_recv().ok()
    }

    /// Copy of the current result slot
    pub fn read_encoded(&self) -> (EncodedFrame, FrameTime, u64) {
        let slot = self.shared.result.lock();
        (slot.frame, slot.timestamp, slot.sequence)
    }

    /// Decode the current result slot
    ///
    /// `None` until the first result is written, or if the slot fails
    /// validation.
    pub fn read_landmarks(&self) -> Option<DecodedFrame> {
        let (frame, _, sequence) = self.read_encoded();
        if sequence == 0 {
            return None;
        }
        LandmarkCodec::decode(frame.as_slice())
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Stop the worker and wait for it to finish
    ///
    /// Returns the final session counters on the first call, `None` after.
    pub async fn shutdown(&mut self) -> Option<CaptureStats> {
        if !self.begin_shutdown() {
            return None;
        }
        let handle = self.worker.take()?;
        match handle.await {
            Ok(stats) => {
                info!(session = %self.id, "worker host stopped");
                stats
            }
            Err(e) => {
                error!(session = %self.id, "worker task failed: {}", e);
                None
            }
        }
    }

    /// Clear the liveness flag; true if this call did it
    fn begin_shutdown(&self) -> bool {
        // Taken under the result lock so no write can straddle shutdown
        let _result = self.shared.result.lock();
        let was_alive = self.shared.alive.swap(false, Ordering::AcqRel);
        if was_alive {
            self.shared.frame_ready.notify_one();
        }
        was_alive
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        self.begin_shutdown();
    }
}

impl std::fmt::Debug for WorkerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHost")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("alive", &self.is_alive())
            .finish()
    }
}

async fn run_worker(
    mut session: CaptureSession,
    shared: Arc<Shared>,
    ready_tx: mpsc::Sender<LandmarksReady>,
    mut frame: VideoFrame,
) -> Option<CaptureStats> {
    let mut sequence = 0u64;

    loop {
        shared.frame_ready.notified().await;
        if !shared.alive.load(Ordering::Acquire) {
            break;
        }

        let timestamp = {
            let mut slot = shared.frame.lock();
            if !slot.fresh {
                continue;
            }
            slot.fresh = false;
            std::mem::swap(&mut slot.pixels, &mut frame.pixels);
            slot.timestamp
        };

        // Detection blocks; the session travels to the blocking pool and back
        let joined = tokio::task::spawn_blocking(move || {
            let result = session.submit_frame(&frame, timestamp);
            (session, frame, result)
        })
        .await;
        let result = match joined {
            Ok((returned, returned_frame, result)) => {
                session = returned;
                frame = returned_frame;
                result
            }
            Err(e) => {
                error!("detection task panicked: {}", e);
                shared.alive.store(false, Ordering::Release);
                return None;
            }
        };

        let Some(result) = result else {
            trace!(?timestamp, "frame rate limited");
            continue;
        };

        {
            let mut slot = shared.result.lock();
            if !shared.alive.load(Ordering::Acquire) {
                debug!(session = %session.id(), "dropping result after shutdown");
                break;
            }
            sequence += 1;
            slot.frame = LandmarkCodec::encode(Some(&result.landmarks), result.pose.as_ref());
            slot.timestamp = timestamp;
            slot.sequence = sequence;
        }

        let ready = LandmarksReady {
            timestamp,
            encoded_len: ENCODED_FRAME_LEN,
            sequence,
        };
        match ready_tx.try_send(ready) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(sequence, "ready channel full, reader will see the slot");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => break,
        }
    }

    Some(session.stats().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{LandmarkDetector, ScriptedDetector, ScriptedFrame};
    use ringside_core::Point3;
    use ringside_visual::{face_index, RawFrameDetections};
    use std::time::Duration;

    const W: u32 = 4;
    const H: u32 = 2;

    fn face_at(x: f32, y: f32) -> RawFrameDetections {
        let mut face = vec![Point3::new(0.5, 0.5, 0.0); 300];
        face[face_index::NOSE_BRIDGE] = Point3::new(x, y, 0.0);
        RawFrameDetections {
            face,
            ..Default::default()
        }
    }

    fn factory(script: Vec<ScriptedFrame>) -> Arc<dyn DetectorFactory> {
        let script = Mutex::new(Some(script));
        Arc::new(move || -> RingsideResult<Box<dyn LandmarkDetector>> {
            let script = script.lock().take().unwrap_or_default();
            Ok(Box::new(ScriptedDetector::new(script)))
        })
    }

    fn pixels() -> Vec<u8> {
        vec![0; VideoFrame::byte_len(W, H)]
    }

    async fn next_ready(host: &mut WorkerHost) -> LandmarksReady {
        tokio::time::timeout(Duration::from_secs(5), host.recv_ready())
            .await
            .expect("timed out waiting for landmarks")
            .expect("worker stopped")
    }

    #[tokio::test]
    async fn test_frame_to_landmarks() {
        let mut host = WorkerHost::initialize(
            CaptureConfig::background_thread(),
            factory(vec![ScriptedFrame::Detections(face_at(0.3, 0.6))]),
            W,
            H,
        )
        .await
        .unwrap();

        assert!(host.read_landmarks().is_none());
        host.submit_frame(&pixels(), FrameTime::from_millis(16)).unwrap();

        let ready = next_ready(&mut host).await;
        assert_eq!(ready.timestamp, FrameTime::from_millis(16));
        assert_eq!(ready.encoded_len, ENCODED_FRAME_LEN);
        assert_eq!(ready.sequence, 1);

        let decoded = host.read_landmarks().unwrap();
        let landmarks = decoded.landmarks.unwrap();
        assert_eq!(landmarks.head.position, Point3::new(0.3, 0.6, 0.0));
        assert!(decoded.pose.is_none());

        let stats = host.shutdown().await.unwrap();
        assert_eq!(stats.frames_processed, 1);
    }

    #[tokio::test]
    async fn test_sequence_advances() {
        let mut host = WorkerHost::initialize(
            CaptureConfig::background_thread(),
            factory(vec![
                ScriptedFrame::Detections(face_at(0.3, 0.6)),
                ScriptedFrame::Failure("lost tracking".into()),
            ]),
            W,
            H,
        )
        .await
        .unwrap();

        host.submit_frame(&pixels(), FrameTime::from_millis(0)).unwrap();
        assert_eq!(next_ready(&mut host).await.sequence, 1);
        host.submit_frame(&pixels(), FrameTime::from_millis(100)).unwrap();
        let ready = next_ready(&mut host).await;
        assert_eq!(ready.sequence, 2);

        // Failed detection reproduces the last valid head
        let landmarks = host.read_landmarks().unwrap().landmarks.unwrap();
        assert_eq!(landmarks.head.position, Point3::new(0.3, 0.6, 0.0));

        let stats = host.shutdown().await.unwrap();
        assert_eq!(stats.detection_failures, 1);
    }

    #[tokio::test]
    async fn test_initialize_failure() {
        let failing: Arc<dyn DetectorFactory> =
            Arc::new(|| -> RingsideResult<Box<dyn LandmarkDetector>> {
                Err(RingsideError::DetectorUnavailable("no model".into()))
            });
        let err = WorkerHost::initialize(CaptureConfig::default(), failing, W, H)
            .await
            .unwrap_err();
        assert!(matches!(err, RingsideError::DetectorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_short_buffer_rejected() {
        let mut host = WorkerHost::initialize(CaptureConfig::default(), factory(Vec::new()), W, H)
            .await
            .unwrap();
        let err = host.submit_frame(&[0; 3], FrameTime::ZERO).unwrap_err();
        assert_eq!(
            err,
            RingsideError::BufferTooShort {
                expected: 32,
                actual: 3
            }
        );
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_idempotent() {
        let mut host = WorkerHost::initialize(CaptureConfig::default(), factory(Vec::new()), W, H)
            .await
            .unwrap();

        assert!(host.shutdown().await.is_some());
        assert!(!host.is_alive());
        assert!(host.shutdown().await.is_none());
        assert_eq!(
            host.submit_frame(&pixels(), FrameTime::ZERO),
            Err(RingsideError::SessionClosed)
        );
        assert!(host.recv_ready().await.is_none());
    }
}
