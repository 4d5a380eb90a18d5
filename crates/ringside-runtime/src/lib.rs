//! Ringside Runtime - Capture sessions and hosts
//!
//! Each processed frame goes through:
//! 1. Rate gate (drop frames arriving faster than the detection rate)
//! 2. Detect face, hands and body pose
//! 3. Fuse into stabilized landmarks (movement gate, laterality, fallback)
//! 4. Encode into the fixed-layout result slot
//! 5. Notify the host
//!
//! `WorkerHost` runs steps 2-5 on a background task. `MainThreadHost`
//! runs them inline and interpolates the frames in between.

pub mod config;
pub mod detector;
pub mod pacing;
pub mod session;
pub mod telemetry;
pub mod worker;

pub use config::*;
pub use detector::*;
pub use pacing::*;
pub use session::*;
pub use telemetry::*;
pub use worker::*;
