//! Ringside Visual - Landmark stabilization
//!
//! Turns noisy per-frame detector output (face mesh, hand skeletons, body
//! pose) into a compact, jitter-resistant record of what the head and each
//! hand are doing.
//!
//! # Pipeline
//!
//! Detections → Fusion (gate, fallback, laterality) → Stabilized record →
//! Encoding (50-slot frame) → Decoding on the consumer side
//!
//! Frames skipped by the detector are filled by interpolation between the
//! last two fused results.

pub mod encoding;
pub mod fusion;
pub mod geometry;
pub mod interpolation;
pub mod landmarks;

pub use encoding::*;
pub use fusion::*;
pub use geometry::*;
pub use interpolation::*;
pub use landmarks::*;
