//! Ringside Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by the landmark pipeline:
//! - 3-D points (Point3)
//! - Time primitives (FrameTime)
//! - Session identifiers (SessionId)
//! - Error taxonomy

pub mod error;
pub mod id;
pub mod point;
pub mod time;

pub use error::*;
pub use id::*;
pub use point::*;
pub use time::*;
