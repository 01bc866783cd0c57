//! # FormPulse Core
//!
//! Core types and geometry utilities for the FormPulse motion analysis engine.
//!
//! This crate provides the foundational building blocks shared across the
//! FormPulse ecosystem:
//!
//! - **Landmark Types**: [`Frame`], [`Landmark`], [`LandmarkType`], and
//!   [`Confidence`] for representing timestamped body-landmark snapshots
//!   delivered by an external pose-estimation provider.
//!
//! - **Geometry Utilities**: Pure functions in the [`geometry`] module for
//!   three-point joint angles, point/line deviation, left/right symmetry
//!   deviation, and rate-of-change estimation.
//!
//! - **Error Types**: [`CoreError`] and [`CoreResult`] for validation failures
//!   at the type boundary.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization via serde
//!
//! ## Example
//!
//! ```rust
//! use formpulse_core::{Confidence, Frame, Landmark, LandmarkType};
//!
//! let mut frame = Frame::new(0.0);
//! frame.set_landmark(Landmark::new(
//!     LandmarkType::LeftKnee,
//!     0.4,
//!     0.7,
//!     Confidence::new(0.95).unwrap(),
//! ));
//!
//! assert!(frame.visible(LandmarkType::LeftKnee, 0.5));
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{CoreError, CoreResult};
pub use types::{Axis, Confidence, Frame, Landmark, LandmarkType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of tracked body landmarks (COCO format)
pub const MAX_LANDMARKS: usize = 17;

/// Default minimum visibility for a landmark to count as observed
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.5;

/// Prelude module for convenient imports.
///
/// ```rust
/// use formpulse_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::types::{Axis, Confidence, Frame, Landmark, LandmarkType};
    pub use crate::{DEFAULT_VISIBILITY_THRESHOLD, MAX_LANDMARKS};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_valid() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_constants() {
        assert_eq!(MAX_LANDMARKS, 17);
        assert!(DEFAULT_VISIBILITY_THRESHOLD > 0.0);
        assert!(DEFAULT_VISIBILITY_THRESHOLD < 1.0);
    }
}
