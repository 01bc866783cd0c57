//! Core data types for the FormPulse motion analysis engine.
//!
//! This module defines the fundamental data structures used throughout the
//! FormPulse ecosystem for representing body landmarks and per-frame pose
//! snapshots delivered by an external landmark-estimation provider.
//!
//! # Type Categories
//!
//! - **Landmark Types**: [`Landmark`], [`LandmarkType`], [`Axis`]
//! - **Frame Types**: [`Frame`]
//! - **Common Types**: [`Confidence`]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::{DEFAULT_VISIBILITY_THRESHOLD, MAX_LANDMARKS};

// =============================================================================
// Common Types
// =============================================================================

/// Visibility/confidence score in the range [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Confidence(f32);

impl Confidence {
    /// Creates a new confidence value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range [0.0, 1.0].
    pub fn new(value: f32) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(CoreError::validation(format!(
                "Confidence must be in [0.0, 1.0], got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Creates a confidence value, clamping out-of-range input into [0.0, 1.0].
    ///
    /// Useful at the provider boundary, where estimation models occasionally
    /// emit values marginally outside the nominal range.
    #[must_use]
    pub fn clamped(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the raw confidence value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Returns `true` if the confidence exceeds the default visibility threshold.
    #[must_use]
    pub fn is_high(&self) -> bool {
        self.0 >= DEFAULT_VISIBILITY_THRESHOLD
    }

    /// Returns `true` if the confidence exceeds the given threshold.
    #[must_use]
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.0 >= threshold
    }

    /// Maximum confidence (1.0).
    pub const MAX: Self = Self(1.0);

    /// Minimum confidence (0.0).
    pub const MIN: Self = Self(0.0);
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.0)
    }
}

/// Coordinate axis selector for position-based signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Horizontal image axis
    X,
    /// Vertical image axis
    Y,
    /// Depth axis (only meaningful for 3D landmarks)
    Z,
}

// =============================================================================
// Landmark Types
// =============================================================================

/// Types of body landmarks following COCO format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum LandmarkType {
    /// Nose
    Nose = 0,
    /// Left eye
    LeftEye = 1,
    /// Right eye
    RightEye = 2,
    /// Left ear
    LeftEar = 3,
    /// Right ear
    RightEar = 4,
    /// Left shoulder
    LeftShoulder = 5,
    /// Right shoulder
    RightShoulder = 6,
    /// Left elbow
    LeftElbow = 7,
    /// Right elbow
    RightElbow = 8,
    /// Left wrist
    LeftWrist = 9,
    /// Right wrist
    RightWrist = 10,
    /// Left hip
    LeftHip = 11,
    /// Right hip
    RightHip = 12,
    /// Left knee
    LeftKnee = 13,
    /// Right knee
    RightKnee = 14,
    /// Left ankle
    LeftAnkle = 15,
    /// Right ankle
    RightAnkle = 16,
}

impl LandmarkType {
    /// Returns all landmark types in order.
    #[must_use]
    pub fn all() -> &'static [Self; MAX_LANDMARKS] {
        &[
            Self::Nose,
            Self::LeftEye,
            Self::RightEye,
            Self::LeftEar,
            Self::RightEar,
            Self::LeftShoulder,
            Self::RightShoulder,
            Self::LeftElbow,
            Self::RightElbow,
            Self::LeftWrist,
            Self::RightWrist,
            Self::LeftHip,
            Self::RightHip,
            Self::LeftKnee,
            Self::RightKnee,
            Self::LeftAnkle,
            Self::RightAnkle,
        ]
    }

    /// Returns the landmark name as a string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Returns the contralateral landmark, if one exists.
    ///
    /// Midline landmarks (the nose) have no mirror.
    #[must_use]
    pub fn mirror(&self) -> Option<Self> {
        match self {
            Self::Nose => None,
            Self::LeftEye => Some(Self::RightEye),
            Self::RightEye => Some(Self::LeftEye),
            Self::LeftEar => Some(Self::RightEar),
            Self::RightEar => Some(Self::LeftEar),
            Self::LeftShoulder => Some(Self::RightShoulder),
            Self::RightShoulder => Some(Self::LeftShoulder),
            Self::LeftElbow => Some(Self::RightElbow),
            Self::RightElbow => Some(Self::LeftElbow),
            Self::LeftWrist => Some(Self::RightWrist),
            Self::RightWrist => Some(Self::LeftWrist),
            Self::LeftHip => Some(Self::RightHip),
            Self::RightHip => Some(Self::LeftHip),
            Self::LeftKnee => Some(Self::RightKnee),
            Self::RightKnee => Some(Self::LeftKnee),
            Self::LeftAnkle => Some(Self::RightAnkle),
            Self::RightAnkle => Some(Self::LeftAnkle),
        }
    }

    /// Returns `true` if this is an upper body landmark.
    #[must_use]
    pub fn is_upper_body(&self) -> bool {
        matches!(
            self,
            Self::LeftShoulder
                | Self::RightShoulder
                | Self::LeftElbow
                | Self::RightElbow
                | Self::LeftWrist
                | Self::RightWrist
        )
    }

    /// Returns `true` if this is a lower body landmark.
    #[must_use]
    pub fn is_lower_body(&self) -> bool {
        matches!(
            self,
            Self::LeftHip
                | Self::RightHip
                | Self::LeftKnee
                | Self::RightKnee
                | Self::LeftAnkle
                | Self::RightAnkle
        )
    }
}

impl TryFrom<u8> for LandmarkType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        LandmarkType::all()
            .get(value as usize)
            .copied()
            .ok_or_else(|| CoreError::validation(format!("Invalid landmark type: {value}")))
    }
}

impl std::fmt::Display for LandmarkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single body landmark with position and visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Landmark {
    /// Type of landmark
    pub landmark_type: LandmarkType,
    /// X coordinate (normalized 0.0-1.0, image left to right)
    pub x: f32,
    /// Y coordinate (normalized 0.0-1.0, image top to bottom)
    pub y: f32,
    /// Z coordinate (depth, if the provider supplies it)
    pub z: Option<f32>,
    /// Estimation visibility/confidence
    pub visibility: Confidence,
}

impl Landmark {
    /// Creates a new 2D landmark.
    #[must_use]
    pub fn new(landmark_type: LandmarkType, x: f32, y: f32, visibility: Confidence) -> Self {
        Self {
            landmark_type,
            x,
            y,
            z: None,
            visibility,
        }
    }

    /// Creates a new 3D landmark.
    #[must_use]
    pub fn new_3d(
        landmark_type: LandmarkType,
        x: f32,
        y: f32,
        z: f32,
        visibility: Confidence,
    ) -> Self {
        Self {
            landmark_type,
            x,
            y,
            z: Some(z),
            visibility,
        }
    }

    /// Returns `true` if this landmark should be considered visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility.is_high()
    }

    /// Returns the 2D position as a tuple.
    #[must_use]
    pub fn position_2d(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Returns the 3D position as a tuple, if available.
    #[must_use]
    pub fn position_3d(&self) -> Option<(f32, f32, f32)> {
        self.z.map(|z| (self.x, self.y, z))
    }

    /// Returns the coordinate of this landmark along the given axis.
    ///
    /// A 2D landmark reports `0.0` along [`Axis::Z`].
    #[must_use]
    pub fn axis_value(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z.unwrap_or(0.0),
        }
    }

    /// Calculates the Euclidean distance to another landmark.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        match (self.z, other.z) {
            (Some(z1), Some(z2)) => {
                let dz = z1 - z2;
                dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
            }
            _ => (dx * dx + dy * dy).sqrt(),
        }
    }
}

// =============================================================================
// Frame Types
// =============================================================================

/// One timestamped snapshot of all tracked landmarks.
///
/// Timestamps come from the producer's clock in milliseconds and drive all
/// engine timing (debouncing, cooldowns, throttle windows), so replayed
/// sessions behave identically to live ones.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Producer timestamp in milliseconds
    pub timestamp_ms: f64,
    /// All landmark slots, indexed by [`LandmarkType`]
    landmarks: [Option<Landmark>; MAX_LANDMARKS],
}

impl Frame {
    /// Creates a new empty frame at the given producer timestamp.
    #[must_use]
    pub fn new(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            landmarks: [None; MAX_LANDMARKS],
        }
    }

    /// Sets a landmark, replacing any previous landmark of the same type.
    pub fn set_landmark(&mut self, landmark: Landmark) {
        let idx = landmark.landmark_type as usize;
        if idx < MAX_LANDMARKS {
            self.landmarks[idx] = Some(landmark);
        }
    }

    /// Builder-style variant of [`Frame::set_landmark`].
    #[must_use]
    pub fn with_landmark(mut self, landmark: Landmark) -> Self {
        self.set_landmark(landmark);
        self
    }

    /// Gets a landmark by type.
    #[must_use]
    pub fn get(&self, landmark_type: LandmarkType) -> Option<&Landmark> {
        self.landmarks[landmark_type as usize].as_ref()
    }

    /// Returns `true` if the landmark is present and meets the visibility threshold.
    #[must_use]
    pub fn visible(&self, landmark_type: LandmarkType, threshold: f32) -> bool {
        self.get(landmark_type)
            .is_some_and(|lm| lm.visibility.exceeds(threshold))
    }

    /// Returns `true` if every required landmark meets the visibility threshold.
    #[must_use]
    pub fn has_required(&self, required: &[LandmarkType], threshold: f32) -> bool {
        required.iter().all(|&lt| self.visible(lt, threshold))
    }

    /// Returns the number of landmarks meeting the default visibility threshold.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.landmarks
            .iter()
            .filter(|lm| lm.as_ref().is_some_and(Landmark::is_visible))
            .count()
    }
}
