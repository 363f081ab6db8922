//! Error types for the homography engine

use thiserror::Error;

/// Smallest accepted magnitude for a plane's signed distance (mm)
pub const MIN_PLANE_DISTANCE: f64 = 1e-6;

/// Errors raised while constructing the input models.
///
/// A singular projection is not an error: it is reported through
/// [`crate::homography::ProjectionStatus`] so an animated rig can keep rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HomographyError {
    /// A scalar input is out of range (non-positive size, focal length, scale,
    /// zero-length normal, non-finite value)
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The plane passes (nearly) through the world origin, or no tangent basis exists
    #[error("degenerate plane: |distance| = {distance} is below 1e-6")]
    DegeneratePlane { distance: f64 },
}

impl HomographyError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, HomographyError>;

/// Reject non-finite or non-positive values
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(HomographyError::invalid(name, value, "must be finite"));
    }
    if value <= 0.0 {
        return Err(HomographyError::invalid(name, value, "must be positive"));
    }
    Ok(value)
}

/// Reject NaN and infinities
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(HomographyError::invalid(name, value, "must be finite"))
    }
}
