//! Camera extrinsics
//!
//! Rotation convention, used everywhere in this crate:
//!
//! - camera frame: x right, y down, z forward (optical axis)
//! - at zero angles the world axes coincide with the camera axes
//! - camera-to-world rotation `R_wc = Rz(yaw) * Ry(pitch) * Rx(roll)`, i.e. roll
//!   about world X first, then pitch about world Y, then yaw about world Z
//! - world-to-camera rotation `R = R_wc^T`, translation `t = -R * C`
//!
//! Yaw therefore spins the view about the resting optical axis, and a roll of
//! 180 degrees turns the optical axis from +Z to -Z.

use nalgebra::{Matrix3, Vector3};

use crate::error::{require_finite, Result};

/// Camera position (mm) and orientation (degrees) with derived R and t
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    position: Vector3<f64>,
    roll_deg: f64,
    pitch_deg: f64,
    yaw_deg: f64,
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl CameraPose {
    /// Build a pose; R and t are derived together here and never patched afterwards
    pub fn new(
        position: Vector3<f64>,
        roll_deg: f64,
        pitch_deg: f64,
        yaw_deg: f64,
    ) -> Result<Self> {
        require_finite("x", position.x)?;
        require_finite("y", position.y)?;
        require_finite("z", position.z)?;
        require_finite("roll", roll_deg)?;
        require_finite("pitch", pitch_deg)?;
        require_finite("yaw", yaw_deg)?;

        let rotation = rotation_from_angles(roll_deg, pitch_deg, yaw_deg);
        let translation = -(rotation * position);

        Ok(Self {
            position,
            roll_deg,
            pitch_deg,
            yaw_deg,
            rotation,
            translation,
        })
    }

    /// Camera at the world origin looking along +Z
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            roll_deg: 0.0,
            pitch_deg: 0.0,
            yaw_deg: 0.0,
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Same position, new orientation
    pub fn with_angles(&self, roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Result<Self> {
        Self::new(self.position, roll_deg, pitch_deg, yaw_deg)
    }

    /// Same orientation, new position
    pub fn with_position(&self, position: Vector3<f64>) -> Result<Self> {
        Self::new(position, self.roll_deg, self.pitch_deg, self.yaw_deg)
    }

    /// Camera center C in world coordinates (mm)
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// `(roll, pitch, yaw)` in degrees
    pub fn angles_deg(&self) -> (f64, f64, f64) {
        (self.roll_deg, self.pitch_deg, self.yaw_deg)
    }

    /// World-to-camera rotation R
    pub fn rotation(&self) -> Matrix3<f64> {
        self.rotation
    }

    /// Extrinsic translation `t = -R * C`
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Viewing direction in world coordinates, `R^T * z`
    pub fn optical_axis(&self) -> Vector3<f64> {
        self.rotation.transpose() * Vector3::z()
    }

    /// Map a world point into camera coordinates
    pub fn world_to_camera(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * point + self.translation
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::identity()
    }
}

fn rotation_from_angles(roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Matrix3<f64> {
    let (sr, cr) = roll_deg.to_radians().sin_cos();
    let (sp, cp) = pitch_deg.to_radians().sin_cos();
    let (sy, cy) = yaw_deg.to_radians().sin_cos();

    let rx = Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, cr, -sr, //
        0.0, sr, cr,
    );
    let ry = Matrix3::new(
        cp, 0.0, sp, //
        0.0, 1.0, 0.0, //
        -sp, 0.0, cp,
    );
    let rz = Matrix3::new(
        cy, -sy, 0.0, //
        sy, cy, 0.0, //
        0.0, 0.0, 1.0,
    );

    (rz * ry * rx).transpose()
}
