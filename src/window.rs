//! Output window framing
//!
//! The output window decides which part of the plane lands in the output
//! texture and how big it is. `y_up` selects the UV convention of both the
//! source and the output texture: bottom-left origin (GL) when true, top-left
//! origin (image rows) when false.

use nalgebra::Matrix3;

use crate::error::{require_finite, require_positive, Result};
use crate::intrinsics::Intrinsics;
use crate::plane::PlaneModel;
use crate::pose::CameraPose;

/// Output framing on the plane (mm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputWindow {
    scale_x: f64,
    scale_y: f64,
    origin_x: f64,
    origin_y: f64,
    y_up: bool,
}

impl OutputWindow {
    pub fn new(
        scale_x: f64,
        scale_y: f64,
        origin_x: f64,
        origin_y: f64,
        y_up: bool,
    ) -> Result<Self> {
        Ok(Self {
            scale_x: require_positive("scale_x", scale_x)?,
            scale_y: require_positive("scale_y", scale_y)?,
            origin_x: require_finite("origin_x", origin_x)?,
            origin_y: require_finite("origin_y", origin_y)?,
            y_up,
        })
    }

    /// Window covering exactly the camera frame on a fronto-parallel plane at `distance` mm
    pub fn fronto_parallel(intrinsics: &Intrinsics, distance: f64, y_up: bool) -> Result<Self> {
        let distance = require_positive("distance", distance)?;
        let (fx, fy) = intrinsics.focal_length_px();
        let (cx, cy) = intrinsics.principal_point();

        let mm_per_px_x = distance / fx;
        let mm_per_px_y = distance / fy;

        Self::new(
            mm_per_px_x * intrinsics.width() as f64,
            mm_per_px_y * intrinsics.height() as f64,
            -cx * mm_per_px_x,
            -cy * mm_per_px_y,
            y_up,
        )
    }

    /// Window of the given size centered where the optical axis meets the plane.
    ///
    /// Returns `None` when the axis is parallel to the plane or points away from it.
    pub fn centered_on_optical_axis(
        pose: &CameraPose,
        plane: &PlaneModel,
        scale_x: f64,
        scale_y: f64,
        y_up: bool,
    ) -> Option<Self> {
        let hit = plane.intersect_ray(&pose.position(), &pose.optical_axis())?;
        let (a, b) = plane.to_plane_coords(&hit).ok()?;
        tracing::debug!("Optical axis meets plane at ({:.1}, {:.1}) mm", a, b);

        Self::new(
            scale_x,
            scale_y,
            a - 0.5 * scale_x,
            b - 0.5 * scale_y,
            y_up,
        )
        .ok()
    }

    /// `(scale_x, scale_y)` in mm per UV unit
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Plane coordinates (mm) of output UV `(0, 0)`
    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    pub fn y_up(&self) -> bool {
        self.y_up
    }

    /// A: output UV `(u, v, 1)` to plane mm `(sx*u + ox, sy*v + oy, 1)`
    pub fn plane_to_uv_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.scale_x, 0.0, self.origin_x, //
            0.0, self.scale_y, self.origin_y, //
            0.0, 0.0, 1.0,
        )
    }

    /// N^-1: source pixels to normalized `[0, 1]` texture coordinates.
    ///
    /// `v = 1 - y/height` when `y_up`, `v = y/height` otherwise.
    pub fn pixel_to_uv_matrix(width: u32, height: u32, y_up: bool) -> Matrix3<f64> {
        let w = width as f64;
        let h = height as f64;
        if y_up {
            Matrix3::new(
                1.0 / w, 0.0, 0.0, //
                0.0, -1.0 / h, 1.0, //
                0.0, 0.0, 1.0,
            )
        } else {
            Matrix3::new(
                1.0 / w, 0.0, 0.0, //
                0.0, 1.0 / h, 0.0, //
                0.0, 0.0, 1.0,
            )
        }
    }

    /// Output UV in the requested convention to image-convention UV (its own inverse)
    pub fn uv_flip_matrix(y_up: bool) -> Matrix3<f64> {
        if y_up {
            Matrix3::new(
                1.0, 0.0, 0.0, //
                0.0, -1.0, 1.0, //
                0.0, 0.0, 1.0,
            )
        } else {
            Matrix3::identity()
        }
    }
}
