//! Pinhole camera intrinsics
//!
//! Converts an image size plus either a lens description (focal length and
//! sensor pixel pitch) or a field-of-view pair into the camera matrix K.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::{require_finite, require_positive, HomographyError, Result};

/// How the focal length of a camera is specified
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Optics {
    /// Lens focal length and sensor pixel pitch (e.g. 2.95mm / 1.45µm)
    FocalLength {
        focal_length_mm: f64,
        pixel_pitch_um: f64,
    },
    /// Horizontal and vertical field of view in degrees
    FieldOfView { h_fov_deg: f64, v_fov_deg: f64 },
}

/// Validated pinhole intrinsics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    width: u32,
    height: u32,
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

impl Intrinsics {
    /// Build intrinsics from either parametrization
    pub fn new(width: u32, height: u32, optics: Optics) -> Result<Self> {
        match optics {
            Optics::FocalLength {
                focal_length_mm,
                pixel_pitch_um,
            } => Self::from_focal_length(width, height, focal_length_mm, pixel_pitch_um),
            Optics::FieldOfView {
                h_fov_deg,
                v_fov_deg,
            } => Self::from_fov(width, height, h_fov_deg, v_fov_deg),
        }
    }

    /// `fx = fy = f_mm * 1000 / pitch_um` (square pixels)
    pub fn from_focal_length(
        width: u32,
        height: u32,
        focal_length_mm: f64,
        pixel_pitch_um: f64,
    ) -> Result<Self> {
        check_dimensions(width, height)?;
        let f_mm = require_positive("focal_length_mm", focal_length_mm)?;
        let pitch = require_positive("pixel_pitch_um", pixel_pitch_um)?;
        let f_px = f_mm * 1000.0 / pitch;

        Self::from_focal_px(width, height, f_px, f_px)
    }

    /// `fx = (w/2) / tan(h_fov/2)`, `fy = (h/2) / tan(v_fov/2)`
    pub fn from_fov(width: u32, height: u32, h_fov_deg: f64, v_fov_deg: f64) -> Result<Self> {
        check_dimensions(width, height)?;
        let h_fov = check_fov("h_fov_deg", h_fov_deg)?;
        let v_fov = check_fov("v_fov_deg", v_fov_deg)?;

        let fx = (width as f64 / 2.0) / (h_fov.to_radians() / 2.0).tan();
        let fy = (height as f64 / 2.0) / (v_fov.to_radians() / 2.0).tan();

        Self::from_focal_px(width, height, fx, fy)
    }

    /// Focal lengths already expressed in pixels, principal point at the image center
    pub fn from_focal_px(width: u32, height: u32, fx: f64, fy: f64) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            fx: require_positive("fx", fx)?,
            fy: require_positive("fy", fy)?,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        })
    }

    /// Override the principal point (pixels)
    pub fn with_principal_point(self, cx: f64, cy: f64) -> Result<Self> {
        Ok(Self {
            cx: require_finite("cx", cx)?,
            cy: require_finite("cy", cy)?,
            ..self
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Focal lengths `(fx, fy)` in pixels
    pub fn focal_length_px(&self) -> (f64, f64) {
        (self.fx, self.fy)
    }

    /// Principal point `(cx, cy)` in pixels
    pub fn principal_point(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    /// The camera matrix K
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Full horizontal and vertical field of view in degrees
    pub fn field_of_view_deg(&self) -> (f64, f64) {
        let h = 2.0 * (self.width as f64 / 2.0 / self.fx).atan();
        let v = 2.0 * (self.height as f64 / 2.0 / self.fy).atan();
        (h.to_degrees(), v.to_degrees())
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 {
        return Err(HomographyError::invalid("width", 0.0, "must be positive"));
    }
    if height == 0 {
        return Err(HomographyError::invalid("height", 0.0, "must be positive"));
    }
    Ok(())
}

fn check_fov(name: &'static str, fov_deg: f64) -> Result<f64> {
    let fov = require_positive(name, fov_deg)?;
    if fov >= 180.0 {
        return Err(HomographyError::invalid(
            name,
            fov,
            "must be below 180 degrees",
        ));
    }
    Ok(fov)
}
