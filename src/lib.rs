//! Birdseye - planar homography engine for camera rectification
//!
//! Given a camera's intrinsics and pose, a plane in the scene and an output
//! window onto that plane, computes the 3x3 matrix that maps normalized output
//! texture coordinates to normalized source texture coordinates. A fragment
//! shader uses it per pixel to render a bird's-eye or fronto-parallel view.
//!
//! ```no_run
//! use birdseye::{CameraPose, HomographyEngine, Intrinsics, OutputWindow, PlaneModel};
//! use nalgebra::Vector3;
//!
//! # fn main() -> birdseye::Result<()> {
//! let k = Intrinsics::from_focal_length(1280, 720, 2.95, 1.45)?;
//! let pose = CameraPose::new(Vector3::new(0.0, 0.0, 12000.0), 180.0, -60.0, 0.0)?;
//! let ground = PlaneModel::new(Vector3::z(), 1.0)?;
//! let window = OutputWindow::centered_on_optical_axis(&pose, &ground, 5000.0, 5000.0, true)
//!     .expect("camera looks at the ground");
//!
//! let homography = HomographyEngine::new(k, pose, ground, window).compute()?;
//! let center = homography.map_point(0.5, 0.5);
//! assert!(center.valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod homography;
pub mod intrinsics;
pub mod plane;
pub mod pose;
pub mod rig;
pub mod transform;
pub mod uniforms;
pub mod window;

pub use error::{HomographyError, Result};
pub use homography::{
    compute, Homography, HomographyEngine, MappedPoint, ProjectedMatrix, ProjectionStatus,
};
pub use intrinsics::{Intrinsics, Optics};
pub use plane::PlaneModel;
pub use pose::CameraPose;
pub use rig::{Rig, RigCamera, RigResult};
pub use uniforms::{MatrixLayout, ShaderUniforms};
pub use window::OutputWindow;
