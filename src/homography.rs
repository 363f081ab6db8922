//! Plane-induced homography engine
//!
//! Chains the four input models into two matrices:
//!
//! - `H = K * (R - (R*C) * n^T / d) * B` maps plane-local homogeneous
//!   coordinates `(a, b, 1)` (mm) to source pixels. For a point X on the plane
//!   this is exactly `K * (R*X + t)`, the pinhole projection.
//! - `M = N^-1 * H * A * F` maps output UV to source UV: output UV to image
//!   convention (F), to plane mm (A), to source pixels (H), to source UV (N^-1).
//!   In image convention F is the identity and `M = N^-1 * H * A`.
//!
//! Both are recomputed in full from one snapshot of the inputs every time.

use nalgebra::{Matrix3, Vector3};
use serde::Serialize;

use crate::error::Result;
use crate::intrinsics::Intrinsics;
use crate::plane::PlaneModel;
use crate::pose::CameraPose;
use crate::window::OutputWindow;

/// `|H[2,2]|` below this fraction of the largest entry is treated as zero
const CANONICAL_EPS: f64 = 1e-9;

/// `|w|` below this is a per-sample division singularity
const DIVIDE_EPS: f64 = 1e-9;

/// Whether a matrix could be canonicalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionStatus {
    /// `H[2,2]` was usable and the matrix is scaled so that it equals 1
    Ok,
    /// `H[2,2]` vanished: the plane's support point sits at zero camera depth,
    /// e.g. a plane parallel to the optical axis. The matrix is returned unnormalized.
    Singular,
}

/// A 3x3 matrix together with its validity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedMatrix {
    pub matrix: Matrix3<f64>,
    pub status: ProjectionStatus,
    /// Sign relating the third homogeneous coordinate to camera depth: +1, or
    /// -1 when canonicalization divided by a negative `H[2,2]`
    pub depth_sign: f64,
}

impl ProjectedMatrix {
    pub fn ok(&self) -> bool {
        self.status == ProjectionStatus::Ok
    }
}

/// Result of mapping one UV sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MappedPoint {
    pub u: f64,
    pub v: f64,
    /// False when the homogeneous divide was singular or the plane point is
    /// behind the camera; `u`/`v` are then 0
    pub valid: bool,
}

impl MappedPoint {
    const INVALID: Self = Self {
        u: 0.0,
        v: 0.0,
        valid: false,
    };
}

/// Both derived matrices computed from one input snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    /// Plane-local mm to source pixels
    pub h: Matrix3<f64>,
    /// Output UV to source UV, the matrix handed to the shader
    pub m: Matrix3<f64>,
    pub status: ProjectionStatus,
    /// See [`ProjectedMatrix::depth_sign`]
    pub depth_sign: f64,
}

impl Homography {
    pub fn is_ok(&self) -> bool {
        self.status == ProjectionStatus::Ok
    }

    /// Map output UV `(u, v)` to source UV with a perspective divide
    pub fn map_point(&self, u: f64, v: f64) -> MappedPoint {
        apply(&self.m, self.depth_sign, u, v)
    }

    /// M flattened row by row: m00, m01, m02, m10, ..., m22
    pub fn to_row_major(&self) -> [f64; 9] {
        row_major(&self.m)
    }

    /// H flattened row by row
    pub fn homography_row_major(&self) -> [f64; 9] {
        row_major(&self.h)
    }
}

/// Compute H, M and the status from the four input models
pub fn compute(
    intrinsics: &Intrinsics,
    pose: &CameraPose,
    plane: &PlaneModel,
    window: &OutputWindow,
) -> Result<Homography> {
    let h = plane_homography(intrinsics, pose, plane)?;
    let m = normalize(intrinsics, window, &h.matrix);

    if !h.ok() {
        let n = plane.normal();
        let c = pose.position();
        tracing::debug!(
            "Singular projection: plane normal ({:.3}, {:.3}, {:.3}), \
             camera at ({:.1}, {:.1}, {:.1})",
            n.x,
            n.y,
            n.z,
            c.x,
            c.y,
            c.z
        );
    }

    Ok(Homography {
        h: h.matrix,
        m,
        status: h.status,
        depth_sign: h.depth_sign,
    })
}

/// Canonicalized `K * (R - (R*C) * n^T / d) * B`
fn plane_homography(
    intrinsics: &Intrinsics,
    pose: &CameraPose,
    plane: &PlaneModel,
) -> Result<ProjectedMatrix> {
    let k = intrinsics.camera_matrix();
    let r = pose.rotation();
    let n = plane.normal();
    let d = plane.distance();
    let b = plane.basis()?;

    // Camera center in rotated coordinates; equals -t
    let center: Vector3<f64> = r * pose.position();
    let h = k * (r - center * n.transpose() / d) * b;

    Ok(canonicalize(h))
}

fn canonicalize(h: Matrix3<f64>) -> ProjectedMatrix {
    let h22 = h[(2, 2)];
    let largest = h.amax();

    // Raw w is the camera depth of the plane point, since K's last row is (0, 0, 1)
    if largest.is_finite() && h22.abs() > CANONICAL_EPS * largest {
        ProjectedMatrix {
            matrix: h / h22,
            status: ProjectionStatus::Ok,
            depth_sign: h22.signum(),
        }
    } else {
        ProjectedMatrix {
            matrix: h,
            status: ProjectionStatus::Singular,
            depth_sign: 1.0,
        }
    }
}

fn normalize(intrinsics: &Intrinsics, window: &OutputWindow, h: &Matrix3<f64>) -> Matrix3<f64> {
    let y_up = window.y_up();
    let to_uv = OutputWindow::pixel_to_uv_matrix(intrinsics.width(), intrinsics.height(), y_up);
    let flip = OutputWindow::uv_flip_matrix(y_up);

    to_uv * h * window.plane_to_uv_matrix() * flip
}

fn apply(m: &Matrix3<f64>, depth_sign: f64, u: f64, v: f64) -> MappedPoint {
    let p = m * Vector3::new(u, v, 1.0);
    let w = p.z;
    // Near-zero or negative depth: on the horizon or behind the camera
    if !w.is_finite() || w * depth_sign < DIVIDE_EPS {
        return MappedPoint::INVALID;
    }

    let (u, v) = (p.x / w, p.y / w);
    if u.is_finite() && v.is_finite() {
        MappedPoint { u, v, valid: true }
    } else {
        MappedPoint::INVALID
    }
}

fn row_major(m: &Matrix3<f64>) -> [f64; 9] {
    // nalgebra stores column-major; the transpose's storage is our row order
    let mut out = [0.0; 9];
    out.copy_from_slice(m.transpose().as_slice());
    out
}

/// Immutable snapshot of the four inputs.
///
/// Replacing an input yields a new engine, so a published matrix is never
/// built from a half-updated configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomographyEngine {
    intrinsics: Intrinsics,
    pose: CameraPose,
    plane: PlaneModel,
    window: OutputWindow,
}

impl HomographyEngine {
    pub fn new(
        intrinsics: Intrinsics,
        pose: CameraPose,
        plane: PlaneModel,
        window: OutputWindow,
    ) -> Self {
        Self {
            intrinsics,
            pose,
            plane,
            window,
        }
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn plane(&self) -> &PlaneModel {
        &self.plane
    }

    pub fn window(&self) -> &OutputWindow {
        &self.window
    }

    pub fn with_intrinsics(self, intrinsics: Intrinsics) -> Self {
        Self { intrinsics, ..self }
    }

    pub fn with_pose(self, pose: CameraPose) -> Self {
        Self { pose, ..self }
    }

    pub fn with_plane(self, plane: PlaneModel) -> Self {
        Self { plane, ..self }
    }

    pub fn with_window(self, window: OutputWindow) -> Self {
        Self { window, ..self }
    }

    /// H: plane-local mm to source pixels
    pub fn homography(&self) -> Result<ProjectedMatrix> {
        plane_homography(&self.intrinsics, &self.pose, &self.plane)
    }

    /// M: output UV to source UV; carries H's status
    pub fn normalized(&self) -> Result<ProjectedMatrix> {
        let h = self.homography()?;
        Ok(ProjectedMatrix {
            matrix: normalize(&self.intrinsics, &self.window, &h.matrix),
            status: h.status,
            depth_sign: h.depth_sign,
        })
    }

    /// Map one output UV sample to source UV
    pub fn map_point(&self, u: f64, v: f64) -> Result<MappedPoint> {
        let m = self.normalized()?;
        Ok(apply(&m.matrix, m.depth_sign, u, v))
    }

    /// H, M and status together
    pub fn compute(&self) -> Result<Homography> {
        compute(&self.intrinsics, &self.pose, &self.plane, &self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-3;

    fn radxa_720() -> Intrinsics {
        Intrinsics::from_focal_length(720, 720, 2.95, 1.45).unwrap()
    }

    /// Camera at the origin, wall at 4m, window spanning the whole frame
    fn fronto_parallel(y_up: bool) -> HomographyEngine {
        let k = radxa_720();
        HomographyEngine::new(
            k,
            CameraPose::identity(),
            PlaneModel::new(Vector3::z(), 4000.0).unwrap(),
            OutputWindow::fronto_parallel(&k, 4000.0, y_up).unwrap(),
        )
    }

    /// 12m high camera flipped down and tilted 60 degrees, 5m x 5m window on the ground
    fn oblique_ground() -> HomographyEngine {
        let pose = CameraPose::new(Vector3::new(0.0, 0.0, 12000.0), 180.0, -60.0, 0.0).unwrap();
        let ground = PlaneModel::new(Vector3::z(), 1.0).unwrap();
        let window =
            OutputWindow::centered_on_optical_axis(&pose, &ground, 5000.0, 5000.0, true).unwrap();
        HomographyEngine::new(radxa_720(), pose, ground, window)
    }

    fn assert_maps_to(h: &Homography, from: (f64, f64), to: (f64, f64)) {
        let p = h.map_point(from.0, from.1);
        assert!(p.valid, "{:?} is not valid", from);
        assert!(
            (p.u - to.0).abs() < TOL && (p.v - to.1).abs() < TOL,
            "{:?} mapped to ({}, {}), expected {:?}",
            from,
            p.u,
            p.v,
            to
        );
    }

    #[test]
    fn test_fronto_parallel_identity() {
        for y_up in [true, false] {
            let h = fronto_parallel(y_up).compute().unwrap();
            assert!(h.is_ok());
            assert_maps_to(&h, (0.5, 0.5), (0.5, 0.5));
            for corner in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                assert_maps_to(&h, corner, corner);
            }
        }
    }

    #[test]
    fn test_identity_over_grid() {
        let engine = fronto_parallel(true);
        for i in 0..=10 {
            for j in 0..=10 {
                let (u, v) = (i as f64 / 10.0, j as f64 / 10.0);
                let p = engine.map_point(u, v).unwrap();
                assert!(p.valid);
                assert!((p.u - u).abs() < 1e-9 && (p.v - v).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_reference_scenario_first_row() {
        // 720x720, wall at 4000mm, window centered at (-halfscale, -halfscale)
        let k = radxa_720();
        let (fx, _) = k.focal_length_px();
        let scale = 4000.0 / fx * 720.0;
        let window = OutputWindow::new(scale, scale, -0.5 * scale, -0.5 * scale, true).unwrap();
        let engine = fronto_parallel(true).with_window(window);

        let m = engine.normalized().unwrap();
        assert!(m.ok());
        let row = [m.matrix[(0, 0)], m.matrix[(0, 1)], m.matrix[(0, 2)]];
        assert!((row[0] - 1.0).abs() < 1e-6);
        assert!(row[1].abs() < 1e-6);
        assert!(row[2].abs() < 1e-6);
    }

    #[test]
    fn test_canonical_h() {
        let h = fronto_parallel(false).homography().unwrap();
        assert!(h.ok());
        assert_eq!(h.matrix[(2, 2)], 1.0);

        // Plane mm (0, 0) is straight ahead: the principal point
        let p = h.matrix * Vector3::new(0.0, 0.0, 1.0);
        assert!((p.x / p.z - 360.0).abs() < 1e-9);
        assert!((p.y / p.z - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_h_matches_pinhole_projection() {
        let k = radxa_720();
        let pose = CameraPose::new(Vector3::new(200.0, -300.0, 3000.0), 180.0, 25.0, 10.0).unwrap();
        let plane = PlaneModel::new(Vector3::new(0.1, -0.05, 1.0), 500.0).unwrap();
        let window = OutputWindow::new(1000.0, 1000.0, 0.0, 0.0, false).unwrap();
        let engine = HomographyEngine::new(k, pose, plane, window);
        let h = engine.homography().unwrap();
        assert!(h.ok());

        for (a, b) in [(0.0, 0.0), (123.0, -456.0), (-800.0, 250.0)] {
            let world = plane.to_world(a, b).unwrap();
            let direct = k.camera_matrix() * pose.world_to_camera(&world);
            let via_h = h.matrix * Vector3::new(a, b, 1.0);

            assert!((direct.x / direct.z - via_h.x / via_h.z).abs() < 1e-6);
            assert!((direct.y / direct.z - via_h.y / via_h.z).abs() < 1e-6);
        }
    }

    #[test]
    fn test_oblique_center_and_monotonic_rows() {
        let h = oblique_ground().compute().unwrap();
        assert!(h.is_ok());
        assert_maps_to(&h, (0.5, 0.5), (0.5, 0.5));

        let mut previous = f64::NEG_INFINITY;
        for i in 0..=16 {
            let p = h.map_point(i as f64 / 16.0, 0.5);
            assert!(p.valid);
            assert!((0.0..=1.0).contains(&p.u), "sample {} left the frame: {}", i, p.u);
            assert!(p.u > previous, "folding at sample {}", i);
            previous = p.u;
        }
    }

    #[test]
    fn test_tilted_wall_monotonic() {
        let k = radxa_720();
        let pose = CameraPose::new(Vector3::new(0.0, -800.0, 0.0), 0.0, 20.0, 15.0).unwrap();
        let wall = PlaneModel::new(Vector3::z(), 4000.0).unwrap();
        let window =
            OutputWindow::centered_on_optical_axis(&pose, &wall, 1200.0, 1200.0, true).unwrap();
        let engine = HomographyEngine::new(k, pose, wall, window);

        for v in [0.1, 0.5, 0.9] {
            let samples: Vec<f64> = (0..=20)
                .map(|i| engine.map_point(i as f64 / 20.0, v).unwrap())
                .map(|p| {
                    assert!(p.valid);
                    p.u
                })
                .collect();
            let increasing = samples.windows(2).all(|w| w[1] > w[0]);
            let decreasing = samples.windows(2).all(|w| w[1] < w[0]);
            assert!(increasing || decreasing, "row v={} folds: {:?}", v, samples);
        }
    }

    #[test]
    fn test_yaw_sweep_keeps_center() {
        let base = fronto_parallel(true);
        let mut yaw = 0.0;
        while yaw < 360.0 {
            let pose = base.pose().with_angles(0.0, 0.0, yaw).unwrap();
            let h = base.with_pose(pose).compute().unwrap();
            assert_maps_to(&h, (0.5, 0.5), (0.5, 0.5));
            yaw += 5.0;
        }
    }

    #[test]
    fn test_singular_plane_parallel_to_axis() {
        let k = radxa_720();
        let plane = PlaneModel::new(Vector3::x(), 1000.0).unwrap();
        let window = OutputWindow::new(1000.0, 1000.0, -500.0, -500.0, false).unwrap();
        let engine = HomographyEngine::new(k, CameraPose::identity(), plane, window);

        let h = engine.homography().unwrap();
        assert!(!h.ok());
        assert_eq!(h.status, ProjectionStatus::Singular);

        let p = engine.map_point(0.5, 0.5).unwrap();
        assert!(!p.valid);

        let snapshot = engine.compute().unwrap();
        assert!(!snapshot.is_ok());
        assert!(!snapshot.map_point(0.5, 0.5).valid);
    }

    #[test]
    fn test_points_behind_camera_are_invalid() {
        // Camera 1m up, looking almost horizontally along +X over the ground
        let k = Intrinsics::from_fov(720, 720, 150.0, 150.0).unwrap();
        let pose = CameraPose::new(Vector3::new(0.0, 0.0, 1000.0), 180.0, -80.0, 0.0).unwrap();
        let ground = PlaneModel::new(Vector3::z(), 1.0).unwrap();
        let window = OutputWindow::new(40000.0, 40000.0, -20000.0, -20000.0, false).unwrap();
        let engine = HomographyEngine::new(k, pose, ground, window);
        let h = engine.compute().unwrap();
        assert!(h.is_ok());

        // Ground x = -10000 is behind the camera even though its UV lands in frame
        let behind = pose.world_to_camera(&Vector3::new(-10000.0, 0.0, 1.0));
        assert!(behind.z < 0.0);
        assert_eq!(h.map_point(0.25, 0.5), MappedPoint::INVALID);
        assert!(!engine.map_point(0.25, 0.5).unwrap().valid);

        // Ground x = +10000 is in front
        let ahead = h.map_point(0.75, 0.5);
        assert!(ahead.valid);
        assert!((ahead.u - 0.5101).abs() < 1e-3 && (ahead.v - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_negative_h22_keeps_front_points_valid() {
        // Oblique wall whose support point d*n sits behind the camera, so raw H[2,2] < 0
        let plane = PlaneModel::new(Vector3::new(1.0, 0.0, -0.2), 1000.0).unwrap();
        assert!(plane.to_world(0.0, 0.0).unwrap().z < 0.0);

        // Window centered on the wall point 10m ahead, plane coords (-10398, 0)
        let window = OutputWindow::new(1000.0, 1000.0, -10898.039, -500.0, false).unwrap();
        let engine = HomographyEngine::new(radxa_720(), CameraPose::identity(), plane, window);
        let h = engine.compute().unwrap();
        assert!(h.is_ok());
        assert_eq!(h.depth_sign, -1.0);

        let center = h.map_point(0.5, 0.5);
        assert!(center.valid);
        assert!((center.v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_engine_and_snapshot_agree() {
        let engine = oblique_ground();
        let snapshot = engine.compute().unwrap();
        assert_eq!(snapshot.h, engine.homography().unwrap().matrix);
        assert_eq!(snapshot.m, engine.normalized().unwrap().matrix);
        for (u, v) in [(0.1, 0.2), (0.5, 0.5), (0.9, 0.7)] {
            assert_eq!(snapshot.map_point(u, v), engine.map_point(u, v).unwrap());
        }
    }

    #[test]
    fn test_f32_evaluation_matches() {
        // The shader evaluates M in single precision
        let h = oblique_ground().compute().unwrap();
        let m32: [f32; 9] = h.to_row_major().map(|x| x as f32);

        for (u, v) in [(0.0f32, 0.0f32), (0.25, 0.75), (0.5, 0.5), (1.0, 1.0)] {
            let x = m32[0] * u + m32[1] * v + m32[2];
            let y = m32[3] * u + m32[4] * v + m32[5];
            let w = m32[6] * u + m32[7] * v + m32[8];
            let cpu = h.map_point(u as f64, v as f64);
            assert!(cpu.valid);
            assert!(((x / w) as f64 - cpu.u).abs() < 1e-4);
            assert!(((y / w) as f64 - cpu.v).abs() < 1e-4);
        }
    }

    #[test]
    fn test_row_major_order() {
        let h = Homography {
            h: Matrix3::identity(),
            m: Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0),
            status: ProjectionStatus::Ok,
            depth_sign: 1.0,
        };
        assert_eq!(h.to_row_major(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(
            h.homography_row_major(),
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
    }
}
