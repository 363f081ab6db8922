//! Scene plane model
//!
//! A plane is stored as a unit normal `n` and signed distance `d` with
//! `n . X = d` for every point X on it. The plane basis expresses plane-local
//! 2D coordinates `(a, b)` as world points `a*u + b*v + p0`.

use nalgebra::{Matrix3, Vector3};

use crate::error::{require_finite, HomographyError, Result, MIN_PLANE_DISTANCE};

/// Threshold on `|n . r|` above which a reference axis counts as parallel
const PARALLEL_EPS: f64 = 1e-6;

/// A plane in world coordinates (mm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    normal: Vector3<f64>,
    distance: f64,
}

impl PlaneModel {
    /// Build a plane; the normal is renormalized
    pub fn new(normal: Vector3<f64>, distance: f64) -> Result<Self> {
        for &c in normal.iter() {
            require_finite("normal", c)?;
        }
        // Prescale by the largest component so the norm neither overflows nor underflows
        let largest = normal.amax();
        if largest == 0.0 {
            return Err(HomographyError::invalid(
                "normal",
                largest,
                "plane normal must not be zero-length",
            ));
        }
        let unit = (normal / largest).normalize();
        let len = unit.norm();
        if (len - 1.0).abs() > 1e-12 {
            return Err(HomographyError::invalid(
                "normal",
                len,
                "plane normal could not be normalized",
            ));
        }
        let distance = require_finite("distance", distance)?;
        if distance.abs() < MIN_PLANE_DISTANCE {
            return Err(HomographyError::DegeneratePlane { distance });
        }

        Ok(Self {
            normal: unit,
            distance,
        })
    }

    /// Unit normal n
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Signed distance d from the world origin along n
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Plane basis `B = [u | v | p0]`.
    ///
    /// The reference axis is world +Y, or world +X when the normal is
    /// (nearly) parallel to Y. Then `u = normalize(r x n)`,
    /// `v = normalize(n x u)` and `p0 = d * n`, so `(u, v, n)` is right-handed
    /// and the result depends only on `(n, d)`.
    pub fn basis(&self) -> Result<Matrix3<f64>> {
        let n = self.normal;
        let reference = [Vector3::y(), Vector3::x()]
            .into_iter()
            .find(|r| n.dot(r).abs() <= 1.0 - PARALLEL_EPS)
            .ok_or(HomographyError::DegeneratePlane {
                distance: self.distance,
            })?;

        let u = reference
            .cross(&n)
            .try_normalize(f64::EPSILON)
            .ok_or(HomographyError::DegeneratePlane {
                distance: self.distance,
            })?;
        let v = n
            .cross(&u)
            .try_normalize(f64::EPSILON)
            .ok_or(HomographyError::DegeneratePlane {
                distance: self.distance,
            })?;
        let p0 = n * self.distance;

        Ok(Matrix3::from_columns(&[u, v, p0]))
    }

    /// `n . p - d`: positive on the side the normal points to
    pub fn signed_distance(&self, point: &Vector3<f64>) -> f64 {
        self.normal.dot(point) - self.distance
    }

    /// Forward intersection of the ray `origin + s * direction`, `s > 0`
    pub fn intersect_ray(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Vector3<f64>> {
        let denom = self.normal.dot(direction);
        if denom.abs() < 1e-9 {
            return None;
        }
        let s = (self.distance - self.normal.dot(origin)) / denom;
        if s <= 0.0 || !s.is_finite() {
            return None;
        }
        Some(origin + direction * s)
    }

    /// Plane-local coordinates `(a, b)` of the orthogonal projection of a world point
    pub fn to_plane_coords(&self, point: &Vector3<f64>) -> Result<(f64, f64)> {
        let basis = self.basis()?;
        let offset = point - basis.column(2);
        Ok((offset.dot(&basis.column(0)), offset.dot(&basis.column(1))))
    }

    /// World point of plane-local coordinates `(a, b)`
    pub fn to_world(&self, a: f64, b: f64) -> Result<Vector3<f64>> {
        Ok(self.basis()? * Vector3::new(a, b, 1.0))
    }
}
