//! Shader uniform marshaling
//!
//! The fragment shader reconstructs a `mat3` from nine float uniforms named
//! `m00` .. `m22`. GLSL's `mat3(...)` constructor fills columns first, so the
//! element order handed over must be chosen explicitly by the caller.

use serde::{Deserialize, Serialize};

use crate::homography::{Homography, ProjectionStatus};

/// Uniform names in upload order
pub const UNIFORM_NAMES: [&str; 9] = [
    "m00", "m01", "m02", "m10", "m11", "m12", "m20", "m21", "m22",
];

/// Element order of the nine floats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatrixLayout {
    /// m00 = M[0][0], m01 = M[0][1], ...
    RowMajor,
    /// m00 = M[0][0], m01 = M[1][0], ... (what `mat3(m00, ..., m22)` expects)
    #[default]
    ColumnMajor,
}

/// The uniform block handed to the pipeline layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShaderUniforms {
    pub layout: MatrixLayout,
    pub values: [f32; 9],
    /// Clamp out-of-range source UVs instead of sampling transparent black
    pub clamp_uv: bool,
    /// The shader discards samples where `w * depth_sign <= 0` (behind the camera)
    pub depth_sign: f32,
    pub status: ProjectionStatus,
}

impl ShaderUniforms {
    pub fn new(homography: &Homography, layout: MatrixLayout, clamp_uv: bool) -> Self {
        let row_major = homography.to_row_major();
        let ordered = match layout {
            MatrixLayout::RowMajor => row_major,
            MatrixLayout::ColumnMajor => transpose(&row_major),
        };

        Self {
            layout,
            values: ordered.map(|x| x as f32),
            clamp_uv,
            depth_sign: homography.depth_sign as f32,
            status: homography.status,
        }
    }

    /// `(name, value)` pairs in upload order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        UNIFORM_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Flat JSON object `{"m00": .., ..., "m22": .., "clamp_uv": 1, "depth_sign": 1.0}`
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in self.named() {
            map.insert(name.to_string(), serde_json::json!(value));
        }
        map.insert("clamp_uv".to_string(), serde_json::json!(self.clamp_uv as i32));
        map.insert("depth_sign".to_string(), serde_json::json!(self.depth_sign));
        serde_json::Value::Object(map)
    }
}

fn transpose(m: &[f64; 9]) -> [f64; 9] {
    [m[0], m[3], m[6], m[1], m[4], m[7], m[2], m[5], m[8]]
}
