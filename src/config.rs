//! Rig configuration
//!
//! A TOML description of one or more cameras, each with intrinsics, pose,
//! target plane and output window, plus the uniform layout expected by the
//! shader layer.

use anyhow::{anyhow, Context, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::homography::HomographyEngine;
use crate::intrinsics::{Intrinsics, Optics};
use crate::plane::PlaneModel;
use crate::pose::CameraPose;
use crate::rig::Rig;
use crate::uniforms::MatrixLayout;
use crate::window::OutputWindow;

fn default_y_up() -> bool {
    true
}

fn default_clamp_uv() -> bool {
    true
}

/// Image size and optics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrinsicsConfig {
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub optics: Optics,
    /// Principal point override in pixels; defaults to the image center
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_point: Option<[f64; 2]>,
}

impl IntrinsicsConfig {
    pub fn to_model(&self) -> crate::Result<Intrinsics> {
        let intrinsics = Intrinsics::new(self.width, self.height, self.optics)?;
        match self.principal_point {
            Some([cx, cy]) => intrinsics.with_principal_point(cx, cy),
            None => Ok(intrinsics),
        }
    }
}

/// Camera position (mm) and orientation (degrees)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseConfig {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
}

impl PoseConfig {
    pub fn to_model(&self) -> crate::Result<CameraPose> {
        CameraPose::new(
            Vector3::new(self.x, self.y, self.z),
            self.roll,
            self.pitch,
            self.yaw,
        )
    }
}

/// Target plane `n . X = distance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub normal: [f64; 3],
    pub distance: f64,
}

impl PlaneConfig {
    pub fn to_model(&self) -> crate::Result<PlaneModel> {
        PlaneModel::new(Vector3::from(self.normal), self.distance)
    }
}

/// How the output window is placed on the plane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowConfig {
    /// Explicit scale (mm per UV unit) and origin (mm)
    Manual {
        scale_x: f64,
        scale_y: f64,
        origin_x: f64,
        origin_y: f64,
        #[serde(default = "default_y_up")]
        y_up: bool,
    },
    /// Span the camera frame at the camera's distance from the plane,
    /// anchored at the plane's support point
    Fit {
        #[serde(default = "default_y_up")]
        y_up: bool,
    },
    /// Given size, centered where the optical axis meets the plane
    OpticalAxis {
        scale_x: f64,
        scale_y: f64,
        #[serde(default = "default_y_up")]
        y_up: bool,
    },
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig::Fit { y_up: true }
    }
}

impl WindowConfig {
    pub fn to_model(
        &self,
        intrinsics: &Intrinsics,
        pose: &CameraPose,
        plane: &PlaneModel,
    ) -> Result<OutputWindow> {
        let window = match *self {
            WindowConfig::Manual {
                scale_x,
                scale_y,
                origin_x,
                origin_y,
                y_up,
            } => OutputWindow::new(scale_x, scale_y, origin_x, origin_y, y_up)?,
            WindowConfig::Fit { y_up } => {
                let distance = plane.signed_distance(&pose.position()).abs();
                OutputWindow::fronto_parallel(intrinsics, distance, y_up)?
            }
            WindowConfig::OpticalAxis {
                scale_x,
                scale_y,
                y_up,
            } => OutputWindow::centered_on_optical_axis(pose, plane, scale_x, scale_y, y_up)
                .ok_or_else(|| {
                    anyhow!("optical axis does not hit the plane in front of the camera")
                })?,
        };
        Ok(window)
    }
}

/// One camera of the rig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub name: String,
    pub intrinsics: IntrinsicsConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    pub plane: PlaneConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

impl CameraConfig {
    /// Validate the raw values into an engine
    pub fn to_engine(&self) -> Result<HomographyEngine> {
        let intrinsics = self
            .intrinsics
            .to_model()
            .with_context(|| format!("Invalid intrinsics for camera '{}'", self.name))?;
        let pose = self
            .pose
            .to_model()
            .with_context(|| format!("Invalid pose for camera '{}'", self.name))?;
        let plane = self
            .plane
            .to_model()
            .with_context(|| format!("Invalid plane for camera '{}'", self.name))?;
        let window = self
            .window
            .to_model(&intrinsics, &pose, &plane)
            .with_context(|| format!("Invalid output window for camera '{}'", self.name))?;

        Ok(HomographyEngine::new(intrinsics, pose, plane, window))
    }
}

/// Uniform marshaling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformsConfig {
    #[serde(default)]
    pub layout: MatrixLayout,
    #[serde(default = "default_clamp_uv")]
    pub clamp_uv: bool,
}

impl Default for UniformsConfig {
    fn default() -> Self {
        Self {
            layout: MatrixLayout::default(),
            clamp_uv: true,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub uniforms: UniformsConfig,

    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
}

impl Default for RigConfig {
    /// Two Radxa 4K cameras 100mm apart, facing a wall 4m away
    fn default() -> Self {
        let camera = |name: &str, x: f64| CameraConfig {
            name: name.to_string(),
            intrinsics: IntrinsicsConfig {
                width: 1280,
                height: 720,
                optics: Optics::FocalLength {
                    focal_length_mm: 2.95,
                    pixel_pitch_um: 1.45,
                },
                principal_point: None,
            },
            pose: PoseConfig {
                x,
                ..PoseConfig::default()
            },
            plane: PlaneConfig {
                normal: [0.0, 0.0, 1.0],
                distance: 4000.0,
            },
            window: WindowConfig::default(),
        };

        Self {
            uniforms: UniformsConfig::default(),
            cameras: vec![camera("left", -50.0), camera("right", 50.0)],
        }
    }
}

impl RigConfig {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: RigConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = RigConfig::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Look up a camera by name; `None` picks the first one
    pub fn camera(&self, name: Option<&str>) -> Result<&CameraConfig> {
        match name {
            Some(name) => self
                .cameras
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| anyhow!("No camera named '{}' in configuration", name)),
            None => self
                .cameras
                .first()
                .ok_or_else(|| anyhow!("Configuration contains no cameras")),
        }
    }

    /// Validate every camera into a rig
    pub fn to_rig(&self) -> Result<Rig> {
        let mut rig = Rig::default();
        for camera in &self.cameras {
            rig.push(camera.name.clone(), camera.to_engine()?);
        }
        Ok(rig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let config = RigConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RigConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.cameras.len(), 2);
        assert_eq!(parsed.cameras[0].name, "left");
        assert_eq!(parsed.uniforms.layout, MatrixLayout::ColumnMajor);
        assert!(matches!(
            parsed.cameras[1].intrinsics.optics,
            Optics::FocalLength { .. }
        ));

        let rig = parsed.to_rig().unwrap();
        assert_eq!(rig.len(), 2);
    }

    #[test]
    fn test_parse_fov_camera_with_manual_window() {
        let text = r#"
            [uniforms]
            layout = "row_major"
            clamp_uv = false

            [[cameras]]
            name = "ground"

            [cameras.intrinsics]
            width = 720
            height = 720
            h_fov_deg = 59.0
            v_fov_deg = 59.0

            [cameras.pose]
            z = 12000.0
            roll = 180.0
            pitch = -60.0

            [cameras.plane]
            normal = [0.0, 0.0, 1.0]
            distance = 1.0

            [cameras.window]
            mode = "manual"
            scale_x = 5000.0
            scale_y = 5000.0
            origin_x = -2500.0
            origin_y = -2500.0
        "#;

        let config: RigConfig = toml::from_str(text).unwrap();
        assert_eq!(config.uniforms.layout, MatrixLayout::RowMajor);
        assert!(!config.uniforms.clamp_uv);

        let camera = config.camera(Some("ground")).unwrap();
        let engine = camera.to_engine().unwrap();
        assert!(engine.window().y_up());
        assert_eq!(engine.pose().angles_deg(), (180.0, -60.0, 0.0));
        assert!(engine.compute().is_ok());
    }

    #[test]
    fn test_principal_point_override() {
        let text = r#"
            [[cameras]]
            name = "offset"

            [cameras.intrinsics]
            width = 1280
            height = 720
            focal_length_mm = 2.95
            pixel_pitch_um = 1.45
            principal_point = [652.5, 341.25]

            [cameras.plane]
            normal = [0.0, 0.0, 1.0]
            distance = 4000.0
        "#;

        let config: RigConfig = toml::from_str(text).unwrap();
        let intrinsics = &config.cameras[0].intrinsics;
        assert_eq!(intrinsics.principal_point, Some([652.5, 341.25]));
        assert!(matches!(intrinsics.optics, Optics::FocalLength { .. }));

        let engine = config.cameras[0].to_engine().unwrap();
        let k = engine.intrinsics().camera_matrix();
        assert_eq!(k[(0, 2)], 652.5);
        assert_eq!(k[(1, 2)], 341.25);

        // Straight ahead still lands on the principal point
        let h = engine.homography().unwrap();
        let p = h.matrix * Vector3::new(0.0, 0.0, 1.0);
        assert!((p.x / p.z - 652.5).abs() < 1e-9);
        assert!((p.y / p.z - 341.25).abs() < 1e-9);

        // Survives a save round trip
        let text = toml::to_string_pretty(&config).unwrap();
        let reparsed: RigConfig = toml::from_str(&text).unwrap();
        assert_eq!(reparsed.cameras[0].intrinsics.principal_point, Some([652.5, 341.25]));
    }

    #[test]
    fn test_principal_point_must_be_finite() {
        let mut config = RigConfig::default();
        config.cameras[0].intrinsics.principal_point = Some([f64::NAN, 360.0]);
        let err = config.cameras[0].to_engine().unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid intrinsics for camera 'left'"));
    }

    #[test]
    fn test_optical_axis_window() {
        let mut config = RigConfig::default();
        config.cameras[0].pose.roll = 180.0;
        config.cameras[0].pose.pitch = -60.0;
        config.cameras[0].pose.z = 12000.0;
        config.cameras[0].plane.distance = 1.0;
        config.cameras[0].window = WindowConfig::OpticalAxis {
            scale_x: 5000.0,
            scale_y: 5000.0,
            y_up: true,
        };

        let engine = config.cameras[0].to_engine().unwrap();
        let center = engine.map_point(0.5, 0.5).unwrap();
        assert!(center.valid);
        assert!((center.u - 0.5).abs() < 1e-6);
        assert!((center.v - 0.5).abs() < 1e-6);

        // Looking straight up, away from the ground
        config.cameras[0].pose.roll = 0.0;
        config.cameras[0].pose.pitch = 0.0;
        assert!(config.cameras[0].to_engine().is_err());
    }

    #[test]
    fn test_invalid_values_fail_fast() {
        let mut config = RigConfig::default();
        config.cameras[1].plane.normal = [0.0, 0.0, 0.0];
        let err = config.to_rig().unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid plane for camera 'right'"));
    }

    #[test]
    fn test_camera_lookup() {
        let config = RigConfig::default();
        assert_eq!(config.camera(None).unwrap().name, "left");
        assert!(config.camera(Some("missing")).is_err());
    }

    #[test]
    fn test_load_or_create() {
        let dir = std::env::temp_dir().join(format!("birdseye-config-{}", std::process::id()));
        let path = dir.join("rig.toml");
        let _ = std::fs::remove_file(&path);

        let created = RigConfig::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = RigConfig::load_or_create(&path).unwrap();
        assert_eq!(loaded.cameras.len(), created.cameras.len());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
