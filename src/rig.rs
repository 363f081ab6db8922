//! Multi-camera rigs
//!
//! Every camera of a rig owns an independent engine, so the whole rig is
//! computed in parallel without coordination.

use rayon::prelude::*;

use crate::error::Result;
use crate::homography::{Homography, HomographyEngine};

/// A named camera of a rig
#[derive(Debug, Clone)]
pub struct RigCamera {
    pub name: String,
    pub engine: HomographyEngine,
}

/// Matrices of one rig camera
#[derive(Debug, Clone)]
pub struct RigResult {
    pub name: String,
    pub homography: Result<Homography>,
}

#[derive(Debug, Clone, Default)]
pub struct Rig {
    cameras: Vec<RigCamera>,
}

impl Rig {
    pub fn new(cameras: Vec<RigCamera>) -> Self {
        Self { cameras }
    }

    pub fn push(&mut self, name: impl Into<String>, engine: HomographyEngine) {
        self.cameras.push(RigCamera {
            name: name.into(),
            engine,
        });
    }

    pub fn cameras(&self) -> &[RigCamera] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Engine of the camera called `name`
    pub fn get(&self, name: &str) -> Option<&HomographyEngine> {
        self.cameras
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.engine)
    }

    /// Compute every camera in parallel; results keep the rig order
    pub fn compute_all(&self) -> Vec<RigResult> {
        let results: Vec<RigResult> = self
            .cameras
            .par_iter()
            .map(|camera| RigResult {
                name: camera.name.clone(),
                homography: camera.engine.compute(),
            })
            .collect();

        let singular = results
            .iter()
            .filter(|r| matches!(&r.homography, Ok(h) if !h.is_ok()))
            .count();
        tracing::debug!(
            "Computed {} rig cameras ({} singular)",
            results.len(),
            singular
        );

        results
    }
}
