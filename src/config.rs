//! Tunables for the numerical parts of the engine and for whoever drives it.
//!
//! Everything here deserializes from the tables of a scene file, and every field has a default so
//! a scene only has to name what it changes.

use glam::{dvec3, DVec3};
use serde::Deserialize;

/// Ray marching parameters for implicit surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarchSettings {
    /// Initial finite difference offset for gradient estimation
    pub gradient_epsilon: f64,
    /// The offset stops doubling once it reaches this
    pub max_gradient_epsilon: f64,
    /// Squared gradient length below which the gradient counts as degenerate
    pub degenerate_gradient: f64,
    /// Smallest march step when no usable gradient hint is given
    pub min_step: f64,
    /// Field magnitude accepted as "on the surface"
    pub tolerance: f64,
    /// Marching past this distance means the ray escaped
    pub escape_distance: f64,
    pub max_steps: u32,
    pub max_bisections: u32,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            gradient_epsilon: 1e-6,
            max_gradient_epsilon: 100.0,
            degenerate_gradient: 1e-6,
            min_step: 1e-4,
            tolerance: 1e-7,
            escape_distance: 1e99,
            max_steps: 1_000_000,
            max_bisections: 256,
        }
    }
}

/// Event collection and merging parameters for CSG nodes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsgSettings {
    /// Distances closer than this are the same event, and re-queries step this far past a hit
    pub epsilon: f64,
    /// Upper bound on the crossings collected from one child
    pub max_events: usize,
}

impl Default for CsgSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_events: 64,
        }
    }
}

/// Startup configuration for the render loop. The engine itself never reads it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub seed: u64,
    /// Worker threads, 0 picks one per core
    pub threads: usize,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub camera: CameraSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            threads: 0,
            width: 80,
            height: 40,
            samples: 4,
            camera: CameraSettings::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraSettings {
    pub position: DVec3,
    pub target: DVec3,
    pub up: DVec3,
    /// Vertical field of view in degrees
    pub fov: f64,
    pub aperture: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: dvec3(0.0, 2.0, -6.0),
            target: DVec3::ZERO,
            up: DVec3::Y,
            fov: 60.0,
            aperture: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tables_keep_defaults() {
        let march: MarchSettings = toml::from_str("tolerance = 1e-9").unwrap();
        assert_eq!(march.tolerance, 1e-9);
        assert_eq!(march.min_step, MarchSettings::default().min_step);

        let render: RenderSettings = toml::from_str(
            r#"
            threads = 3
            [camera]
            position = [1.0, 2.0, 3.0]
            "#,
        )
        .unwrap();
        assert_eq!(render.threads, 3);
        assert_eq!(render.seed, 42);
        assert_eq!(render.camera.position, dvec3(1.0, 2.0, 3.0));
        assert_eq!(render.camera.fov, 60.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<CsgSettings>("epsilom = 1.0").is_err());
    }
}
