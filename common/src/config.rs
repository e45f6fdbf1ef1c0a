use std::{fs, path::Path};

use anyhow::{Context, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything that can be tuned about a slicing session. Loaded from a
/// `slicer.toml`, any missing field falls back to its default.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub slice: SliceConfig,
    pub plane_stack: PlaneStackConfig,
    pub contour: ContourConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SliceConfig {
    /// Vertices closer than this to the cutting plane are treated as lying
    /// on it.
    pub epsilon: f32,
    /// Triangles with a smaller area are skipped.
    pub min_triangle_area: f32,
    /// Close the open seam of each half with cap triangles.
    pub generate_caps: bool,
    pub normals: NormalMode,
}

/// How vertex normals of the sliced halves are produced.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalMode {
    /// Keep the interpolated input normals when the input mesh has them,
    /// otherwise recompute.
    Interpolate,
    /// Always recompute area weighted vertex normals.
    Recompute,
}

/// Layout of the measurement plane stack built from the head landmarks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PlaneStackConfig {
    /// Number of parallel planes.
    pub count: u32,
    /// How many of those start at the base landmark and step upwards, the
    /// rest step downwards.
    pub above: u32,
    /// The plane spacing is the sellion to right tragion distance divided by
    /// this.
    pub spacing_divisor: f32,
    /// Direction the stack is offset along.
    pub up: Vector3<f32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ContourConfig {
    /// Angle between the length axis and each measured diagonal, in degrees.
    pub diagonal_angle: f32,
    /// Multiplier applied to projected points.
    pub scale: f32,
}

impl Config {
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("Failed to load config, using defaults: {:#}", err);
                Config::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(if path.exists() {
            let file = fs::read(path)
                .with_context(|| format!("Can't read config `{}`", path.display()))?;
            let string = String::from_utf8_lossy(&file);
            let config = toml::from_str(&string).context("Invalid config file")?;
            info!("Successfully loaded config file");
            config
        } else {
            info!("No config file found, using defaults");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let string = toml::to_string(self)?;
        fs::write(path, string)?;
        Ok(())
    }
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            min_triangle_area: 1e-12,
            generate_caps: true,
            normals: NormalMode::Interpolate,
        }
    }
}

impl Default for PlaneStackConfig {
    fn default() -> Self {
        Self {
            count: 12,
            above: 7,
            spacing_divisor: 8.0,
            up: Vector3::y(),
        }
    }
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            diagonal_angle: 30.0,
            scale: 1.0,
        }
    }
}
