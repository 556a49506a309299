//! Window and clear settings, read from TOML.
//!
//! ```toml
//! title = "glquad"
//! width = 400
//! height = 300
//! clear_color = [0.0, 0.0, 0.0, 1.0]
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid render config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("the surface must not be empty, got {width}x{height}")]
    EmptySurface { width: u32, height: u32 },
    #[error("the surface is too large for a GL viewport, got {width}x{height}")]
    SurfaceTooLarge { width: u32, height: u32 },
}

/// Largest width or height `glViewport` takes as a `GLsizei`.
pub const MAX_SURFACE_SIZE: u32 = i32::MAX as u32;

/// Normalized RGBA color the framebuffer is cleared to.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct ClearColor {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl ClearColor {
    pub const BLACK: ClearColor = ClearColor::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        ClearColor {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// The first component outside `[0, 1]`. GL clamps those silently.
    pub fn out_of_range(&self) -> Option<f32> {
        self.components()
            .iter()
            .cloned()
            .find(|component| !(0.0..=1.0).contains(component))
    }

    pub fn components(&self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        ClearColor::BLACK
    }
}

impl From<[f32; 4]> for ClearColor {
    fn from([red, green, blue, alpha]: [f32; 4]) -> Self {
        ClearColor::new(red, green, blue, alpha)
    }
}

impl From<ClearColor> for [f32; 4] {
    fn from(color: ClearColor) -> Self {
        color.components()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: ClearColor,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            title: String::from("glquad"),
            width: 400,
            height: 300,
            clear_color: ClearColor::BLACK,
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("loaded render config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptySurface {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_SURFACE_SIZE || self.height > MAX_SURFACE_SIZE {
            return Err(ConfigError::SurfaceTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
