use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::domain::face_cropper::{
    MatchParams, DEFAULT_MIN_FACE_SIZE, DEFAULT_PADDING, DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::shared::device::Device;

pub const SIMILARITY_THRESHOLD_RANGE: (f64, f64) = (0.0, 1.0);
pub const MIN_FACE_SIZE_RANGE: (u32, u32) = (32, 512);
pub const PADDING_RANGE: (f64, f64) = (0.0, 1.0);
pub const SAMPLE_EVERY_RANGE: (usize, usize) = (1, 30);
pub const MAX_FRAMES_RANGE: (usize, usize) = (0, 10_000);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    Images,
    #[serde(alias = "video")]
    VideoFile,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputMode::Images => write!(f, "images"),
            InputMode::VideoFile => write!(f, "video_file"),
        }
    }
}

/// Knobs for one extraction run.
///
/// Values are checked once by [`ExtractionConfig::validate`]; the use case
/// never sees an out-of-range config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub similarity_threshold: f64,
    pub min_face_size: u32,
    pub padding: f64,
    pub sample_every_n_frames: usize,
    /// 0 means no limit.
    pub max_frames: usize,
    pub device: Device,
    pub input_mode: InputMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            padding: DEFAULT_PADDING,
            sample_every_n_frames: 1,
            max_frames: 0,
            device: Device::Cpu,
            input_mode: InputMode::Images,
        }
    }
}

impl ExtractionConfig {
    pub fn new(
        similarity_threshold: f64,
        min_face_size: u32,
        padding: f64,
        sample_every_n_frames: usize,
        max_frames: usize,
        device: Device,
        input_mode: InputMode,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            similarity_threshold,
            min_face_size,
            padding,
            sample_every_n_frames,
            max_frames,
            device,
            input_mode,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "similarity_threshold",
            self.similarity_threshold,
            SIMILARITY_THRESHOLD_RANGE,
        )?;
        check_range(
            "min_face_size",
            self.min_face_size as f64,
            (MIN_FACE_SIZE_RANGE.0 as f64, MIN_FACE_SIZE_RANGE.1 as f64),
        )?;
        check_range("padding", self.padding, PADDING_RANGE)?;
        check_range(
            "sample_every_n_frames",
            self.sample_every_n_frames as f64,
            (SAMPLE_EVERY_RANGE.0 as f64, SAMPLE_EVERY_RANGE.1 as f64),
        )?;
        check_range(
            "max_frames",
            self.max_frames as f64,
            (MAX_FRAMES_RANGE.0 as f64, MAX_FRAMES_RANGE.1 as f64),
        )?;
        Ok(())
    }

    pub fn match_params(&self) -> MatchParams {
        MatchParams {
            threshold: self.similarity_threshold,
            min_size: self.min_face_size,
            padding: self.padding,
        }
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    // NaN fails both comparisons, so test for containment.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
