//! Error types for line_vision

use std::path::PathBuf;
use thiserror::Error;

/// Raised by `PipelineConfig::validate`. Always fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("HSV band inverted on {channel} channel: lower {lower} > upper {upper}")]
    InvertedHsvBand {
        channel: &'static str,
        lower: u8,
        upper: u8,
    },

    #[error("hue bound {0} is outside the 0..=180 hue scale")]
    HueOutOfRange(u8),

    #[error("blur kernel must be odd and within 3..=15, got {0}")]
    InvalidBlurKernel(u32),

    #[error("region of interest must be non-empty, got {width}x{height}")]
    EmptyRoi { width: u32, height: u32 },

    #[error("minimum contour area must be finite and non-negative, got {0}")]
    InvalidMinArea(f64),

    #[error("{name} must be finite and positive, got {value}")]
    NonPositiveThreshold { name: &'static str, value: f64 },

    #[error("{name} gain must be finite, got {value}")]
    InvalidGain { name: &'static str, value: f64 },

    #[error("integral clamp limit must be finite and positive, got {0}")]
    InvalidIntegralLimit(f64),

    #[error("history depth must be positive")]
    NonPositiveHistoryDepth,

    #[error("{name} must be within 0..=100, got {value}")]
    SpeedOutOfRange { name: &'static str, value: u8 },
}

/// Top-level error for the engine and its collaborators.
#[derive(Error, Debug)]
pub enum LineVisionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("frame acquisition failed: {0}")]
    Acquisition(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure reported by a `CommandDispatcher`. Logged by the follower, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("command link is saturated, command dropped")]
    Backpressure,

    #[error("command link is closed")]
    Closed,

    #[error("command link error: {0}")]
    Link(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_the_channel() {
        let err = ConfigError::InvertedHsvBand {
            channel: "value",
            lower: 90,
            upper: 50,
        };
        let text = err.to_string();
        assert!(text.contains("value"));
        assert!(text.contains("90"));
    }

    #[test]
    fn config_error_converts_into_top_level_error() {
        let err: LineVisionError = ConfigError::NonPositiveHistoryDepth.into();
        match err {
            LineVisionError::Config(ConfigError::NonPositiveHistoryDepth) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_error_display() {
        assert!(DispatchError::Link("port gone".into())
            .to_string()
            .contains("port gone"));
    }
}
