// THEORY:
// The `config` module holds every tunable constant of the engine in one place.
// None of these values are derived at runtime: they are fixed at startup, either
// from the defaults below or from a TOML file, and validated exactly once. A
// configuration that fails validation never produces a pipeline, so every later
// stage can assume its thresholds are sane.
//
// The file layout mirrors the pipeline stages, one TOML table per stage:
//
//     [segmentation]   colour band, blur, closing, mirroring
//     [roi]            size of the bottom-center search strip
//     [classifier]     error band and angle tolerances
//     [controller]     PID gains and integral policy
//
// Scalar knobs (minimum contour area, history depth, miss threshold, speeds) sit
// at the top level. Every field has a default, so a partial file only overrides
// what it names.

use crate::error::{ConfigError, LineVisionError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Colour thresholding and mask cleanup applied to each search region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Inclusive lower HSV bound as `[hue, saturation, value]`. Hue is on the 0..=180 scale.
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound. The default keeps every hue and saturation and only
    /// the dark pixels of the painted line.
    pub hsv_upper: [u8; 3],
    /// Side of the square Gaussian kernel, in pixels. Must be odd.
    pub blur_kernel: u32,
    /// Radius of the square closing element. A radius of 2 gives a 5x5 element.
    pub close_radius: u8,
    /// Flip each frame horizontally before segmentation (mirrored camera mounts).
    pub mirror: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            hsv_lower: [0, 0, 0],
            hsv_upper: [180, 255, 90],
            blur_kernel: 7,
            close_radius: 2,
            mirror: false,
        }
    }
}

impl SegmentationConfig {
    /// Gaussian sigma for the configured kernel size, using the usual
    /// `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule for a kernel given only by its size.
    pub fn blur_sigma(&self) -> f32 {
        0.3 * ((self.blur_kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// Size of the region of interest. It is always anchored bottom-center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 150,
        }
    }
}

/// Thresholds of the direction decision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Lateral errors strictly inside this band (in pixels) count as centered.
    pub error_band_px: f64,
    /// Maximum deviation from vertical, in degrees, for the line to count as straight ahead.
    pub angle_tolerance_deg: f64,
    /// Orientations within +/- this many degrees do not trigger a turn.
    pub turn_dead_band_deg: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            error_band_px: 30.0,
            angle_tolerance_deg: 15.0,
            turn_dead_band_deg: 5.0,
        }
    }
}

/// How the integral term behaves over a long session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegralPolicy {
    /// Accumulate forever. This is the field-tested behavior.
    #[default]
    Unbounded,
    /// Clamp the accumulator to `[-limit, limit]` after every update.
    Clamp { limit: f64 },
}

/// Gains and integral handling of the lateral PID controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_policy: IntegralPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kp: 0.4,
            ki: 0.0,
            kd: 0.15,
            integral_policy: IntegralPolicy::Unbounded,
        }
    }
}

/// Configuration for the `LinePipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub roi: RoiConfig,
    /// Contours must enclose strictly more than this many square pixels to be candidates.
    pub min_contour_area: f64,
    pub classifier: ClassifierConfig,
    pub controller: ControllerConfig,
    /// Number of raw decisions the temporal stabilizer votes over.
    pub history_depth: usize,
    /// Consecutive no-match cycles tolerated before the searching behavior kicks in.
    /// The transition happens on the first miss that exceeds this count.
    pub exploration_miss_threshold: u32,
    /// Speed sent with every line-tracking command (0..=100).
    pub cruise_speed: u8,
    /// Speed sent while spinning in search of the line (0..=100).
    pub search_speed: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationConfig::default(),
            roi: RoiConfig::default(),
            min_contour_area: 500.0,
            classifier: ClassifierConfig::default(),
            controller: ControllerConfig::default(),
            history_depth: 5,
            exploration_miss_threshold: 10,
            cruise_speed: 60,
            search_speed: 30,
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document and validates the result.
    pub fn from_toml_str(text: &str) -> Result<Self, LineVisionError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LineVisionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LineVisionError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every threshold. Called once when a pipeline is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seg = &self.segmentation;
        for (index, channel) in ["hue", "saturation", "value"].into_iter().enumerate() {
            if seg.hsv_lower[index] > seg.hsv_upper[index] {
                return Err(ConfigError::InvertedHsvBand {
                    channel,
                    lower: seg.hsv_lower[index],
                    upper: seg.hsv_upper[index],
                });
            }
        }
        if seg.hsv_upper[0] > 180 {
            return Err(ConfigError::HueOutOfRange(seg.hsv_upper[0]));
        }
        if seg.blur_kernel % 2 == 0 || !(3..=15).contains(&seg.blur_kernel) {
            return Err(ConfigError::InvalidBlurKernel(seg.blur_kernel));
        }

        if self.roi.width == 0 || self.roi.height == 0 {
            return Err(ConfigError::EmptyRoi {
                width: self.roi.width,
                height: self.roi.height,
            });
        }

        if !self.min_contour_area.is_finite() || self.min_contour_area < 0.0 {
            return Err(ConfigError::InvalidMinArea(self.min_contour_area));
        }

        let cls = &self.classifier;
        for (name, value) in [
            ("error band", cls.error_band_px),
            ("angle tolerance", cls.angle_tolerance_deg),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveThreshold { name, value });
            }
        }
        if !cls.turn_dead_band_deg.is_finite() || cls.turn_dead_band_deg < 0.0 {
            return Err(ConfigError::NonPositiveThreshold {
                name: "turn dead band",
                value: cls.turn_dead_band_deg,
            });
        }

        let ctl = &self.controller;
        for (name, value) in [("kp", ctl.kp), ("ki", ctl.ki), ("kd", ctl.kd)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidGain { name, value });
            }
        }
        if let IntegralPolicy::Clamp { limit } = ctl.integral_policy {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(ConfigError::InvalidIntegralLimit(limit));
            }
        }

        if self.history_depth == 0 {
            return Err(ConfigError::NonPositiveHistoryDepth);
        }

        for (name, value) in [
            ("cruise speed", self.cruise_speed),
            ("search speed", self.search_speed),
        ] {
            if value > 100 {
                return Err(ConfigError::SpeedOutOfRange { name, value });
            }
        }

        Ok(())
    }
}
