// THEORY:
// The `pipeline` module is the top-level API of the engine. It threads one frame
// through every stage and owns the session state the stages need between frames:
// the PID memory, the exploration counter and the decision history. Nothing is
// global. Two pipelines never share state, so each test builds a fresh one.
//
// Per cycle:
// 1.  Search the region of interest. A usable contour there yields an error, an
//     orientation and a controller update.
// 2.  Only if the ROI missed, search the full frame. A contour there yields an
//     error against the frame centerline. Orientation is not needed.
// 3.  Classify the observation, let exploration override it, vote it through the
//     stabilizer, and attach a speed.
//
// Exactly one of ROI match, full-frame match and no match holds per cycle.

use crate::core_modules::contour::SelectedContour;
use crate::core_modules::contour_selector::contour_selector;
use crate::core_modules::direction::{LineObservation, classify};
use crate::core_modules::exploration::ExplorationState;
use crate::core_modules::lateral_controller::LateralController;
use crate::core_modules::orientation;
use crate::core_modules::region::Region;
use crate::core_modules::segmenter;
use crate::core_modules::stabilizer::TemporalStabilizer;
use crate::error::ConfigError;
use image::{RgbImage, imageops};
use tracing::{debug, trace};

// Re-export key data structures for the public API.
pub use crate::config::PipelineConfig;
pub use crate::core_modules::direction::DirectionCommand;
pub use crate::core_modules::lateral_controller::{ControllerOutput, ControllerState};

/// Which search region produced this cycle's contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMatch {
    Roi,
    FullFrame,
    NoMatch,
}

/// Everything the engine decided about one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Zero-based cycle counter.
    pub cycle: u64,
    pub region: RegionMatch,
    /// Centroid of the selected contour, in frame pixels.
    pub centroid: Option<(i32, i32)>,
    /// Principal-axis angle in degrees. ROI matches only.
    pub orientation_deg: Option<f64>,
    /// Centroid x minus the matching region's centerline.
    pub lateral_error: Option<f64>,
    /// PID terms. ROI matches only. Reported, not used for the decision.
    pub controller: Option<ControllerOutput>,
    /// Classifier output after the exploration override.
    pub raw_direction: DirectionCommand,
    /// The stabilized command to dispatch.
    pub direction: DirectionCommand,
    pub speed: u8,
    pub miss_count: u32,
    pub searching: bool,
}

pub struct LinePipeline {
    config: PipelineConfig,
    controller: LateralController,
    exploration: ExplorationState,
    stabilizer: TemporalStabilizer,
    cycle: u64,
}

impl LinePipeline {
    /// Validates `config` and builds a pipeline with fresh session state.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            controller: LateralController::new(config.controller.clone()),
            exploration: ExplorationState::new(config.exploration_miss_threshold),
            stabilizer: TemporalStabilizer::new(config.history_depth),
            config,
            cycle: 0,
        })
    }

    /// Runs one control cycle on `frame`.
    pub fn process_frame(&mut self, frame: &RgbImage) -> CycleReport {
        if self.config.segmentation.mirror {
            let flipped = imageops::flip_horizontal(frame);
            self.run_cycle(&flipped)
        } else {
            self.run_cycle(frame)
        }
    }

    fn run_cycle(&mut self, frame: &RgbImage) -> CycleReport {
        let (width, height) = frame.dimensions();
        let roi = Region::bottom_center(
            width,
            height,
            self.config.roi.width,
            self.config.roi.height,
        );

        let mut centroid = None;
        let mut orientation_deg = None;
        let mut controller = None;

        let (region, observation) = if let Some(selected) = self.search(frame, roi) {
            let (cx, cy) = selected.centroid().pixel();
            let error = (cx - roi.center_x()) as f64;
            let angle = orientation::estimate(&selected);
            centroid = Some(roi.to_frame(cx, cy));
            orientation_deg = Some(angle);
            controller = Some(self.controller.update(error));
            (
                RegionMatch::Roi,
                LineObservation::Roi {
                    error,
                    orientation_deg: angle,
                },
            )
        } else {
            let full = Region::full_frame(width, height);
            match self.search(frame, full) {
                Some(selected) => {
                    let (cx, cy) = selected.centroid().pixel();
                    let error = (cx - full.center_x()) as f64;
                    centroid = Some((cx, cy));
                    (RegionMatch::FullFrame, LineObservation::FullFrame { error })
                }
                None => (RegionMatch::NoMatch, LineObservation::Missing),
            }
        };

        match region {
            RegionMatch::NoMatch => self.exploration.record_miss(),
            RegionMatch::Roi | RegionMatch::FullFrame => self.exploration.record_match(),
        }

        let raw_direction = self
            .exploration
            .apply(classify(observation, &self.config.classifier));
        let direction = self.stabilizer.push(raw_direction);
        let speed = self.speed_for(direction);

        let lateral_error = match observation {
            LineObservation::Roi { error, .. } | LineObservation::FullFrame { error } => {
                Some(error)
            }
            LineObservation::Missing => None,
        };

        debug!(
            cycle = self.cycle,
            region = ?region,
            error = ?lateral_error,
            orientation = ?orientation_deg,
            control = ?controller.map(|c| c.output),
            raw = %raw_direction,
            direction = %direction,
            speed,
            "cycle complete"
        );

        let report = CycleReport {
            cycle: self.cycle,
            region,
            centroid,
            orientation_deg,
            lateral_error,
            controller,
            raw_direction,
            direction,
            speed,
            miss_count: self.exploration.miss_count(),
            searching: self.exploration.is_searching(),
        };
        self.cycle += 1;
        report
    }

    fn search(&self, frame: &RgbImage, region: Region) -> Option<SelectedContour> {
        let mask = segmenter::segment(frame, region, &self.config.segmentation);
        let selected = contour_selector::find_line(&mask, self.config.min_contour_area);
        trace!(?region, found = selected.is_some(), "region searched");
        selected
    }

    /// Speed attached to `command`: cruise while tracking, slow while searching,
    /// zero when stopped.
    pub fn speed_for(&self, command: DirectionCommand) -> u8 {
        match command {
            DirectionCommand::NoLine => 0,
            DirectionCommand::SearchTurn => self.config.search_speed,
            _ => self.config.cruise_speed,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn controller_state(&self) -> ControllerState {
        self.controller.state()
    }

    pub fn exploration(&self) -> &ExplorationState {
        &self.exploration
    }

    pub fn stabilizer(&self) -> &TemporalStabilizer {
        &self.stabilizer
    }

    /// Number of frames processed so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const FLOOR: Rgb<u8> = Rgb([60, 150, 230]);
    const LINE: Rgb<u8> = Rgb([15, 15, 20]);

    fn vertical_bar(width: u32, height: u32, left: u32, bar_width: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x >= left && x < left + bar_width { LINE } else { FLOOR }
        })
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            history_depth: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            LinePipeline::new(config),
            Err(ConfigError::NonPositiveHistoryDepth)
        ));
    }

    #[test]
    fn centered_bar_goes_straight() {
        let mut pipeline = LinePipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.process_frame(&vertical_bar(320, 240, 150, 20));
        assert_eq!(report.region, RegionMatch::Roi);
        assert_eq!(report.direction, DirectionCommand::Straight);
        assert_eq!(report.speed, 60);
        assert!(report.controller.is_some());
        assert!((report.orientation_deg.unwrap() - 90.0).abs() < 1.0);
    }

    #[test]
    fn empty_frame_is_a_miss() {
        let mut pipeline = LinePipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.process_frame(&RgbImage::from_pixel(320, 240, FLOOR));
        assert_eq!(report.region, RegionMatch::NoMatch);
        assert_eq!(report.direction, DirectionCommand::NoLine);
        assert_eq!(report.speed, 0);
        assert_eq!(report.miss_count, 1);
        assert!(report.lateral_error.is_none());
        assert!(report.controller.is_none());
    }

    #[test]
    fn zero_sized_frame_is_a_miss() {
        let mut pipeline = LinePipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.process_frame(&RgbImage::new(0, 0));
        assert_eq!(report.region, RegionMatch::NoMatch);
    }

    #[test]
    fn mirror_flips_the_error_sign() {
        let frame = vertical_bar(320, 240, 110, 20);

        let mut plain = LinePipeline::new(PipelineConfig::default()).unwrap();
        let plain_error = plain.process_frame(&frame).lateral_error.unwrap();

        let mut config = PipelineConfig::default();
        config.segmentation.mirror = true;
        let mut mirrored = LinePipeline::new(config).unwrap();
        let mirrored_error = mirrored.process_frame(&frame).lateral_error.unwrap();

        assert!(plain_error < -30.0);
        assert!(mirrored_error > 30.0);
    }

    #[test]
    fn controller_only_runs_on_roi_matches() {
        let mut pipeline = LinePipeline::new(PipelineConfig::default()).unwrap();
        pipeline.process_frame(&vertical_bar(320, 240, 110, 20));
        let after_match = pipeline.controller_state();
        pipeline.process_frame(&RgbImage::from_pixel(320, 240, FLOOR));
        assert_eq!(pipeline.controller_state(), after_match);
        assert_eq!(pipeline.cycles(), 2);
    }

    #[test]
    fn speed_policy() {
        let pipeline = LinePipeline::new(PipelineConfig::default()).unwrap();
        assert_eq!(pipeline.speed_for(DirectionCommand::TurnLeft), 60);
        assert_eq!(pipeline.speed_for(DirectionCommand::DriftRightApproach), 60);
        assert_eq!(pipeline.speed_for(DirectionCommand::SearchTurn), 30);
        assert_eq!(pipeline.speed_for(DirectionCommand::NoLine), 0);
    }
}
