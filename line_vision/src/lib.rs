// THEORY:
// This file is the main entry point for the `line_vision` library crate. It turns
// camera frames into discrete steering commands for an underwater line-following
// vehicle.
//
// The public surface is small:
// - `LinePipeline` processes one frame and returns a `CycleReport`,
// - `PipelineConfig` holds every threshold and gain, loadable from TOML,
// - `LineFollower` runs the loop against a `FrameSource` and a `CommandDispatcher`.
//
// The stages themselves (segmenter, contour selector, orientation, lateral
// controller, classifier, exploration, stabilizer) live in `core_modules`. They are
// public for testing and tooling but a vehicle only needs the pipeline.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod follower;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{ConfigError, DispatchError, LineVisionError};
pub use follower::{
    CommandDispatcher, FrameSource, LineFollower, NullDispatcher, RunEnd, RunSummary,
};
pub use pipeline::{CycleReport, DirectionCommand, LinePipeline, RegionMatch};
