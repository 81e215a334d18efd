// THEORY:
// The `follower` owns the control loop and nothing else. Frame acquisition and
// command delivery are external collaborators behind two small traits, so the same
// loop drives a camera and a serial link on the vehicle, or a folder of PNGs and a
// recording dispatcher in a test.
//
// Contract with the collaborators:
// - `FrameSource::next_frame` blocks until a frame is available. `Ok(None)` is a
//   clean end of stream. `Err` is an acquisition failure. Both end the loop.
// - `CommandDispatcher::dispatch` is fire-and-forget. A failure is logged and
//   counted, and the loop carries on with the next frame.
// - `CommandDispatcher::dispatch_stop` is the one delivery that may wait. It is
//   sent once, after the loop, and must not be dropped for backpressure or
//   suppressed as a repeat.
// - Running without a dispatcher is valid. Decisions are still made and reported.
//
// When the loop ends, for whatever reason, a final NO-LINE at speed 0 is sent so
// the vehicle stops rather than holding its last command.

use crate::error::{DispatchError, LineVisionError};
use crate::pipeline::{CycleReport, DirectionCommand, LinePipeline};
use image::RgbImage;
use tracing::{error, info, warn};

/// Supplies one frame per control cycle.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, LineVisionError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, LineVisionError> {
        (**self).next_frame()
    }
}

/// Forwards a stabilized command and its speed towards the thrusters.
pub trait CommandDispatcher {
    fn dispatch(&mut self, command: DirectionCommand, speed: u8) -> Result<(), DispatchError>;

    /// Delivers the final NO-LINE at speed 0. Implementations that can drop or
    /// suppress commands override this so the stop always reaches the link.
    fn dispatch_stop(&mut self) -> Result<(), DispatchError> {
        self.dispatch(DirectionCommand::NoLine, 0)
    }
}

/// Accepts and discards every command.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDispatcher;

impl CommandDispatcher for NullDispatcher {
    fn dispatch(&mut self, _command: DirectionCommand, _speed: u8) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    EndOfStream,
    AcquisitionFailed(String),
}

/// Totals of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub dispatch_failures: u64,
    pub last_direction: Option<DirectionCommand>,
    pub end: RunEnd,
}

pub struct LineFollower {
    pipeline: LinePipeline,
    dispatcher: Option<Box<dyn CommandDispatcher + Send>>,
    dispatch_failures: u64,
    last_direction: Option<DirectionCommand>,
}

impl LineFollower {
    /// A follower with no dispatcher attached.
    pub fn new(pipeline: LinePipeline) -> Self {
        Self {
            pipeline,
            dispatcher: None,
            dispatch_failures: 0,
            last_direction: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Box<dyn CommandDispatcher + Send>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Processes one frame and dispatches the result.
    pub fn step(&mut self, frame: &RgbImage) -> CycleReport {
        let report = self.pipeline.process_frame(frame);
        self.send(report.direction, report.speed);
        self.last_direction = Some(report.direction);
        report
    }

    /// Pulls frames from `source` until it ends or fails, then sends a stop.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> RunSummary {
        info!("line follower started");
        let start_cycle = self.pipeline.cycles();

        let end = loop {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.step(&frame);
                }
                Ok(None) => {
                    info!("frame source exhausted");
                    break RunEnd::EndOfStream;
                }
                Err(err) => {
                    error!(%err, "frame acquisition failed, stopping");
                    break RunEnd::AcquisitionFailed(err.to_string());
                }
            }
        };

        self.stop();

        let summary = RunSummary {
            cycles: self.pipeline.cycles() - start_cycle,
            dispatch_failures: self.dispatch_failures,
            last_direction: self.last_direction,
            end,
        };
        info!(
            cycles = summary.cycles,
            dispatch_failures = summary.dispatch_failures,
            "line follower stopped"
        );
        summary
    }

    /// Sends the stop command through the dispatcher's stop path.
    pub fn stop(&mut self) {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return;
        };
        if let Err(err) = dispatcher.dispatch_stop() {
            self.dispatch_failures += 1;
            warn!(%err, "stop command could not be delivered");
        }
    }

    fn send(&mut self, command: DirectionCommand, speed: u8) {
        let Some(dispatcher) = self.dispatcher.as_mut() else {
            return;
        };
        if let Err(err) = dispatcher.dispatch(command, speed) {
            self.dispatch_failures += 1;
            warn!(%err, %command, speed, "command dispatch failed");
        }
    }

    pub fn pipeline(&self) -> &LinePipeline {
        &self.pipeline
    }

    pub fn dispatch_failures(&self) -> u64 {
        self.dispatch_failures
    }

    /// Hands the dispatcher back, e.g. to flush or join its writer.
    pub fn into_dispatcher(self) -> Option<Box<dyn CommandDispatcher + Send>> {
        self.dispatcher
    }
}
