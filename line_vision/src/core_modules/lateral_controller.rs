// THEORY:
// The `lateral_controller` keeps the PID error state on the line's sideways offset
// from the track centerline. It is the only stage whose memory spans the whole
// session: the integral and the previous error persist from process start.
//
// The controller's continuous output is computed every ROI-matched cycle and
// reported, but the direction classifier decides from the raw error and the
// orientation instead. The output stays observable for logging, tuning and any
// future proportional thruster mode.
//
// Integral handling is a configuration choice (`IntegralPolicy`):
// - `Unbounded` accumulates forever, matching the field-tested behavior. Over a long
//   run with a persistent offset this grows without limit.
// - `Clamp { limit }` holds the accumulator inside `[-limit, limit]`.

use crate::config::{ControllerConfig, IntegralPolicy};

/// Session-long PID memory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    pub integral: f64,
    pub previous_error: f64,
}

/// The terms of one controller update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerOutput {
    pub error: f64,
    pub integral: f64,
    pub derivative: f64,
    pub output: f64,
}

#[derive(Debug, Clone)]
pub struct LateralController {
    config: ControllerConfig,
    state: ControllerState,
}

impl LateralController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            state: ControllerState::default(),
        }
    }

    /// Feeds one lateral error (centroid x minus centerline x, in pixels).
    pub fn update(&mut self, error: f64) -> ControllerOutput {
        let mut integral = self.state.integral + error;
        if let IntegralPolicy::Clamp { limit } = self.config.integral_policy {
            integral = integral.clamp(-limit, limit);
        }
        let derivative = error - self.state.previous_error;

        self.state = ControllerState {
            integral,
            previous_error: error,
        };

        ControllerOutput {
            error,
            integral,
            derivative,
            output: self.config.kp * error
                + self.config.ki * integral
                + self.config.kd * derivative,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Forgets the accumulated error. Nothing in the pipeline calls this on its own.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }
}
