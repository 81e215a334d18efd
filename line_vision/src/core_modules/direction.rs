// THEORY:
// The `direction` module is the decision layer. It owns the closed set of steering
// commands and the table that maps one cycle's observation to one of them.
//
// The classifier is a pure function. It sees only:
// - which region matched (ROI, full frame, or neither),
// - the lateral error in that region, and
// - for ROI matches, the principal-axis orientation.
//
// Decision table:
//
//   ROI match, line near vertical (| |angle| - 90 | < tolerance):
//       |error| < band            -> STRAIGHT
//       otherwise                 -> DRIFT-LEFT / DRIFT-RIGHT by the error's sign
//   ROI match, line tilted:
//       angle < -dead band        -> TURN-LEFT
//       angle > +dead band        -> TURN-RIGHT
//       otherwise                 -> STRAIGHT
//   Full-frame match:
//       |error| < band            -> STRAIGHT-APPROACH
//       otherwise                 -> DRIFT-LEFT-APPROACH / DRIFT-RIGHT-APPROACH
//   No match                      -> NO-LINE (the exploration layer may override)
//
// The ROI always wins over the full frame. The two signals are never blended.

use crate::config::ClassifierConfig;
use std::fmt;

/// Every steering decision the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectionCommand {
    Straight,
    DriftLeft,
    DriftRight,
    TurnLeft,
    TurnRight,
    StraightApproach,
    DriftLeftApproach,
    DriftRightApproach,
    SearchTurn,
    NoLine,
}

impl DirectionCommand {
    pub const ALL: [DirectionCommand; 10] = [
        DirectionCommand::Straight,
        DirectionCommand::DriftLeft,
        DirectionCommand::DriftRight,
        DirectionCommand::TurnLeft,
        DirectionCommand::TurnRight,
        DirectionCommand::StraightApproach,
        DirectionCommand::DriftLeftApproach,
        DirectionCommand::DriftRightApproach,
        DirectionCommand::SearchTurn,
        DirectionCommand::NoLine,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DirectionCommand::Straight => "STRAIGHT",
            DirectionCommand::DriftLeft => "DRIFT-LEFT",
            DirectionCommand::DriftRight => "DRIFT-RIGHT",
            DirectionCommand::TurnLeft => "TURN-LEFT",
            DirectionCommand::TurnRight => "TURN-RIGHT",
            DirectionCommand::StraightApproach => "STRAIGHT-APPROACH",
            DirectionCommand::DriftLeftApproach => "DRIFT-LEFT-APPROACH",
            DirectionCommand::DriftRightApproach => "DRIFT-RIGHT-APPROACH",
            DirectionCommand::SearchTurn => "SEARCH-TURN",
            DirectionCommand::NoLine => "NO-LINE",
        }
    }

    /// True for commands issued while a line is in view.
    pub fn is_tracking(self) -> bool {
        !matches!(self, DirectionCommand::SearchTurn | DirectionCommand::NoLine)
    }
}

impl fmt::Display for DirectionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the contour search produced this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineObservation {
    /// A contour in the region of interest, with its lateral error and orientation.
    Roi { error: f64, orientation_deg: f64 },
    /// No ROI contour, but one in the full frame.
    FullFrame { error: f64 },
    /// Nothing in either region.
    Missing,
}

/// Maps one observation to a raw direction.
pub fn classify(observation: LineObservation, config: &ClassifierConfig) -> DirectionCommand {
    match observation {
        LineObservation::Roi {
            error,
            orientation_deg,
        } => {
            let angle_deviation = (orientation_deg.abs() - 90.0).abs();
            if angle_deviation < config.angle_tolerance_deg {
                if error.abs() < config.error_band_px {
                    DirectionCommand::Straight
                } else if error < 0.0 {
                    DirectionCommand::DriftLeft
                } else {
                    DirectionCommand::DriftRight
                }
            } else if orientation_deg < -config.turn_dead_band_deg {
                DirectionCommand::TurnLeft
            } else if orientation_deg > config.turn_dead_band_deg {
                DirectionCommand::TurnRight
            } else {
                DirectionCommand::Straight
            }
        }
        LineObservation::FullFrame { error } => {
            if error.abs() < config.error_band_px {
                DirectionCommand::StraightApproach
            } else if error < 0.0 {
                DirectionCommand::DriftLeftApproach
            } else {
                DirectionCommand::DriftRightApproach
            }
        }
        LineObservation::Missing => DirectionCommand::NoLine,
    }
}
