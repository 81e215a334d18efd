//! ASCII wire formats understood by the thruster firmware and the pool simulators.
//!
//! Discrete mode sends `CMD:<c>;SPEED:<0-100>\n` with `c` one of `F`, `L`, `R`, `S`.
//! Velocity mode sends `VEL:<surge>,<sway>,<heave>,<yaw>\n`, each in -100..=100.
//! Positive sway and yaw point right.

use clap::ValueEnum;
use line_vision::DirectionCommand;

const MAX_SPEED: u8 = 100;
const AXIS_LIMIT: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WireMode {
    /// Discrete `CMD:<c>;SPEED:<n>` lines.
    Cmd,
    /// `VEL:<surge>,<sway>,<heave>,<yaw>` lines.
    Vel,
}

impl WireMode {
    pub fn encode(self, command: DirectionCommand, speed: u8) -> String {
        match self {
            WireMode::Cmd => encode_cmd(command, speed),
            WireMode::Vel => encode_vel(command, speed),
        }
    }
}

/// Single-character discrete command. The search spin is a slow right turn.
pub fn command_char(command: DirectionCommand) -> char {
    match command {
        DirectionCommand::Straight | DirectionCommand::StraightApproach => 'F',
        DirectionCommand::DriftLeft
        | DirectionCommand::DriftLeftApproach
        | DirectionCommand::TurnLeft => 'L',
        DirectionCommand::DriftRight
        | DirectionCommand::DriftRightApproach
        | DirectionCommand::TurnRight
        | DirectionCommand::SearchTurn => 'R',
        DirectionCommand::NoLine => 'S',
    }
}

pub fn encode_cmd(command: DirectionCommand, speed: u8) -> String {
    format!("CMD:{};SPEED:{}\n", command_char(command), speed.min(MAX_SPEED))
}

/// Thruster axes of one velocity command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Velocity {
    pub surge: i32,
    pub sway: i32,
    pub heave: i32,
    pub yaw: i32,
}

impl Velocity {
    fn clamped(self) -> Self {
        Self {
            surge: self.surge.clamp(-AXIS_LIMIT, AXIS_LIMIT),
            sway: self.sway.clamp(-AXIS_LIMIT, AXIS_LIMIT),
            heave: self.heave.clamp(-AXIS_LIMIT, AXIS_LIMIT),
            yaw: self.yaw.clamp(-AXIS_LIMIT, AXIS_LIMIT),
        }
    }
}

pub fn velocity(command: DirectionCommand, speed: u8) -> Velocity {
    let s = speed.min(MAX_SPEED) as i32;
    let v = |surge, sway, yaw| Velocity {
        surge,
        sway,
        heave: 0,
        yaw,
    };
    let raw = match command {
        DirectionCommand::Straight | DirectionCommand::StraightApproach => v(s, 0, 0),
        DirectionCommand::DriftLeft | DirectionCommand::DriftLeftApproach => v(s / 2, -s, 0),
        DirectionCommand::DriftRight | DirectionCommand::DriftRightApproach => v(s / 2, s, 0),
        DirectionCommand::TurnLeft => v(s / 2, 0, -s),
        DirectionCommand::TurnRight => v(s / 2, 0, s),
        DirectionCommand::SearchTurn => v(0, 0, s),
        DirectionCommand::NoLine => Velocity::default(),
    };
    raw.clamped()
}

pub fn encode_vel(command: DirectionCommand, speed: u8) -> String {
    let v = velocity(command, speed);
    format!("VEL:{},{},{},{}\n", v.surge, v.sway, v.heave, v.yaw)
}
