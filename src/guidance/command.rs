//! Discrete steering commands understood by the feedback actuator.
//!
//! Codes and the left/right sign convention are a fixed contract with the
//! actuator: a positive angular difference (target counter-clockwise of the
//! walker's heading) is a left turn.

use serde::Serialize;

/// Below this absolute difference (degrees) the walker keeps straight.
pub const STRAIGHT_THRESHOLD_DEG: f64 = 10.0;

/// At or above this absolute difference (degrees) the turn is hard.
pub const HARD_TURN_THRESHOLD_DEG: f64 = 90.0;

/// Steering command sent to the actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceCommand {
    Straight,
    SlightLeft,
    SlightRight,
    HardLeft,
    HardRight,
}

impl GuidanceCommand {
    /// Quantize a signed difference in (-180, 180] degrees.
    ///
    /// `|diff| < 10` is straight; `±90` and beyond are hard turns.
    pub fn from_angle_diff(diff: f64) -> Self {
        if diff.abs() < STRAIGHT_THRESHOLD_DEG {
            GuidanceCommand::Straight
        } else if diff > -HARD_TURN_THRESHOLD_DEG && diff < 0.0 {
            GuidanceCommand::SlightRight
        } else if diff > 0.0 && diff < HARD_TURN_THRESHOLD_DEG {
            GuidanceCommand::SlightLeft
        } else if diff <= -HARD_TURN_THRESHOLD_DEG {
            GuidanceCommand::HardRight
        } else {
            GuidanceCommand::HardLeft
        }
    }

    /// Actuator wire code.
    pub fn code(self) -> u8 {
        match self {
            GuidanceCommand::Straight => 0,
            GuidanceCommand::SlightLeft => 1,
            GuidanceCommand::SlightRight => 2,
            GuidanceCommand::HardLeft => 3,
            GuidanceCommand::HardRight => 4,
        }
    }

    /// Parse an actuator wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GuidanceCommand::Straight),
            1 => Some(GuidanceCommand::SlightLeft),
            2 => Some(GuidanceCommand::SlightRight),
            3 => Some(GuidanceCommand::HardLeft),
            4 => Some(GuidanceCommand::HardRight),
            _ => None,
        }
    }

    /// Short name for logs and JSON frames.
    pub fn name(self) -> &'static str {
        match self {
            GuidanceCommand::Straight => "straight",
            GuidanceCommand::SlightLeft => "slight_left",
            GuidanceCommand::SlightRight => "slight_right",
            GuidanceCommand::HardLeft => "hard_left",
            GuidanceCommand::HardRight => "hard_right",
        }
    }
}

impl std::fmt::Display for GuidanceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
