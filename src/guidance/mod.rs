//! Heading guidance: quantized steering commands and the controller that issues them.

pub mod command;
pub mod controller;

pub use command::GuidanceCommand;
pub use controller::{
    ActiveRoute, FeedSample, GuidanceConfig, GuidanceController, GuidanceState, RouteStatus,
    Selection, SessionState,
};
