//! Control layer: alignment decisions, mission phases and the run loop.

mod aligner;
mod command;
mod io;
mod mission;
mod phase;
mod runner;

pub use aligner::{AlignerConfig, AlignmentController, CloseMetric};
pub use command::{AlignmentCommand, MotionCommand, SpeedLevel};
pub use io::{Actuator, FrameSource};
pub use mission::{Action, MissionConfig, MissionStateMachine};
pub use phase::MissionPhase;
pub use runner::{MissionReport, MissionRunner, RunnerConfig};
