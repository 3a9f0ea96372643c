//! Visual servoing and mission sequencing for a color block transport
//! robot.
//!
//! The [`vision`] module turns camera frames into per-color blob
//! observations; the [`control`] module turns observations into discrete
//! motion commands and sequences the pickup/transport/return mission with
//! timeout-based recovery. Camera and actuator hardware sit behind the
//! [`FrameSource`] and [`Actuator`] traits.

pub mod control;
pub mod vision;

pub use control::{
    Action, Actuator, AlignerConfig, AlignmentCommand, AlignmentController, CloseMetric,
    FrameSource, MissionConfig, MissionPhase, MissionReport, MissionRunner, MissionStateMachine,
    MotionCommand, RunnerConfig, SpeedLevel,
};
pub use vision::{BlobLocator, BlobObservation, BlockColor, ColorSpec, HsvRange, LocatorConfig};
