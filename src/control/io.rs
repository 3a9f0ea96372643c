//! Collaborator seams: the camera and the actuator link.

use image::RgbImage;

use crate::control::command::MotionCommand;

/// Source of camera frames.
///
/// A failed capture returns `None`; the control loop treats that as a
/// transient no-op cycle, never an error.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// Actuator link accepting discrete motion and gripper commands.
///
/// Implementations must keep `Stop` safe and idempotent at any time,
/// including after a prior send failed. `Pick` and `Release` block until
/// the gripper sequence nominally completes.
///
/// # Example
///
/// ```ignore
/// use colorcourier_rs::{Actuator, MotionCommand};
///
/// struct SerialLink { /* port handle */ }
///
/// impl Actuator for SerialLink {
///     type Error = std::io::Error;
///
///     fn send(&mut self, command: MotionCommand) -> Result<(), Self::Error> {
///         // Write the wire command for `command` to the port.
///         Ok(())
///     }
/// }
/// ```
pub trait Actuator {
    /// Error type for link failures.
    type Error;

    /// Issue one command to the hardware.
    fn send(&mut self, command: MotionCommand) -> Result<(), Self::Error>;
}
