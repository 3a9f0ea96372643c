//! Command vocabularies for the alignment controller and the actuator.

/// Discrete decision of the alignment controller for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentCommand {
    /// Horizontally aligned, not yet close: drive straight.
    Forward,
    StrafeLeft,
    StrafeRight,
    RotateClockwise,
    RotateCounterclockwise,
    /// Close enough to act on the target.
    Close,
    /// Nothing visible: the caller should search.
    Search,
}

/// Motor speed levels understood by the drive controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedLevel {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl SpeedLevel {
    /// Wire-level value of the speed step.
    pub fn value(self) -> u8 {
        match self {
            SpeedLevel::Slow => 30,
            SpeedLevel::Medium => 50,
            SpeedLevel::Fast => 80,
        }
    }
}

/// Command set accepted by the actuator link.
///
/// `Stop` must be safe and idempotent at any time. `Pick` and `Release`
/// are synchronous: the link blocks until the gripper sequence nominally
/// completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    RotateClockwise,
    RotateCounterclockwise,
    Stop,
    SetSpeed(SpeedLevel),
    Pick,
    Release,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_levels() {
        assert_eq!(SpeedLevel::Slow.value(), 30);
        assert_eq!(SpeedLevel::Medium.value(), 50);
        assert_eq!(SpeedLevel::Fast.value(), 80);
        assert_eq!(SpeedLevel::default(), SpeedLevel::Medium);
    }
}
