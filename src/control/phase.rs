/// Mission phase enumeration. The state machine owns exactly one current
/// phase; `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissionPhase {
    /// Startup: stop the actuator and begin the mission.
    #[default]
    Init,
    /// Drive onto the green start region.
    AlignToStart,
    /// Look for a small block to pick up.
    SearchBlock,
    /// Run the gripper pick sequence.
    Pick,
    /// Rough navigation until the target drop region is visible.
    NavigateToRegion,
    /// Precision servoing onto the target drop region.
    AlignToRegion,
    /// Release the block and back off.
    Drop,
    /// Drive back onto the start region for the next cycle.
    ReturnToStart,
    /// Pickup area empty: mission finished normally.
    Complete,
    /// Unrecoverable: a region search timed out.
    Error,
}

impl MissionPhase {
    /// Terminal phases end the control loop; only an external restart
    /// leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionPhase::Complete | MissionPhase::Error)
    }
}
