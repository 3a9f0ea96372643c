//! Blocking control loop that drives the mission against live hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::control::command::{MotionCommand, SpeedLevel};
use crate::control::io::{Actuator, FrameSource};
use crate::control::mission::{Action, MissionConfig, MissionStateMachine};
use crate::control::phase::MissionPhase;

/// Loop pacing for the runner.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// Delay between control cycles.
    pub cycle_delay: Duration,
    /// Drive speed set once at mission start.
    pub speed: SpeedLevel,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycle_delay: Duration::from_millis(50),
            speed: SpeedLevel::Medium,
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionReport {
    pub final_phase: MissionPhase,
    pub blocks_transported: u32,
}

/// Single-threaded driver: one frame, one handler, at most one pulse per
/// cycle element, in strict sequence. Pulses block until their hold
/// elapses and are always followed by a stop.
pub struct MissionRunner<S: FrameSource, A: Actuator> {
    source: S,
    actuator: A,
    machine: MissionStateMachine,
    config: RunnerConfig,
    quit: Arc<AtomicBool>,
}

impl<S: FrameSource, A: Actuator> MissionRunner<S, A> {
    pub fn new(source: S, actuator: A, mission: MissionConfig, config: RunnerConfig) -> Self {
        Self {
            source,
            actuator,
            machine: MissionStateMachine::new(mission),
            config,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_default_config(source: S, actuator: A) -> Self {
        Self::new(
            source,
            actuator,
            MissionConfig::default(),
            RunnerConfig::default(),
        )
    }

    /// Flag that, once set, exits the loop at the next cycle boundary after
    /// a final stop. Clone it into a signal handler.
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }

    /// The mission state machine, for debug introspection.
    pub fn machine(&self) -> &MissionStateMachine {
        &self.machine
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// Execute the control loop until a terminal phase or an external quit.
    ///
    /// The actuator is always left stopped, even on the error path.
    pub fn run(&mut self) -> Result<MissionReport, A::Error> {
        self.actuator
            .send(MotionCommand::SetSpeed(self.config.speed))?;

        let result = self.run_loop();

        // Cleanup stop must go out regardless of prior link state.
        let _ = self.actuator.send(MotionCommand::Stop);

        result?;
        let report = MissionReport {
            final_phase: self.machine.phase(),
            blocks_transported: self.machine.blocks_transported(),
        };
        info!(
            final_phase = ?report.final_phase,
            blocks_transported = report.blocks_transported,
            "mission ended"
        );
        Ok(report)
    }

    fn run_loop(&mut self) -> Result<(), A::Error> {
        loop {
            if self.quit.load(Ordering::Relaxed) {
                info!("quit requested");
                return Ok(());
            }

            let frame = self.source.next_frame();
            let actions = self.machine.step(frame.as_ref(), Instant::now());
            for action in actions {
                self.execute(action)?;
            }

            if self.machine.phase().is_terminal() {
                return Ok(());
            }

            thread::sleep(self.config.cycle_delay);
        }
    }

    /// A pulse is asserted, held, then explicitly stopped; it always
    /// completes before the next sensor read.
    fn execute(&mut self, action: Action) -> Result<(), A::Error> {
        match action {
            Action::Send(command) => self.actuator.send(command),
            Action::Pulse(command, hold) => {
                self.actuator.send(command)?;
                thread::sleep(hold);
                self.actuator.send(MotionCommand::Stop)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct NoFrames;

    impl FrameSource for NoFrames {
        fn next_frame(&mut self) -> Option<RgbImage> {
            None
        }
    }

    struct BlankFrames;

    impl FrameSource for BlankFrames {
        fn next_frame(&mut self) -> Option<RgbImage> {
            Some(RgbImage::new(640, 480))
        }
    }

    #[derive(Default)]
    struct RecordingActuator {
        sent: Vec<MotionCommand>,
    }

    impl Actuator for RecordingActuator {
        type Error = std::convert::Infallible;

        fn send(&mut self, command: MotionCommand) -> Result<(), Self::Error> {
            self.sent.push(command);
            Ok(())
        }
    }

    #[test]
    fn test_quit_leaves_actuator_stopped() {
        let mut runner = MissionRunner::with_default_config(NoFrames, RecordingActuator::default());
        runner.quit_flag().store(true, Ordering::Relaxed);

        let report = runner.run().unwrap();
        assert_eq!(report.blocks_transported, 0);

        let sent = &runner.actuator().sent;
        assert_eq!(sent[0], MotionCommand::SetSpeed(SpeedLevel::Medium));
        assert_eq!(*sent.last().unwrap(), MotionCommand::Stop);
    }

    #[test]
    fn test_zero_timeout_on_empty_frames_ends_in_error() {
        let mission = MissionConfig {
            phase_timeout: Duration::from_millis(0),
            search_pulse: Duration::from_millis(1),
            ..MissionConfig::default()
        };
        let runner_config = RunnerConfig {
            cycle_delay: Duration::from_millis(1),
            ..RunnerConfig::default()
        };
        let mut runner = MissionRunner::new(
            BlankFrames,
            RecordingActuator::default(),
            mission,
            runner_config,
        );

        // Start region never appears, so the start search times out at once.
        let report = runner.run().unwrap();
        assert_eq!(report.final_phase, MissionPhase::Error);
        assert_eq!(report.blocks_transported, 0);
        assert_eq!(
            *runner.actuator().sent.last().unwrap(),
            MotionCommand::Stop
        );
    }
}
