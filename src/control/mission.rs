//! Mission state machine: sequences pickup, transport, drop and return.

use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{info, warn};

use crate::control::aligner::{AlignerConfig, AlignmentController};
use crate::control::command::{AlignmentCommand, MotionCommand};
use crate::control::phase::MissionPhase;
use crate::vision::{BlobLocator, BlobObservation, BlockColor};

/// One actuator instruction produced by a control cycle.
///
/// A `Pulse` is a motion command held for a fixed duration and then
/// explicitly stopped; the driver executes the hold. `Send` is immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Send(MotionCommand),
    Pulse(MotionCommand, Duration),
}

/// Numeric policy for the mission: timeouts, pulse lengths, tolerances.
#[derive(Debug, Clone, Copy)]
pub struct MissionConfig {
    /// Elapsed time in one phase before its timeout policy fires.
    pub phase_timeout: Duration,
    pub forward_pulse: Duration,
    pub strafe_pulse: Duration,
    pub rotate_pulse: Duration,
    /// Rotation pulse used while searching for a target.
    pub search_pulse: Duration,
    /// Backward pulse after dropping, to clear the region.
    pub backoff_pulse: Duration,
    /// Horizontal offset beyond which a found block gets a centering strafe
    /// before the pick.
    pub block_center_tolerance: f32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub aligner: AlignerConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_secs(30),
            forward_pulse: Duration::from_millis(200),
            strafe_pulse: Duration::from_millis(150),
            rotate_pulse: Duration::from_millis(100),
            search_pulse: Duration::from_millis(150),
            backoff_pulse: Duration::from_millis(500),
            block_center_tolerance: 60.0,
            frame_width: 640,
            frame_height: 480,
            aligner: AlignerConfig::default(),
        }
    }
}

/// What a region-seek handler does when its target is not in the frame.
#[derive(Debug, Clone, Copy)]
enum LostPolicy {
    /// Rotate a search pulse; escalate to the given phase on timeout.
    SearchRotate { on_timeout: MissionPhase },
    /// Give up precision and fall back to the given phase immediately.
    FallBack(MissionPhase),
}

/// Parameterization of the shared "drive onto a colored region" handler.
#[derive(Debug, Clone, Copy)]
struct SeekSpec {
    target: BlockColor,
    search_rotation: MotionCommand,
    /// Precise seeks dispatch aligner pulses until `Close`; coarse seeks
    /// transition on first sighting without issuing a motion.
    precise: bool,
    on_arrival: MissionPhase,
    on_lost: LostPolicy,
}

/// Owns all mission state and decides one cycle at a time.
///
/// `step` never sleeps and never touches hardware: it consumes at most one
/// frame, mutates the mission data, and returns the actions for the driver
/// to execute. That keeps every phase testable without a camera or a
/// serial link.
pub struct MissionStateMachine {
    config: MissionConfig,
    region_locator: BlobLocator,
    block_locator: BlobLocator,
    aligner: AlignmentController,
    phase: MissionPhase,
    previous_phase: Option<MissionPhase>,
    phase_entered: Instant,
    held_block: Option<BlockColor>,
    target_region: Option<BlockColor>,
    blocks_transported: u32,
    last_observation: Option<BlobObservation>,
    last_command: Option<AlignmentCommand>,
}

impl MissionStateMachine {
    pub fn new(config: MissionConfig) -> Self {
        let aligner = AlignmentController::new(
            config.frame_width,
            config.frame_height,
            config.aligner,
        );
        Self {
            config,
            region_locator: BlobLocator::regions(),
            block_locator: BlobLocator::blocks(),
            aligner,
            phase: MissionPhase::Init,
            previous_phase: None,
            phase_entered: Instant::now(),
            held_block: None,
            target_region: None,
            blocks_transported: 0,
            last_observation: None,
            last_command: None,
        }
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn previous_phase(&self) -> Option<MissionPhase> {
        self.previous_phase
    }

    pub fn blocks_transported(&self) -> u32 {
        self.blocks_transported
    }

    pub fn held_block(&self) -> Option<BlockColor> {
        self.held_block
    }

    pub fn target_region(&self) -> Option<BlockColor> {
        self.target_region
    }

    /// Most recent observation acted on, for debug introspection.
    pub fn last_observation(&self) -> Option<&BlobObservation> {
        self.last_observation.as_ref()
    }

    /// Most recent alignment decision, for debug introspection.
    pub fn last_command(&self) -> Option<AlignmentCommand> {
        self.last_command
    }

    /// Run one control cycle.
    ///
    /// `frame` is `None` when the capture failed; handlers that need vision
    /// then skip the cycle without escalating.
    pub fn step(&mut self, frame: Option<&RgbImage>, now: Instant) -> Vec<Action> {
        match self.phase {
            MissionPhase::Init => {
                info!("mission starting");
                self.transition(MissionPhase::AlignToStart, now);
                vec![Action::Send(MotionCommand::Stop)]
            }
            MissionPhase::AlignToStart => self.seek_region(
                frame,
                now,
                SeekSpec {
                    target: BlockColor::Green,
                    search_rotation: MotionCommand::RotateClockwise,
                    precise: true,
                    on_arrival: MissionPhase::SearchBlock,
                    on_lost: LostPolicy::SearchRotate {
                        on_timeout: MissionPhase::Error,
                    },
                },
            ),
            MissionPhase::SearchBlock => self.search_block(frame, now),
            MissionPhase::Pick => {
                info!(color = ?self.held_block, "picking up block");
                self.transition(MissionPhase::NavigateToRegion, now);
                vec![Action::Send(MotionCommand::Pick)]
            }
            MissionPhase::NavigateToRegion => {
                let Some(target) = self.target_region else {
                    warn!("no target region while navigating");
                    self.transition(MissionPhase::Error, now);
                    return vec![Action::Send(MotionCommand::Stop)];
                };
                self.seek_region(
                    frame,
                    now,
                    SeekSpec {
                        target,
                        search_rotation: MotionCommand::RotateClockwise,
                        precise: false,
                        on_arrival: MissionPhase::AlignToRegion,
                        on_lost: LostPolicy::SearchRotate {
                            on_timeout: MissionPhase::Error,
                        },
                    },
                )
            }
            MissionPhase::AlignToRegion => {
                let Some(target) = self.target_region else {
                    warn!("no target region while aligning");
                    self.transition(MissionPhase::Error, now);
                    return vec![Action::Send(MotionCommand::Stop)];
                };
                self.seek_region(
                    frame,
                    now,
                    SeekSpec {
                        target,
                        search_rotation: MotionCommand::RotateClockwise,
                        precise: true,
                        on_arrival: MissionPhase::Drop,
                        on_lost: LostPolicy::FallBack(MissionPhase::NavigateToRegion),
                    },
                )
            }
            MissionPhase::Drop => self.drop_block(now),
            MissionPhase::ReturnToStart => self.seek_region(
                frame,
                now,
                SeekSpec {
                    target: BlockColor::Green,
                    search_rotation: MotionCommand::RotateCounterclockwise,
                    precise: true,
                    on_arrival: MissionPhase::AlignToStart,
                    on_lost: LostPolicy::SearchRotate {
                        on_timeout: MissionPhase::Error,
                    },
                },
            ),
            MissionPhase::Complete | MissionPhase::Error => {
                vec![Action::Send(MotionCommand::Stop)]
            }
        }
    }

    /// Shared handler for every "drive onto a colored region" phase.
    fn seek_region(
        &mut self,
        frame: Option<&RgbImage>,
        now: Instant,
        spec: SeekSpec,
    ) -> Vec<Action> {
        let Some(frame) = frame else {
            return vec![];
        };

        let observation = self.region_locator.locate(frame, spec.target);
        self.last_observation = observation.clone();

        let Some(observation) = observation else {
            self.last_command = Some(AlignmentCommand::Search);
            return match spec.on_lost {
                LostPolicy::FallBack(next) => {
                    info!(target = ?spec.target, "lost target region, falling back");
                    self.transition(next, now);
                    vec![]
                }
                LostPolicy::SearchRotate { on_timeout } => {
                    if self.timed_out(now) {
                        warn!(target = ?spec.target, "region search timed out");
                        self.transition(on_timeout, now);
                        return vec![Action::Send(MotionCommand::Stop)];
                    }
                    vec![Action::Pulse(spec.search_rotation, self.config.search_pulse)]
                }
            };
        };

        if !spec.precise {
            // Coarse seek: a sighting is enough to switch modes.
            info!(target = ?spec.target, "target region sighted");
            self.transition(spec.on_arrival, now);
            return vec![Action::Send(MotionCommand::Stop)];
        }

        let command = self.aligner.command(Some(&observation));
        self.last_command = Some(command);
        match command {
            AlignmentCommand::Close => {
                info!(target = ?spec.target, "reached target region");
                self.transition(spec.on_arrival, now);
                vec![Action::Send(MotionCommand::Stop)]
            }
            AlignmentCommand::Forward => vec![Action::Pulse(
                MotionCommand::Forward,
                self.config.forward_pulse,
            )],
            AlignmentCommand::StrafeLeft => vec![Action::Pulse(
                MotionCommand::StrafeLeft,
                self.config.strafe_pulse,
            )],
            AlignmentCommand::StrafeRight => vec![Action::Pulse(
                MotionCommand::StrafeRight,
                self.config.strafe_pulse,
            )],
            AlignmentCommand::RotateClockwise => vec![Action::Pulse(
                MotionCommand::RotateClockwise,
                self.config.rotate_pulse,
            )],
            AlignmentCommand::RotateCounterclockwise => vec![Action::Pulse(
                MotionCommand::RotateCounterclockwise,
                self.config.rotate_pulse,
            )],
            // The aligner never searches on a present observation.
            AlignmentCommand::Search => vec![],
        }
    }

    /// Look for a small block; timeout here means the pickup area is empty,
    /// which ends the mission normally rather than as a fault.
    fn search_block(&mut self, frame: Option<&RgbImage>, now: Instant) -> Vec<Action> {
        let Some(frame) = frame else {
            return vec![];
        };

        let mut blocks = self.block_locator.locate_all(frame);
        if blocks.is_empty() {
            self.last_observation = None;
            self.last_command = Some(AlignmentCommand::Search);
            if self.timed_out(now) {
                info!(
                    transported = self.blocks_transported,
                    "no blocks left in pickup area, mission complete"
                );
                self.transition(MissionPhase::Complete, now);
                return vec![Action::Send(MotionCommand::Stop)];
            }
            return vec![Action::Pulse(
                MotionCommand::RotateClockwise,
                self.config.search_pulse,
            )];
        }

        // Largest block is the target.
        let target = blocks.remove(0);
        self.held_block = Some(target.color);
        self.target_region = target.color.target_region();
        info!(color = ?target.color, area = target.area, "block selected");

        let error_x = target.center.x - self.config.frame_width as f32 / 2.0;
        self.last_observation = Some(target);

        if error_x.abs() > self.config.block_center_tolerance {
            let (command, motion) = if error_x > 0.0 {
                (AlignmentCommand::StrafeRight, MotionCommand::StrafeRight)
            } else {
                (AlignmentCommand::StrafeLeft, MotionCommand::StrafeLeft)
            };
            self.last_command = Some(command);
            return vec![Action::Pulse(motion, self.config.strafe_pulse)];
        }

        self.transition(MissionPhase::Pick, now);
        vec![]
    }

    fn drop_block(&mut self, now: Instant) -> Vec<Action> {
        self.blocks_transported += 1;
        info!(
            color = ?self.held_block,
            transported = self.blocks_transported,
            "block delivered"
        );
        self.held_block = None;
        self.target_region = None;
        self.transition(MissionPhase::ReturnToStart, now);
        vec![
            Action::Send(MotionCommand::Release),
            Action::Pulse(MotionCommand::Backward, self.config.backoff_pulse),
        ]
    }

    fn transition(&mut self, next: MissionPhase, now: Instant) {
        info!(from = ?self.phase, to = ?next, "phase transition");
        self.previous_phase = Some(self.phase);
        self.phase = next;
        self.phase_entered = now;
    }

    fn timed_out(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.phase_entered) > self.config.phase_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 200, 0]);

    fn blank_frame() -> RgbImage {
        RgbImage::from_pixel(640, 480, Rgb([0, 0, 0]))
    }

    fn frame_with_rect(color: Rgb<u8>, x: u32, y: u32, w: u32, h: u32) -> RgbImage {
        let mut frame = blank_frame();
        for py in y..y + h {
            for px in x..x + w {
                frame.put_pixel(px, py, color);
            }
        }
        frame
    }

    /// Centered rect of the given size.
    fn centered_rect(color: Rgb<u8>, w: u32, h: u32) -> RgbImage {
        frame_with_rect(color, 320 - w / 2, 240 - h / 2, w, h)
    }

    fn machine() -> MissionStateMachine {
        MissionStateMachine::new(MissionConfig::default())
    }

    #[test]
    fn test_init_stops_and_enters_start_align() {
        let mut machine = machine();
        let actions = machine.step(None, Instant::now());
        assert_eq!(actions, vec![Action::Send(MotionCommand::Stop)]);
        assert_eq!(machine.phase(), MissionPhase::AlignToStart);
        assert_eq!(machine.previous_phase(), Some(MissionPhase::Init));
    }

    #[test]
    fn test_missing_frame_is_a_no_op_cycle() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        assert_eq!(machine.phase(), MissionPhase::AlignToStart);
        let actions = machine.step(None, now);
        assert!(actions.is_empty());
        assert_eq!(machine.phase(), MissionPhase::AlignToStart);
    }

    #[test]
    fn test_start_align_searches_when_blind() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        let actions = machine.step(Some(&blank_frame()), now);
        assert_eq!(
            actions,
            vec![Action::Pulse(
                MotionCommand::RotateClockwise,
                machine.config.search_pulse
            )]
        );
        assert_eq!(machine.last_command(), Some(AlignmentCommand::Search));
    }

    #[test]
    fn test_start_align_timeout_is_fatal() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        let late = now + Duration::from_secs(31);
        let actions = machine.step(Some(&blank_frame()), late);
        assert_eq!(actions, vec![Action::Send(MotionCommand::Stop)]);
        assert_eq!(machine.phase(), MissionPhase::Error);
    }

    #[test]
    fn test_search_block_timeout_completes_mission() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        // Park on the start region.
        machine.step(Some(&centered_rect(GREEN, 300, 200)), now);
        assert_eq!(machine.phase(), MissionPhase::SearchBlock);

        // Empty pickup area until the timeout fires.
        let actions = machine.step(Some(&blank_frame()), now + Duration::from_secs(1));
        assert_eq!(
            actions,
            vec![Action::Pulse(
                MotionCommand::RotateClockwise,
                machine.config.search_pulse
            )]
        );
        machine.step(Some(&blank_frame()), now + Duration::from_secs(31));
        assert_eq!(machine.phase(), MissionPhase::Complete);
    }

    #[test]
    fn test_search_block_centers_before_picking() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        machine.step(Some(&centered_rect(GREEN, 300, 200)), now);

        // Block well right of center: one strafe pulse, no pick yet.
        let off_center = frame_with_rect(RED, 500, 210, 60, 60);
        let actions = machine.step(Some(&off_center), now);
        assert_eq!(
            actions,
            vec![Action::Pulse(
                MotionCommand::StrafeRight,
                machine.config.strafe_pulse
            )]
        );
        assert_eq!(machine.phase(), MissionPhase::SearchBlock);
        assert_eq!(machine.held_block(), Some(BlockColor::Red));
        assert_eq!(machine.target_region(), Some(BlockColor::Red));

        // Centered block: transition to pick.
        machine.step(Some(&centered_rect(RED, 60, 60)), now);
        assert_eq!(machine.phase(), MissionPhase::Pick);
    }

    #[test]
    fn test_pick_issues_gripper_command() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        machine.step(Some(&centered_rect(GREEN, 300, 200)), now);
        machine.step(Some(&centered_rect(RED, 60, 60)), now);

        let actions = machine.step(None, now);
        assert_eq!(actions, vec![Action::Send(MotionCommand::Pick)]);
        assert_eq!(machine.phase(), MissionPhase::NavigateToRegion);
    }

    #[test]
    fn test_align_region_lost_falls_back_to_navigate() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        machine.step(Some(&centered_rect(GREEN, 300, 200)), now);
        machine.step(Some(&centered_rect(RED, 60, 60)), now);
        machine.step(None, now); // pick
        // Coarse sighting switches to precise alignment.
        machine.step(Some(&frame_with_rect(RED, 100, 100, 200, 100)), now);
        assert_eq!(machine.phase(), MissionPhase::AlignToRegion);

        // Target vanishes: fall back, not error, even long after entry.
        let late = now + Duration::from_secs(40);
        let actions = machine.step(Some(&blank_frame()), late);
        assert!(actions.is_empty());
        assert_eq!(machine.phase(), MissionPhase::NavigateToRegion);
    }

    #[test]
    fn test_drop_counts_and_resets_mission_data() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        machine.step(Some(&centered_rect(GREEN, 300, 200)), now);
        machine.step(Some(&centered_rect(RED, 60, 60)), now);
        machine.step(None, now); // pick
        machine.step(Some(&frame_with_rect(RED, 100, 100, 200, 100)), now);
        machine.step(Some(&centered_rect(RED, 300, 200)), now);
        assert_eq!(machine.phase(), MissionPhase::Drop);

        let actions = machine.step(None, now);
        assert_eq!(actions[0], Action::Send(MotionCommand::Release));
        assert!(matches!(
            actions[1],
            Action::Pulse(MotionCommand::Backward, _)
        ));
        assert_eq!(machine.blocks_transported(), 1);
        assert_eq!(machine.held_block(), None);
        assert_eq!(machine.target_region(), None);
        assert_eq!(machine.phase(), MissionPhase::ReturnToStart);
    }

    #[test]
    fn test_return_to_start_searches_counterclockwise() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        machine.step(Some(&centered_rect(GREEN, 300, 200)), now);
        machine.step(Some(&centered_rect(RED, 60, 60)), now);
        machine.step(None, now);
        machine.step(Some(&frame_with_rect(RED, 100, 100, 200, 100)), now);
        machine.step(Some(&centered_rect(RED, 300, 200)), now);
        machine.step(None, now); // drop

        let actions = machine.step(Some(&blank_frame()), now);
        assert_eq!(
            actions,
            vec![Action::Pulse(
                MotionCommand::RotateCounterclockwise,
                machine.config.search_pulse
            )]
        );
    }

    #[test]
    fn test_terminal_phases_keep_stopping() {
        let mut machine = machine();
        let now = Instant::now();
        machine.step(None, now);
        machine.step(Some(&blank_frame()), now + Duration::from_secs(31));
        assert_eq!(machine.phase(), MissionPhase::Error);

        for _ in 0..3 {
            let actions = machine.step(None, now + Duration::from_secs(32));
            assert_eq!(actions, vec![Action::Send(MotionCommand::Stop)]);
            assert_eq!(machine.phase(), MissionPhase::Error);
        }
    }
}
