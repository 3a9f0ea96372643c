//! Alignment controller: turns one blob observation into one discrete
//! motion decision.

use nalgebra::{Point2, Vector2};
use tracing::trace;

use crate::control::command::AlignmentCommand;
use crate::vision::BlobObservation;

/// "Close enough to act" test. A controller uses exactly one metric; the
/// area test suits region docking, the bounding-box-height test suits
/// geometry-based nearness on tall targets.
#[derive(Debug, Clone, Copy)]
pub enum CloseMetric {
    /// Blob area in pixels, inclusive.
    Area(u32),
    /// Bounding box height in pixels, inclusive.
    BoxHeight(u32),
}

impl CloseMetric {
    fn satisfied_by(self, observation: &BlobObservation) -> bool {
        match self {
            CloseMetric::Area(threshold) => observation.area >= threshold,
            CloseMetric::BoxHeight(threshold) => observation.bounding_box.height >= threshold,
        }
    }
}

/// Tolerances for the alignment decision cascade.
#[derive(Debug, Clone, Copy)]
pub struct AlignerConfig {
    /// Horizontal error below this is "aligned".
    pub x_tolerance: f32,
    /// Horizontal error above this calls for rotation instead of strafing.
    pub large_error: f32,
    pub close: CloseMetric,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            x_tolerance: 50.0,
            large_error: 150.0,
            close: CloseMetric::Area(50_000),
        }
    }
}

/// Pure decision function over an optional observation. Holds tolerances
/// and the frame center, never state.
#[derive(Debug, Clone)]
pub struct AlignmentController {
    config: AlignerConfig,
    frame_center: Point2<f32>,
}

impl AlignmentController {
    pub fn new(frame_width: u32, frame_height: u32, config: AlignerConfig) -> Self {
        Self {
            config,
            frame_center: Point2::new(frame_width as f32 / 2.0, frame_height as f32 / 2.0),
        }
    }

    /// Controller with default tolerances for a given frame size.
    pub fn for_frame(frame_width: u32, frame_height: u32) -> Self {
        Self::new(frame_width, frame_height, AlignerConfig::default())
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Offset of the observation center from the frame center. The vertical
    /// component is diagnostic only; the robot has no vertical actuation.
    pub fn error_vector(&self, observation: &BlobObservation) -> Vector2<f32> {
        observation.center - self.frame_center
    }

    pub fn is_aligned(&self, observation: &BlobObservation) -> bool {
        self.error_vector(observation).x.abs() <= self.config.x_tolerance
    }

    pub fn is_close(&self, observation: &BlobObservation) -> bool {
        self.config.close.satisfied_by(observation)
    }

    /// Decision cascade: search when blind, close when the metric is met
    /// (inclusive), rotate on large horizontal error, strafe on small,
    /// otherwise forward.
    pub fn command(&self, observation: Option<&BlobObservation>) -> AlignmentCommand {
        let Some(observation) = observation else {
            return AlignmentCommand::Search;
        };

        if self.is_close(observation) {
            return AlignmentCommand::Close;
        }

        let error = self.error_vector(observation);
        trace!(ex = error.x, ey = error.y, area = observation.area, "alignment error");

        if error.x.abs() > self.config.x_tolerance {
            if error.x.abs() > self.config.large_error {
                return if error.x > 0.0 {
                    AlignmentCommand::RotateClockwise
                } else {
                    AlignmentCommand::RotateCounterclockwise
                };
            }
            return if error.x > 0.0 {
                AlignmentCommand::StrafeRight
            } else {
                AlignmentCommand::StrafeLeft
            };
        }

        AlignmentCommand::Forward
    }
}
