//! Color definitions, HSV thresholding tables and pixel conversion.

use image::Rgb;
use thiserror::Error;

/// Colors known to the mission: three block colors plus the green start zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockColor {
    Red,
    Yellow,
    Blue,
    /// Start region marker. Never appears as a pickup block.
    Green,
}

impl BlockColor {
    /// Drop region a block of this color belongs to.
    ///
    /// The course uses an identity mapping: a red block goes to the red
    /// region, and so on. Green marks the start zone and has no drop region.
    pub fn target_region(self) -> Option<BlockColor> {
        match self {
            BlockColor::Red => Some(BlockColor::Red),
            BlockColor::Yellow => Some(BlockColor::Yellow),
            BlockColor::Blue => Some(BlockColor::Blue),
            BlockColor::Green => None,
        }
    }
}

/// HSV pixel on the OpenCV scale: H in 0..=179, S and V in 0..=255.
pub type Hsv = [u8; 3];

/// Inclusive box range in HSV space.
#[derive(Debug, Clone, Copy)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    /// Inclusive containment test on all three channels.
    #[inline]
    pub fn contains(&self, hsv: Hsv) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// Error type for color table construction.
#[derive(Debug, Error)]
pub enum ColorSpecError {
    #[error("color {0:?} defines no HSV ranges")]
    EmptyRanges(BlockColor),
}

/// A named color as the union of one or more closed HSV ranges.
///
/// Red needs two ranges because its hue wraps around the top of the
/// OpenCV hue scale.
#[derive(Debug, Clone)]
pub struct ColorSpec {
    color: BlockColor,
    ranges: Vec<HsvRange>,
}

impl ColorSpec {
    pub fn new(color: BlockColor, ranges: Vec<HsvRange>) -> Result<Self, ColorSpecError> {
        if ranges.is_empty() {
            return Err(ColorSpecError::EmptyRanges(color));
        }
        Ok(Self { color, ranges })
    }

    pub fn color(&self) -> BlockColor {
        self.color
    }

    pub fn ranges(&self) -> &[HsvRange] {
        &self.ranges
    }

    /// Membership in the union of the ranges.
    #[inline]
    pub fn matches(&self, hsv: Hsv) -> bool {
        self.ranges.iter().any(|r| r.contains(hsv))
    }
}

/// Thresholds tuned for the large floor regions (start and drop zones).
pub fn region_palette() -> Vec<ColorSpec> {
    vec![
        spec(
            BlockColor::Red,
            vec![
                HsvRange::new([0, 100, 100], [10, 255, 255]),
                HsvRange::new([160, 100, 100], [179, 255, 255]),
            ],
        ),
        spec(
            BlockColor::Yellow,
            vec![HsvRange::new([20, 100, 100], [35, 255, 255])],
        ),
        spec(
            BlockColor::Blue,
            vec![HsvRange::new([100, 100, 100], [130, 255, 255])],
        ),
        spec(
            BlockColor::Green,
            vec![HsvRange::new([40, 50, 50], [80, 255, 255])],
        ),
    ]
}

/// Tighter saturation thresholds for the small pickup blocks. Green is
/// absent: the start zone is never a pickup target.
pub fn block_palette() -> Vec<ColorSpec> {
    vec![
        spec(
            BlockColor::Red,
            vec![
                HsvRange::new([0, 120, 100], [10, 255, 255]),
                HsvRange::new([160, 120, 100], [179, 255, 255]),
            ],
        ),
        spec(
            BlockColor::Yellow,
            vec![HsvRange::new([20, 120, 100], [35, 255, 255])],
        ),
        spec(
            BlockColor::Blue,
            vec![HsvRange::new([100, 120, 100], [130, 255, 255])],
        ),
    ]
}

fn spec(color: BlockColor, ranges: Vec<HsvRange>) -> ColorSpec {
    // Static tables always carry at least one range.
    ColorSpec { color, ranges }
}

/// Convert an RGB pixel to HSV on the OpenCV scale.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> Hsv {
    let r = pixel[0] as f32 / 255.0;
    let g = pixel[1] as f32 / 255.0;
    let b = pixel[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    [
        ((hue / 2.0).round() as u16).min(179) as u8,
        (saturation * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    ]
}
