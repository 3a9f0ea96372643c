//! Blob location: per-color mask, cleanup, component selection.

use image::RgbImage;
use nalgebra::Point2;
use tracing::debug;

use crate::vision::blob::{Blob, connected_components};
use crate::vision::color::{BlockColor, ColorSpec, block_palette, region_palette};
use crate::vision::mask::{KERNEL_SIZE, close, color_mask, open};
use crate::vision::rect::Rect;

/// One detected blob, produced fresh every frame. Observations carry no
/// identity across frames.
#[derive(Debug, Clone)]
pub struct BlobObservation {
    pub color: BlockColor,
    /// Binary centroid of the blob in pixel coordinates.
    pub center: Point2<f32>,
    /// Pixel count of the blob.
    pub area: u32,
    pub bounding_box: Rect,
}

/// Area window and cleanup policy for one detection task.
#[derive(Debug, Clone, Copy)]
pub struct LocatorConfig {
    /// Blobs below this area are noise.
    pub min_area: u32,
    /// Upper area bound, used to exclude floor regions from block search.
    pub max_area: Option<u32>,
    /// Apply morphological closing after opening, to fill small gaps.
    pub fill_gaps: bool,
}

impl LocatorConfig {
    /// Profile for the large floor regions (start and drop zones).
    pub fn region() -> Self {
        Self {
            min_area: 8000,
            max_area: None,
            fill_gaps: false,
        }
    }

    /// Profile for the small pickup blocks.
    pub fn block() -> Self {
        Self {
            min_area: 500,
            max_area: Some(8000),
            fill_gaps: true,
        }
    }
}

/// Stateless locator: a color palette plus an area window.
#[derive(Debug, Clone)]
pub struct BlobLocator {
    palette: Vec<ColorSpec>,
    config: LocatorConfig,
}

impl BlobLocator {
    pub fn new(palette: Vec<ColorSpec>, config: LocatorConfig) -> Self {
        Self { palette, config }
    }

    /// Locator tuned for the large floor regions.
    pub fn regions() -> Self {
        Self::new(region_palette(), LocatorConfig::region())
    }

    /// Locator tuned for the small pickup blocks.
    pub fn blocks() -> Self {
        Self::new(block_palette(), LocatorConfig::block())
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Find the best (largest) blob of one color, if any passes the area
    /// window. Absence is the only failure signal.
    pub fn locate(&self, frame: &RgbImage, color: BlockColor) -> Option<BlobObservation> {
        let spec = self.palette.iter().find(|s| s.color() == color)?;
        let best = self
            .blobs_for(frame, spec)
            .into_iter()
            .max_by_key(|blob| blob.area)?;
        debug!(
            ?color,
            area = best.area,
            cx = best.centroid.x,
            cy = best.centroid.y,
            "located blob"
        );
        Some(observation(color, best))
    }

    /// Find every blob of every palette color inside the area window,
    /// sorted by area descending. Ties keep the deterministic per-color
    /// enumeration order.
    pub fn locate_all(&self, frame: &RgbImage) -> Vec<BlobObservation> {
        let mut observations: Vec<BlobObservation> = Vec::new();
        for spec in &self.palette {
            observations.extend(
                self.blobs_for(frame, spec)
                    .into_iter()
                    .map(|blob| observation(spec.color(), blob)),
            );
        }
        observations.sort_by(|a, b| b.area.cmp(&a.area));
        debug!(count = observations.len(), "located blobs");
        observations
    }

    /// Closest passing blob to a pixel position, across all palette colors.
    pub fn find_closest(&self, frame: &RgbImage, to: Point2<f32>) -> Option<BlobObservation> {
        self.locate_all(frame)
            .into_iter()
            .min_by(|a, b| {
                let da = nalgebra::distance_squared(&a.center, &to);
                let db = nalgebra::distance_squared(&b.center, &to);
                da.total_cmp(&db)
            })
    }

    /// Mask, morphology, components, area filter for one color.
    fn blobs_for(&self, frame: &RgbImage, spec: &ColorSpec) -> Vec<Blob> {
        let mut mask = color_mask(frame, spec);
        mask = open(&mask, KERNEL_SIZE);
        if self.config.fill_gaps {
            mask = close(&mask, KERNEL_SIZE);
        }
        connected_components(&mask)
            .into_iter()
            .filter(|blob| {
                blob.area >= self.config.min_area
                    && self.config.max_area.is_none_or(|max| blob.area <= max)
            })
            .collect()
    }
}

fn observation(color: BlockColor, blob: Blob) -> BlobObservation {
    BlobObservation {
        color,
        center: blob.centroid,
        area: blob.area,
        bounding_box: blob.bounding_box,
    }
}
