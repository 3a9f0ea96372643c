//! Vision layer: color tables, masks, blob extraction and the locator.

mod blob;
mod color;
mod locator;
mod mask;
mod rect;

pub use blob::{Blob, connected_components};
pub use color::{
    BlockColor, ColorSpec, ColorSpecError, Hsv, HsvRange, block_palette, region_palette,
    rgb_to_hsv,
};
pub use locator::{BlobLocator, BlobObservation, LocatorConfig};
pub use mask::{KERNEL_SIZE, close, color_mask, dilate, erode, open};
pub use rect::Rect;
