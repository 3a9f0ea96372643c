//! Binary color masks and morphological cleanup.

use image::RgbImage;
use ndarray::Array2;

use crate::vision::color::{ColorSpec, rgb_to_hsv};

/// Structuring element side used everywhere in the pipeline.
pub const KERNEL_SIZE: usize = 5;

/// Build a binary mask (1 = pixel inside the color's HSV ranges).
///
/// The mask is indexed `[row, col]`, matching image `(y, x)`.
pub fn color_mask(frame: &RgbImage, spec: &ColorSpec) -> Array2<u8> {
    let (width, height) = frame.dimensions();
    let mut mask = Array2::zeros((height as usize, width as usize));
    for (x, y, pixel) in frame.enumerate_pixels() {
        if spec.matches(rgb_to_hsv(*pixel)) {
            mask[[y as usize, x as usize]] = 1;
        }
    }
    mask
}

/// Morphological opening: erosion then dilation. Removes speckle noise
/// smaller than the structuring element.
pub fn open(mask: &Array2<u8>, kernel: usize) -> Array2<u8> {
    dilate(&erode(mask, kernel), kernel)
}

/// Morphological closing: dilation then erosion. Fills gaps smaller than
/// the structuring element.
pub fn close(mask: &Array2<u8>, kernel: usize) -> Array2<u8> {
    erode(&dilate(mask, kernel), kernel)
}

/// Erosion with a `kernel` x `kernel` ones element. Out-of-bounds pixels
/// count as zero, so shapes touching the border are eaten from that side.
pub fn erode(mask: &Array2<u8>, kernel: usize) -> Array2<u8> {
    morph(mask, kernel, false)
}

/// Dilation with a `kernel` x `kernel` ones element.
pub fn dilate(mask: &Array2<u8>, kernel: usize) -> Array2<u8> {
    morph(mask, kernel, true)
}

fn morph(mask: &Array2<u8>, kernel: usize, dilating: bool) -> Array2<u8> {
    let (rows, cols) = mask.dim();
    let reach = (kernel / 2) as isize;
    let mut out = Array2::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            let mut any_set = false;
            let mut all_set = true;
            'window: for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let ny = row as isize + dy;
                    let nx = col as isize + dx;
                    let set = ny >= 0
                        && ny < rows as isize
                        && nx >= 0
                        && nx < cols as isize
                        && mask[[ny as usize, nx as usize]] != 0;
                    any_set |= set;
                    all_set &= set;
                    if dilating && any_set {
                        break 'window;
                    }
                    if !dilating && !all_set {
                        break 'window;
                    }
                }
            }
            let keep = if dilating { any_set } else { all_set };
            if keep {
                out[[row, col]] = 1;
            }
        }
    }
    out
}
