//! Connected-component extraction over binary masks.
//!
//! Components stand in for contours: the area is the component's pixel
//! count and the center is the binary centroid (first moments), which stays
//! robust for asymmetric shapes where a bounding-box midpoint drifts.

use nalgebra::Point2;
use ndarray::Array2;

use crate::vision::rect::Rect;

/// One connected region of set mask pixels.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Pixel count of the component.
    pub area: u32,
    /// Binary centroid of the component.
    pub centroid: Point2<f32>,
    /// Tight bounding box around the component.
    pub bounding_box: Rect,
}

/// Extract all 8-connected components of the mask.
///
/// Enumeration order is row-major by seed pixel, which keeps results
/// deterministic for a given mask.
pub fn connected_components(mask: &Array2<u8>) -> Vec<Blob> {
    let (rows, cols) = mask.dim();
    let mut visited = vec![false; rows * cols];
    let mut blobs = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if mask[[row, col]] == 0 || visited[row * cols + col] {
                continue;
            }
            blobs.push(grow_component(mask, &mut visited, row, col));
        }
    }
    blobs
}

/// Flood fill from a seed pixel, aggregating blob properties.
fn grow_component(
    mask: &Array2<u8>,
    visited: &mut [bool],
    seed_row: usize,
    seed_col: usize,
) -> Blob {
    let (rows, cols) = mask.dim();
    let mut queue = vec![(seed_row, seed_col)];
    visited[seed_row * cols + seed_col] = true;

    let mut count: u64 = 0;
    let mut sum_x: u64 = 0;
    let mut sum_y: u64 = 0;
    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0usize;
    let mut max_y = 0usize;

    while let Some((row, col)) = queue.pop() {
        count += 1;
        sum_x += col as u64;
        sum_y += row as u64;
        min_x = min_x.min(col);
        min_y = min_y.min(row);
        max_x = max_x.max(col);
        max_y = max_y.max(row);

        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dy == 0 && dx == 0 {
                    continue;
                }
                let ny = row as isize + dy;
                let nx = col as isize + dx;
                if ny < 0 || ny >= rows as isize || nx < 0 || nx >= cols as isize {
                    continue;
                }
                let idx = ny as usize * cols + nx as usize;
                if !visited[idx] && mask[[ny as usize, nx as usize]] != 0 {
                    visited[idx] = true;
                    queue.push((ny as usize, nx as usize));
                }
            }
        }
    }

    Blob {
        area: count as u32,
        centroid: Point2::new(sum_x as f32 / count as f32, sum_y as f32 / count as f32),
        bounding_box: Rect::new(
            min_x as u32,
            min_y as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ),
    }
}
