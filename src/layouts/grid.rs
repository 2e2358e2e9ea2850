use super::{by_area_then_squareness, Layout, LayoutRecord};
use crate::config::MosaicConfig;
use crate::loader::LoadedImage;
use crate::math::{clamp_span, contain_scale, Rect};

/// How close `cols / rows` must come to the canvas aspect ratio before the grid stops widening.
const TARGET_RATIO: f64 = 0.99;

/// Neighbours whose aspect ratios differ by less than this tile well together.
const SIMILAR_ASPECT_DELTA: f64 = 0.2;
/// Extra scale per similar neighbour, and the cap on the total.
const SIMILAR_NEIGHBOR_BOOST: f64 = 0.1;
const MAX_NEIGHBOR_MULTIPLIER: f64 = 1.3;

/// Cells on the canvas border stretch towards it; corners touch two borders.
const EDGE_MULTIPLIER: f64 = 1.05;
const CORNER_MULTIPLIER: f64 = 1.1;

/// Slight overlap is preferred over hairline gaps between cells.
pub const OVERLAP_FACTOR: f64 = 1.02;

/// Area-weighted mean aspect ratio: the shape of a "typical" image, dominated by the big ones.
pub fn weighted_aspect_ratio(images: &[LoadedImage]) -> f64 {
    let total_area: f64 = images.iter().map(|i| i.area as f64).sum();
    let weighted: f64 = images.iter().map(|i| i.aspect_ratio * i.area as f64).sum();
    weighted / total_area
}

/// Picks `(cols, rows)` with `cols * rows >= n` and `cols / rows` close to `canvas_aspect`.
///
/// Starts from `round(sqrt(n * weighted_aspect * canvas_aspect))` columns and widens until the
/// ratio reaches `canvas_aspect * 0.99`, or until every image sits in one row.
///
/// # Panics
///
/// Panics if `n` is zero.
pub fn grid_dimensions(n: usize, weighted_aspect: f64, canvas_aspect: f64) -> (usize, usize) {
    assert!(n > 0, "grid needs at least one image");
    let estimate = (n as f64 * weighted_aspect * canvas_aspect).sqrt().round();
    let mut cols = (estimate as usize).clamp(1, n);
    let mut rows = n.div_ceil(cols);
    while cols < n && (cols as f64 / rows as f64) < canvas_aspect * TARGET_RATIO {
        cols += 1;
        rows = n.div_ceil(cols);
    }
    (cols, rows)
}

pub fn pack<'a>(images: &'a [LoadedImage], config: &MosaicConfig) -> Layout<'a> {
    let canvas = config.viewport();
    let sorted = by_area_then_squareness(images);
    let n = sorted.len();
    let (cols, rows) = grid_dimensions(n, weighted_aspect_ratio(images), config.aspect_ratio());
    log::debug!("grid: {n} images in {cols}x{rows}");

    let cell_w = canvas.width / cols as f64;
    let cell_h = canvas.height / rows as f64;
    let padded_w = cell_w * (1.0 - config.padding_ratio);
    let padded_h = cell_h * (1.0 - config.padding_ratio);

    // Slot `k` lives at row `k / cols`, column `k % cols`.
    let at = |row: usize, col: usize| -> Option<&LoadedImage> {
        if col >= cols {
            return None;
        }
        sorted.get(row * cols + col).copied()
    };

    let records = sorted
        .iter()
        .enumerate()
        .map(|(k, &image)| {
            let (row, col) = (k / cols, k % cols);

            let neighbours = [
                col.checked_sub(1).and_then(|c| at(row, c)),
                at(row, col + 1),
                row.checked_sub(1).and_then(|r| at(r, col)),
                at(row + 1, col),
            ];
            let similar = neighbours
                .iter()
                .flatten()
                .filter(|other| (other.aspect_ratio - image.aspect_ratio).abs() < SIMILAR_ASPECT_DELTA)
                .count();
            let density = f64::min(
                1.0 + SIMILAR_NEIGHBOR_BOOST * similar as f64,
                MAX_NEIGHBOR_MULTIPLIER,
            );

            let on_x_edge = col == 0 || col == cols - 1;
            let on_y_edge = row == 0 || row == rows - 1;
            let border = match (on_x_edge, on_y_edge) {
                (true, true) => CORNER_MULTIPLIER,
                (true, false) | (false, true) => EDGE_MULTIPLIER,
                (false, false) => 1.0,
            };

            let (w, h) = (f64::from(image.width), f64::from(image.height));
            let scale = (contain_scale(w, h, padded_w, padded_h) * density * border * OVERLAP_FACTOR)
                .min(contain_scale(w, h, canvas.width, canvas.height));
            let (w, h) = (w * scale, h * scale);

            // A short last row is centred rather than left-aligned.
            let in_row = if row == rows - 1 { n - row * cols } else { cols };
            let row_offset = (cols - in_row) as f64 * cell_w / 2.0;
            let cx = row_offset + (col as f64 + 0.5) * cell_w;
            let cy = (row as f64 + 0.5) * cell_h;

            let x = clamp_span(cx - w / 2.0, w, canvas.x, canvas.right());
            let y = clamp_span(cy - h / 2.0, h, canvas.y, canvas.bottom());
            LayoutRecord::new(image, Rect::new(x, y, w, h))
        })
        .collect();

    Layout {
        records,
        width: canvas.width,
        height: canvas.height,
    }
}
