use super::{Layout, LayoutRecord};
use crate::config::MosaicConfig;
use crate::loader::LoadedImage;
use crate::math::Rect;

/// A row is closed early only if the space it leaves open is at most this share of the width.
const MAX_GAP_RATIO: f64 = 0.2;

/// The last row may grow to at most this multiple of the target row height.
pub const LAST_ROW_MAX_STRETCH: f64 = 2.0;

/// Inter-image gaps may take at most this share of a row's width.
const MAX_GAP_SHARE: f64 = 0.5;

/// Row height at which the images, laid end to end, wrap into about
/// `sqrt(n * width / height)` rows of `width` each.
pub fn target_row_height(images: &[LoadedImage], width: f64, height: f64) -> f64 {
    let n = images.len() as f64;
    let rows = (n * width / height).sqrt().round().clamp(1.0, n);
    let total_aspect: f64 = images.iter().map(|i| i.aspect_ratio).sum();
    rows * width / total_aspect
}

pub fn pack<'a>(images: &'a [LoadedImage], config: &MosaicConfig) -> Layout<'a> {
    let canvas = config.viewport();
    let width = canvas.width;
    let target = target_row_height(images, width, canvas.height);
    let gap = config.padding_ratio * target;

    let mut sorted: Vec<&LoadedImage> = images.iter().collect();
    sorted.sort_by(|a, b| a.aspect_ratio.total_cmp(&b.aspect_ratio));

    let rows = break_rows(&sorted, target, gap, width * MAX_GAP_RATIO, width);
    log::debug!(
        "row-justified: {} images in {} rows at target height {target:.1}",
        sorted.len(),
        rows.len()
    );

    let mut records = Vec::with_capacity(sorted.len());
    let mut y = 0.0;
    let mut last_gap = 0.0;
    for (i, row) in rows.iter().enumerate() {
        let is_last = i == rows.len() - 1;
        let row_gap = if row.len() > 1 {
            gap.min(width * MAX_GAP_SHARE / (row.len() - 1) as f64)
        } else {
            0.0
        };
        let row_height = justify(row, y, target, row_gap, width, is_last, &mut records);
        y += row_height + gap;
        last_gap = gap;
    }

    Layout {
        records,
        width,
        height: y - last_gap,
    }
}

/// Greedily fills rows at `target` height. A row closes before an image that would overflow
/// `width`, unless closing would leave more than `max_gap` open; then the image joins the row
/// and the row is shrunk to fit instead.
fn break_rows<'a>(
    sorted: &[&'a LoadedImage],
    target: f64,
    gap: f64,
    max_gap: f64,
    width: f64,
) -> Vec<Vec<&'a LoadedImage>> {
    let mut rows = Vec::new();
    let mut current: Vec<&LoadedImage> = Vec::new();
    let mut used = 0.0;
    for &image in sorted {
        let image_width = image.aspect_ratio * target;
        if !current.is_empty() && used + gap + image_width > width && width - used <= max_gap {
            rows.push(std::mem::take(&mut current));
            used = 0.0;
        }
        if !current.is_empty() {
            used += gap;
        }
        used += image_width;
        current.push(image);
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

/// Scales `row` uniformly so that it spans `width` exactly, appends its records at height `y`,
/// and returns the row's height. The last row's scale is capped, and a capped row is centred.
fn justify<'a>(
    row: &[&'a LoadedImage],
    y: f64,
    target: f64,
    gap: f64,
    width: f64,
    is_last: bool,
    records: &mut Vec<LayoutRecord<'a>>,
) -> f64 {
    let gaps = gap * (row.len() - 1) as f64;
    let content: f64 = row.iter().map(|i| i.aspect_ratio * target).sum();
    let mut scale = (width - gaps) / content;
    if is_last {
        scale = scale.min(LAST_ROW_MAX_STRETCH);
    }
    let row_height = target * scale;
    let row_width = content * scale + gaps;

    let mut x = ((width - row_width) / 2.0).max(0.0);
    for &image in row {
        let w = image.aspect_ratio * row_height;
        records.push(LayoutRecord::new(image, Rect::new(x, y, w, row_height)));
        x += w + gap;
    }
    row_height
}
