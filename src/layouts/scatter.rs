use super::{by_area_then_squareness, Layout, LayoutRecord};
use crate::config::MosaicConfig;
use crate::loader::LoadedImage;
use crate::math::{clamp_span, contain_scale, dist, lerp, Rect};
use crate::rand::Rng;
use crate::zones::Zones;

const ZONE_COLS: usize = 3;
const ZONE_ROWS: usize = 3;

/// The largest images are "features": drawn bigger and pulled towards the centre.
const FEATURE_COUNT: usize = 2;
const FEATURE_SCALE: f64 = 1.4;
const BASE_SCALE: f64 = 0.9;
const FEATURE_CENTER_PULL: f64 = 0.5;

/// Relative jitter on scale, and on position as a fraction of the zone size.
const SCALE_JITTER: f64 = 0.18;
const POSITION_JITTER: f64 = 0.3;

/// Margin kept clear around the canvas, as a fraction of its shorter side.
const BORDER_RATIO: f64 = 0.02;

/// Lays images out as a loose collage. Not deterministic unless `rng` is seeded identically.
///
/// `z_index` ranks records by distance from the canvas centre, farthest lowest, so painting in
/// ascending order puts central images on top.
pub fn pack<'a>(images: &'a [LoadedImage], config: &MosaicConfig, rng: &mut Rng) -> Layout<'a> {
    let canvas = config.viewport();
    let canvas_center = canvas.center();
    let zones = Zones::new(canvas, ZONE_COLS, ZONE_ROWS);
    let sorted = by_area_then_squareness(images);

    let by_centrality = zones.by_centrality();
    let feature_count = FEATURE_COUNT.min(sorted.len());
    let feature_zones = &by_centrality[..feature_count];
    let other_zones = rng.shuffle(by_centrality[feature_count..].iter().copied());

    let border = BORDER_RATIO * f64::min(canvas.width, canvas.height);
    let inner = Rect::new(
        canvas.x + border,
        canvas.y + border,
        canvas.width - 2.0 * border,
        canvas.height - 2.0 * border,
    );

    let mut records: Vec<LayoutRecord> = sorted
        .iter()
        .enumerate()
        .map(|(i, &image)| {
            let is_feature = i < feature_count;
            let zone = if is_feature {
                zones.zone(feature_zones[i])
            } else {
                zones.zone(other_zones[(i - feature_count) % other_zones.len()])
            };

            let (w, h) = (f64::from(image.width), f64::from(image.height));
            let base = if is_feature { FEATURE_SCALE } else { BASE_SCALE };
            let mut scale = contain_scale(w, h, zone.width * base, zone.height * base)
                * (1.0 + rng.jitter(SCALE_JITTER));
            // Never larger than the area inside the border.
            scale = scale.min(contain_scale(w, h, inner.width, inner.height));
            let (w, h) = (w * scale, h * scale);

            let (mut cx, mut cy) = zone.center();
            if is_feature {
                cx = lerp(cx, canvas_center.0, FEATURE_CENTER_PULL);
                cy = lerp(cy, canvas_center.1, FEATURE_CENTER_PULL);
            }
            cx += rng.jitter(POSITION_JITTER) * zone.width;
            cy += rng.jitter(POSITION_JITTER) * zone.height;

            let x = clamp_span(cx - w / 2.0, w, inner.x, inner.right());
            let y = clamp_span(cy - h / 2.0, h, inner.y, inner.bottom());
            LayoutRecord::new(image, Rect::new(x, y, w, h))
        })
        .collect();

    // Painter's order: farthest from the centre first.
    let mut by_distance: Vec<(usize, f64)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (i, dist(r.rect.center(), canvas_center)))
        .collect();
    by_distance.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (rank, (i, _)) in by_distance.into_iter().enumerate() {
        records[i].z_index = rank as u32;
    }

    Layout {
        records,
        width: canvas.width,
        height: canvas.height,
    }
}
