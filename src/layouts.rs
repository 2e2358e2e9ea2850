use serde::{Deserialize, Serialize};

use super::config::MosaicConfig;
use super::loader::LoadedImage;
use super::math::Rect;
use super::rand::Rng;

mod grid;
mod honeycomb;
mod rows;
mod scatter;

pub use grid::{grid_dimensions, weighted_aspect_ratio};
pub use rows::target_row_height;

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pattern {
    /// Approximately square grid with adaptive overlap.
    #[default]
    Grid,
    /// Offset rows of hexagon-clipped tiles.
    Honeycomb,
    /// Rows scaled to fill the viewport width exactly.
    RowJustified,
    /// Randomly perturbed collage over a coarse zone grid.
    Scatter,
}

impl Pattern {
    /// Whether two passes over the same input produce the same layout.
    pub fn is_deterministic(self) -> bool {
        !matches!(self, Pattern::Scatter)
    }
}

/// A clip shape in fractions of the record's own box, `(0, 0)` top-left to `(1, 1)`
/// bottom-right.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPolygon(pub Vec<(f64, f64)>);

impl ClipPolygon {
    /// Flat-topped hexagon touching all four sides of its box.
    pub fn hexagon() -> Self {
        ClipPolygon(vec![
            (0.25, 0.0),
            (0.75, 0.0),
            (1.0, 0.5),
            (0.75, 1.0),
            (0.25, 1.0),
            (0.0, 0.5),
        ])
    }

    /// The polygon's vertices placed on `rect`.
    pub fn points_in(&self, rect: &Rect) -> impl Iterator<Item = (f64, f64)> + '_ {
        let rect = *rect;
        self.0
            .iter()
            .map(move |&(u, v)| (rect.x + u * rect.width, rect.y + v * rect.height))
    }

    /// As a CSS `clip-path` value.
    pub fn to_css(&self) -> String {
        let points: Vec<String> = self
            .0
            .iter()
            .map(|(u, v)| format!("{}% {}%", u * 100.0, v * 100.0))
            .collect();
        format!("polygon({})", points.join(", "))
    }
}

/// Where and how large one image is drawn.
#[derive(Debug, Clone)]
pub struct LayoutRecord<'a> {
    pub image: &'a LoadedImage,
    pub rect: Rect,
    /// Stacking order; higher is drawn later.
    pub z_index: u32,
    pub clip: Option<ClipPolygon>,
}

impl<'a> LayoutRecord<'a> {
    pub fn new(image: &'a LoadedImage, rect: Rect) -> Self {
        LayoutRecord {
            image,
            rect,
            z_index: 0,
            clip: None,
        }
    }

    /// Relative deviation of the drawn aspect ratio from the image's natural one.
    pub fn aspect_error(&self) -> f64 {
        let drawn = self.rect.width / self.rect.height;
        (drawn - self.image.aspect_ratio).abs() / self.image.aspect_ratio
    }
}

/// The records of one pass, all in the same coordinate space (viewport CSS pixels).
#[derive(Debug, Clone)]
pub struct Layout<'a> {
    pub records: Vec<LayoutRecord<'a>>,
    /// Extent of the laid-out content. Equal to the viewport for grid and scatter; justified rows
    /// and honeycombs may run past its bottom.
    pub width: f64,
    pub height: f64,
}

impl<'a> Layout<'a> {
    /// Lays out `images` with the configured pattern. Only [`Pattern::Scatter`] draws from
    /// `rng`.
    ///
    /// # Panics
    ///
    /// Panics if `images` is empty, or if a packer produces a non-finite or empty box (a bug in
    /// the packer, never a property of the input).
    pub fn build(images: &'a [LoadedImage], config: &MosaicConfig, rng: &mut Rng) -> Self {
        assert!(!images.is_empty(), "cannot lay out zero images");
        let layout = match config.pattern {
            Pattern::Grid => grid::pack(images, config),
            Pattern::RowJustified => rows::pack(images, config),
            Pattern::Honeycomb => honeycomb::pack(images, config),
            Pattern::Scatter => scatter::pack(images, config, rng),
        };
        for record in &layout.records {
            let r = &record.rect;
            assert!(
                [r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite())
                    && r.width > 0.0
                    && r.height > 0.0,
                "{:?} produced an invalid box for image {}: {:?}",
                config.pattern,
                record.image.index,
                r
            );
        }
        log::debug!(
            "{:?} layout: {} records over {:.0}x{:.0}",
            config.pattern,
            layout.records.len(),
            layout.width,
            layout.height
        );
        layout
    }

    /// Records in painting order: ascending `z_index`, ties in layout order.
    pub fn paint_order(&self) -> Vec<&LayoutRecord<'a>> {
        let mut order: Vec<&LayoutRecord<'a>> = self.records.iter().collect();
        order.sort_by_key(|record| record.z_index);
        order
    }
}

/// Sorts by area (largest first), then by closeness to square.
fn by_area_then_squareness(images: &[LoadedImage]) -> Vec<&LoadedImage> {
    let mut sorted: Vec<&LoadedImage> = images.iter().collect();
    sorted.sort_by(|a, b| {
        b.area.cmp(&a.area).then_with(|| {
            super::math::squareness(a.aspect_ratio).total_cmp(&super::math::squareness(b.aspect_ratio))
        })
    });
    sorted
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{Rgba, RgbaImage};

    use crate::loader::LoadedImage;

    pub fn image(index: usize, width: u32, height: u32) -> LoadedImage {
        let bitmap = RgbaImage::from_pixel(width, height, Rgba([90, 120, 200, 255]));
        LoadedImage::new(index, format!("{index}.png"), String::new(), bitmap)
            .expect("non-empty test image")
    }

    pub fn images(sizes: &[(u32, u32)]) -> Vec<LoadedImage> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| image(i, w, h))
            .collect()
    }

    /// Natural sizes from the six-image reference scenario.
    pub const SIX: &[(u32, u32)] = &[
        (800, 600),
        (600, 800),
        (1024, 768),
        (768, 1024),
        (400, 400),
        (1200, 300),
    ];
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;
    use crate::rand::Seed;

    #[test]
    fn test_hexagon_css() {
        assert_eq!(
            ClipPolygon::hexagon().to_css(),
            "polygon(25% 0%, 75% 0%, 100% 50%, 75% 100%, 25% 100%, 0% 50%)"
        );
    }

    #[test]
    fn test_hexagon_points_in_rect() {
        let points: Vec<_> = ClipPolygon::hexagon()
            .points_in(&Rect::new(10.0, 20.0, 100.0, 80.0))
            .collect();
        assert_eq!(points[0], (35.0, 20.0));
        assert_eq!(points[2], (110.0, 60.0));
        assert_eq!(points[5], (10.0, 60.0));
    }

    #[test]
    fn test_every_pattern_lays_out_every_image() {
        let images = images(SIX);
        let mut rng = Rng::from_seed(&Seed([7; 32]));
        for pattern in [
            Pattern::Grid,
            Pattern::Honeycomb,
            Pattern::RowJustified,
            Pattern::Scatter,
        ] {
            let config = MosaicConfig {
                pattern,
                ..MosaicConfig::default()
            };
            let layout = Layout::build(&images, &config, &mut rng);
            assert_eq!(layout.records.len(), images.len(), "{pattern:?}");
            let mut seen: Vec<usize> = layout.records.iter().map(|r| r.image.index).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..images.len()).collect::<Vec<_>>(), "{pattern:?}");
        }
    }

    #[test]
    #[should_panic(expected = "zero images")]
    fn test_empty_input_is_a_caller_bug() {
        let mut rng = Rng::from_seed(&Seed([0; 32]));
        Layout::build(&[], &MosaicConfig::default(), &mut rng);
    }

    #[test]
    fn test_paint_order_is_stable() {
        let images = images(&[(10, 10), (10, 10), (10, 10)]);
        let mut records: Vec<LayoutRecord> = images
            .iter()
            .map(|image| LayoutRecord::new(image, Rect::new(0.0, 0.0, 1.0, 1.0)))
            .collect();
        records[0].z_index = 2;
        let layout = Layout {
            records,
            width: 1.0,
            height: 1.0,
        };
        let order: Vec<usize> = layout.paint_order().iter().map(|r| r.image.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_only_scatter_is_random() {
        assert!(Pattern::Grid.is_deterministic());
        assert!(Pattern::RowJustified.is_deterministic());
        assert!(Pattern::Honeycomb.is_deterministic());
        assert!(!Pattern::Scatter.is_deterministic());
    }
}
