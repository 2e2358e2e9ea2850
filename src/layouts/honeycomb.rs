use std::f64::consts::PI;

use super::{ClipPolygon, Layout, LayoutRecord};
use crate::config::MosaicConfig;
use crate::loader::LoadedImage;
use crate::math::{squareness, Rect};

/// Hexagons are a little smaller than the largest allowed image.
const HEX_SIZE_FACTOR: f64 = 0.8;
/// Neighbouring hexagons share a quarter of their width.
const HORIZONTAL_STEP: f64 = 0.75;
const VERTICAL_STEP: f64 = 0.85;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HexGrid {
    pub hex_width: f64,
    pub hex_height: f64,
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
    pub columns: usize,
}

impl HexGrid {
    pub fn new(config: &MosaicConfig) -> Self {
        let viewport = config.viewport();
        let max_width = viewport.width * config.max_image_width_ratio;
        let max_height = viewport.height * config.max_image_height_ratio;
        let hex_width = f64::min(max_width, max_height) * HEX_SIZE_FACTOR;
        let hex_height = hex_width * (PI / 3.0).sin();
        let horizontal_spacing = hex_width * HORIZONTAL_STEP;
        let vertical_spacing = hex_height * VERTICAL_STEP;
        let columns = ((viewport.width / horizontal_spacing).floor() as usize).max(1);
        HexGrid {
            hex_width,
            hex_height,
            horizontal_spacing,
            vertical_spacing,
            columns,
        }
    }

    /// Box of the `i`th hexagon; odd rows shift right by half a step.
    pub fn cell(&self, i: usize) -> (usize, Rect) {
        let row = i / self.columns;
        let col = i % self.columns;
        let offset = if row % 2 == 1 {
            self.horizontal_spacing / 2.0
        } else {
            0.0
        };
        let x = col as f64 * self.horizontal_spacing + offset;
        let y = row as f64 * self.vertical_spacing;
        (row, Rect::new(x, y, self.hex_width, self.hex_height))
    }
}

pub fn pack<'a>(images: &'a [LoadedImage], config: &MosaicConfig) -> Layout<'a> {
    let grid = HexGrid::new(config);
    let mut sorted: Vec<&LoadedImage> = images.iter().collect();
    sorted.sort_by(|a, b| squareness(a.aspect_ratio).total_cmp(&squareness(b.aspect_ratio)));

    let mut width: f64 = 0.0;
    let mut height: f64 = 0.0;
    let records = sorted
        .into_iter()
        .enumerate()
        .map(|(i, image)| {
            let (row, rect) = grid.cell(i);
            width = width.max(rect.right());
            height = height.max(rect.bottom());
            LayoutRecord {
                image,
                rect,
                z_index: (row % 2) as u32,
                clip: Some(ClipPolygon::hexagon()),
            }
        })
        .collect();

    Layout {
        records,
        width,
        height,
    }
}

#[cfg(test)]
mod test {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_hex_grid_geometry() {
        let config = MosaicConfig {
            viewport_width: 1000,
            viewport_height: 500,
            max_image_width_ratio: 0.4,
            max_image_height_ratio: 0.4,
            ..MosaicConfig::default()
        };
        let grid = HexGrid::new(&config);
        // min(400, 200) * 0.8
        assert!((grid.hex_width - 160.0).abs() < 1e-9);
        assert!((grid.hex_height - 160.0 * 0.866_025_403_784_438_6).abs() < 1e-9);
        assert!((grid.horizontal_spacing - 120.0).abs() < 1e-9);
        assert_eq!(grid.columns, 8);

        let (row, first) = grid.cell(0);
        assert_eq!(row, 0);
        assert_eq!((first.x, first.y), (0.0, 0.0));
        let (row, odd) = grid.cell(8);
        assert_eq!(row, 1);
        assert!((odd.x - 60.0).abs() < 1e-9);
        assert!((odd.y - grid.vertical_spacing).abs() < 1e-9);
        let (row, even) = grid.cell(17);
        assert_eq!(row, 2);
        assert!((even.x - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_records_are_clipped_hexagons_alternating_by_row() {
        let images = images(&[(100, 100); 20]);
        let config = MosaicConfig {
            viewport_width: 1000,
            viewport_height: 500,
            ..MosaicConfig::default()
        };
        let layout = pack(&images, &config);
        assert_eq!(layout.records.len(), 20);
        let columns = HexGrid::new(&config).columns;
        for (i, record) in layout.records.iter().enumerate() {
            assert_eq!(record.clip, Some(ClipPolygon::hexagon()));
            assert_eq!(record.z_index, ((i / columns) % 2) as u32);
        }
        let bottom = layout
            .records
            .iter()
            .map(|r| r.rect.bottom())
            .fold(0.0, f64::max);
        assert_eq!(layout.height, bottom);
    }

    #[test]
    fn test_narrow_viewport_keeps_one_column() {
        let images = images(&[(100, 100); 3]);
        let config = MosaicConfig {
            viewport_width: 10,
            viewport_height: 1000,
            max_image_width_ratio: 1.0,
            max_image_height_ratio: 1.0,
            ..MosaicConfig::default()
        };
        let layout = pack(&images, &config);
        assert!(layout.records.iter().all(|r| r.rect.x >= 0.0));
        assert_eq!(HexGrid::new(&config).columns, 1);
    }

    #[test]
    fn test_squarest_images_first() {
        let images = images(&[(300, 100), (100, 100), (100, 150)]);
        let layout = pack(&images, &MosaicConfig::default());
        let order: Vec<usize> = layout.records.iter().map(|r| r.image.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
