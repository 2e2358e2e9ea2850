//! Turns a [`Layout`] into something a host can show: positioned element descriptions for a
//! document, or a composited bitmap.

use std::str::FromStr;

use base64::Engine;
use image::imageops::{self, FilterType};
use image::{ImageEncoder, RgbaImage};
use log::{debug, warn};
use raqote::{DrawOptions, DrawTarget, Image, PathBuilder, SolidSource};
use serde::Serialize;

use crate::config::MosaicConfig;
use crate::error::RenderError;
use crate::layouts::{Layout, LayoutRecord};

/// Largest canvas side most platforms will allocate.
pub const MAX_CANVAS_DIMENSION: f64 = 16384.0;

/// Shown by the host in place of an image that fails to load.
pub const PLACEHOLDER_SVG: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' \
viewBox='0 0 100 100'%3E%3Crect width='100' height='100' fill='%23444'/%3E%3Cpath \
d='M30 65l15-20 10 12 8-9 12 17z' fill='%23888'/%3E%3C/svg%3E";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl FromStr for Rgb {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let bytes = hex::decode(s)?;
        let rgb = <[u8; 3]>::try_from(bytes)
            .map_err(|b| anyhow::anyhow!("expected 3 color bytes, got {}", b.len()))?;
        Ok(Rgb(rgb))
    }
}

/// One absolutely positioned element of the document rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub src: String,
    pub caption: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<String>,
    pub object_fit: &'static str,
    pub fallback: &'static str,
}

impl Placement {
    fn from_record(record: &LayoutRecord) -> Self {
        Placement {
            src: record.image.url.clone(),
            caption: record.image.caption.clone(),
            left: record.rect.x,
            top: record.rect.y,
            width: record.rect.width,
            height: record.rect.height,
            z_index: record.z_index,
            clip_path: record.clip.as_ref().map(|clip| clip.to_css()),
            object_fit: "cover",
            fallback: PLACEHOLDER_SVG,
        }
    }
}

/// Document rendition of `layout`, in painting order.
pub fn placements(layout: &Layout) -> Vec<Placement> {
    layout
        .paint_order()
        .into_iter()
        .map(Placement::from_record)
        .collect()
}

/// Physical pixels per layout pixel: the device pixel ratio, reduced if the canvas would exceed
/// [`MAX_CANVAS_DIMENSION`] on either side.
pub fn canvas_scale(config: &MosaicConfig) -> f64 {
    config
        .device_pixel_ratio
        .min(MAX_CANVAS_DIMENSION / f64::from(config.viewport_width))
        .min(MAX_CANVAS_DIMENSION / f64::from(config.viewport_height))
}

/// A composited mosaic.
pub struct RenderedMosaic {
    pub canvas: DrawTarget,
    pub scale: f64,
    /// Records that made it onto the canvas.
    pub drawn: usize,
}

impl RenderedMosaic {
    pub fn width(&self) -> u32 {
        self.canvas.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.canvas.height() as u32
    }

    /// Straight-alpha copy of the canvas.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width(), self.height());
        for (px, &argb) in out.pixels_mut().zip(self.canvas.get_data()) {
            px.0 = unpremultiply(argb);
        }
        out
    }

    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let rgba = self.to_rgba_image();
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf).write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            image::ColorType::Rgba8,
        )?;
        Ok(buf)
    }

    pub fn to_data_uri(&self) -> Result<String, RenderError> {
        Ok(png_data_uri(&self.to_png()?))
    }
}

/// PNG bytes as a `data:` URI, the form the mosaic cache stores.
pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// Composites `layout` onto a single canvas the size of the viewport at [`canvas_scale`].
///
/// Records are painted in ascending `z_index`. A record that cannot be drawn is logged and left
/// out; only failing to allocate the canvas itself is an error.
pub fn render_pixels(layout: &Layout, config: &MosaicConfig) -> Result<RenderedMosaic, RenderError> {
    let scale = canvas_scale(config);
    let width = (f64::from(config.viewport_width) * scale).round().max(1.0) as u32;
    let height = (f64::from(config.viewport_height) * scale).round().max(1.0) as u32;
    let pixels = allocate(width as usize * height as usize)
        .ok_or(RenderError::CanvasAllocation { width, height })?;
    let mut canvas = DrawTarget::from_backing(width as i32, height as i32, pixels);

    let Rgb([r, g, b]) = config.background;
    canvas.clear(SolidSource::from_unpremultiplied_argb(0xff, r, g, b));

    let filter = if config.no_smoothing {
        FilterType::Nearest
    } else {
        FilterType::Lanczos3
    };
    let mut drawn = 0;
    for record in layout.paint_order() {
        match draw_record(&mut canvas, record, scale, filter) {
            Ok(true) => drawn += 1,
            Ok(false) => debug!("image {} lies outside the canvas", record.image.index),
            Err(e) => warn!("{e}"),
        }
    }
    debug!(
        "rendered {drawn} of {} records onto {width}x{height}",
        layout.records.len()
    );
    Ok(RenderedMosaic {
        canvas,
        scale,
        drawn,
    })
}

fn allocate(len: usize) -> Option<Vec<u32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize(len, 0);
    Some(buf)
}

/// Returns `Ok(false)` when the record falls entirely off the canvas.
fn draw_record(
    canvas: &mut DrawTarget,
    record: &LayoutRecord,
    scale: f64,
    filter: FilterType,
) -> Result<bool, RenderError> {
    let index = record.image.index;
    let rect = record.rect.scaled(scale);
    let x0 = rect.x.round();
    let y0 = rect.y.round();
    let w = (rect.right().round() - x0).max(1.0);
    let h = (rect.bottom().round() - y0).max(1.0);
    if x0 >= f64::from(canvas.width())
        || y0 >= f64::from(canvas.height())
        || x0 + w <= 0.0
        || y0 + h <= 0.0
    {
        return Ok(false);
    }
    if w > MAX_CANVAS_DIMENSION || h > MAX_CANVAS_DIMENSION {
        return Err(RenderError::Image {
            index,
            reason: format!("target size {w}x{h} is too large"),
        });
    }

    let tile = cover(&record.image.bitmap, w as u32, h as u32, filter);
    let data = premultiplied(&tile).ok_or_else(|| RenderError::Image {
        index,
        reason: "out of memory for offscreen buffer".to_owned(),
    })?;
    let image = Image {
        width: tile.width() as i32,
        height: tile.height() as i32,
        data: &data,
    };

    let clip = record.clip.as_ref().map(|clip| {
        let mut pb = PathBuilder::new();
        for (i, (x, y)) in clip.points_in(&rect).enumerate() {
            if i == 0 {
                pb.move_to(x as f32, y as f32);
            } else {
                pb.line_to(x as f32, y as f32);
            }
        }
        pb.close();
        pb.finish()
    });
    if let Some(path) = &clip {
        canvas.push_clip(path);
    }
    canvas.draw_image_at(x0 as f32, y0 as f32, &image, &DrawOptions::new());
    if clip.is_some() {
        canvas.pop_clip();
    }
    Ok(true)
}

/// Crops `bitmap` to the aspect ratio of `width x height` about its centre, then resamples it to
/// exactly that size.
fn cover(bitmap: &RgbaImage, width: u32, height: u32, filter: FilterType) -> RgbaImage {
    let (sw, sh) = bitmap.dimensions();
    let target = f64::from(width) / f64::from(height);
    let (cw, ch) = if f64::from(sw) / f64::from(sh) > target {
        (((f64::from(sh) * target).round() as u32).clamp(1, sw), sh)
    } else {
        (sw, ((f64::from(sw) / target).round() as u32).clamp(1, sh))
    };
    let cropped = imageops::crop_imm(bitmap, (sw - cw) / 2, (sh - ch) / 2, cw, ch).to_image();
    if cropped.dimensions() == (width, height) {
        return cropped;
    }
    imageops::resize(&cropped, width, height, filter)
}

fn premultiplied(tile: &RgbaImage) -> Option<Vec<u32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(tile.width() as usize * tile.height() as usize)
        .ok()?;
    data.extend(tile.pixels().map(|px| {
        let [r, g, b, a] = px.0;
        let mul = |c: u8| (u32::from(c) * u32::from(a) + 127) / 255;
        (u32::from(a) << 24) | (mul(r) << 16) | (mul(g) << 8) | mul(b)
    }));
    Some(data)
}

fn unpremultiply(argb: u32) -> [u8; 4] {
    let [b, g, r, a] = argb.to_le_bytes();
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let div = |c: u8| ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
    [div(r), div(g), div(b), a]
}
