use log::info;

use crate::error::ConfigError;
use crate::layouts::Pattern;
use crate::math::Rect;
use crate::rand::Seed;
use crate::render::Rgb;

/// Runtime options for one layout pass, supplied by the host.
#[derive(Debug, Clone, clap::Args)]
pub struct MosaicConfig {
    /// Layout strategy.
    #[clap(long, value_enum, default_value_t = Pattern::Grid)]
    pub pattern: Pattern,

    /// Viewport width in CSS pixels.
    #[clap(long, default_value_t = 1920)]
    pub viewport_width: u32,

    /// Viewport height in CSS pixels.
    #[clap(long, default_value_t = 1080)]
    pub viewport_height: u32,

    /// Fraction of each cell (or row height, for justified rows) left as padding.
    #[clap(long, default_value_t = 0.0)]
    pub padding_ratio: f64,

    /// Largest image width as a fraction of the viewport width.
    #[clap(long, default_value_t = 0.4)]
    pub max_image_width_ratio: f64,

    /// Largest image height as a fraction of the viewport height.
    #[clap(long, default_value_t = 0.4)]
    pub max_image_height_ratio: f64,

    /// Physical pixels per CSS pixel when rendering a bitmap.
    #[clap(long, default_value_t = 1.0)]
    pub device_pixel_ratio: f64,

    /// Seed for the scatter pattern. A fresh one is drawn when absent.
    #[clap(long)]
    pub seed: Option<Seed>,

    /// Canvas background as `#rrggbb`.
    #[clap(long, default_value = "#000000")]
    pub background: Rgb,

    /// Resample with nearest-neighbour instead of Lanczos when compositing.
    #[clap(long)]
    pub no_smoothing: bool,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        MosaicConfig {
            pattern: Pattern::Grid,
            viewport_width: 1920,
            viewport_height: 1080,
            padding_ratio: 0.0,
            max_image_width_ratio: 0.4,
            max_image_height_ratio: 0.4,
            device_pixel_ratio: 1.0,
            seed: None,
            background: Rgb([0, 0, 0]),
            no_smoothing: false,
        }
    }
}

impl MosaicConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::EmptyViewport {
                width: self.viewport_width,
                height: self.viewport_height,
            });
        }
        check(
            "padding ratio",
            "[0, 1)",
            self.padding_ratio,
            |v| (0.0..1.0).contains(&v),
        )?;
        check(
            "max image width ratio",
            "(0, 1]",
            self.max_image_width_ratio,
            |v| v > 0.0 && v <= 1.0,
        )?;
        check(
            "max image height ratio",
            "(0, 1]",
            self.max_image_height_ratio,
            |v| v > 0.0 && v <= 1.0,
        )?;
        check(
            "device pixel ratio",
            "(0, inf)",
            self.device_pixel_ratio,
            |v| v.is_finite() && v > 0.0,
        )?;
        Ok(())
    }

    pub fn viewport(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.viewport_width),
            f64::from(self.viewport_height),
        )
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.viewport_width) / f64::from(self.viewport_height)
    }

    /// The configured seed, or a fresh one. A fresh seed for a randomized pattern is logged so
    /// the layout can be reproduced with `--seed`.
    pub fn seed_or_random(&self) -> Seed {
        if let Some(seed) = self.seed {
            return seed;
        }
        let seed = Seed::random();
        if !self.pattern.is_deterministic() {
            info!("{:?} seed: {seed}", self.pattern);
        }
        seed
    }
}

fn check(
    name: &'static str,
    range: &'static str,
    value: f64,
    ok: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, range, value })
    }
}
