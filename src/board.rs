use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::cache::CacheClient;
use crate::config::MosaicConfig;
use crate::error::{MosaicError, StoreError};
use crate::layouts::{Layout, Pattern};
use crate::loader::Loader;
use crate::pass::{debounce, Generation, Generations, Surface};
use crate::rand::{Rng, Seed};
use crate::render::{placements, png_data_uri, render_pixels, Placement};
use crate::store::ImageLibrary;

/// Everything one completed pass produced, in both renditions.
#[derive(Debug, Clone)]
pub struct Frame {
    pub generation: Generation,
    pub pattern: Pattern,
    pub seed: Seed,
    pub placements: Vec<Placement>,
    /// Composited mosaic, PNG encoded.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn data_uri(&self) -> String {
        png_data_uri(&self.png)
    }
}

#[derive(Debug, Clone)]
pub enum PassOutcome {
    /// There was nothing to lay out.
    Empty,
    Rendered(Arc<Frame>),
    /// A newer pass started before this one finished; its result was dropped.
    Stale,
}

pub struct Board {
    library: ImageLibrary,
    loader: Loader,
    cache: CacheClient,
    generations: Generations,
    surface: Surface<Arc<Frame>>,
}

impl Board {
    pub fn new(library: ImageLibrary, loader: Loader, cache: CacheClient) -> Self {
        Board {
            library,
            loader,
            cache,
            generations: Generations::new(),
            surface: Surface::new(),
        }
    }

    /// The frame currently on display.
    pub fn current(&self) -> Option<Arc<Frame>> {
        self.surface.current()
    }

    /// The mosaic cached by an earlier run, for painting before the first pass completes.
    pub async fn cached_preview(&self) -> Result<Option<String>, StoreError> {
        self.cache.get_cached_mosaic().await
    }

    /// Runs one full pass: read the library, load, lay out, render, then show and cache the
    /// result unless a newer pass has started meanwhile.
    pub async fn regenerate(&self, config: &MosaicConfig) -> Result<PassOutcome, MosaicError> {
        config.validate()?;
        let generation = self.generations.begin();
        debug!("pass {generation:?}: {:?}", config.pattern);

        let sources = self.library.get_images().await?;
        let images = self.loader.load(&sources).await?;
        if images.is_empty() {
            info!("no images to display");
            return Ok(PassOutcome::Empty);
        }
        if !self.generations.is_current(generation) {
            debug!("pass {generation:?} superseded after loading");
            return Ok(PassOutcome::Stale);
        }

        let seed = config.seed_or_random();
        let frame = {
            let mut rng = Rng::from_seed(&seed);
            let layout = Layout::build(&images, config, &mut rng);
            let mosaic = render_pixels(&layout, config)?;
            Frame {
                generation,
                pattern: config.pattern,
                seed,
                placements: placements(&layout),
                png: mosaic.to_png()?,
                width: mosaic.width(),
                height: mosaic.height(),
            }
        };

        let frame = Arc::new(frame);
        if !self
            .surface
            .commit(&self.generations, generation, Arc::clone(&frame))
        {
            return Ok(PassOutcome::Stale);
        }
        if let Err(e) = self.cache.set_cached_mosaic(frame.data_uri()).await {
            warn!("could not cache mosaic: {e}");
        }
        Ok(PassOutcome::Rendered(frame))
    }

    /// Regenerates once per burst of configuration changes (typically viewport resizes) until
    /// the sender goes away. Failed passes are logged and do not stop the loop.
    pub async fn run(&self, mut changes: mpsc::UnboundedReceiver<MosaicConfig>, quiet: Duration) {
        while let Some(config) = debounce(&mut changes, quiet).await {
            match self.regenerate(&config).await {
                Ok(PassOutcome::Rendered(frame)) => {
                    debug!("showing {:?} ({}x{})", frame.generation, frame.width, frame.height)
                }
                Ok(outcome) => debug!("pass ended: {outcome:?}"),
                Err(e) => warn!("{e}"),
            }
        }
    }
}
