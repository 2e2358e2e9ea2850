use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use futures_util::future::join_all;
use image::RgbaImage;
use log::{debug, warn};

use crate::error::{ImageDecodeError, NoValidImagesError};
use crate::store::ImageRecord;

/// A decoded image with its natural dimensions, valid for one layout pass.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Position of the source in the loader's input.
    pub index: usize,
    pub url: String,
    pub caption: String,
    pub bitmap: Arc<RgbaImage>,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub area: u64,
}

impl LoadedImage {
    /// Returns `None` for a zero-sized bitmap.
    pub fn new(index: usize, url: String, caption: String, bitmap: RgbaImage) -> Option<Self> {
        let (width, height) = bitmap.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        Some(LoadedImage {
            index,
            url,
            caption,
            bitmap: Arc::new(bitmap),
            width,
            height,
            aspect_ratio: f64::from(width) / f64::from(height),
            area: u64::from(width) * u64::from(height),
        })
    }
}

/// Resolves a source string to encoded image bytes.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, index: usize, url: &str) -> Result<Vec<u8>, ImageDecodeError>;
}

/// Reads filesystem paths, `file://` URLs and base64 `data:` URIs. Relative paths resolve
/// against `base_dir`.
#[derive(Debug, Clone, Default)]
pub struct LocalFetch {
    pub base_dir: PathBuf,
}

impl LocalFetch {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        LocalFetch {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[async_trait]
impl Fetch for LocalFetch {
    async fn fetch(&self, index: usize, url: &str) -> Result<Vec<u8>, ImageDecodeError> {
        if let Some(rest) = url.strip_prefix("data:") {
            return decode_data_uri(rest).ok_or_else(|| ImageDecodeError::MalformedDataUri {
                index,
                source_url: abbreviate(url),
            });
        }
        let path = match url.strip_prefix("file://") {
            Some(path) => path,
            None if url.contains("://") => {
                return Err(ImageDecodeError::UnsupportedSource {
                    index,
                    source_url: url.to_owned(),
                })
            }
            None => url,
        };
        tokio::fs::read(self.resolve(path))
            .await
            .map_err(|error| ImageDecodeError::Fetch {
                index,
                source_url: url.to_owned(),
                error,
            })
    }
}

/// Decodes the part of a data URI after `data:`. Only base64 payloads carry raster bytes;
/// anything else is malformed.
fn decode_data_uri(rest: &str) -> Option<Vec<u8>> {
    let (header, payload) = rest.split_once(',')?;
    if !header.split(';').any(|param| param == "base64") {
        return None;
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()
}

/// Data URIs can be megabytes long; keep log lines readable.
fn abbreviate(url: &str) -> String {
    const MAX: usize = 48;
    match url.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &url[..end]),
        None => url.to_owned(),
    }
}

pub struct Loader {
    fetch: Arc<dyn Fetch>,
}

impl Loader {
    pub fn new(fetch: impl Fetch + 'static) -> Self {
        Loader {
            fetch: Arc::new(fetch),
        }
    }

    pub fn local(base_dir: impl Into<PathBuf>) -> Self {
        Loader::new(LocalFetch::new(base_dir))
    }

    /// Fetches and decodes every source concurrently. Sources that fail are logged and dropped;
    /// the survivors keep their input order.
    ///
    /// An empty input yields an empty output. If there was at least one source and none of them
    /// survived, returns [`NoValidImagesError`].
    pub async fn load(
        &self,
        sources: &[ImageRecord],
    ) -> Result<Vec<LoadedImage>, NoValidImagesError> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        debug!("loading {} images", sources.len());
        let results = join_all(
            sources
                .iter()
                .enumerate()
                .map(|(index, source)| self.load_one(index, source)),
        )
        .await;

        let mut loaded = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(image) => loaded.push(image),
                Err(e) => warn!("skipping {e}"),
            }
        }
        if loaded.is_empty() {
            return Err(NoValidImagesError {
                attempted: sources.len(),
            });
        }
        debug!("loaded {} of {} images", loaded.len(), sources.len());
        Ok(loaded)
    }

    async fn load_one(
        &self,
        index: usize,
        source: &ImageRecord,
    ) -> Result<LoadedImage, ImageDecodeError> {
        let bytes = self.fetch.fetch(index, &source.url).await?;
        let decoded = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map(|image| image.into_rgba8())
        })
        .await
        .map_err(|e| ImageDecodeError::Task {
            index,
            source_url: abbreviate(&source.url),
            reason: e.to_string(),
        })?
        .map_err(|error| ImageDecodeError::Decode {
            index,
            source_url: abbreviate(&source.url),
            error,
        })?;
        LoadedImage::new(index, source.url.clone(), source.caption.clone(), decoded).ok_or_else(
            || ImageDecodeError::Empty {
                index,
                source_url: abbreviate(&source.url),
            },
        )
    }
}
