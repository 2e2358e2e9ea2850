use thiserror::Error;

/// Why a single source could not become a [`LoadedImage`][crate::loader::LoadedImage].
///
/// Always recoverable: the loader logs it and drops the entry.
#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("image {index} ({source_url}): failed to read: {error}")]
    Fetch {
        index: usize,
        source_url: String,
        error: std::io::Error,
    },
    #[error("image {index} ({source_url}): failed to decode: {error}")]
    Decode {
        index: usize,
        source_url: String,
        error: image::ImageError,
    },
    #[error("image {index} ({source_url}): unsupported source")]
    UnsupportedSource { index: usize, source_url: String },
    #[error("image {index} ({source_url}): malformed data URI")]
    MalformedDataUri { index: usize, source_url: String },
    #[error("image {index} ({source_url}): decoded to an empty bitmap")]
    Empty { index: usize, source_url: String },
    #[error("image {index} ({source_url}): decode task failed: {reason}")]
    Task {
        index: usize,
        source_url: String,
        reason: String,
    },
}

/// None of the sources in a batch could be decoded.
#[derive(Debug, Error)]
#[error("no valid images to display ({attempted} attempted)")]
pub struct NoValidImagesError {
    pub attempted: usize,
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// The target canvas could not be allocated.
    #[error("cannot allocate a {width}x{height} canvas")]
    CanvasAllocation { width: u32, height: u32 },
    /// A single record could not be drawn; the pass continues without it.
    #[error("cannot draw image {index}: {reason}")]
    Image { index: usize, reason: String },
    #[error("failed to encode mosaic: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("index {index} is out of range for {len} images")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cache service is not running")]
    CacheClosed,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("viewport must be non-empty, got {width}x{height}")]
    EmptyViewport { width: u32, height: u32 },
    #[error("{name} must be within {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },
}

/// Failures that abort a whole layout pass.
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error(transparent)]
    NoValidImages(#[from] NoValidImagesError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
