//! Persistence for the image collection: a small JSON key-value store and the image library
//! kept under its `images` key.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::StoreError;

const IMAGES_KEY: &str = "images";

/// Shipped with the board, shown until the first upload.
pub const DEFAULT_IMAGES: &[&str] = &[
    "images/default1.jpg",
    "images/default2.jpg",
    "images/default3.jpg",
    "images/default4.jpg",
];

/// One entry of the collection, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub caption: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ImageRecord {
    /// A record stamped with the current time.
    pub fn new(url: impl Into<String>, caption: impl Into<String>) -> Self {
        ImageRecord {
            url: url.into(),
            caption: caption.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    fn legacy(url: String) -> Self {
        ImageRecord {
            url,
            caption: String::new(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// Stored shapes of an entry: a bare URL from older versions, or a full record whose fields may
/// be missing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireImageEntry {
    Url(String),
    Record {
        url: String,
        #[serde(default)]
        caption: Option<String>,
        #[serde(default, with = "time::serde::rfc3339::option")]
        timestamp: Option<OffsetDateTime>,
    },
}

impl From<WireImageEntry> for ImageRecord {
    fn from(entry: WireImageEntry) -> Self {
        match entry {
            WireImageEntry::Url(url) => ImageRecord::legacy(url),
            WireImageEntry::Record {
                url,
                caption,
                timestamp,
            } => ImageRecord {
                url,
                caption: caption.unwrap_or_default(),
                timestamp: timestamp.unwrap_or(OffsetDateTime::UNIX_EPOCH),
            },
        }
    }
}

/// JSON key-value storage, either held in memory or mirrored to a file on every write.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct Storage {
    path: Option<PathBuf>,
    values: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl Storage {
    pub fn in_memory() -> Self {
        Storage {
            path: None,
            values: Arc::default(),
        }
    }

    /// Opens the store at `path`; a missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("opened store {} ({} keys)", path.display(), values.len());
        Ok(Storage {
            path: Some(path),
            values: Arc::new(Mutex::new(values)),
        })
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.values.lock().await.keys().cloned().collect()
    }

    /// Stores `value` under `key`. The in-memory map only changes once the write succeeds.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        let mut next = values.clone();
        next.insert(key.to_owned(), value);
        self.flush(&next).await?;
        *values = next;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.flush(&next).await?;
        *values = next;
        Ok(())
    }

    async fn flush(&self, values: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(values)?;
        // Write-then-rename so a crash never leaves a torn file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// The image collection, with the default set standing in while it is empty.
#[derive(Debug, Clone)]
pub struct ImageLibrary {
    storage: Storage,
    defaults: Vec<String>,
}

impl ImageLibrary {
    pub fn new(storage: Storage) -> Self {
        ImageLibrary::with_defaults(storage, DEFAULT_IMAGES.iter().map(|s| s.to_string()))
    }

    pub fn with_defaults(storage: Storage, defaults: impl IntoIterator<Item = String>) -> Self {
        ImageLibrary {
            storage,
            defaults: defaults.into_iter().collect(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The stored collection, or the defaults if nothing is stored.
    pub async fn get_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let stored = self.stored().await?;
        if stored.is_empty() {
            return Ok(self.default_records());
        }
        Ok(stored)
    }

    pub async fn set_images(&self, images: &[ImageRecord]) -> Result<(), StoreError> {
        self.storage
            .set(IMAGES_KEY, serde_json::to_value(images)?)
            .await
    }

    /// Appends an image. The first upload replaces the default set.
    pub async fn add_image(
        &self,
        url: impl Into<String>,
        caption: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut images = self.stored().await?;
        images.push(ImageRecord::new(url, caption));
        self.set_images(&images).await
    }

    pub async fn remove_image(&self, index: usize) -> Result<ImageRecord, StoreError> {
        let mut images = self.stored().await?;
        check_index(index, images.len())?;
        let removed = images.remove(index);
        self.set_images(&images).await?;
        Ok(removed)
    }

    pub async fn update_caption(
        &self,
        index: usize,
        caption: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut images = self.stored().await?;
        check_index(index, images.len())?;
        images[index].caption = caption.into();
        self.set_images(&images).await
    }

    /// Swaps the images at positions `a` and `b`. Captions and timestamps stay with their image.
    pub async fn swap_images(&self, a: usize, b: usize) -> Result<(), StoreError> {
        let mut images = self.stored().await?;
        check_index(a, images.len())?;
        check_index(b, images.len())?;
        images.swap(a, b);
        self.set_images(&images).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.set_images(&[]).await
    }

    async fn stored(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let Some(value) = self.storage.get(IMAGES_KEY).await else {
            return Ok(Vec::new());
        };
        let entries: Vec<WireImageEntry> = serde_json::from_value(value)?;
        Ok(entries.into_iter().map(ImageRecord::from).collect())
    }

    fn default_records(&self) -> Vec<ImageRecord> {
        self.defaults
            .iter()
            .map(|url| ImageRecord::legacy(url.clone()))
            .collect()
    }
}

fn check_index(index: usize, len: usize) -> Result<(), StoreError> {
    if index < len {
        Ok(())
    } else {
        Err(StoreError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn urls(records: &[ImageRecord]) -> Vec<&str> {
        records.iter().map(|r| r.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_defaults_until_first_upload() {
        let library = ImageLibrary::new(Storage::in_memory());
        let images = library.get_images().await.unwrap();
        assert_eq!(urls(&images), DEFAULT_IMAGES);

        library.add_image("mine.png", "goal").await.unwrap();
        let images = library.get_images().await.unwrap();
        assert_eq!(urls(&images), vec!["mine.png"]);
        assert_eq!(images[0].caption, "goal");
    }

    #[tokio::test]
    async fn test_legacy_entries_are_normalized() {
        let storage = Storage::in_memory();
        storage
            .set(
                IMAGES_KEY,
                json!([
                    "data:image/png;base64,AAAA",
                    {"url": "b.png", "caption": "beach"},
                    {"url": "c.png", "caption": "city", "timestamp": "2024-03-01T12:00:00Z"},
                ]),
            )
            .await
            .unwrap();
        let images = ImageLibrary::new(storage).get_images().await.unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].caption, "");
        assert_eq!(images[0].timestamp, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(images[1].caption, "beach");
        assert_eq!(images[2].timestamp.year(), 2024);
    }

    #[tokio::test]
    async fn test_caption_remove_and_swap() {
        let library = ImageLibrary::new(Storage::in_memory());
        for url in ["a", "b", "c", "d"] {
            library.add_image(url, "").await.unwrap();
        }
        library.update_caption(0, "ant").await.unwrap();
        library.swap_images(0, 3).await.unwrap();
        let images = library.get_images().await.unwrap();
        assert_eq!(urls(&images), vec!["d", "b", "c", "a"]);
        assert_eq!(images[3].caption, "ant");
        assert_eq!(images[0].caption, "");

        library.swap_images(2, 2).await.unwrap();
        assert_eq!(urls(&library.get_images().await.unwrap()), vec!["d", "b", "c", "a"]);

        let removed = library.remove_image(3).await.unwrap();
        assert_eq!(removed.url, "a");
        assert_eq!(removed.caption, "ant");
        assert_eq!(urls(&library.get_images().await.unwrap()), vec!["d", "b", "c"]);

        assert!(matches!(
            library.remove_image(3).await,
            Err(StoreError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            library.swap_images(0, 9).await,
            Err(StoreError::IndexOutOfRange { index: 9, len: 3 })
        ));
    }

    #[tokio::test]
    async fn test_clear_restores_defaults() {
        let library = ImageLibrary::with_defaults(Storage::in_memory(), vec!["x.png".to_owned()]);
        library.add_image("a.png", "").await.unwrap();
        library.clear().await.unwrap();
        assert_eq!(urls(&library.get_images().await.unwrap()), vec!["x.png"]);
    }

    #[tokio::test]
    async fn test_file_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        {
            let library = ImageLibrary::new(Storage::open(&path).await.unwrap());
            library.add_image("kept.png", "still here").await.unwrap();
        }
        let storage = Storage::open(&path).await.unwrap();
        assert_eq!(storage.keys().await, vec![IMAGES_KEY.to_owned()]);
        let images = ImageLibrary::new(storage).get_images().await.unwrap();
        assert_eq!(images[0].url, "kept.png");
        assert_eq!(images[0].caption, "still here");
    }

    #[tokio::test]
    async fn test_delete_key() {
        let storage = Storage::in_memory();
        storage.set("k", json!(1)).await.unwrap();
        assert_eq!(storage.get("k").await, Some(json!(1)));
        storage.delete("k").await.unwrap();
        assert_eq!(storage.get("k").await, None);
        storage.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_values_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let storage = Storage::open(&path).await.unwrap();
        storage.set("kept", json!(1)).await.unwrap();

        // A directory where the temporary file goes makes every write fail.
        std::fs::create_dir(dir.path().join("board.json.tmp")).unwrap();
        assert!(storage.set("k", json!(1)).await.is_err());
        assert_eq!(storage.get("k").await, None);
        assert!(storage.delete("kept").await.is_err());
        assert_eq!(storage.get("kept").await, Some(json!(1)));

        let reopened = Storage::open(&path).await.unwrap();
        assert_eq!(reopened.keys().await, storage.keys().await);
    }
}
