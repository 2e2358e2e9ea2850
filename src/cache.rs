//! Holds the most recently rendered mosaic so a host can paint it immediately on start-up while
//! a fresh one is computed.

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::StoreError;
use crate::store::Storage;

const CACHE_KEY: &str = "cachedMosaic";

enum CacheRequest {
    Get {
        reply: oneshot::Sender<Option<String>>,
    },
    Set {
        encoded: String,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// Handle to the cache task. Clones talk to the same task.
#[derive(Debug, Clone)]
pub struct CacheClient {
    sender: mpsc::UnboundedSender<CacheRequest>,
}

impl std::fmt::Debug for CacheRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheRequest::Get { .. } => f.write_str("Get"),
            CacheRequest::Set { encoded, .. } => write!(f, "Set({} bytes)", encoded.len()),
        }
    }
}

impl CacheClient {
    /// The cached mosaic as a `data:image/png;base64,` URI, if one has been stored.
    pub async fn get_cached_mosaic(&self) -> Result<Option<String>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(CacheRequest::Get { reply })
            .map_err(|_| StoreError::CacheClosed)?;
        rx.await.map_err(|_| StoreError::CacheClosed)
    }

    pub async fn set_cached_mosaic(&self, encoded: String) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(CacheRequest::Set { encoded, reply })
            .map_err(|_| StoreError::CacheClosed)?;
        rx.await.map_err(|_| StoreError::CacheClosed)?
    }
}

/// Starts the cache task on the current runtime. With a `storage`, the cache starts from its
/// persisted value and every update is written back; without one it lives only as long as the
/// process.
///
/// The task exits once every [`CacheClient`] is dropped.
pub fn spawn(storage: Option<Storage>) -> CacheClient {
    let (sender, mut rx) = mpsc::unbounded_channel::<CacheRequest>();
    tokio::spawn(async move {
        let mut cached: Option<String> = match &storage {
            Some(storage) => match storage.get(CACHE_KEY).await {
                Some(Value::String(encoded)) => Some(encoded),
                Some(other) => {
                    warn!("ignoring malformed cached mosaic: {other}");
                    None
                }
                None => None,
            },
            None => None,
        };
        while let Some(request) = rx.recv().await {
            debug!("cache request: {request:?}");
            match request {
                CacheRequest::Get { reply } => {
                    let _ = reply.send(cached.clone());
                }
                CacheRequest::Set { encoded, reply } => {
                    let result = match &storage {
                        Some(storage) => storage.set(CACHE_KEY, Value::String(encoded.clone())).await,
                        None => Ok(()),
                    };
                    if result.is_ok() {
                        cached = Some(encoded);
                    }
                    let _ = reply.send(result);
                }
            }
        }
        debug!("cache task stopped");
    });
    CacheClient { sender }
}
