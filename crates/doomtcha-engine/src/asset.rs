//! Asset fetching and validation.
//!
//! The game asset is fetched through an [`AssetSource`] and checked for the
//! `IWAD` magic before anything else sees the bytes. Validation is
//! deliberately shallow: deeper parsing is the runtime's job.

use std::{io, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Magic tag expected in the first four bytes of a valid asset.
pub const ASSET_MAGIC: [u8; 4] = *b"IWAD";

/// The fetched binary payload, validated and ready for the runtime.
///
/// Produced by [`AssetLoader::load`] and consumed exactly once by the game
/// bridge; it is not retained after handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    bytes: Vec<u8>,
}

impl Asset {
    /// Validate a raw payload and wrap it.
    ///
    /// A payload is valid iff it is at least four bytes long and starts
    /// with the exact ASCII sequence `IWAD`. Anything after the magic is
    /// accepted as-is.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < ASSET_MAGIC.len() {
            return Err(Error::Validation(format!(
                "payload too short for magic ({} bytes)",
                bytes.len()
            )));
        }
        if bytes[..ASSET_MAGIC.len()] != ASSET_MAGIC {
            return Err(Error::Validation(format!(
                "bad magic {:?}",
                &bytes[..ASSET_MAGIC.len()]
            )));
        }
        Ok(Self { bytes })
    }

    /// The four-byte magic tag at the start of the payload.
    pub fn signature(&self) -> &[u8] {
        &self.bytes[..ASSET_MAGIC.len()]
    }

    /// Full payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a validated asset; present for slice-like symmetry.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transport abstraction for retrieving the asset payload.
///
/// The engine never speaks a wire protocol itself; callers supply whatever
/// source fits their embedding (a web fetch, a file read, a test script).
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the full payload at `url`. Transport and non-success failures
    /// surface as `io::Error`; there is no partial-content handling.
    async fn fetch(&self, url: &str) -> io::Result<Vec<u8>>;
}

/// Reads assets from the local filesystem, treating `url` as a path.
pub struct FileSource;

#[async_trait]
impl AssetSource for FileSource {
    async fn fetch(&self, url: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(url).await
    }
}

/// Fetches and validates assets. No retries: the operation either fully
/// succeeds or fails once.
#[derive(Clone)]
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
}

impl AssetLoader {
    /// Create a loader over the given transport.
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }

    /// Fetch `url` and validate the payload.
    ///
    /// Transport failures map to [`Error::Network`]; a structurally invalid
    /// payload maps to [`Error::Validation`].
    pub async fn load(&self, url: &str) -> Result<Asset> {
        let bytes = self
            .source
            .fetch(url)
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        debug!(len = bytes.len(), url, "asset fetched");
        Asset::from_bytes(bytes)
    }
}
