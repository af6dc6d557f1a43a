//! # segue-artwork
//!
//! Default artwork resolver for Segue.
//!
//! Locators come in three kinds, told apart by prefix:
//! - `data:image/...;base64,...` inline images
//! - `file://` URLs for local files
//! - anything else is fetched over HTTP(S)
//!
//! Decoded images are kept in an in-memory LRU cache keyed by locator.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lru::LruCache;
use parking_lot::Mutex;
use segue_core::{Artwork, ArtworkLocator, ArtworkResolver, Error, Result};
use tracing::{debug, trace};

/// Number of decoded images kept when no capacity is given.
const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Resolves inline, file and remote artwork and decodes it to RGBA.
pub struct DefaultArtworkResolver {
    agent: ureq::Agent,
    cache: Mutex<LruCache<String, Arc<Artwork>>>,
}

impl DefaultArtworkResolver {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached images.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        match ArtworkLocator::classify(locator) {
            ArtworkLocator::Inline(data) => decode_inline(&data),
            ArtworkLocator::File(path) => read_file(&path),
            ArtworkLocator::Remote(url) => self.download(&url),
        }
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading artwork from {url}");
        self.agent
            .get(url)
            .call()
            .map_err(|e| Error::Artwork(format!("HTTP request failed: {e}")))?
            .into_body()
            .read_to_vec()
            .map_err(|e| Error::Artwork(format!("Failed to read response: {e}")))
    }
}

impl Default for DefaultArtworkResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtworkResolver for DefaultArtworkResolver {
    fn resolve(&self, locator: &str) -> Result<Artwork> {
        if let Some(hit) = self.cache.lock().get(locator) {
            trace!("Artwork cache hit for {locator}");
            return Ok(Artwork::clone(hit));
        }

        let bytes = self.fetch(locator)?;
        let artwork = decode(&bytes)?;
        debug!(
            "Decoded {}x{} artwork from {} bytes",
            artwork.width,
            artwork.height,
            bytes.len()
        );

        self.cache
            .lock()
            .put(locator.to_string(), Arc::new(artwork.clone()));
        Ok(artwork)
    }
}

/// Payload of a `data:image/<fmt>;base64,<payload>` URI.
fn decode_inline(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| Error::Artwork("inline artwork has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(Error::Artwork(format!(
            "unsupported inline artwork encoding '{header}'"
        )));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Artwork(format!("invalid base64 artwork: {e}")))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Artwork(format!("cannot read {}: {e}", path.display())))
}

fn decode(bytes: &[u8]) -> Result<Artwork> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::Artwork(format!("cannot decode image: {e}")))?
        .into_rgba8();
    Ok(Artwork {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
