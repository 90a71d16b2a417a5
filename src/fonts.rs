//! Handwriting font resources.
//!
//! DESIGN
//! ======
//! Fonts are addressed by short keys stored on overlay items (`fontKey`).
//! [`FontSource`] is the async seam the rasterizer and the export engine
//! fetch through, so tests can substitute in-memory sources. Failures here
//! are never fatal to callers: both consumers fall back to a default font.

#[cfg(test)]
#[path = "fonts_test.rs"]
mod fonts_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::config::EditorConfig;
use crate::error::ErrorCode;

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// MANIFEST
// =============================================================================

/// A downloadable handwriting font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

pub const FONT_MANIFEST: &[FontEntry] = &[
    FontEntry {
        key: "dancing",
        name: "Dancing Script",
        url: "https://github.com/google/fonts/raw/main/ofl/dancingscript/DancingScript%5Bwght%5D.ttf",
    },
    FontEntry {
        key: "pacifico",
        name: "Pacifico",
        url: "https://github.com/google/fonts/raw/main/ofl/pacifico/Pacifico-Regular.ttf",
    },
    FontEntry {
        key: "greatv",
        name: "Great Vibes",
        url: "https://github.com/google/fonts/raw/main/ofl/greatvibes/GreatVibes-Regular.ttf",
    },
    FontEntry {
        key: "kalam",
        name: "Kalam",
        url: "https://github.com/google/fonts/raw/main/ofl/kalam/Kalam-Regular.ttf",
    },
    FontEntry {
        key: "courget",
        name: "Courgette",
        url: "https://github.com/google/fonts/raw/main/ofl/courgette/Courgette-Regular.ttf",
    },
    FontEntry {
        key: "satisfy",
        name: "Satisfy",
        url: "https://github.com/google/fonts/raw/main/ofl/satisfy/Satisfy-Regular.ttf",
    },
    FontEntry {
        key: "hmapple",
        name: "Homemade Apple",
        url: "https://github.com/google/fonts/raw/main/ofl/homemadeapple/HomemadeApple-Regular.ttf",
    },
    FontEntry {
        key: "caveat",
        name: "Caveat",
        url: "https://github.com/google/fonts/raw/main/ofl/caveat/Caveat%5Bwght%5D.ttf",
    },
];

/// Look up a manifest entry by key.
#[must_use]
pub fn font_entry(key: &str) -> Option<&'static FontEntry> {
    FONT_MANIFEST.iter().find(|f| f.key == key)
}

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while fetching font bytes.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("unknown font key: {0}")]
    UnknownKey(String),

    /// The HTTP request failed before a response arrived.
    #[error("font request failed: {0}")]
    Request(String),

    #[error("font download failed: {key} returned status {status}")]
    Status { key: String, status: u16 },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for FontError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownKey(_) => "E_FONT_UNKNOWN",
            Self::Request(_) => "E_FONT_REQUEST",
            Self::Status { .. } => "E_FONT_STATUS",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// SOURCE TRAIT
// =============================================================================

/// Async font loader. Enables mocking in tests.
#[async_trait::async_trait]
pub trait FontSource: Send + Sync {
    /// Fetch the TrueType bytes for `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`FontError`] if the key is unknown or the bytes cannot be
    /// retrieved.
    async fn fetch(&self, key: &str) -> Result<Arc<[u8]>, FontError>;
}

// =============================================================================
// HTTP
// =============================================================================

/// Downloads manifest fonts over HTTP.
pub struct HttpFontSource {
    http: reqwest::Client,
}

impl HttpFontSource {
    /// # Errors
    ///
    /// Returns [`FontError::HttpClientBuild`] if the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, FontError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .build()
            .map_err(|e| FontError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }

    /// # Errors
    ///
    /// Returns [`FontError::HttpClientBuild`] if the client cannot be built.
    pub fn from_config(config: &EditorConfig) -> Result<Self, FontError> {
        Self::new(Duration::from_secs(config.font_timeout_secs))
    }
}

#[async_trait::async_trait]
impl FontSource for HttpFontSource {
    async fn fetch(&self, key: &str) -> Result<Arc<[u8]>, FontError> {
        let entry = font_entry(key).ok_or_else(|| FontError::UnknownKey(key.to_owned()))?;

        let response = self
            .http
            .get(entry.url)
            .send()
            .await
            .map_err(|e| FontError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FontError::Status { key: key.to_owned(), status });
        }

        let bytes = response.bytes().await.map_err(|e| FontError::Request(e.to_string()))?;
        Ok(Arc::from(bytes.as_ref()))
    }
}

// =============================================================================
// STATIC
// =============================================================================

/// Serves bundled font bytes from memory.
#[derive(Default, Clone)]
pub struct StaticFontSource {
    fonts: HashMap<String, Arc<[u8]>>,
}

impl StaticFontSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(key, bytes);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.fonts.insert(key.into(), bytes.into());
    }
}

#[async_trait::async_trait]
impl FontSource for StaticFontSource {
    async fn fetch(&self, key: &str) -> Result<Arc<[u8]>, FontError> {
        self.fonts.get(key).cloned().ok_or_else(|| FontError::UnknownKey(key.to_owned()))
    }
}

// =============================================================================
// CACHE
// =============================================================================

/// Memoizes another source by key.
///
/// Only successes are cached. Two concurrent misses for the same key may both
/// reach the inner source; the later insert wins, which is harmless since
/// the bytes for a key never change.
pub struct CachedFontSource<S> {
    inner: S,
    cache: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl<S: FontSource> CachedFontSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, cache: Mutex::new(HashMap::new()) }
    }

    /// Number of cached fonts.
    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl<S: FontSource> FontSource for CachedFontSource<S> {
    async fn fetch(&self, key: &str) -> Result<Arc<[u8]>, FontError> {
        let hit = self.lock().get(key).cloned();
        if let Some(bytes) = hit {
            return Ok(bytes);
        }

        let bytes = self.inner.fetch(key).await?;
        info!(font_key = key, bytes = bytes.len(), "font cached");
        self.lock().insert(key.to_owned(), Arc::clone(&bytes));
        Ok(bytes)
    }
}
