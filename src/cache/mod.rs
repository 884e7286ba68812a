//! # Cache Gate
//!
//! Content-derived validators for rendered cards.
//!
//! A card's token is the hex SHA-256 of its encoded JPEG bytes, so two
//! renders share a token exactly when they would serve identical bytes. The
//! server sends it as the `ETag` and answers `304 Not Modified` when a
//! client's `If-None-Match` matches.
//!
//! [`RenderCache`] remembers the last result per resource so a matching
//! client can be answered without running the pipeline at all, as long as
//! the entry is still fresh.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::Result;

/// Quality of served and persisted cards.
pub const JPEG_QUALITY: u8 = 90;

/// Opaque validator derived from output bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheToken(String);

impl CacheToken {
    /// Hash `bytes` into a token.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Hex digest, unquoted.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strong entity tag form: `"<hex>"`.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Whether an `If-None-Match` header value names this token.
    ///
    /// Accepts quoted or bare tags, weak (`W/`) tags, comma-separated lists
    /// and `*`.
    pub fn matches(&self, if_none_match: &str) -> bool {
        if_none_match.split(',').map(str::trim).any(|candidate| {
            if candidate == "*" {
                return true;
            }
            let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
            let candidate = candidate
                .strip_prefix('"')
                .and_then(|c| c.strip_suffix('"'))
                .unwrap_or(candidate);
            candidate == self.0
        })
    }
}

impl fmt::Display for CacheToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a card as JPEG.
pub fn encode_jpeg(card: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(card)?;
    Ok(bytes)
}

/// Encode a card and derive its token from the encoded bytes.
pub fn token_for(card: &RgbImage) -> Result<(Vec<u8>, CacheToken)> {
    let bytes = encode_jpeg(card)?;
    let token = CacheToken::for_bytes(&bytes);
    Ok((bytes, token))
}

/// Whether a response body has to be produced.
///
/// `false` only when the client presented a validator that matches the
/// known token.
pub fn should_render(if_none_match: Option<&str>, prior: Option<&CacheToken>) -> bool {
    match (if_none_match, prior) {
        (Some(client), Some(token)) => !token.matches(client),
        _ => true,
    }
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct CachedCard {
    pub token: CacheToken,
    pub jpeg: Vec<u8>,
    pub rendered_at: Instant,
}

impl CachedCard {
    pub fn new(jpeg: Vec<u8>, token: CacheToken) -> Self {
        Self {
            token,
            jpeg,
            rendered_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.rendered_at.elapsed() < ttl
    }
}

/// Last render per resource key.
#[derive(Debug)]
pub struct RenderCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedCard>>,
}

impl RenderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The entry for `key`, if it is still fresh.
    pub async fn fresh(&self, key: &str) -> Option<CachedCard> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|card| card.is_fresh(self.ttl))
            .cloned()
    }

    /// Token of the fresh entry for `key`.
    pub async fn fresh_token(&self, key: &str) -> Option<CacheToken> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|card| card.is_fresh(self.ttl))
            .map(|card| card.token.clone())
    }

    pub async fn store(&self, key: &str, card: CachedCard) {
        self.entries.write().await.insert(key.to_string(), card);
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}
