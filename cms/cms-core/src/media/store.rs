//! MediaStore - object storage for uploaded images and videos
//!
//! TigerStyle: uploads are two-step. A caller first asks for a pre-signed
//! target (a short-lived token bound to one object name), then streams the
//! body against that token. Tokens are single-use and expire.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::constants::{
    MEDIA_NAME_BYTES_MAX, MEDIA_SIGNED_UPLOAD_TTL_MS, MEDIA_UPLOAD_BYTES_MAX,
    MEDIA_UPLOAD_CHUNK_BYTES, MEDIA_UPLOAD_TOKEN_BYTES,
};
use super::kind::{content_type_for, extension};
use crate::storage::StoreError;

// =============================================================================
// Errors
// =============================================================================

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors from object storage and the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Pre-signed target could not be created
    #[error("failed to sign upload: {0}")]
    Sign(String),

    /// Body transfer failed
    #[error("upload failed: {0}")]
    Upload(String),

    /// Token unknown, already used or expired
    #[error("upload token rejected: {reason}")]
    TokenRejected {
        /// Why the token was refused
        reason: String,
    },

    /// Object does not exist
    #[error("object not found: {name}")]
    NotFound {
        /// Object name
        name: String,
    },

    /// Object name breaks the naming rules
    #[error("invalid object name: {0:?}")]
    InvalidName(String),

    /// Uploader's content type differs from the one the object was signed for
    #[error("content type {actual:?} does not match signed type {expected:?}")]
    ContentTypeMismatch {
        /// Content type implied by the signed object name
        expected: String,
        /// Content type sent by the uploader
        actual: String,
    },

    /// Body exceeds the upload limit
    #[error("upload of {size} bytes exceeds max {max}")]
    TooLarge {
        /// Body size
        size: usize,
        /// Limit
        max: usize,
    },

    /// Image could not be decoded or encoded
    #[error("transcode failed: {0}")]
    Transcode(String),

    /// Listing, reading or deleting objects failed
    #[error("object storage error: {0}")]
    Storage(String),

    /// Content store could not be read while sweeping
    #[error(transparent)]
    Content(#[from] StoreError),
}

impl MediaError {
    /// Create an upload error.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a token rejection.
    pub fn token_rejected(reason: impl Into<String>) -> Self {
        Self::TokenRejected {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// A pre-signed upload target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUpload {
    /// Object name the token is bound to
    pub name: String,
    /// Where the body is sent
    pub url: String,
    /// Single-use token
    pub token: String,
    /// After this instant the token is refused
    pub expires_at: DateTime<Utc>,
}

/// Bytes acknowledged so far out of the body size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    /// Bytes stored
    pub sent: u64,
    /// Body size
    pub total: u64,
}

impl UploadProgress {
    /// Percent complete, 0..=100. An empty body is complete.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = self.sent.min(self.total) * 100 / self.total;
        u8::try_from(pct).unwrap_or(100)
    }

    /// Whether every byte was acknowledged.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sent >= self.total
    }
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaObject {
    /// Object name inside the bucket
    pub name: String,
    /// Content type served with the object
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    /// Upload time
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// MediaStore Trait
// =============================================================================

/// Object storage with pre-signed uploads and public URLs.
#[async_trait]
pub trait MediaStore: Send + Sync + std::fmt::Debug {
    /// Bucket the store writes into.
    fn bucket(&self) -> &str;

    /// Public URL an object is served under.
    fn public_url(&self, name: &str) -> String;

    /// Object name for a public URL of this store, if it is one.
    fn object_name_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let prefix = self.public_url("");
        url.strip_prefix(prefix.as_str()).filter(|n| !n.is_empty())
    }

    /// Issue a single-use upload target for `name`.
    ///
    /// # Errors
    /// Returns error if the name is invalid or signing fails.
    async fn create_signed_upload(&self, name: &str) -> MediaResult<SignedUpload>;

    /// Store `body` under the name bound to `token`, publishing progress after
    /// each chunk.
    ///
    /// # Errors
    /// Returns error if the token is unknown or expired, the body is too large,
    /// or the transfer fails. A failed transfer stores nothing.
    async fn upload_signed(
        &self,
        token: &str,
        content_type: &str,
        body: Bytes,
        progress: Option<&watch::Sender<UploadProgress>>,
    ) -> MediaResult<MediaObject>;

    /// Every object in the bucket.
    ///
    /// # Errors
    /// Returns error if the listing fails.
    async fn list(&self) -> MediaResult<Vec<MediaObject>>;

    /// Object metadata and body.
    ///
    /// # Errors
    /// Returns error if the read fails.
    async fn get(&self, name: &str) -> MediaResult<Option<(MediaObject, Bytes)>>;

    /// Delete an object. Returns `false` if it did not exist.
    ///
    /// # Errors
    /// Returns error if the delete fails.
    async fn delete(&self, name: &str) -> MediaResult<bool>;
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Check an object name: a single path segment of safe characters.
pub fn check_object_name(name: &str) -> MediaResult<()> {
    let well_formed = !name.is_empty()
        && name.len() <= MEDIA_NAME_BYTES_MAX
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if well_formed {
        Ok(())
    } else {
        Err(MediaError::InvalidName(name.to_string()))
    }
}

/// Public URL layout shared by the bundled backends:
/// `{base}/storage/public/{bucket}/{name}`.
#[must_use]
pub fn public_url_for(base_url: &str, bucket: &str, name: &str) -> String {
    format!("{}/storage/public/{bucket}/{name}", base_url.trim_end_matches('/'))
}

/// Upload URL for a pre-signed token: `{base}/storage/upload/{token}`.
#[must_use]
pub fn upload_url_for(base_url: &str, token: &str) -> String {
    format!("{}/storage/upload/{token}", base_url.trim_end_matches('/'))
}

pub(crate) fn check_body_size(body: &Bytes) -> MediaResult<()> {
    if body.len() > MEDIA_UPLOAD_BYTES_MAX {
        return Err(MediaError::TooLarge {
            size: body.len(),
            max: MEDIA_UPLOAD_BYTES_MAX,
        });
    }
    Ok(())
}

/// Split a body into upload chunks; an empty body yields no chunks.
pub(crate) fn chunks(body: &Bytes) -> impl Iterator<Item = Bytes> + '_ {
    (0..body.len())
        .step_by(MEDIA_UPLOAD_CHUNK_BYTES)
        .map(move |start| body.slice(start..(start + MEDIA_UPLOAD_CHUNK_BYTES).min(body.len())))
}

pub(crate) fn publish(progress: Option<&watch::Sender<UploadProgress>>, sent: u64, total: u64) {
    if let Some(tx) = progress {
        tx.send_replace(UploadProgress { sent, total });
    }
}

/// Content type an object must be uploaded with, from its name's extension.
#[must_use]
pub fn expected_content_type(name: &str) -> &'static str {
    content_type_for(&extension(name).unwrap_or_default())
}

fn same_media_type(expected: &str, actual: &str) -> bool {
    let essence = actual.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(expected)
}

#[derive(Debug, Clone)]
struct PendingUpload {
    name: String,
    content_type: &'static str,
    expires_at_ms: u64,
}

impl PendingUpload {
    fn new(name: String, expires_at_ms: u64) -> Self {
        Self {
            content_type: expected_content_type(&name),
            name,
            expires_at_ms,
        }
    }
}

/// Outstanding pre-signed tokens, shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct UploadTokens {
    pending: HashMap<String, PendingUpload>,
}

impl UploadTokens {
    /// Issue a token for `name`, valid until `now_ms + TTL`. Expired tokens
    /// are dropped on the way.
    pub(crate) fn issue(&mut self, name: &str, now_ms: u64) -> (String, u64) {
        self.pending.retain(|_, p| p.expires_at_ms > now_ms);

        let mut raw = [0u8; MEDIA_UPLOAD_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let expires_at_ms = now_ms + MEDIA_SIGNED_UPLOAD_TTL_MS;

        self.pending
            .insert(token.clone(), PendingUpload::new(name.to_string(), expires_at_ms));
        (token, expires_at_ms)
    }

    /// Consume a token, returning the object name it is bound to and the
    /// token's expiry. A content type that does not match the signed name is
    /// refused without consuming the token.
    pub(crate) fn redeem(
        &mut self,
        token: &str,
        content_type: &str,
        now_ms: u64,
    ) -> MediaResult<(String, u64)> {
        let pending = self
            .pending
            .get(token)
            .ok_or_else(|| MediaError::token_rejected("unknown or already used"))?;
        if now_ms >= pending.expires_at_ms {
            self.pending.remove(token);
            return Err(MediaError::token_rejected("expired"));
        }
        if !same_media_type(pending.content_type, content_type) {
            return Err(MediaError::ContentTypeMismatch {
                expected: pending.content_type.to_string(),
                actual: content_type.to_string(),
            });
        }

        let pending = self
            .pending
            .remove(token)
            .ok_or_else(|| MediaError::token_rejected("unknown or already used"))?;
        Ok((pending.name, pending.expires_at_ms))
    }

    /// Put a token back after a failed transfer so the caller can retry.
    pub(crate) fn restore(&mut self, token: &str, name: String, expires_at_ms: u64) {
        self.pending
            .insert(token.to_string(), PendingUpload::new(name, expires_at_ms));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_rules() {
        assert!(check_object_name("hero-0-1700000000000.webp").is_ok());
        assert!(check_object_name("").is_err());
        assert!(check_object_name("../etc/passwd").is_err());
        assert!(check_object_name("a/b.webp").is_err());
        assert!(check_object_name(".hidden").is_err());
    }

    #[test]
    fn test_url_layout() {
        assert_eq!(
            public_url_for("http://localhost:8080/", "cms-images", "a.webp"),
            "http://localhost:8080/storage/public/cms-images/a.webp"
        );
        assert_eq!(upload_url_for("http://x", "tok"), "http://x/storage/upload/tok");
    }

    #[test]
    fn test_chunks_cover_body() {
        let body = Bytes::from(vec![7u8; MEDIA_UPLOAD_CHUNK_BYTES * 2 + 10]);
        let sizes: Vec<usize> = chunks(&body).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![MEDIA_UPLOAD_CHUNK_BYTES, MEDIA_UPLOAD_CHUNK_BYTES, 10]);
        assert_eq!(chunks(&Bytes::new()).count(), 0);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(UploadProgress { sent: 0, total: 0 }.percent(), 100);
        assert_eq!(UploadProgress { sent: 1, total: 4 }.percent(), 25);
        assert!(UploadProgress { sent: 4, total: 4 }.is_complete());
    }

    #[test]
    fn test_tokens_single_use_and_expire() {
        let mut tokens = UploadTokens::default();
        let (token, expires) = tokens.issue("a.webp", 1_000);
        assert_eq!(expires, 1_000 + MEDIA_SIGNED_UPLOAD_TTL_MS);
        assert_eq!(tokens.redeem(&token, "image/webp", 2_000).unwrap().0, "a.webp");
        assert!(tokens.redeem(&token, "image/webp", 2_000).is_err());

        let (late, expires) = tokens.issue("b.webp", 0);
        let err = tokens.redeem(&late, "image/webp", expires).unwrap_err();
        assert_eq!(err, MediaError::token_rejected("expired"));
    }

    #[test]
    fn test_tokens_bind_content_type() {
        let mut tokens = UploadTokens::default();
        let (token, _) = tokens.issue("promo-1-5.mp4", 0);

        let err = tokens.redeem(&token, "text/html", 1).unwrap_err();
        assert_eq!(
            err,
            MediaError::ContentTypeMismatch {
                expected: "video/mp4".to_string(),
                actual: "text/html".to_string(),
            }
        );

        // The refused attempt leaves the token usable.
        let (name, _) = tokens.redeem(&token, "Video/MP4; codecs=avc1", 1).unwrap();
        assert_eq!(name, "promo-1-5.mp4");
    }

    #[test]
    fn test_expected_content_type() {
        assert_eq!(expected_content_type("hero-0-1.webp"), "image/webp");
        assert_eq!(expected_content_type("marketing-2-1.bin"), "application/octet-stream");
    }
}
