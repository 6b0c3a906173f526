//! SimMediaStore - in-memory object storage with fault injection

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{TimeZone, Utc};
use tokio::sync::{watch, RwLock};

use super::store::{
    check_body_size, check_object_name, chunks, public_url_for, publish, upload_url_for,
    MediaError, MediaObject, MediaResult, MediaStore, SignedUpload, UploadProgress, UploadTokens,
};
use crate::constants::MEDIA_BUCKET_DEFAULT;
use crate::dst::{Clock, FaultInjector, FaultType};

/// Base URL used by simulated stores.
pub const SIM_BASE_URL: &str = "http://sim.local";

#[derive(Debug, Default)]
struct SimBucket {
    tokens: UploadTokens,
    objects: BTreeMap<String, (MediaObject, Bytes)>,
}

/// In-memory [`MediaStore`] for tests and simulation.
#[derive(Debug)]
pub struct SimMediaStore {
    bucket: String,
    clock: Arc<dyn Clock>,
    faults: FaultInjector,
    state: RwLock<SimBucket>,
}

impl SimMediaStore {
    /// Create an empty bucket that never fails.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_faults(clock, FaultInjector::none())
    }

    /// Create an empty bucket with fault injection.
    #[must_use]
    pub fn with_faults(clock: Arc<dyn Clock>, faults: FaultInjector) -> Self {
        Self {
            bucket: MEDIA_BUCKET_DEFAULT.to_string(),
            clock,
            faults,
            state: RwLock::new(SimBucket::default()),
        }
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Whether the bucket is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Place an object directly, bypassing signing. Used to seed sweeps.
    pub async fn put_object(&self, name: &str, content_type: &str, body: Bytes) -> MediaObject {
        let object = MediaObject {
            name: name.to_string(),
            content_type: content_type.to_string(),
            size: body.len() as u64,
            created_at: self.clock.now(),
        };
        self.state
            .write()
            .await
            .objects
            .insert(name.to_string(), (object.clone(), body));
        object
    }
}

#[async_trait]
impl MediaStore for SimMediaStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, name: &str) -> String {
        public_url_for(SIM_BASE_URL, &self.bucket, name)
    }

    async fn create_signed_upload(&self, name: &str) -> MediaResult<SignedUpload> {
        check_object_name(name)?;
        if self.faults.should_inject(FaultType::MediaSignFail) {
            return Err(MediaError::Sign(format!("injected sign fault on {name}")));
        }

        let now_ms = self.clock.now_ms();
        let (token, expires_at_ms) = self.state.write().await.tokens.issue(name, now_ms);
        let expires_at = Utc
            .timestamp_millis_opt(i64::try_from(expires_at_ms).unwrap_or(i64::MAX))
            .single()
            .unwrap_or_default();

        Ok(SignedUpload {
            name: name.to_string(),
            url: upload_url_for(SIM_BASE_URL, &token),
            token,
            expires_at,
        })
    }

    async fn upload_signed(
        &self,
        token: &str,
        content_type: &str,
        body: Bytes,
        progress: Option<&watch::Sender<UploadProgress>>,
    ) -> MediaResult<MediaObject> {
        check_body_size(&body)?;
        let mut state = self.state.write().await;
        let (name, expires_at_ms) = state.tokens.redeem(token, content_type, self.clock.now_ms())?;

        let total = body.len() as u64;
        let mut received = BytesMut::with_capacity(body.len());
        publish(progress, 0, total);
        for chunk in chunks(&body) {
            if self.faults.should_inject(FaultType::MediaUploadFail) {
                state.tokens.restore(token, name.clone(), expires_at_ms);
                return Err(MediaError::upload(format!(
                    "injected transfer fault on {name} after {} bytes",
                    received.len()
                )));
            }
            received.extend_from_slice(&chunk);
            publish(progress, received.len() as u64, total);
        }

        let object = MediaObject {
            name: name.clone(),
            content_type: content_type.to_string(),
            size: total,
            created_at: self.clock.now(),
        };
        state
            .objects
            .insert(name, (object.clone(), received.freeze()));
        Ok(object)
    }

    async fn list(&self) -> MediaResult<Vec<MediaObject>> {
        let state = self.state.read().await;
        Ok(state.objects.values().map(|(o, _)| o.clone()).collect())
    }

    async fn get(&self, name: &str) -> MediaResult<Option<(MediaObject, Bytes)>> {
        Ok(self.state.read().await.objects.get(name).cloned())
    }

    async fn delete(&self, name: &str) -> MediaResult<bool> {
        if self.faults.should_inject(FaultType::MediaDeleteFail) {
            return Err(MediaError::storage(format!("injected delete fault on {name}")));
        }
        Ok(self.state.write().await.objects.remove(name).is_some())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MEDIA_SIGNED_UPLOAD_TTL_MS, MEDIA_UPLOAD_CHUNK_BYTES};
    use crate::dst::{FaultConfig, SimClock};

    #[tokio::test]
    async fn test_sign_upload_get() {
        let store = SimMediaStore::new(Arc::new(SimClock::at_ms(1_000)));
        let signed = store.create_signed_upload("hero-0-1000.webp").await.unwrap();
        assert!(signed.url.ends_with(&signed.token));

        let (tx, rx) = watch::channel(UploadProgress::default());
        let body = Bytes::from(vec![1u8; MEDIA_UPLOAD_CHUNK_BYTES + 1]);
        let object = store
            .upload_signed(&signed.token, "image/webp", body.clone(), Some(&tx))
            .await
            .unwrap();

        assert_eq!(object.size, body.len() as u64);
        assert!(rx.borrow().is_complete());
        let (meta, stored) = store.get("hero-0-1000.webp").await.unwrap().unwrap();
        assert_eq!(meta.content_type, "image/webp");
        assert_eq!(stored, body);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let clock = SimClock::new();
        let store = SimMediaStore::new(Arc::new(clock.clone()));
        let signed = store.create_signed_upload("a.webp").await.unwrap();

        clock.advance_ms(MEDIA_SIGNED_UPLOAD_TTL_MS);
        let result = store
            .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"x"), None)
            .await;
        assert!(matches!(result, Err(MediaError::TokenRejected { .. })));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_transfer_fault_stores_nothing() {
        let faults = FaultInjector::builder(7)
            .with_fault(FaultConfig::always(FaultType::MediaUploadFail))
            .build();
        let store = SimMediaStore::with_faults(Arc::new(SimClock::new()), faults);
        let signed = store.create_signed_upload("clip.mp4").await.unwrap();

        let result = store
            .upload_signed(&signed.token, "video/mp4", Bytes::from_static(b"data"), None)
            .await;
        assert!(matches!(result, Err(MediaError::Upload(_))));
        assert!(store.get("clip.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_name_for_url() {
        let store = SimMediaStore::new(Arc::new(SimClock::new()));
        let url = store.public_url("product-1-5.webp");
        assert_eq!(store.object_name_for_url(&url), Some("product-1-5.webp"));
        assert_eq!(store.object_name_for_url("https://images.unsplash.com/x"), None);
    }
}
