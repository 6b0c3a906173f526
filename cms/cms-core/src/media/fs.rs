//! FsMediaStore - a bucket directory on local disk
//!
//! Objects are plain files named after the object; metadata (content type,
//! upload time) lives in a sidecar index next to them. Bodies are streamed to
//! a `.part` file and renamed into place once the last chunk is written, with
//! no lock held. The index is the shared source of truth: it is re-read under
//! an OS lock for every operation, so several processes can share a bucket.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex};

use super::store::{
    check_body_size, check_object_name, chunks, public_url_for, publish, upload_url_for,
    MediaError, MediaObject, MediaResult, MediaStore, SignedUpload, UploadProgress, UploadTokens,
};
use crate::dst::Clock;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Sidecar index file inside the bucket directory
pub const MEDIA_INDEX_FILE_NAME: &str = ".index.json";

/// Lock file guarding the index
pub const MEDIA_LOCK_FILE_NAME: &str = ".index.lock";

type MediaIndex = BTreeMap<String, MediaObject>;

/// [`MediaStore`] backed by a directory.
#[derive(Debug)]
pub struct FsMediaStore {
    dir: PathBuf,
    bucket: String,
    base_url: String,
    clock: Arc<dyn Clock>,
    tokens: Mutex<UploadTokens>,
}

impl FsMediaStore {
    /// Open (or create) `root/<bucket>`, serving public URLs under `base_url`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or the index cannot be
    /// parsed.
    pub async fn open(
        root: &Path,
        bucket: &str,
        base_url: &str,
        clock: Arc<dyn Clock>,
    ) -> MediaResult<Self> {
        // Preconditions
        assert!(!bucket.is_empty(), "bucket cannot be empty");
        check_object_name(bucket)?;

        let dir = root.join(bucket);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| MediaError::storage(format!("failed to create {}: {e}", dir.display())))?;

        let store = Self {
            dir,
            bucket: bucket.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            clock,
            tokens: Mutex::new(UploadTokens::default()),
        };
        let objects = store.read_index(|index| index.len()).await?;

        tracing::debug!(dir = %store.dir.display(), objects, "Opened media bucket");
        Ok(store)
    }

    /// Bucket directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run `op` against the index as it is on disk, under a shared lock.
    async fn read_index<T: Send + 'static>(
        &self,
        op: impl FnOnce(&MediaIndex) -> T + Send + 'static,
    ) -> MediaResult<T> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            let lock = fd_lock::RwLock::new(open_lock_file(&dir)?);
            let _guard = lock
                .read()
                .map_err(|e| MediaError::storage(format!("failed to lock index: {e}")))?;
            Ok(op(&load_index(&dir)?))
        })
        .await
        .map_err(|e| MediaError::storage(format!("index worker failed: {e}")))?
    }

    /// Re-read the index under an exclusive lock, apply `op` (which may also
    /// touch object files in the bucket directory) and persist the index.
    async fn mutate_index<T: Send + 'static>(
        &self,
        op: impl FnOnce(&mut MediaIndex, &Path) -> MediaResult<T> + Send + 'static,
    ) -> MediaResult<T> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            let mut lock = fd_lock::RwLock::new(open_lock_file(&dir)?);
            let _guard = lock
                .write()
                .map_err(|e| MediaError::storage(format!("failed to lock index: {e}")))?;
            let mut index = load_index(&dir)?;
            let result = op(&mut index, &dir)?;
            save_index(&dir, &index)?;
            Ok(result)
        })
        .await
        .map_err(|e| MediaError::storage(format!("index worker failed: {e}")))?
    }

    async fn write_body(
        &self,
        path: &Path,
        body: &Bytes,
        progress: Option<&watch::Sender<UploadProgress>>,
    ) -> std::io::Result<()> {
        let total = body.len() as u64;
        let mut file = fs::File::create(path).await?;
        let mut sent = 0u64;
        publish(progress, 0, total);
        for chunk in chunks(body) {
            file.write_all(&chunk).await?;
            sent += chunk.len() as u64;
            publish(progress, sent, total);
        }
        file.flush().await?;
        file.sync_all().await
    }

    /// Undo a stored body and hand the token back.
    async fn roll_back(&self, token: &str, name: String, expires_at_ms: u64, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove object");
            }
        }
        self.tokens.lock().await.restore(token, name, expires_at_ms);
    }
}

fn open_lock_file(dir: &Path) -> MediaResult<File> {
    let path = dir.join(MEDIA_LOCK_FILE_NAME);
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|e| MediaError::storage(format!("failed to open {}: {e}", path.display())))
}

fn load_index(dir: &Path) -> MediaResult<MediaIndex> {
    match std::fs::read(dir.join(MEDIA_INDEX_FILE_NAME)) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| MediaError::storage(format!("invalid media index: {e}"))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MediaIndex::new()),
        Err(e) => Err(MediaError::storage(format!("failed to read index: {e}"))),
    }
}

fn save_index(dir: &Path, index: &MediaIndex) -> MediaResult<()> {
    let bytes = serde_json::to_vec_pretty(index)
        .map_err(|e| MediaError::storage(format!("failed to serialize index: {e}")))?;
    let path = dir.join(MEDIA_INDEX_FILE_NAME);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &bytes)
        .map_err(|e| MediaError::storage(format!("failed to write index: {e}")))?;
    std::fs::rename(&tmp, &path)
        .map_err(|e| MediaError::storage(format!("failed to replace index: {e}")))
}

#[async_trait]
impl MediaStore for FsMediaStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn public_url(&self, name: &str) -> String {
        public_url_for(&self.base_url, &self.bucket, name)
    }

    async fn create_signed_upload(&self, name: &str) -> MediaResult<SignedUpload> {
        check_object_name(name)?;
        let now_ms = self.clock.now_ms();
        let (token, expires_at_ms) = self.tokens.lock().await.issue(name, now_ms);
        let expires_at = Utc
            .timestamp_millis_opt(i64::try_from(expires_at_ms).unwrap_or(i64::MAX))
            .single()
            .unwrap_or_default();

        tracing::debug!(name, "Signed upload");
        Ok(SignedUpload {
            name: name.to_string(),
            url: upload_url_for(&self.base_url, &token),
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
        let (name, expires_at_ms) = self
            .tokens
            .lock()
            .await
            .redeem(token, content_type, self.clock.now_ms())?;

        let path = self.dir.join(&name);
        let part = self.dir.join(format!("{name}.part"));
        let written = match self.write_body(&part, &body, progress).await {
            Ok(()) => fs::rename(&part, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.roll_back(token, name.clone(), expires_at_ms, &part).await;
            return Err(MediaError::upload(format!("failed to store {name}: {e}")));
        }

        let object = MediaObject {
            name: name.clone(),
            content_type: content_type.to_string(),
            size: body.len() as u64,
            created_at: self.clock.now(),
        };
        let entry = object.clone();
        let indexed = self
            .mutate_index(move |index, _| {
                index.insert(entry.name.clone(), entry);
                Ok(())
            })
            .await;
        if let Err(e) = indexed {
            self.roll_back(token, name, expires_at_ms, &path).await;
            return Err(e);
        }

        tracing::info!(name = %object.name, size = object.size, "Stored object");
        Ok(object)
    }

    async fn list(&self) -> MediaResult<Vec<MediaObject>> {
        self.read_index(|index| index.values().cloned().collect()).await
    }

    async fn get(&self, name: &str) -> MediaResult<Option<(MediaObject, Bytes)>> {
        check_object_name(name)?;
        let key = name.to_string();
        let Some(object) = self.read_index(move |index| index.get(&key).cloned()).await? else {
            return Ok(None);
        };
        match fs::read(self.dir.join(name)).await {
            Ok(body) => Ok(Some((object, Bytes::from(body)))),
            // Deleted between the index read and the body read.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MediaError::storage(format!("failed to read {name}: {e}"))),
        }
    }

    async fn delete(&self, name: &str) -> MediaResult<bool> {
        check_object_name(name)?;
        let name = name.to_string();
        self.mutate_index(move |index, dir| {
            if !index.contains_key(&name) {
                return Ok(false);
            }
            match std::fs::remove_file(dir.join(&name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(MediaError::storage(format!("failed to delete {name}: {e}"))),
            }
            index.remove(&name);
            Ok(true)
        })
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::SimClock;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upload_survives_reopen() {
        let dir = tempdir().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SimClock::at_ms(42));

        {
            let store = FsMediaStore::open(dir.path(), "cms-images", "http://localhost:8080", clock.clone())
                .await
                .unwrap();
            let signed = store.create_signed_upload("hero-0-42.webp").await.unwrap();
            store
                .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"RIFF"), None)
                .await
                .unwrap();
        }

        let store = FsMediaStore::open(dir.path(), "cms-images", "http://localhost:8080", clock)
            .await
            .unwrap();
        let (meta, body) = store.get("hero-0-42.webp").await.unwrap().unwrap();
        assert_eq!(meta.content_type, "image/webp");
        assert_eq!(&body[..], b"RIFF");
        assert_eq!(
            store.public_url("hero-0-42.webp"),
            "http://localhost:8080/storage/public/cms-images/hero-0-42.webp"
        );
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_index_entry() {
        let dir = tempdir().unwrap();
        let store = FsMediaStore::open(dir.path(), "b", "http://x", Arc::new(SimClock::new()))
            .await
            .unwrap();
        let signed = store.create_signed_upload("clip.mp4").await.unwrap();
        store
            .upload_signed(&signed.token, "video/mp4", Bytes::from_static(b"mp4"), None)
            .await
            .unwrap();

        assert!(store.delete("clip.mp4").await.unwrap());
        assert!(!store.delete("clip.mp4").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.dir().join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn test_two_handles_share_the_index() {
        let dir = tempdir().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SimClock::at_ms(7));
        let cli = FsMediaStore::open(dir.path(), "b", "http://x", clock.clone()).await.unwrap();
        let server = FsMediaStore::open(dir.path(), "b", "http://x", clock).await.unwrap();

        let signed = cli.create_signed_upload("hero-0-7.webp").await.unwrap();
        cli.upload_signed(&signed.token, "image/webp", Bytes::from_static(b"cli"), None)
            .await
            .unwrap();
        let (_, body) = server.get("hero-0-7.webp").await.unwrap().unwrap();
        assert_eq!(&body[..], b"cli");

        let signed = server.create_signed_upload("clip.mp4").await.unwrap();
        server
            .upload_signed(&signed.token, "video/mp4", Bytes::from_static(b"srv"), None)
            .await
            .unwrap();

        let mut names: Vec<String> = cli.list().await.unwrap().into_iter().map(|o| o.name).collect();
        names.sort();
        assert_eq!(names, vec!["clip.mp4".to_string(), "hero-0-7.webp".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_index_write_rolls_back() {
        let dir = tempdir().unwrap();
        let store = FsMediaStore::open(dir.path(), "b", "http://x", Arc::new(SimClock::new()))
            .await
            .unwrap();
        let signed = store.create_signed_upload("a.webp").await.unwrap();

        // A directory where the temporary index goes makes the index write fail.
        let blocker = store.dir().join(MEDIA_INDEX_FILE_NAME).with_extension("json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let result = store
            .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"1"), None)
            .await;
        assert!(matches!(result, Err(MediaError::Storage(_))));
        assert!(!store.dir().join("a.webp").exists());
        assert!(store.list().await.unwrap().is_empty());

        std::fs::remove_dir(&blocker).unwrap();
        let retried = store
            .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"2"), None)
            .await
            .unwrap();
        assert_eq!(retried.name, "a.webp");
    }

    #[tokio::test]
    async fn test_reads_proceed_while_a_body_streams() {
        let dir = tempdir().unwrap();
        let store = FsMediaStore::open(dir.path(), "b", "http://x", Arc::new(SimClock::new()))
            .await
            .unwrap();
        let signed = store.create_signed_upload("big.mp4").await.unwrap();
        let body = Bytes::from(vec![3u8; crate::constants::MEDIA_UPLOAD_CHUNK_BYTES * 32]);

        let (tx, mut rx) = watch::channel(UploadProgress::default());
        let upload = store.upload_signed(&signed.token, "video/mp4", body, Some(&tx));
        let reader = async {
            let _ = rx.changed().await;
            let wait = std::time::Duration::from_secs(5);
            let listed = tokio::time::timeout(wait, store.list()).await;
            let signed = tokio::time::timeout(wait, store.create_signed_upload("c.webp")).await;
            (listed, signed)
        };

        let (uploaded, (listed, signed_again)) = tokio::join!(upload, reader);
        assert!(uploaded.is_ok());
        assert!(listed.unwrap().is_ok());
        assert!(signed_again.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_wrong_content_type_keeps_token() {
        let dir = tempdir().unwrap();
        let store = FsMediaStore::open(dir.path(), "b", "http://x", Arc::new(SimClock::new()))
            .await
            .unwrap();
        let signed = store.create_signed_upload("a.webp").await.unwrap();

        let refused = store
            .upload_signed(&signed.token, "text/html", Bytes::from_static(b"<script>"), None)
            .await;
        assert!(matches!(refused, Err(MediaError::ContentTypeMismatch { .. })));
        assert!(store.list().await.unwrap().is_empty());

        store
            .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"RIFF"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_token_reuse_rejected() {
        let dir = tempdir().unwrap();
        let store = FsMediaStore::open(dir.path(), "b", "http://x", Arc::new(SimClock::new()))
            .await
            .unwrap();
        let signed = store.create_signed_upload("a.webp").await.unwrap();
        store
            .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"1"), None)
            .await
            .unwrap();
        let again = store
            .upload_signed(&signed.token, "image/webp", Bytes::from_static(b"2"), None)
            .await;
        assert!(matches!(again, Err(MediaError::TokenRejected { .. })));
    }
}
