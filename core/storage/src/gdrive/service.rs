//! Folder, existence and upload helpers over a [`FileStore`].

use std::sync::Arc;

use gdclient_auth::AuthorizedClient;
use gdclient_common::{Ensured, Error, ResourceHandle, ResourceKind, Result};

use crate::ensure::{normalize_parent, Ensurer};
use crate::provider::{FileQuery, FileStore, MediaSource, FOLDER_MIME_TYPE};

use super::client::DriveClient;
use super::media::HttpMediaSource;

/// Drive's alias for the caller's top-level folder.
pub const ROOT_FOLDER_ID: &str = "root";

/// MIME type attached to uploads unless the caller picks one.
pub const DEFAULT_MEDIA_MIME_TYPE: &str = "image/jpeg";

/// Drive helpers for one session.
///
/// Folder ensures made through the same instance are serialized, so
/// concurrent callers asking for the same folder get one folder. Uploads are
/// never deduplicated.
pub struct DriveService {
    store: Arc<dyn FileStore>,
    media: Arc<dyn MediaSource>,
    ensurer: Ensurer,
}

impl DriveService {
    pub fn new(store: Arc<dyn FileStore>, media: Arc<dyn MediaSource>) -> Self {
        Self {
            store,
            media,
            ensurer: Ensurer::new(),
        }
    }

    /// Service backed by the Drive REST API.
    pub fn from_client(client: AuthorizedClient) -> Self {
        let media = HttpMediaSource::new(client.http().clone());
        Self::new(Arc::new(DriveClient::new(client)), Arc::new(media))
    }

    /// First folder named `name` directly under `parent_id`, if any.
    pub async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<ResourceHandle>> {
        let parent_id = normalize_parent(parent_id, ROOT_FOLDER_ID);
        let query = FileQuery::new(name, parent_id).folders();
        Ok(self.store.list(&query).await?.into_iter().next())
    }

    /// Return the folder `name` under `parent_id`, creating it if absent.
    ///
    /// An empty `parent_id` means the root folder. When several folders
    /// share the name, the first one Drive lists wins.
    pub async fn ensure_folder(&self, name: &str, parent_id: &str) -> Result<Ensured> {
        let parent_id = normalize_parent(parent_id, ROOT_FOLDER_ID);
        self.ensurer
            .ensure(
                ResourceKind::Folder,
                name,
                move || self.find_folder(name, parent_id),
                move || self.store.create(name, parent_id, FOLDER_MIME_TYPE),
            )
            .await
    }

    /// Whether anything named `name` exists directly under `parent_id`.
    pub async fn file_exists(&self, name: &str, parent_id: &str) -> Result<bool> {
        let parent_id = normalize_parent(parent_id, ROOT_FOLDER_ID);
        let matches = self.store.list(&FileQuery::new(name, parent_id)).await?;
        Ok(!matches.is_empty())
    }

    /// Upload the content at `source_url` as a JPEG named `name`.
    ///
    /// Each call creates a new file, even with identical arguments.
    pub async fn upload_media(
        &self,
        name: &str,
        parent_id: &str,
        source_url: &str,
    ) -> Result<ResourceHandle> {
        self.upload_media_as(name, parent_id, source_url, DEFAULT_MEDIA_MIME_TYPE)
            .await
    }

    /// Upload the content at `source_url` with an explicit MIME type.
    pub async fn upload_media_as(
        &self,
        name: &str,
        parent_id: &str,
        source_url: &str,
        mime_type: &str,
    ) -> Result<ResourceHandle> {
        if name.is_empty() {
            return Err(Error::InvalidInput("file name cannot be empty".to_string()));
        }
        let parent_id = normalize_parent(parent_id, ROOT_FOLDER_ID);

        // The stream moves into the store and is dropped there on every path
        let stream = self.media.open(source_url).await?;
        let handle = self
            .store
            .upload_media(name, parent_id, mime_type, stream)
            .await?;

        tracing::info!(name, id = %handle.id, source = source_url, "Uploaded media");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryFileStore, MemoryMediaSource};
    use crate::provider::ByteStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const IMAGE_URL: &str = "https://images.example/cat.jpg";

    fn service(store: Arc<MemoryFileStore>) -> DriveService {
        let media = MemoryMediaSource::new().with(IMAGE_URL, b"\xFF\xD8jpeg-bytes".to_vec());
        DriveService::new(store, Arc::new(media))
    }

    #[tokio::test]
    async fn test_ensure_folder_twice_returns_same_id() {
        let store = Arc::new(MemoryFileStore::new());
        let drive = service(store.clone());

        let first = drive.ensure_folder("Reports", "P").await.unwrap();
        let second = drive.ensure_folder("Reports", "P").await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id(), second.id());
        assert_eq!(store.create_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_folder_uses_seeded_folder() {
        let store = Arc::new(MemoryFileStore::new());
        let seeded = store.seed("X", "P", FOLDER_MIME_TYPE).await;
        let drive = service(store.clone());

        let ensured = drive.ensure_folder("X", "P").await.unwrap();

        assert_eq!(ensured, Ensured::existing(seeded));
        assert_eq!(store.create_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_folder_ignores_same_named_file() {
        let store = Arc::new(MemoryFileStore::new());
        store.seed("X", "P", "image/jpeg").await;
        let drive = service(store.clone());

        let ensured = drive.ensure_folder("X", "P").await.unwrap();
        assert!(ensured.created);
        assert_eq!(ensured.handle.kind, ResourceKind::Folder);
    }

    #[tokio::test]
    async fn test_empty_parent_means_root() {
        let store = Arc::new(MemoryFileStore::new());
        let drive = service(store.clone());

        let ensured = drive.ensure_folder("Top", "").await.unwrap();
        assert_eq!(ensured.handle.parent_id, ROOT_FOLDER_ID);

        let again = drive.ensure_folder("Top", ROOT_FOLDER_ID).await.unwrap();
        assert_eq!(again.id(), ensured.id());
        assert!(drive.file_exists("Top", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_names_return_first_listed() {
        let store = Arc::new(MemoryFileStore::new());
        let first = store.seed("Dup", "P", FOLDER_MIME_TYPE).await;
        store.seed("Dup", "P", FOLDER_MIME_TYPE).await;
        let drive = service(store.clone());

        let ensured = drive.ensure_folder("Dup", "P").await.unwrap();
        assert_eq!(ensured.id(), first.id);
    }

    #[tokio::test]
    async fn test_create_error_is_returned_unchanged() {
        let store = Arc::new(MemoryFileStore::new());
        store.fail_writes(true);
        let drive = service(store.clone());

        let err = drive.ensure_folder("X", "P").await.unwrap_err();
        assert!(matches!(err, Error::Storage(ref m) if m == "write rejected by test store"));
        assert!(store.handles().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_folder_ensures_create_once() {
        let store = Arc::new(MemoryFileStore::new().with_read_delay(Duration::from_millis(20)));
        let drive = Arc::new(service(store.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let drive = drive.clone();
                tokio::spawn(async move { drive.ensure_folder("Shared", "P").await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().handle.id);
        }

        assert_eq!(store.create_count(), 1);
        assert!(ids.iter().all(|id| id == &ids[0]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_services_can_still_race() {
        let store = Arc::new(MemoryFileStore::new().with_read_delay(Duration::from_millis(50)));
        let a = service(store.clone());
        let b = service(store.clone());

        let (ra, rb) = tokio::join!(a.ensure_folder("Shared", "P"), b.ensure_folder("Shared", "P"));
        ra.unwrap();
        rb.unwrap();

        // The guard is per instance, so both lookups saw nothing
        assert_eq!(store.create_count(), 2);
    }

    #[tokio::test]
    async fn test_file_exists() {
        let store = Arc::new(MemoryFileStore::new());
        store.seed("cat.jpg", "P", "image/jpeg").await;
        let drive = service(store);

        assert!(drive.file_exists("cat.jpg", "P").await.unwrap());
        assert!(!drive.file_exists("cat.jpg", "Q").await.unwrap());
        assert!(!drive.file_exists("dog.jpg", "P").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_media_stores_content_as_jpeg() {
        let store = Arc::new(MemoryFileStore::new());
        let drive = service(store.clone());

        let handle = drive.upload_media("cat.jpg", "P", IMAGE_URL).await.unwrap();

        assert_eq!(handle.kind, ResourceKind::File);
        assert_eq!(store.content(&handle.id).await.unwrap(), b"\xFF\xD8jpeg-bytes");
        assert_eq!(store.mime_type(&handle.id).await.unwrap(), DEFAULT_MEDIA_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_upload_media_is_not_idempotent() {
        let store = Arc::new(MemoryFileStore::new());
        let drive = service(store.clone());

        let a = drive.upload_media("cat.jpg", "P", IMAGE_URL).await.unwrap();
        let b = drive.upload_media("cat.jpg", "P", IMAGE_URL).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.upload_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_media_fetch_error_skips_store() {
        let store = Arc::new(MemoryFileStore::new());
        let drive = service(store.clone());

        let err = drive
            .upload_media("x.jpg", "P", "https://images.example/missing.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(store.upload_count(), 0);
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct TrackedSource {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MediaSource for TrackedSource {
        async fn open(&self, _url: &str) -> Result<ByteStream> {
            let flag = DropFlag(self.dropped.clone());
            let stream = futures::stream::iter(vec![Bytes::from_static(b"data")]).map(move |b| {
                let _ = &flag;
                Ok::<_, Error>(b)
            });
            Ok(Box::pin(stream))
        }
    }

    #[tokio::test]
    async fn test_upload_stream_released_on_store_error() {
        let store = Arc::new(MemoryFileStore::new());
        store.fail_writes(true);
        let dropped = Arc::new(AtomicBool::new(false));
        let drive = DriveService::new(
            store,
            Arc::new(TrackedSource {
                dropped: dropped.clone(),
            }),
        );

        assert!(drive.upload_media("x.jpg", "P", IMAGE_URL).await.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_upload_stream_released_on_success() {
        let store = Arc::new(MemoryFileStore::new());
        let dropped = Arc::new(AtomicBool::new(false));
        let drive = DriveService::new(
            store,
            Arc::new(TrackedSource {
                dropped: dropped.clone(),
            }),
        );

        drive.upload_media("x.jpg", "P", IMAGE_URL).await.unwrap();
        assert!(dropped.load(Ordering::SeqCst));
    }
}
