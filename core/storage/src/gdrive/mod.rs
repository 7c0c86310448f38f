//! Google Drive backend.
//!
//! - REST client implementing [`FileStore`](crate::provider::FileStore)
//! - HTTP media source for upload-by-URL
//! - [`DriveService`]: ensure-folder, existence check and media upload

pub mod client;
pub mod media;
pub mod service;

pub use client::{DriveClient, DriveFile};
pub use media::HttpMediaSource;
pub use service::{DriveService, DEFAULT_MEDIA_MIME_TYPE, ROOT_FOLDER_ID};
