//! Google Drive API client.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::{header, Body, StatusCode};
use serde::{Deserialize, Serialize};

use gdclient_auth::AuthorizedClient;
use gdclient_common::{Error, ResourceHandle, ResourceKind, Result};

use crate::provider::{ByteStream, FileQuery, FileStore, FOLDER_MIME_TYPE};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const FILE_FIELDS: &str = "id,name,mimeType,parents";
const LIST_FIELDS: &str = "files(id,name,mimeType,parents)";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Convert to a handle, using `parent_id` when the API omitted parents.
    pub fn into_handle(self, parent_id: &str) -> ResourceHandle {
        let kind = if self.is_folder() {
            ResourceKind::Folder
        } else {
            ResourceKind::File
        };
        let parent = self
            .parents
            .into_iter()
            .next()
            .unwrap_or_else(|| parent_id.to_string());
        ResourceHandle {
            id: self.id,
            name: self.name,
            parent_id: parent,
            kind,
        }
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Google Drive API client.
pub struct DriveClient {
    client: AuthorizedClient,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound("Resource not found".to_string()))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(Error::Authentication(
                "Invalid or expired token".to_string(),
            ))
        } else if status == StatusCode::FORBIDDEN {
            Err(Error::PermissionDenied("Access denied".to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Network(format!("API error: {} - {}", status, body)))
        }
    }
}

/// Multipart/related framing around a streamed media part.
pub(crate) struct MultipartFrame {
    pub boundary: String,
    pub head: String,
    pub tail: String,
}

impl MultipartFrame {
    pub(crate) fn new(metadata_json: &str, mime_type: &str) -> Self {
        let boundary = format!("gdclient-{}", uuid::Uuid::new_v4().simple());
        let head = format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = boundary,
            meta = metadata_json,
            mime = mime_type
        );
        let tail = format!("\r\n--{}--\r\n", boundary);
        Self {
            boundary,
            head,
            tail,
        }
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }

    /// Stream `head`, then the media, then `tail`.
    pub(crate) fn wrap(self, media: ByteStream) -> ByteStream {
        let MultipartFrame { head, tail, .. } = self;
        let head = stream::once(async move { Ok::<_, Error>(Bytes::from(head)) });
        let tail = stream::once(async move { Ok::<_, Error>(Bytes::from(tail)) });
        Box::pin(head.chain(media).chain(tail))
    }
}

#[async_trait]
impl FileStore for DriveClient {
    async fn list(&self, query: &FileQuery) -> Result<Vec<ResourceHandle>> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.client.bearer().await?;
        let q = query.to_drive_query();

        tracing::debug!(q = %q, "Listing files");

        let response = self
            .client
            .http()
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("q", q.as_str()), ("fields", LIST_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list files: {}", e)))?;

        let list_response: FileListResponse = Self::handle_response(response).await?;
        Ok(list_response
            .files
            .into_iter()
            .map(|f| f.into_handle(&query.parent_id))
            .collect())
    }

    async fn create(&self, name: &str, parent_id: &str, mime_type: &str) -> Result<ResourceHandle> {
        let url = format!("{}/files", DRIVE_API_BASE);
        let auth = self.client.bearer().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [parent_id]
        });

        let response = self
            .client
            .http()
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to create file: {}", e)))?;

        let file: DriveFile = Self::handle_response(response).await?;
        Ok(file.into_handle(parent_id))
    }

    async fn upload_media(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        stream: ByteStream,
    ) -> Result<ResourceHandle> {
        let url = format!("{}/files", DRIVE_UPLOAD_BASE);
        let auth = self.client.bearer().await?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [parent_id]
        });
        let frame = MultipartFrame::new(&serde_json::to_string(&metadata)?, mime_type);
        let content_type = frame.content_type();

        let response = self
            .client
            .http()
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, content_type)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .body(Body::wrap_stream(frame.wrap(stream)))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        let file: DriveFile = Self::handle_response(response).await?;
        Ok(file.into_handle(parent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn drive_file(mime_type: &str, parents: Vec<String>) -> DriveFile {
        DriveFile {
            id: "abc123".to_string(),
            name: "item".to_string(),
            mime_type: mime_type.to_string(),
            parents,
        }
    }

    #[test]
    fn test_drive_file_is_folder() {
        assert!(drive_file(FOLDER_MIME_TYPE, vec![]).is_folder());
        assert!(!drive_file("image/jpeg", vec![]).is_folder());
    }

    #[test]
    fn test_into_handle_prefers_reported_parent() {
        let handle = drive_file(FOLDER_MIME_TYPE, vec!["p1".to_string()]).into_handle("root");
        assert_eq!(handle.parent_id, "p1");
        assert_eq!(handle.kind, ResourceKind::Folder);

        let handle = drive_file("image/jpeg", vec![]).into_handle("root");
        assert_eq!(handle.parent_id, "root");
        assert_eq!(handle.kind, ResourceKind::File);
    }

    #[test]
    fn test_drive_file_deserialization() {
        let json = r#"{"id": "1", "name": "x", "mimeType": "image/jpeg"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert!(file.parents.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_frame_layout() {
        let frame = MultipartFrame::new(r#"{"name":"a"}"#, "image/jpeg");
        let boundary = frame.boundary.clone();
        assert_eq!(
            frame.content_type(),
            format!("multipart/related; boundary={}", boundary)
        );

        let media: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"JP")),
            Ok(Bytes::from_static(b"EG")),
        ]));
        let chunks: Vec<Bytes> = frame.wrap(media).try_collect().await.unwrap();
        let body = String::from_utf8(chunks.concat()).unwrap();

        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains("{\"name\":\"a\"}\r\n"));
        assert!(body.contains("Content-Type: image/jpeg\r\n\r\nJPEG\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }
}
