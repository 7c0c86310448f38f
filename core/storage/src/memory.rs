//! In-memory stores for testing.
//!
//! Both stores count write calls and can delay reads, which makes
//! check-then-act races reproducible.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use gdclient_common::{Error, ResourceHandle, ResourceKind, Result};

use crate::provider::{
    AddSheetReply, BatchUpdateResponse, ByteStream, FileQuery, FileStore, MediaSource, SheetReply,
    SheetRequest, SheetTab, SpreadsheetStore, SpreadsheetStructure, FOLDER_MIME_TYPE,
};

#[derive(Debug, Clone)]
struct StoredFile {
    handle: ResourceHandle,
    mime_type: String,
    content: Vec<u8>,
}

/// In-memory file store.
///
/// `list` returns a snapshot taken before the optional read delay, so a
/// write landing during the delay is not visible to that lookup.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<Vec<StoredFile>>,
    read_delay: Option<Duration>,
    fail_writes: AtomicBool,
    creates: AtomicUsize,
    uploads: AtomicUsize,
}

impl MemoryFileStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `list` call after its snapshot is taken.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Make `create` and `upload_media` fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert a resource directly, bypassing the write counters.
    pub async fn seed(&self, name: &str, parent_id: &str, mime_type: &str) -> ResourceHandle {
        self.insert(name, parent_id, mime_type, Vec::new()).await
    }

    /// Number of `create` calls that succeeded.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `upload_media` calls that succeeded.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// All resources, in insertion order.
    pub async fn handles(&self) -> Vec<ResourceHandle> {
        self.files.read().await.iter().map(|f| f.handle.clone()).collect()
    }

    /// Content of an uploaded file.
    pub async fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .await
            .iter()
            .find(|f| f.handle.id == id)
            .map(|f| f.content.clone())
    }

    /// MIME type of a stored resource.
    pub async fn mime_type(&self, id: &str) -> Option<String> {
        self.files
            .read()
            .await
            .iter()
            .find(|f| f.handle.id == id)
            .map(|f| f.mime_type.clone())
    }

    async fn insert(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> ResourceHandle {
        let kind = if mime_type == FOLDER_MIME_TYPE {
            ResourceKind::Folder
        } else {
            ResourceKind::File
        };
        let handle = ResourceHandle::new(Uuid::new_v4().to_string(), name, parent_id, kind);
        self.files.write().await.push(StoredFile {
            handle: handle.clone(),
            mime_type: mime_type.to_string(),
            content,
        });
        handle
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("write rejected by test store".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list(&self, query: &FileQuery) -> Result<Vec<ResourceHandle>> {
        let matches: Vec<ResourceHandle> = self
            .files
            .read()
            .await
            .iter()
            .filter(|f| f.handle.name == query.name && f.handle.parent_id == query.parent_id)
            .filter(|f| query.mime_type.as_deref().map_or(true, |m| f.mime_type == m))
            .map(|f| f.handle.clone())
            .collect();

        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(matches)
    }

    async fn create(&self, name: &str, parent_id: &str, mime_type: &str) -> Result<ResourceHandle> {
        self.check_writable()?;
        let handle = self.insert(name, parent_id, mime_type, Vec::new()).await;
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn upload_media(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        mut stream: ByteStream,
    ) -> Result<ResourceHandle> {
        self.check_writable()?;

        let mut content = Vec::new();
        while let Some(chunk) = stream.next().await {
            content.extend_from_slice(&chunk?);
        }

        let handle = self.insert(name, parent_id, mime_type, content).await;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }
}

/// Media source serving fixed bytes per URL.
#[derive(Default)]
pub struct MemoryMediaSource {
    media: HashMap<String, Vec<u8>>,
}

impl MemoryMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` at `url`.
    pub fn with(mut self, url: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.media.insert(url.into(), content.into());
        self
    }
}

#[async_trait]
impl MediaSource for MemoryMediaSource {
    async fn open(&self, url: &str) -> Result<ByteStream> {
        let content = self
            .media
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("Failed to fetch {}: 404 Not Found", url)))?;

        // Two chunks so consumers see a real stream
        let split = content.len() / 2;
        let tail = content[split..].to_vec();
        let mut head = content;
        head.truncate(split);
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from(head)), Ok(Bytes::from(tail))];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[derive(Debug, Clone)]
struct MemoryTab {
    tab: SheetTab,
    rows: Vec<Vec<String>>,
}

/// In-memory spreadsheet store.
pub struct MemorySpreadsheetStore {
    spreadsheets: RwLock<HashMap<String, Vec<MemoryTab>>>,
    next_sheet_id: AtomicI64,
    read_delay: Option<Duration>,
    add_sheets: AtomicUsize,
}

impl MemorySpreadsheetStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            spreadsheets: RwLock::new(HashMap::new()),
            next_sheet_id: AtomicI64::new(1000),
            read_delay: None,
            add_sheets: AtomicUsize::new(0),
        }
    }

    /// Delay every `get_structure` call after its snapshot is taken.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Create a spreadsheet holding the default first tab.
    pub async fn add_spreadsheet(&self, spreadsheet_id: &str) {
        self.spreadsheets.write().await.insert(
            spreadsheet_id.to_string(),
            vec![MemoryTab {
                tab: SheetTab {
                    sheet_id: 0,
                    title: "Sheet1".to_string(),
                },
                rows: Vec::new(),
            }],
        );
    }

    /// Insert a tab directly, bypassing the write counter.
    pub async fn seed_tab(&self, spreadsheet_id: &str, title: &str) -> Result<SheetTab> {
        let mut spreadsheets = self.spreadsheets.write().await;
        let tabs = spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| Error::NotFound(format!("Spreadsheet not found: {}", spreadsheet_id)))?;
        let tab = SheetTab {
            sheet_id: self.next_sheet_id.fetch_add(1, Ordering::SeqCst),
            title: title.to_string(),
        };
        tabs.push(MemoryTab {
            tab: tab.clone(),
            rows: Vec::new(),
        });
        Ok(tab)
    }

    /// Number of tabs created through `batch_update`.
    pub fn add_sheet_count(&self) -> usize {
        self.add_sheets.load(Ordering::SeqCst)
    }

    /// Rows of a tab, each as its cell texts.
    pub async fn rows(&self, spreadsheet_id: &str, sheet_id: i64) -> Option<Vec<Vec<String>>> {
        self.spreadsheets
            .read()
            .await
            .get(spreadsheet_id)?
            .iter()
            .find(|t| t.tab.sheet_id == sheet_id)
            .map(|t| t.rows.clone())
    }
}

impl Default for MemorySpreadsheetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpreadsheetStore for MemorySpreadsheetStore {
    async fn get_structure(&self, spreadsheet_id: &str) -> Result<SpreadsheetStructure> {
        let tabs = self
            .spreadsheets
            .read()
            .await
            .get(spreadsheet_id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?
            .iter()
            .map(|t| t.tab.clone())
            .collect();

        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(SpreadsheetStructure { tabs })
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Vec<SheetRequest>,
    ) -> Result<BatchUpdateResponse> {
        let mut spreadsheets = self.spreadsheets.write().await;
        let original = spreadsheets
            .get(spreadsheet_id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?
            .clone();

        // Work on a copy so a failing request leaves the spreadsheet untouched
        let mut tabs = original;
        let mut replies = Vec::with_capacity(requests.len());
        let mut added = 0;

        for request in requests {
            match request {
                SheetRequest::AddSheet(add) => {
                    let title = add.properties.title;
                    if tabs.iter().any(|t| t.tab.title == title) {
                        return Err(Error::InvalidInput(format!(
                            "A sheet with the name \"{}\" already exists",
                            title
                        )));
                    }
                    let tab = SheetTab {
                        sheet_id: self.next_sheet_id.fetch_add(1, Ordering::SeqCst),
                        title,
                    };
                    tabs.push(MemoryTab {
                        tab: tab.clone(),
                        rows: Vec::new(),
                    });
                    added += 1;
                    replies.push(SheetReply {
                        add_sheet: Some(AddSheetReply { properties: tab }),
                    });
                }
                SheetRequest::AppendCells(append) => {
                    let target = tabs
                        .iter_mut()
                        .find(|t| t.tab.sheet_id == append.sheet_id)
                        .ok_or_else(|| {
                            Error::InvalidInput(format!("No grid with id: {}", append.sheet_id))
                        })?;
                    for row in append.rows {
                        target
                            .rows
                            .push(row.texts().into_iter().map(String::from).collect());
                    }
                    replies.push(SheetReply::default());
                }
            }
        }

        spreadsheets.insert(spreadsheet_id.to_string(), tabs);
        self.add_sheets.fetch_add(added, Ordering::SeqCst);

        Ok(BatchUpdateResponse { replies })
    }
}
