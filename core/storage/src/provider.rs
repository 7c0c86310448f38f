//! Capability traits the ensure helpers depend on.
//!
//! The Drive and Sheets REST clients implement these, as do the in-memory
//! stores used in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use gdclient_common::{ResourceHandle, Result};

/// MIME type Drive uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Byte stream type for media uploads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Lookup by exact name under exact parent, optionally restricted to one MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub name: String,
    pub parent_id: String,
    pub mime_type: Option<String>,
}

impl FileQuery {
    pub fn new(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: parent_id.into(),
            mime_type: None,
        }
    }

    /// Restrict to folders.
    pub fn folders(mut self) -> Self {
        self.mime_type = Some(FOLDER_MIME_TYPE.to_string());
        self
    }

    /// Render as a Drive `q` expression.
    pub fn to_drive_query(&self) -> String {
        let mut clauses = Vec::with_capacity(4);
        if let Some(mime) = &self.mime_type {
            clauses.push(format!("mimeType = '{}'", escape_literal(mime)));
        }
        clauses.push(format!("name = '{}'", escape_literal(&self.name)));
        clauses.push(format!("'{}' in parents", escape_literal(&self.parent_id)));
        clauses.push("trashed = false".to_string());
        clauses.join(" and ")
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// File-storage capability (Drive).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Resources matching `query`, in backend order.
    async fn list(&self, query: &FileQuery) -> Result<Vec<ResourceHandle>>;

    /// Create an empty resource (a folder when `mime_type` is [`FOLDER_MIME_TYPE`]).
    async fn create(&self, name: &str, parent_id: &str, mime_type: &str) -> Result<ResourceHandle>;

    /// Create a file whose content is read from `stream`.
    ///
    /// The stream is consumed or dropped before this returns.
    async fn upload_media(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        stream: ByteStream,
    ) -> Result<ResourceHandle>;
}

/// Source of media bytes for uploads.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<ByteStream>;
}

/// A tab in a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetTab {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
}

/// The tabs of a spreadsheet, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetStructure {
    pub tabs: Vec<SheetTab>,
}

/// A single string cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub user_entered_value: ExtendedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    pub string_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowData {
    pub values: Vec<CellData>,
}

impl RowData {
    /// A row of plain-text cells, no numeric or date coercion.
    pub fn text<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|v| CellData {
                    user_entered_value: ExtendedValue {
                        string_value: v.into(),
                    },
                })
                .collect(),
        }
    }

    /// Cell texts in order.
    pub fn texts(&self) -> Vec<&str> {
        self.values
            .iter()
            .map(|c| c.user_entered_value.string_value.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddSheetRequest {
    pub properties: NewSheetProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSheetProperties {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendCellsRequest {
    pub sheet_id: i64,
    pub rows: Vec<RowData>,
    pub fields: String,
}

/// One operation of a spreadsheet batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetRequest {
    AddSheet(AddSheetRequest),
    AppendCells(AppendCellsRequest),
}

impl SheetRequest {
    pub fn add_sheet(title: impl Into<String>) -> Self {
        SheetRequest::AddSheet(AddSheetRequest {
            properties: NewSheetProperties {
                title: title.into(),
            },
        })
    }

    pub fn append_row(sheet_id: i64, row: RowData) -> Self {
        SheetRequest::AppendCells(AppendCellsRequest {
            sheet_id,
            rows: vec![row],
            fields: "*".to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddSheetReply {
    pub properties: SheetTab,
}

/// Reply to one request; empty for requests that return nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetReply {
    #[serde(default)]
    pub add_sheet: Option<AddSheetReply>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub replies: Vec<SheetReply>,
}

/// Spreadsheet capability (Sheets).
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    async fn get_structure(&self, spreadsheet_id: &str) -> Result<SpreadsheetStructure>;

    /// Apply `requests` atomically; one reply per request.
    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Vec<SheetRequest>,
    ) -> Result<BatchUpdateResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_folder_query() {
        let query = FileQuery::new("Photos", "root").folders();
        assert_eq!(
            query.to_drive_query(),
            "mimeType = 'application/vnd.google-apps.folder' and name = 'Photos' \
             and 'root' in parents and trashed = false"
        );
    }

    #[test]
    fn test_plain_query_has_no_mime_filter() {
        let query = FileQuery::new("a.jpg", "parent");
        assert_eq!(
            query.to_drive_query(),
            "name = 'a.jpg' and 'parent' in parents and trashed = false"
        );
    }

    #[test]
    fn test_query_escapes_quotes() {
        let query = FileQuery::new("Bob's \\ files", "root");
        assert!(query
            .to_drive_query()
            .contains("name = 'Bob\\'s \\\\ files'"));
    }

    #[test]
    fn test_add_sheet_wire_format() {
        let json = serde_json::to_value(SheetRequest::add_sheet("2024")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"addSheet": {"properties": {"title": "2024"}}})
        );
    }

    #[test]
    fn test_append_cells_wire_format() {
        let request = SheetRequest::append_row(7, RowData::text(["a", "42"]));
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"appendCells": {
                "sheetId": 7,
                "rows": [{"values": [
                    {"userEnteredValue": {"stringValue": "a"}},
                    {"userEnteredValue": {"stringValue": "42"}}
                ]}],
                "fields": "*"
            }})
        );
    }

    #[test]
    fn test_reply_parsing() {
        let json = r#"{"spreadsheetId": "s", "replies": [{}, {"addSheet": {"properties": {"sheetId": 99, "title": "new", "index": 3}}}]}"#;
        let response: BatchUpdateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.replies.len(), 2);
        assert!(response.replies[0].add_sheet.is_none());
        assert_eq!(
            response.replies[1].add_sheet.as_ref().unwrap().properties.sheet_id,
            99
        );
    }

    proptest! {
        #[test]
        fn escaped_names_never_close_the_literal(name in ".*") {
            let escaped = escape_literal(&name);
            // Every quote in the escaped text is preceded by an odd run of backslashes
            let bytes = escaped.as_bytes();
            for (i, b) in bytes.iter().enumerate() {
                if *b == b'\'' {
                    let run = bytes[..i].iter().rev().take_while(|c| **c == b'\\').count();
                    prop_assert!(run % 2 == 1);
                }
            }
        }
    }
}
