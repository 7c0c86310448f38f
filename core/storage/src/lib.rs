//! Drive and Sheets helpers with idempotent create semantics.
//!
//! The services here depend on capability traits rather than concrete API
//! clients, so the same ensure logic runs against the REST clients and the
//! in-memory stores.
//!
//! # Guarantees
//! - `ensure_*` calls sharing one service instance never create duplicates
//! - Uploads and row appends are never deduplicated
//! - Errors from the backing store are returned unchanged, without retry

pub mod ensure;
pub mod gdrive;
pub mod memory;
pub mod provider;
pub mod sheets;

pub use ensure::Ensurer;
pub use gdrive::{DriveClient, DriveService, HttpMediaSource, ROOT_FOLDER_ID};
pub use memory::{MemoryFileStore, MemoryMediaSource, MemorySpreadsheetStore};
pub use provider::{
    ByteStream, FileQuery, FileStore, MediaSource, SheetRequest, SheetTab, SpreadsheetStore,
    SpreadsheetStructure, FOLDER_MIME_TYPE,
};
pub use sheets::{SheetsClient, SheetsService};
