//! Common utilities and types shared across the gdclient crates.
//!
//! This module provides the error taxonomy and the resource handle types
//! returned by the Drive and Sheets helpers.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Ensured, ResourceHandle, ResourceKind};
