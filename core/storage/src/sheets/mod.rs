//! Google Sheets backend.

pub mod client;
pub mod service;

pub use client::SheetsClient;
pub use service::SheetsService;
