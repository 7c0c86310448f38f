//! Credential management for the Google Drive and Sheets helpers.
//!
//! This crate obtains an OAuth2 token pair, caches it on disk and hands out
//! an [`AuthorizedClient`] that attaches a fresh bearer token to every
//! request.
//!
//! # Token lifecycle
//! - A cached token file is used as-is when it deserializes
//! - Otherwise the interactive authorization-code flow runs once and the
//!   result is persisted with owner-only permissions
//! - Expired access tokens are refreshed on demand and re-persisted

pub mod client;
pub mod config;
pub mod flow;
pub mod manager;
pub mod token;

pub use client::AuthorizedClient;
pub use config::{AppConfig, DRIVE_SCOPE};
pub use flow::{get_authenticated_client, obtain_tokens, AuthorizationPrompt, ConsolePrompt};
pub use manager::{AuthManager, TokenEndpoint, TokenManager};
pub use token::{TokenStore, Tokens};
