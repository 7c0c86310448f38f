//! gdclient CLI - Drive folders, uploads and Sheets rows from the command line.
//!
//! Every command authorizes first: a cached token is reused, otherwise the
//! browser authorization flow runs once and the token is cached.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gdclient_auth::{
    get_authenticated_client, AppConfig, AuthorizationPrompt, AuthorizedClient, ConsolePrompt,
    TokenStore,
};
use gdclient_storage::{DriveService, SheetsService};

#[derive(Parser)]
#[command(name = "gdclient")]
#[command(about = "Idempotent helpers for Google Drive and Sheets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// OAuth client secret file.
    #[arg(long, default_value = "credentials.json")]
    credentials: PathBuf,

    /// Token cache file.
    #[arg(long, default_value = "token.json")]
    token: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize and cache a token without doing anything else.
    Auth,

    /// Create a folder unless one with the same name exists.
    Mkdir {
        /// Folder name.
        #[arg(short, long)]
        name: String,

        /// Parent folder ID (default: root).
        #[arg(short, long, default_value = "")]
        parent: String,
    },

    /// Check whether a file exists in a folder.
    Exists {
        /// File name.
        #[arg(short, long)]
        name: String,

        /// Parent folder ID (default: root).
        #[arg(short, long, default_value = "")]
        parent: String,
    },

    /// Upload an image from a URL.
    Upload {
        /// Name of the new file.
        #[arg(short, long)]
        name: String,

        /// Parent folder ID (default: root).
        #[arg(short, long, default_value = "")]
        parent: String,

        /// Source URL.
        #[arg(short, long)]
        url: String,

        /// MIME type to tag the file with.
        #[arg(short, long, default_value = "image/jpeg")]
        mime_type: String,
    },

    /// Add a tab to a spreadsheet unless one with the same title exists.
    EnsureSheet {
        /// Spreadsheet ID.
        #[arg(short, long)]
        spreadsheet: String,

        /// Tab title.
        #[arg(short, long)]
        name: String,
    },

    /// Append one row of text cells to a tab.
    AppendRow {
        /// Spreadsheet ID.
        #[arg(short, long)]
        spreadsheet: String,

        /// Numeric tab ID.
        #[arg(long)]
        sheet_id: i64,

        /// Cell values, in order.
        #[arg(required = true)]
        values: Vec<String>,
    },
}

/// Console prompt that also tries to open the URL in a browser.
struct BrowserPrompt;

#[async_trait]
impl AuthorizationPrompt for BrowserPrompt {
    async fn authorization_code(&self, auth_url: &str) -> gdclient_common::Result<String> {
        if let Err(e) = open::that(auth_url) {
            tracing::debug!("Could not open browser: {}", e);
        }
        ConsolePrompt.authorization_code(auth_url).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = authorize(&cli.credentials, &cli.token).await?;

    match cli.command {
        Commands::Auth => {
            println!("Authorized. Token cached at {}", cli.token.display());
            Ok(())
        }

        Commands::Mkdir { name, parent } => cmd_mkdir(client, &name, &parent).await,

        Commands::Exists { name, parent } => cmd_exists(client, &name, &parent).await,

        Commands::Upload {
            name,
            parent,
            url,
            mime_type,
        } => cmd_upload(client, &name, &parent, &url, &mime_type).await,

        Commands::EnsureSheet { spreadsheet, name } => {
            cmd_ensure_sheet(client, &spreadsheet, &name).await
        }

        Commands::AppendRow {
            spreadsheet,
            sheet_id,
            values,
        } => cmd_append_row(client, &spreadsheet, sheet_id, values).await,
    }
}

/// Load the client config and obtain an authorized client.
async fn authorize(credentials: &Path, token: &Path) -> Result<AuthorizedClient> {
    let config = AppConfig::from_file(credentials).context("Unable to load client secret file")?;
    let store = TokenStore::new(token);

    get_authenticated_client(config, store, &BrowserPrompt)
        .await
        .context("Authorization failed")
}

/// Ensure a folder exists.
async fn cmd_mkdir(client: AuthorizedClient, name: &str, parent: &str) -> Result<()> {
    let drive = DriveService::from_client(client);

    let ensured = drive
        .ensure_folder(name, parent)
        .await
        .context("Failed to ensure folder")?;

    if ensured.created {
        println!("Created folder: {}", ensured.handle);
    } else {
        println!("Folder already exists: {}", ensured.handle);
    }
    println!("{}", ensured.id());

    Ok(())
}

/// Report whether a file exists.
async fn cmd_exists(client: AuthorizedClient, name: &str, parent: &str) -> Result<()> {
    let drive = DriveService::from_client(client);

    let exists = drive
        .file_exists(name, parent)
        .await
        .context("Failed to look up file")?;

    println!("{}", exists);

    Ok(())
}

/// Upload media from a URL.
async fn cmd_upload(
    client: AuthorizedClient,
    name: &str,
    parent: &str,
    url: &str,
    mime_type: &str,
) -> Result<()> {
    info!("Uploading {} as {}", url, name);

    let drive = DriveService::from_client(client);

    let handle = drive
        .upload_media_as(name, parent, url, mime_type)
        .await
        .context("Failed to upload media")?;

    println!("Uploaded: {}", handle);
    println!("{}", handle.id);

    Ok(())
}

/// Ensure a spreadsheet tab exists.
async fn cmd_ensure_sheet(client: AuthorizedClient, spreadsheet: &str, name: &str) -> Result<()> {
    let sheets = SheetsService::from_client(client);

    let ensured = sheets
        .ensure_sheet(name, spreadsheet)
        .await
        .context("Failed to ensure sheet tab")?;

    if ensured.created {
        println!("Created tab: {}", ensured.handle);
    } else {
        println!("Tab already exists: {}", ensured.handle);
    }
    println!("{}", ensured.id());

    Ok(())
}

/// Append a row of text cells.
async fn cmd_append_row(
    client: AuthorizedClient,
    spreadsheet: &str,
    sheet_id: i64,
    values: Vec<String>,
) -> Result<()> {
    let sheets = SheetsService::from_client(client);
    let count = values.len();

    sheets
        .append_row(spreadsheet, sheet_id, values)
        .await
        .context("Failed to append row")?;

    println!("Appended row with {} cells", count);

    Ok(())
}
