//! Sheet-tab and row helpers over a [`SpreadsheetStore`].

use std::sync::Arc;

use gdclient_auth::AuthorizedClient;
use gdclient_common::{Ensured, Error, ResourceHandle, ResourceKind, Result};

use crate::ensure::{normalize_parent, Ensurer};
use crate::provider::{RowData, SheetRequest, SheetTab, SpreadsheetStore};

use super::client::SheetsClient;

/// Sheets helpers for one session.
///
/// Tab ensures made through the same instance are serialized: the structure
/// read and the conditional add run under one lock.
pub struct SheetsService {
    store: Arc<dyn SpreadsheetStore>,
    default_spreadsheet: Option<String>,
    ensurer: Ensurer,
}

impl SheetsService {
    pub fn new(store: Arc<dyn SpreadsheetStore>) -> Self {
        Self {
            store,
            default_spreadsheet: None,
            ensurer: Ensurer::new(),
        }
    }

    /// Service backed by the Sheets REST API.
    pub fn from_client(client: AuthorizedClient) -> Self {
        Self::new(Arc::new(SheetsClient::new(client)))
    }

    /// Spreadsheet used when a call passes an empty spreadsheet id.
    pub fn with_default_spreadsheet(mut self, spreadsheet_id: impl Into<String>) -> Self {
        self.default_spreadsheet = Some(spreadsheet_id.into());
        self
    }

    fn resolve_spreadsheet<'a>(&'a self, spreadsheet_id: &'a str) -> Result<&'a str> {
        let resolved = normalize_parent(
            spreadsheet_id,
            self.default_spreadsheet.as_deref().unwrap_or_default(),
        );
        if resolved.is_empty() {
            return Err(Error::InvalidInput(
                "spreadsheet id is empty and no default is configured".to_string(),
            ));
        }
        Ok(resolved)
    }

    /// First tab titled `name`, if any.
    pub async fn find_sheet(&self, name: &str, spreadsheet_id: &str) -> Result<Option<SheetTab>> {
        let spreadsheet_id = self.resolve_spreadsheet(spreadsheet_id)?;
        let structure = self.store.get_structure(spreadsheet_id).await?;
        Ok(structure.tabs.into_iter().find(|tab| tab.title == name))
    }

    /// Return the tab titled `name`, adding it if absent.
    ///
    /// When several tabs share the title, the first one the API lists wins.
    pub async fn ensure_sheet(&self, name: &str, spreadsheet_id: &str) -> Result<Ensured> {
        let spreadsheet_id = self.resolve_spreadsheet(spreadsheet_id)?;
        self.ensurer
            .ensure(
                ResourceKind::SheetTab,
                name,
                move || async move {
                    let found = self.find_sheet(name, spreadsheet_id).await?;
                    Ok::<_, Error>(found.map(|tab| tab_handle(tab, spreadsheet_id)))
                },
                move || async move {
                    let tab = self.add_sheet(name, spreadsheet_id).await?;
                    Ok::<_, Error>(tab_handle(tab, spreadsheet_id))
                },
            )
            .await
    }

    async fn add_sheet(&self, name: &str, spreadsheet_id: &str) -> Result<SheetTab> {
        let response = self
            .store
            .batch_update(spreadsheet_id, vec![SheetRequest::add_sheet(name)])
            .await?;

        response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|reply| reply.properties)
            .ok_or_else(|| {
                Error::Storage(format!("No addSheet reply for tab '{}'", name))
            })
    }

    /// Append one row of plain-text cells to a tab.
    ///
    /// No deduplication: repeating the call appends another row.
    pub async fn append_row<I, S>(&self, spreadsheet_id: &str, sheet_id: i64, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spreadsheet_id = self.resolve_spreadsheet(spreadsheet_id)?;
        let row = RowData::text(values);
        tracing::debug!(spreadsheet_id, sheet_id, cells = row.values.len(), "Appending row");

        self.store
            .batch_update(spreadsheet_id, vec![SheetRequest::append_row(sheet_id, row)])
            .await?;
        Ok(())
    }
}

fn tab_handle(tab: SheetTab, spreadsheet_id: &str) -> ResourceHandle {
    ResourceHandle::new(
        tab.sheet_id.to_string(),
        tab.title,
        spreadsheet_id,
        ResourceKind::SheetTab,
    )
}
