//! Google Sheets API client.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Deserialize;

use gdclient_auth::AuthorizedClient;
use gdclient_common::{Error, Result};

use crate::provider::{
    BatchUpdateResponse, SheetRequest, SheetTab, SpreadsheetStore, SpreadsheetStructure,
};

/// Google Sheets API base URL.
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetResponse>,
}

#[derive(Debug, Deserialize)]
struct SheetResponse {
    properties: SheetTab,
}

/// Google Sheets API client.
pub struct SheetsClient {
    client: AuthorizedClient,
}

impl SheetsClient {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound("Spreadsheet not found".to_string())),
            StatusCode::UNAUTHORIZED => Err(Error::Authentication(
                "Invalid or expired token".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(Error::PermissionDenied("Access denied".to_string())),
            StatusCode::BAD_REQUEST => Err(Error::InvalidInput(body)),
            _ => Err(Error::Network(format!("API error: {} - {}", status, body))),
        }
    }
}

#[async_trait]
impl SpreadsheetStore for SheetsClient {
    async fn get_structure(&self, spreadsheet_id: &str) -> Result<SpreadsheetStructure> {
        let url = format!("{}/{}", SHEETS_API_BASE, spreadsheet_id);
        let auth = self.client.bearer().await?;

        let response = self
            .client
            .http()
            .get(&url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get spreadsheet: {}", e)))?;

        let spreadsheet: SpreadsheetResponse = Self::handle_response(response).await?;
        Ok(SpreadsheetStructure {
            tabs: spreadsheet.sheets.into_iter().map(|s| s.properties).collect(),
        })
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Vec<SheetRequest>,
    ) -> Result<BatchUpdateResponse> {
        let url = format!("{}/{}:batchUpdate", SHEETS_API_BASE, spreadsheet_id);
        let auth = self.client.bearer().await?;

        let body = serde_json::json!({ "requests": requests });

        let response = self
            .client
            .http()
            .post(&url)
            .header(header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to update spreadsheet: {}", e)))?;

        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_response_parsing() {
        // The API omits sheetId when it is zero
        let json = r#"{"sheets": [
            {"properties": {"title": "Sheet1"}},
            {"properties": {"sheetId": 42, "title": "Log"}}
        ]}"#;
        let parsed: SpreadsheetResponse = serde_json::from_str(json).unwrap();
        let tabs: Vec<SheetTab> = parsed.sheets.into_iter().map(|s| s.properties).collect();

        assert_eq!(tabs[0].sheet_id, 0);
        assert_eq!(tabs[1].sheet_id, 42);
        assert_eq!(tabs[1].title, "Log");
    }

    #[test]
    fn test_empty_spreadsheet_response() {
        let parsed: SpreadsheetResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.sheets.is_empty());
    }
}
