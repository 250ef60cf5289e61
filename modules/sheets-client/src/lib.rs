pub mod error;
pub mod types;

pub use error::{Result, SheetsError};
pub use types::{UpdateValuesResponse, ValueRange};

use url::Url;

const BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Google Sheets values client. Takes an already-issued OAuth access token;
/// minting one from service-account credentials happens elsewhere.
pub struct SheetsClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Read a range as rows of text.
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(spreadsheet_id, range)?;
        tracing::debug!(spreadsheet_id, range, "Reading sheet values");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let value_range: ValueRange = resp.json().await?;
        let rows = value_range.into_string_rows();
        tracing::info!(spreadsheet_id, range, rows = rows.len(), "Read sheet values");
        Ok(rows)
    }

    /// Overwrite a range starting at its top-left cell. Values are stored as-is (`RAW`).
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<UpdateValuesResponse> {
        let mut url = self.values_url(spreadsheet_id, range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = ValueRange::rows(range, rows);
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let updated: UpdateValuesResponse = resp.json().await?;
        tracing::info!(
            spreadsheet_id,
            range = updated.updated_range.as_deref().unwrap_or(range),
            cells = updated.updated_cells.unwrap_or(0),
            "Updated sheet values"
        );
        Ok(updated)
    }

    /// `{base}/spreadsheets/{id}/values/{range}` with each segment percent-encoded,
    /// so sheet names with spaces survive.
    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(format!("cannot be a base URL: {}", self.base_url)))?
            .extend(["spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }
}

/// Sheet name as it must appear in A1 notation: bare identifiers as-is,
/// anything else single-quoted with embedded quotes doubled.
pub fn quote_sheet_name(sheet: &str) -> String {
    let bare = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// A1-notation range for `cell` on `sheet`, e.g. `'Q3 Leads'!A1`.
pub fn a1_range(sheet: &str, cell: &str) -> String {
    format!("{}!{cell}", quote_sheet_name(sheet))
}
