//! Response envelopes and their translation into [`ClientError`]s.
//!
//! Every JSON endpoint answers `{success, message, data}`. A non-2xx status or
//! `success: false` becomes an error carrying the payload's message when there
//! is one.

use crate::error::ClientError;
use logscan_core::types::null_as_default;
use logscan_core::{LogEntry, ResultPage, SearchSummary};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub(crate) const REQUEST_FAILED: &str = "Request failed";
pub(crate) const UPLOAD_FAILED: &str = "Upload failed";
pub(crate) const EXPORT_FAILED: &str = "Export failed";

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `data` of a search response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchData {
    #[serde(deserialize_with = "null_as_default")]
    pub logs: Vec<LogEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub pagination: Pagination,
    pub summary: Option<SearchSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    #[serde(deserialize_with = "null_as_default")]
    pub total_elements: u64,
}

impl From<SearchData> for ResultPage {
    fn from(data: SearchData) -> Self {
        ResultPage {
            logs: data.logs,
            total_elements: data.pagination.total_elements,
            summary: data.summary,
        }
    }
}

/// `data` of an upload response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadData {
    #[serde(deserialize_with = "null_as_default")]
    pub job_id: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

/// Pick the most specific message out of an error payload.
fn payload_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| value.pointer("/data/message").and_then(|m| m.as_str()))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Error for a non-2xx response.
pub(crate) fn http_error(status: u16, body: &[u8], fallback: Option<&str>) -> ClientError {
    let message = payload_message(body)
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| format!("HTTP error {status}"));
    ClientError::Http { status, message }
}

/// Decode an envelope and return its `data`, or the rejection it carries.
pub(crate) fn unwrap_envelope(body: &[u8], fallback: &str) -> Result<serde_json::Value, ClientError> {
    let envelope: ApiResponse = serde_json::from_slice(body)?;
    if !envelope.success {
        let message = envelope
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        return Err(ClientError::Rejected(message));
    }
    Ok(envelope.data)
}

pub(crate) fn decode_data<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    let data = unwrap_envelope(body, REQUEST_FAILED)?;
    Ok(serde_json::from_value(data)?)
}
