//! Upload payloads and their `multipart/form-data` encoding.
//!
//! The upload endpoint expects the log under the `logfile` field and an
//! optional `timestampFormat` text field.

use crate::error::ClientError;
use bytes::{Bytes, BytesMut};
use common_multipart_rfc7578::client::multipart::{Body, Form};
use futures::TryStreamExt;
use mime::Mime;
use std::io::Cursor;
use std::path::Path;

pub const FILE_FIELD: &str = "logfile";
pub const FORMAT_FIELD: &str = "timestampFormat";

/// File name given to pasted text.
pub const PASTED_FILE_NAME: &str = "pasted-logs.txt";

/// The bytes to submit for processing, with the name the service will see.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadPayload {
    /// Wrap pasted text as a plain-text blob.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            file_name: PASTED_FILE_NAME.to_string(),
            content_type: "text/plain".to_string(),
            bytes: Bytes::from(text.into()),
        }
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/octet-stream".to_string(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk; the payload is named after the file.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.log".to_string());
        Ok(Self::from_bytes(file_name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An encoded form body and the `Content-Type` header that goes with it.
#[derive(Debug)]
pub(crate) struct FormBody {
    pub content_type: String,
    pub body: Bytes,
}

/// Encode `payload` under `logfile`, plus `timestampFormat` when given.
pub(crate) async fn encode_upload(
    payload: &UploadPayload,
    timestamp_format: Option<&str>,
) -> Result<FormBody, ClientError> {
    let mime = payload
        .content_type
        .parse::<Mime>()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);

    let mut form = Form::default();
    form.add_reader_file_with_mime(
        FILE_FIELD,
        Cursor::new(payload.bytes.clone()),
        payload.file_name.clone(),
        mime,
    );
    if let Some(format) = timestamp_format {
        form.add_text(FORMAT_FIELD, format);
    }
    let content_type = form.content_type();

    let body = Body::from(form)
        .try_fold(BytesMut::with_capacity(payload.len() + 512), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .map_err(|e| ClientError::Multipart(e.to_string()))?;

    Ok(FormBody {
        content_type,
        body: body.freeze(),
    })
}
