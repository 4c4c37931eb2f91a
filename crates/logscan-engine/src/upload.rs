//! Upload coordinator: submit a payload and hand back a job handle.

use logscan_client::{ClientError, LogService, UploadPayload};
use logscan_core::{JobHandle, TimestampFormat};
use std::sync::Arc;

/// Message for an upload attempted with no content.
pub const NOTHING_TO_UPLOAD: &str = "Nothing to upload";

pub struct UploadCoordinator {
    service: Arc<dyn LogService>,
}

impl UploadCoordinator {
    pub fn new(service: Arc<dyn LogService>) -> Self {
        Self { service }
    }

    /// Submit `payload`. The timestamp format is sent unless it is a blank
    /// custom pattern. The payload is only borrowed, so a failed upload can be
    /// retried with the same value.
    pub async fn upload(
        &self,
        payload: &UploadPayload,
        timestamp_format: &TimestampFormat,
    ) -> Result<JobHandle, ClientError> {
        if payload.is_empty() {
            return Err(ClientError::Rejected(NOTHING_TO_UPLOAD.to_string()));
        }

        tracing::debug!(
            file_name = %payload.file_name,
            bytes = payload.len(),
            format = %timestamp_format,
            "uploading"
        );
        match self
            .service
            .upload(payload, timestamp_format.wire_value())
            .await
        {
            Ok(handle) => {
                tracing::info!(
                    job_id = %handle.job_id,
                    file_name = %handle.file_name,
                    file_size = handle.file_size,
                    "upload accepted"
                );
                Ok(handle)
            }
            Err(e) => {
                tracing::error!(file_name = %payload.file_name, error = %e, "upload failed");
                Err(e)
            }
        }
    }
}
