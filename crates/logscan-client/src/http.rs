//! [`HttpLogService`]: the processing service over plain HTTP/1.1.
//!
//! Built on `hyper-util`'s pooled client. No client-side deadline is applied:
//! a call runs until the service answers or the connection fails.

use crate::envelope::{
    decode_data, http_error, unwrap_envelope, SearchData, UploadData, EXPORT_FAILED,
    REQUEST_FAILED, UPLOAD_FAILED,
};
use crate::error::ClientError;
use crate::multipart::{encode_upload, UploadPayload};
use crate::LogService;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use logscan_core::{
    AvailableFields, ExportFormat, JobHandle, JobProgress, JobSummary, ResultPage, SearchRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

const JSON: &str = "application/json";

/// HTTP implementation of [`LogService`].
#[derive(Clone)]
pub struct HttpLogService {
    base: Url,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl std::fmt::Debug for HttpLogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLogService")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl HttpLogService {
    /// `base_url` is the service root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Join path segments (each percent-encoded) and query pairs onto the base.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Uri, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::BaseUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.as_str().parse()?)
    }

    async fn send(
        &self,
        method: Method,
        uri: Uri,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<(StatusCode, Bytes), ClientError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri.clone())
            .header(ACCEPT, "*/*");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let request = builder.body(Full::new(body))?;

        let response = self.client.request(request).await.map_err(|e| {
            tracing::debug!(%method, %uri, error = %e, "request failed");
            e
        })?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        tracing::debug!(%method, %uri, status = status.as_u16(), bytes = body.len(), "response");
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(&self, uri: Uri) -> Result<T, ClientError> {
        let (status, body) = self.send(Method::GET, uri, None, Bytes::new()).await?;
        if !status.is_success() {
            return Err(http_error(status.as_u16(), &body, None));
        }
        decode_data(&body)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        uri: Uri,
        payload: &B,
    ) -> Result<T, ClientError> {
        let body = Bytes::from(serde_json::to_vec(payload)?);
        let (status, body) = self.send(Method::POST, uri, Some(JSON), body).await?;
        if !status.is_success() {
            return Err(http_error(status.as_u16(), &body, None));
        }
        decode_data(&body)
    }
}

#[derive(Serialize)]
struct ExportBody<'a> {
    query: &'a SearchRequest,
}

#[async_trait::async_trait]
impl LogService for HttpLogService {
    async fn upload(
        &self,
        payload: &UploadPayload,
        timestamp_format: Option<&str>,
    ) -> Result<JobHandle, ClientError> {
        let form = encode_upload(payload, timestamp_format).await?;
        let uri = self.endpoint(&["logs", "upload"], &[])?;
        let (status, body) = self
            .send(Method::POST, uri, Some(&form.content_type), form.body)
            .await?;
        if !status.is_success() {
            return Err(http_error(status.as_u16(), &body, Some(UPLOAD_FAILED)));
        }

        let raw = unwrap_envelope(&body, UPLOAD_FAILED)?;
        let data: UploadData = serde_json::from_value(raw.clone())?;
        if data.job_id.is_empty() {
            return Err(ClientError::Rejected(UPLOAD_FAILED.to_string()));
        }
        Ok(JobHandle {
            job_id: data.job_id,
            file_name: data.file_name.unwrap_or_else(|| payload.file_name.clone()),
            file_size: data.file_size.unwrap_or(payload.len() as u64),
            raw,
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobProgress, ClientError> {
        self.get_json(self.endpoint(&["logs", "status", job_id], &[])?).await
    }

    async fn job_result(&self, job_id: &str) -> Result<serde_json::Value, ClientError> {
        let uri = self.endpoint(&["logs", "result", job_id], &[])?;
        let (status, body) = self.send(Method::GET, uri, None, Bytes::new()).await?;
        if !status.is_success() {
            return Err(http_error(status.as_u16(), &body, None));
        }
        // Either an envelope or the processed content itself.
        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(value) if value.get("success").is_some() => unwrap_envelope(&body, REQUEST_FAILED),
            Ok(value) => Ok(value),
            Err(_) => Ok(serde_json::Value::String(
                String::from_utf8_lossy(&body).into_owned(),
            )),
        }
    }

    async fn search(&self, request: &SearchRequest) -> Result<ResultPage, ClientError> {
        let data: SearchData = self
            .post_json(self.endpoint(&["logs", "search"], &[])?, request)
            .await?;
        Ok(data.into())
    }

    async fn job_summary(&self, job_id: &str) -> Result<JobSummary, ClientError> {
        self.get_json(self.endpoint(&["logs", "job", job_id, "summary"], &[])?)
            .await
    }

    async fn available_fields(&self, job_id: &str) -> Result<AvailableFields, ClientError> {
        self.get_json(self.endpoint(&["logs", "job", job_id, "fields"], &[])?)
            .await
    }

    async fn level_distribution(&self, job_id: &str) -> Result<serde_json::Value, ClientError> {
        self.get_json(self.endpoint(&["logs", "job", job_id, "levels"], &[])?)
            .await
    }

    async fn timeline(
        &self,
        job_id: &str,
        interval: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let uri = self.endpoint(
            &["logs", "job", job_id, "timeline"],
            &[("interval", interval)],
        )?;
        self.get_json(uri).await
    }

    async fn field_values(
        &self,
        job_id: &str,
        field: &str,
        limit: u32,
    ) -> Result<serde_json::Value, ClientError> {
        let limit = limit.to_string();
        let uri = self.endpoint(
            &["logs", "job", job_id, "fields", field],
            &[("limit", &limit)],
        )?;
        self.get_json(uri).await
    }

    async fn context_lines(
        &self,
        job_id: &str,
        line_number: u64,
        before: u32,
        after: u32,
    ) -> Result<serde_json::Value, ClientError> {
        let line = line_number.to_string();
        let (before, after) = (before.to_string(), after.to_string());
        let uri = self.endpoint(
            &["logs", "job", job_id, "context", &line],
            &[("before", &before), ("after", &after)],
        )?;
        self.get_json(uri).await
    }

    async fn export(
        &self,
        job_id: &str,
        format: ExportFormat,
        request: &SearchRequest,
    ) -> Result<Bytes, ClientError> {
        let uri = self.endpoint(
            &["logs", "job", job_id, "export"],
            &[("format", format.as_str())],
        )?;
        let body = Bytes::from(serde_json::to_vec(&ExportBody { query: request })?);
        let (status, body) = self.send(Method::POST, uri, Some(JSON), body).await?;
        if !status.is_success() {
            return Err(http_error(status.as_u16(), &body, Some(EXPORT_FAILED)));
        }
        Ok(body)
    }
}
