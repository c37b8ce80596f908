use super::multipart::{file_form, new_boundary};
use super::{
    PreprocessAck, PreprocessRequest, PreviewPage, RemoteError, ResultsPayload, RunService,
    SplitAck, SplitRequest, TrainAck, TrainRequest, UploadFile, UploadReceipt,
};
use crate::config::Settings;
use crate::shared::ids::RunId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const UPLOAD_FAILED: &str = "Upload failed. Please try again.";
const PREVIEW_FAILED: &str = "Failed to load data preview.";
const PREPROCESS_FAILED: &str = "Preprocessing failed.";
const SPLIT_FAILED: &str = "Splitting failed.";
const TRAIN_FAILED: &str = "Training failed.";
const RESULTS_FAILED: &str = "Failed to fetch results.";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// `RunService` over the backend's HTTP/JSON api.
#[derive(Debug, Clone)]
pub struct HttpRunService {
    api_base: String,
    agent: ureq::Agent,
}

impl HttpRunService {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self::with_timeout(api_base, None)
    }

    pub fn with_timeout(api_base: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            api_base: api_base.into(),
            agent: builder.build(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_timeout(
            settings.api_base.clone(),
            settings.request_timeout_seconds.map(Duration::from_secs),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn run_path(prefix: &str, run_id: &RunId) -> String {
        format!("{prefix}/{}", urlencoding::encode(run_id.as_str()))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        fallback: &str,
    ) -> Result<T, RemoteError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }
        tracing::debug!(%url, "remote GET");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| remote_error(e, fallback))?;
        decode_body(response, fallback)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, RemoteError> {
        let url = self.endpoint(path);
        let body = serde_json::to_value(body)
            .map_err(|e| RemoteError::new(None, format!("{fallback} ({e})")))?;
        tracing::debug!(%url, "remote POST");
        let response = self
            .agent
            .post(&url)
            .send_json(body)
            .map_err(|e| remote_error(e, fallback))?;
        decode_body(response, fallback)
    }
}

fn decode_body<T: DeserializeOwned>(
    response: ureq::Response,
    fallback: &str,
) -> Result<T, RemoteError> {
    let status = response.status();
    response.into_json::<T>().map_err(|e| {
        RemoteError::new(
            Some(status),
            format!("{fallback} (invalid response body: {e})"),
        )
    })
}

fn remote_error(err: ureq::Error, fallback: &str) -> RemoteError {
    match err {
        ureq::Error::Status(code, response) => {
            let message = response
                .into_json::<ErrorBody>()
                .ok()
                .and_then(|body| body.error)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());
            RemoteError::new(Some(code), message)
        }
        ureq::Error::Transport(transport) => {
            RemoteError::new(None, format!("{fallback} ({transport})"))
        }
    }
}

impl RunService for HttpRunService {
    fn submit_upload(&self, file: &UploadFile) -> Result<UploadReceipt, RemoteError> {
        let url = self.endpoint("api/upload");
        let form = file_form("file", file, &new_boundary());
        tracing::debug!(%url, filename = %file.filename, bytes = file.bytes.len(), "remote upload");
        let response = self
            .agent
            .post(&url)
            .set("Content-Type", &form.content_type)
            .send_bytes(&form.bytes)
            .map_err(|e| remote_error(e, UPLOAD_FAILED))?;
        decode_body(response, UPLOAD_FAILED)
    }

    fn fetch_preview(
        &self,
        run_id: &RunId,
        page: u32,
        limit: u32,
    ) -> Result<PreviewPage, RemoteError> {
        self.get_json(
            &Self::run_path("api/preview", run_id),
            &[("page", page.to_string()), ("limit", limit.to_string())],
            PREVIEW_FAILED,
        )
    }

    fn submit_preprocess(
        &self,
        request: &PreprocessRequest,
    ) -> Result<PreprocessAck, RemoteError> {
        self.post_json("api/preprocess", request, PREPROCESS_FAILED)
    }

    fn submit_split(&self, request: &SplitRequest) -> Result<SplitAck, RemoteError> {
        self.post_json("api/split", request, SPLIT_FAILED)
    }

    fn submit_train(&self, request: &TrainRequest) -> Result<TrainAck, RemoteError> {
        self.post_json("api/train", request, TRAIN_FAILED)
    }

    fn fetch_results(&self, run_id: &RunId) -> Result<ResultsPayload, RemoteError> {
        self.get_json(
            &Self::run_path("api/results", run_id),
            &[],
            RESULTS_FAILED,
        )
    }
}
