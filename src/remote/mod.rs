//! Typed client for the remote run service.
//!
//! One call per backend capability. Calls carry no retry logic and no state; the
//! pipeline orchestrator decides when, and whether, to repeat one.

pub mod http;
mod multipart;
pub mod types;

pub use http::HttpRunService;
pub use types::{
    ModelKind, PreprocessAck, PreprocessRequest, PreprocessStep, PreviewPage, PreviewRow,
    ResultsPayload, SplitAck, SplitRequest, TrainAck, TrainRequest, UploadFile, UploadReceipt,
};

use crate::shared::ids::RunId;
use std::sync::Arc;

/// Failure of a remote call. `message` is surfaced to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub code: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub trait RunService {
    fn submit_upload(&self, file: &UploadFile) -> Result<UploadReceipt, RemoteError>;

    fn fetch_preview(
        &self,
        run_id: &RunId,
        page: u32,
        limit: u32,
    ) -> Result<PreviewPage, RemoteError>;

    fn submit_preprocess(&self, request: &PreprocessRequest)
        -> Result<PreprocessAck, RemoteError>;

    fn submit_split(&self, request: &SplitRequest) -> Result<SplitAck, RemoteError>;

    fn submit_train(&self, request: &TrainRequest) -> Result<TrainAck, RemoteError>;

    fn fetch_results(&self, run_id: &RunId) -> Result<ResultsPayload, RemoteError>;
}

impl<T: RunService + ?Sized> RunService for Arc<T> {
    fn submit_upload(&self, file: &UploadFile) -> Result<UploadReceipt, RemoteError> {
        (**self).submit_upload(file)
    }

    fn fetch_preview(
        &self,
        run_id: &RunId,
        page: u32,
        limit: u32,
    ) -> Result<PreviewPage, RemoteError> {
        (**self).fetch_preview(run_id, page, limit)
    }

    fn submit_preprocess(
        &self,
        request: &PreprocessRequest,
    ) -> Result<PreprocessAck, RemoteError> {
        (**self).submit_preprocess(request)
    }

    fn submit_split(&self, request: &SplitRequest) -> Result<SplitAck, RemoteError> {
        (**self).submit_split(request)
    }

    fn submit_train(&self, request: &TrainRequest) -> Result<TrainAck, RemoteError> {
        (**self).submit_train(request)
    }

    fn fetch_results(&self, run_id: &RunId) -> Result<ResultsPayload, RemoteError> {
        (**self).fetch_results(run_id)
    }
}
