pub mod error;
pub mod input;
pub mod orchestrator;
pub mod paging;
pub mod report;
pub mod run_store;
pub mod stage;
pub mod validators;

pub use error::{ContractViolation, PipelineError, ValidationError};
pub use input::{
    SplitRatio, StageDraft, StageInput, DEFAULT_TEST_FRACTION, SPLIT_SLIDER_MAX,
    SPLIT_SLIDER_MIN, SPLIT_SLIDER_STEP,
};
pub use orchestrator::{
    preview_key, report_key, AdvanceOutcome, PendingAdvance, PipelineOrchestrator, RemoteCall,
    RemoteOutput,
};
pub use paging::{
    clamp_page, Page, PageOutcome, PageSource, PageTicket, PageView, PageWindow,
    PagedFetchController,
};
pub use report::{format_metric, format_percent, ReportRow, ResultsReport};
pub use run_store::{Run, RunStateStore, StagePayload};
pub use stage::{ProgressStep, Stage, StageKey, PROGRESS_STEP_LABELS};
