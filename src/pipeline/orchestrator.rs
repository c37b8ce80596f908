//! Stage state machine for one pipeline run.
//!
//! The orchestrator owns the run store and is the only caller of its mutation
//! primitives. `advance` moves forward one stage after at most one remote call,
//! `retreat` moves back one stage locally, and `reset` starts over. At most one
//! advance may be in flight at a time; navigation stays available meanwhile.

use crate::config::{Settings, DEFAULT_PREVIEW_PAGE_SIZE, DEFAULT_REPORT_PAGE_SIZE};
use crate::pipeline::error::{ContractViolation, PipelineError};
use crate::pipeline::input::StageInput;
use crate::pipeline::paging::{
    clamp_page, Page, PageOutcome, PageSource, PageView, PageWindow, PagedFetchController,
};
use crate::pipeline::report::{ReportRow, ResultsReport};
use crate::pipeline::run_store::{Run, RunStateStore, StagePayload};
use crate::pipeline::stage::Stage;
use crate::pipeline::validators;
use crate::remote::{
    PreprocessAck, PreprocessRequest, PreviewRow, RemoteError, RunService, SplitAck, SplitRequest,
    TrainAck, TrainRequest, UploadFile, UploadReceipt,
};
use crate::shared::ids::RunId;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

pub fn preview_key(run_id: &RunId) -> String {
    format!("preview:{run_id}")
}

pub fn report_key(run_id: &RunId) -> String {
    format!("report:{run_id}")
}

/// The single remote call an advance needs, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    None,
    Upload(UploadFile),
    Preprocess(PreprocessRequest),
    Split(SplitRequest),
    Train(TrainRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutput {
    None,
    Upload(UploadReceipt),
    Preprocess(PreprocessAck),
    Split(SplitAck),
    Train(TrainAck),
}

impl RemoteCall {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCall::None => "none",
            RemoteCall::Upload(_) => "upload",
            RemoteCall::Preprocess(_) => "preprocess",
            RemoteCall::Split(_) => "split",
            RemoteCall::Train(_) => "train",
        }
    }

    pub fn execute<S: RunService + ?Sized>(
        &self,
        service: &S,
    ) -> Result<RemoteOutput, RemoteError> {
        match self {
            RemoteCall::None => Ok(RemoteOutput::None),
            RemoteCall::Upload(file) => service.submit_upload(file).map(RemoteOutput::Upload),
            RemoteCall::Preprocess(request) => service
                .submit_preprocess(request)
                .map(RemoteOutput::Preprocess),
            RemoteCall::Split(request) => service.submit_split(request).map(RemoteOutput::Split),
            RemoteCall::Train(request) => service.submit_train(request).map(RemoteOutput::Train),
        }
    }
}

impl RemoteOutput {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOutput::None => "none",
            RemoteOutput::Upload(_) => "upload",
            RemoteOutput::Preprocess(_) => "preprocess",
            RemoteOutput::Split(_) => "split",
            RemoteOutput::Train(_) => "train",
        }
    }

    fn into_payload(self) -> StagePayload {
        let mut payload = StagePayload::new();
        match self {
            RemoteOutput::None => {}
            RemoteOutput::Upload(receipt) => {
                payload.insert("run_id".into(), Value::from(receipt.run_id.as_str()));
                payload.insert("filename".into(), Value::from(receipt.filename));
                payload.insert("rows".into(), Value::from(receipt.row_count));
                payload.insert("columns".into(), Value::from(receipt.column_count));
                payload.insert("column_names".into(), Value::from(receipt.column_names));
            }
            RemoteOutput::Preprocess(ack) => {
                payload.insert("message".into(), Value::from(ack.message));
                payload.insert("columns".into(), Value::from(ack.columns));
            }
            RemoteOutput::Split(ack) => {
                payload.insert("message".into(), Value::from(ack.message));
                payload.insert("train_rows".into(), optional_count(ack.train_rows));
                payload.insert("test_rows".into(), optional_count(ack.test_rows));
            }
            RemoteOutput::Train(ack) => {
                payload.insert("message".into(), Value::from(ack.message));
            }
        }
        payload
    }
}

fn optional_count(value: Option<u64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// An advance whose checks passed and whose remote call has not been applied yet.
///
/// Hand it back to [`PipelineOrchestrator::finish_advance`] with the call's result;
/// until then every other advance is rejected.
#[must_use = "an unfinished advance blocks every later advance"]
#[derive(Debug)]
pub struct PendingAdvance {
    ticket: u64,
    epoch: u64,
    origin: Stage,
    call: RemoteCall,
    partial: StagePayload,
}

impl PendingAdvance {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn origin(&self) -> Stage {
        self.origin
    }

    pub fn call(&self) -> &RemoteCall {
        &self.call
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The stage moved forward.
    Advanced { from: Stage, to: Stage },
    /// The user navigated away while the call ran; data was recorded, the stage kept.
    Recorded { stage: Stage },
    /// The run was reset while the call ran; nothing was applied.
    Discarded,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: u64,
    stage: Stage,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    store: RunStateStore,
    in_flight: Option<InFlight>,
    epoch: u64,
    next_ticket: u64,
    results: Option<ResultsReport>,
    results_generation: u64,
}

pub struct PipelineOrchestrator<S> {
    service: S,
    state: Mutex<OrchestratorState>,
    preview: PagedFetchController<PreviewRow>,
    report: PagedFetchController<ReportRow>,
    preview_page_size: u32,
    report_page_size: u32,
}

struct PreviewSource<'a, S: ?Sized> {
    service: &'a S,
    run_id: &'a RunId,
}

impl<S: RunService + ?Sized> PageSource<PreviewRow> for PreviewSource<'_, S> {
    fn fetch_page(&self, window: &PageWindow) -> Result<Page<PreviewRow>, RemoteError> {
        let page = self
            .service
            .fetch_preview(self.run_id, window.page_number, window.items_per_page)?;
        Ok(Page {
            items: page.rows,
            total_pages: page.total_pages,
        })
    }
}

impl<S: RunService> PipelineOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self::with_page_sizes(service, DEFAULT_PREVIEW_PAGE_SIZE, DEFAULT_REPORT_PAGE_SIZE)
    }

    pub fn with_page_sizes(service: S, preview_page_size: u32, report_page_size: u32) -> Self {
        Self {
            service,
            state: Mutex::new(OrchestratorState {
                next_ticket: 1,
                ..OrchestratorState::default()
            }),
            preview: PagedFetchController::new(),
            report: PagedFetchController::new(),
            preview_page_size: preview_page_size.max(1),
            report_page_size: report_page_size.max(1),
        }
    }

    pub fn from_settings(service: S, settings: &Settings) -> Self {
        Self::with_page_sizes(
            service,
            settings.preview_page_size,
            settings.report_page_size,
        )
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn preview_page_size(&self) -> u32 {
        self.preview_page_size
    }

    pub fn report_page_size(&self) -> u32 {
        self.report_page_size
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn snapshot(&self) -> Run {
        self.lock().store.snapshot()
    }

    pub fn current_stage(&self) -> Stage {
        self.lock().store.run().current_stage()
    }

    pub fn is_advance_in_flight(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Validates `input` for the current stage and reserves the single advance slot.
    pub fn begin_advance(&self, input: StageInput) -> Result<PendingAdvance, PipelineError> {
        let mut state = self.lock();
        let run = state.store.run();
        let current = run.current_stage();

        if let Some(in_flight) = state.in_flight {
            return Err(ContractViolation::AdvanceInFlight {
                stage: in_flight.stage,
            }
            .into());
        }
        if current.is_terminal() {
            return Err(ContractViolation::TerminalStage { stage: current }.into());
        }
        if input.stage() != current {
            return Err(ContractViolation::StageMismatch {
                current,
                supplied: input.stage(),
            }
            .into());
        }
        if current == Stage::Upload {
            if let Some(run_id) = run.run_id() {
                return Err(ContractViolation::RunAlreadyActive {
                    run_id: run_id.clone(),
                }
                .into());
            }
        }

        let (call, partial) = build_call(run, &input)?;
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.in_flight = Some(InFlight {
            ticket,
            stage: current,
        });
        tracing::debug!(stage = %current, call = call.name(), ticket, "advance started");
        Ok(PendingAdvance {
            ticket,
            epoch: state.epoch,
            origin: current,
            call,
            partial,
        })
    }

    /// Applies the result of a pending advance's remote call and releases the advance slot.
    pub fn finish_advance(
        &self,
        pending: PendingAdvance,
        result: Result<RemoteOutput, RemoteError>,
    ) -> Result<AdvanceOutcome, PipelineError> {
        let mut state = self.lock();
        match state.in_flight {
            Some(in_flight) if in_flight.ticket == pending.ticket => {}
            _ => {
                return Err(ContractViolation::UnknownPendingAdvance {
                    ticket: pending.ticket,
                }
                .into())
            }
        }
        state.in_flight = None;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(
                    stage = %pending.origin,
                    call = pending.call.name(),
                    error = %err,
                    "remote call failed; run unchanged"
                );
                return Err(err.into());
            }
        };
        if output.name() != pending.call.name() {
            return Err(ContractViolation::OutputMismatch {
                expected: pending.call.name(),
                received: output.name(),
            }
            .into());
        }
        if state.epoch != pending.epoch {
            tracing::info!(stage = %pending.origin, "response for a reset run discarded");
            return Ok(AdvanceOutcome::Discarded);
        }

        if let RemoteOutput::Upload(receipt) = &output {
            state.store.set_run_id(receipt.run_id.clone())?;
        }
        if let Some(key) = pending.origin.data_key() {
            let mut payload = output.into_payload();
            payload.extend(pending.partial);
            state.store.merge_stage_data(key, payload);
            self.invalidate_results(&mut state);
        }

        let current = state.store.run().current_stage();
        if current != pending.origin {
            tracing::info!(
                stage = %pending.origin,
                current = %current,
                "stage data recorded after navigation; stage kept"
            );
            return Ok(AdvanceOutcome::Recorded {
                stage: pending.origin,
            });
        }
        let Some(next) = current.next() else {
            return Err(ContractViolation::TerminalStage { stage: current }.into());
        };
        state.store.set_stage(next);
        tracing::info!(from = %current, to = %next, "stage advanced");
        Ok(AdvanceOutcome::Advanced {
            from: current,
            to: next,
        })
    }

    /// Checks, performs at most one remote call, then applies its result.
    pub fn advance(&self, input: StageInput) -> Result<AdvanceOutcome, PipelineError> {
        let pending = self.begin_advance(input)?;
        let result = pending.call().execute(&self.service);
        self.finish_advance(pending, result)
    }

    /// Moves back one stage without contacting the service. Stage 1 is the floor.
    pub fn retreat(&self) -> Stage {
        let mut state = self.lock();
        let current = state.store.run().current_stage();
        match current.previous() {
            Some(previous) => {
                state.store.set_stage(previous);
                tracing::info!(from = %current, to = %previous, "stage retreated");
                previous
            }
            None => current,
        }
    }

    /// Restores the initial run. An advance still in flight keeps the advance slot
    /// until it finishes; its result is then discarded.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        state.store.reset_all();
        self.invalidate_results(&mut state);
        self.preview.clear();
        tracing::info!(epoch = state.epoch, "run reset");
    }

    /// Fetches one preview page; `page_number` is clamped to the known page count.
    pub fn preview_page(&self, page_number: u32) -> Result<PageView<PreviewRow>, PipelineError> {
        let run_id = validators::preview_ready(self.lock().store.run())?.clone();
        let key = preview_key(&run_id);
        let page_number = clamp_page(page_number, self.preview.total_pages(&key));
        let source = PreviewSource {
            service: &self.service,
            run_id: &run_id,
        };
        let outcome = self.preview.fetch(
            &source,
            PageWindow::new(key.clone(), page_number, self.preview_page_size),
        );
        settled_view(&self.preview, &key, outcome)
    }

    /// Last preview state, including stale rows kept after a failed fetch.
    pub fn preview_view(&self) -> Option<PageView<PreviewRow>> {
        let run_id = self.lock().store.run().run_id().cloned()?;
        self.preview.view(&preview_key(&run_id))
    }

    /// Cached results describe the run as it was when fetched; any recorded stage output
    /// makes them stale.
    fn invalidate_results(&self, state: &mut OrchestratorState) {
        state.results = None;
        state.results_generation += 1;
        self.report.clear();
    }

    /// Reads results for the trained model. Rejected locally until training succeeded.
    pub fn fetch_results(&self) -> Result<ResultsReport, PipelineError> {
        let (run_id, generation) = {
            let state = self.lock();
            (
                validators::results_ready(state.store.run())?.clone(),
                state.results_generation,
            )
        };
        let payload = match self.service.fetch_results(&run_id) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(run_id = %run_id, error = %err, "results fetch failed");
                return Err(err.into());
            }
        };
        let report = ResultsReport::from_payload(payload);
        let mut state = self.lock();
        if state.results_generation == generation {
            state.results = Some(report.clone());
        }
        tracing::info!(run_id = %run_id, rows = report.rows.len(), "results loaded");
        Ok(report)
    }

    pub fn results(&self) -> Option<ResultsReport> {
        self.lock().results.clone()
    }

    /// One page of classification report rows, loading results first when needed.
    pub fn report_page(&self, page_number: u32) -> Result<PageView<ReportRow>, PipelineError> {
        let report = match self.results() {
            Some(report) => report,
            None => self.fetch_results()?,
        };
        let run_id = validators::results_ready(self.lock().store.run())?.clone();
        let key = report_key(&run_id);
        let total = report.total_pages(self.report_page_size);
        let page_number = clamp_page(page_number, Some(total));
        let outcome = self.report.fetch(
            &report,
            PageWindow::new(key.clone(), page_number, self.report_page_size),
        );
        settled_view(&self.report, &key, outcome)
    }

    pub fn report_view(&self) -> Option<PageView<ReportRow>> {
        let run_id = self.lock().store.run().run_id().cloned()?;
        self.report.view(&report_key(&run_id))
    }
}

fn settled_view<T: Clone>(
    controller: &PagedFetchController<T>,
    key: &str,
    outcome: PageOutcome,
) -> Result<PageView<T>, PipelineError> {
    let view = controller
        .view(key)
        .unwrap_or_else(|| PageView::empty(key));
    if outcome == PageOutcome::Applied {
        if let Some(err) = view.error.clone() {
            return Err(err.into());
        }
    }
    Ok(view)
}

fn build_call(run: &Run, input: &StageInput) -> Result<(RemoteCall, StagePayload), PipelineError> {
    let mut partial = StagePayload::new();
    let call = match input {
        StageInput::Upload { file } => {
            RemoteCall::Upload(validators::upload_ready(file.as_ref())?.clone())
        }
        StageInput::Preview => {
            validators::preview_ready(run)?;
            RemoteCall::None
        }
        StageInput::Preprocess { target, steps } => {
            let run_id = validators::preview_ready(run)?.clone();
            let target = validators::preprocess_ready(run, target.as_deref())?.to_string();
            partial.insert("target".into(), Value::from(target.clone()));
            partial.insert(
                "steps".into(),
                Value::Array(steps.iter().map(|s| Value::from(s.as_str())).collect()),
            );
            RemoteCall::Preprocess(PreprocessRequest {
                run_id,
                steps: steps.clone(),
                target,
            })
        }
        StageInput::Split { test_fraction } => {
            let run_id = validators::preview_ready(run)?.clone();
            let test_fraction = validators::split_ready(*test_fraction)?;
            let target = validators::recorded_target(run)?.to_string();
            partial.insert("test_fraction".into(), Value::from(test_fraction));
            RemoteCall::Split(SplitRequest {
                run_id,
                test_fraction,
                target,
            })
        }
        StageInput::Model { model } => {
            let run_id = validators::preview_ready(run)?.clone();
            let model = validators::model_ready(model.as_deref())?;
            partial.insert("model".into(), Value::from(model.as_str()));
            RemoteCall::Train(TrainRequest { run_id, model })
        }
        StageInput::Results => {
            return Err(ContractViolation::TerminalStage {
                stage: Stage::Results,
            }
            .into())
        }
    };
    Ok((call, partial))
}
