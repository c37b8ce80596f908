use crate::pipeline::error::ContractViolation;
use crate::pipeline::stage::{Stage, StageKey};
use crate::shared::ids::RunId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type StagePayload = Map<String, Value>;

/// One end-to-end pipeline execution as seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    run_id: Option<RunId>,
    current_stage: Stage,
    accumulated_data: BTreeMap<StageKey, StagePayload>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            run_id: None,
            current_stage: Stage::FIRST,
            accumulated_data: BTreeMap::new(),
        }
    }
}

impl Run {
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    pub fn accumulated_data(&self) -> &BTreeMap<StageKey, StagePayload> {
        &self.accumulated_data
    }

    pub fn stage_data(&self, key: StageKey) -> Option<&StagePayload> {
        self.accumulated_data.get(&key)
    }

    pub fn stage_field(&self, key: StageKey, field: &str) -> Option<&Value> {
        self.stage_data(key).and_then(|data| data.get(field))
    }

    pub fn stage_str(&self, key: StageKey, field: &str) -> Option<&str> {
        self.stage_field(key, field).and_then(Value::as_str)
    }

    pub fn has_stage_data(&self, key: StageKey) -> bool {
        self.accumulated_data.contains_key(&key)
    }
}

/// Holds the `Run` and exposes the only primitives that mutate it.
///
/// Each primitive takes `&mut self`, so an owner that serialises access (the
/// orchestrator keeps the store behind a mutex) never exposes a half-applied update.
#[derive(Debug, Default)]
pub struct RunStateStore {
    run: Run,
}

impl RunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    pub fn snapshot(&self) -> Run {
        self.run.clone()
    }

    pub fn set_run_id(&mut self, run_id: RunId) -> Result<(), ContractViolation> {
        if let Some(existing) = self.run.run_id.as_ref() {
            return Err(ContractViolation::RunIdAlreadySet {
                existing: existing.clone(),
            });
        }
        self.run.run_id = Some(run_id);
        Ok(())
    }

    /// Shallow merge: top-level fields of `payload` overwrite matching fields, others
    /// are kept.
    pub fn merge_stage_data(&mut self, key: StageKey, payload: StagePayload) {
        let bucket = self.run.accumulated_data.entry(key).or_default();
        for (field, value) in payload {
            bucket.insert(field, value);
        }
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.run.current_stage = stage;
    }

    pub fn reset_all(&mut self) {
        self.run = Run::default();
    }
}
