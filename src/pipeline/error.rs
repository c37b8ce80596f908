use crate::pipeline::stage::Stage;
use crate::remote::RemoteError;
use crate::shared::ids::RunId;

/// A stage precondition that does not hold. Never reaches the remote service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("select a file first")]
    NoFileSelected,
    #[error("invalid file format for `{filename}`; upload a CSV or Excel file")]
    UnsupportedFileFormat { filename: String },
    #[error("upload a dataset first")]
    NoActiveRun,
    #[error("select a target column (the value you want to predict)")]
    NoTargetColumn,
    #[error("target column `{column}` is not one of the uploaded columns")]
    UnknownTargetColumn { column: String },
    #[error("test fraction must be strictly between 0 and 1, got {value}")]
    TestFractionOutOfRange { value: f64 },
    #[error("select a model")]
    NoModelSelected,
    #[error("unsupported model `{model}`; choose one of: logistic, decision-tree")]
    UnsupportedModel { model: String },
    #[error("train a model before requesting results")]
    ModelNotTrained,
}

/// A caller bug. Fails the call immediately and is not meant for end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("run id is already set to `{existing}`")]
    RunIdAlreadySet { existing: RunId },
    #[error("an advance from stage `{stage}` is already in flight")]
    AdvanceInFlight { stage: Stage },
    #[error("stage `{stage}` is terminal; reset to start a new run")]
    TerminalStage { stage: Stage },
    #[error("input for stage `{supplied}` supplied while the current stage is `{current}`")]
    StageMismatch { current: Stage, supplied: Stage },
    #[error("run `{run_id}` is already active; reset before uploading a new dataset")]
    RunAlreadyActive { run_id: RunId },
    #[error("pending advance #{ticket} is not the advance in flight")]
    UnknownPendingAdvance { ticket: u64 },
    #[error("remote output for `{received}` does not answer the pending `{expected}` call")]
    OutputMismatch {
        expected: &'static str,
        received: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

impl PipelineError {
    /// Remote failures leave the run untouched, so repeating the same action is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Remote(_))
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, PipelineError::Contract(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages_pass_through() {
        let err = PipelineError::from(ValidationError::NoTargetColumn);
        assert_eq!(
            err.to_string(),
            "select a target column (the value you want to predict)"
        );

        let err = PipelineError::from(RemoteError::new(Some(400), "Target column is required"));
        assert_eq!(err.to_string(), "Target column is required");
        assert!(err.is_retryable());
    }

    #[test]
    fn contract_violations_are_labelled() {
        let err = PipelineError::from(ContractViolation::AdvanceInFlight {
            stage: Stage::Split,
        });
        assert!(err.is_contract_violation());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "contract violation: an advance from stage `split` is already in flight"
        );
    }
}
