//! Entry preconditions, one pure predicate per stage.
//!
//! Each check reads only the accumulated run state and the user's in-progress
//! input. A failed check is reported before any remote call is made.

use crate::pipeline::error::ValidationError;
use crate::pipeline::input::StageInput;
use crate::pipeline::run_store::Run;
use crate::pipeline::stage::StageKey;
use crate::remote::{ModelKind, UploadFile};
use crate::shared::ids::RunId;
use serde_json::Value;

pub fn upload_ready(file: Option<&UploadFile>) -> Result<&UploadFile, ValidationError> {
    let file = file
        .filter(|file| !file.filename.trim().is_empty())
        .ok_or(ValidationError::NoFileSelected)?;
    if !file.has_supported_extension() {
        return Err(ValidationError::UnsupportedFileFormat {
            filename: file.filename.clone(),
        });
    }
    Ok(file)
}

pub fn preview_ready(run: &Run) -> Result<&RunId, ValidationError> {
    run.run_id().ok_or(ValidationError::NoActiveRun)
}

/// The target must name one of the columns recorded by the upload stage.
pub fn preprocess_ready<'a>(
    run: &Run,
    target: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    let target = target
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::NoTargetColumn)?;
    let known = run
        .stage_field(StageKey::Upload, "column_names")
        .and_then(Value::as_array)
        .is_some_and(|columns| columns.iter().any(|c| c.as_str() == Some(target)));
    if !known {
        return Err(ValidationError::UnknownTargetColumn {
            column: target.to_string(),
        });
    }
    Ok(target)
}

pub fn split_ready(test_fraction: f64) -> Result<f64, ValidationError> {
    if test_fraction.is_finite() && test_fraction > 0.0 && test_fraction < 1.0 {
        Ok(test_fraction)
    } else {
        Err(ValidationError::TestFractionOutOfRange {
            value: test_fraction,
        })
    }
}

pub fn model_ready(model: Option<&str>) -> Result<ModelKind, ValidationError> {
    let raw = model
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::NoModelSelected)?;
    ModelKind::parse(raw).ok_or_else(|| ValidationError::UnsupportedModel {
        model: raw.to_string(),
    })
}

pub fn results_ready(run: &Run) -> Result<&RunId, ValidationError> {
    let run_id = run.run_id().ok_or(ValidationError::NoActiveRun)?;
    if !run.has_stage_data(StageKey::Model) {
        return Err(ValidationError::ModelNotTrained);
    }
    Ok(run_id)
}

/// Target column recorded by the preprocess stage, read by the split call.
pub fn recorded_target(run: &Run) -> Result<&str, ValidationError> {
    run.stage_str(StageKey::Preprocess, "target")
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::NoTargetColumn)
}

pub fn check_entry(run: &Run, input: &StageInput) -> Result<(), ValidationError> {
    match input {
        StageInput::Upload { file } => upload_ready(file.as_ref()).map(|_| ()),
        StageInput::Preview => preview_ready(run).map(|_| ()),
        StageInput::Preprocess { target, .. } => {
            preprocess_ready(run, target.as_deref()).map(|_| ())
        }
        StageInput::Split { test_fraction } => split_ready(*test_fraction).map(|_| ()),
        StageInput::Model { model } => model_ready(model.as_deref()).map(|_| ()),
        StageInput::Results => results_ready(run).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::run_store::RunStateStore;
    use serde_json::json;

    fn uploaded_run(columns: &[&str]) -> Run {
        let mut store = RunStateStore::new();
        store
            .set_run_id(RunId::parse("run-1").expect("id"))
            .expect("set run id");
        let mut payload = serde_json::Map::new();
        payload.insert("column_names".to_string(), json!(columns));
        store.merge_stage_data(StageKey::Upload, payload);
        store.snapshot()
    }

    #[test]
    fn upload_requires_a_supported_file() {
        assert_eq!(upload_ready(None), Err(ValidationError::NoFileSelected));
        assert_eq!(
            upload_ready(Some(&UploadFile::new("  ", vec![]))),
            Err(ValidationError::NoFileSelected)
        );
        assert_eq!(
            upload_ready(Some(&UploadFile::new("data.json", vec![]))),
            Err(ValidationError::UnsupportedFileFormat {
                filename: "data.json".to_string()
            })
        );
        assert!(upload_ready(Some(&UploadFile::new("data.csv", vec![]))).is_ok());
    }

    #[test]
    fn preview_requires_run_id() {
        assert_eq!(
            preview_ready(&Run::default()),
            Err(ValidationError::NoActiveRun)
        );
        assert_eq!(
            preview_ready(&uploaded_run(&["a"])).map(RunId::as_str),
            Ok("run-1")
        );
    }

    #[test]
    fn preprocess_target_must_be_an_uploaded_column() {
        let run = uploaded_run(&["age", "income", "label"]);
        assert_eq!(
            preprocess_ready(&run, None),
            Err(ValidationError::NoTargetColumn)
        );
        assert_eq!(
            preprocess_ready(&run, Some(" ")),
            Err(ValidationError::NoTargetColumn)
        );
        assert_eq!(
            preprocess_ready(&run, Some("salary")),
            Err(ValidationError::UnknownTargetColumn {
                column: "salary".to_string()
            })
        );
        assert_eq!(preprocess_ready(&run, Some("label")), Ok("label"));
    }

    #[test]
    fn split_fraction_is_open_interval() {
        assert!(split_ready(0.0).is_err());
        assert!(split_ready(1.0).is_err());
        assert!(split_ready(-0.3).is_err());
        assert!(split_ready(f64::NAN).is_err());
        assert_eq!(split_ready(0.2), Ok(0.2));
        assert_eq!(split_ready(0.05), Ok(0.05));
    }

    #[test]
    fn model_must_be_supported() {
        assert_eq!(model_ready(None), Err(ValidationError::NoModelSelected));
        assert_eq!(
            model_ready(Some("random-forest")),
            Err(ValidationError::UnsupportedModel {
                model: "random-forest".to_string()
            })
        );
        assert_eq!(model_ready(Some("decision-tree")), Ok(ModelKind::DecisionTree));
    }

    #[test]
    fn results_require_trained_model() {
        assert_eq!(
            results_ready(&Run::default()),
            Err(ValidationError::NoActiveRun)
        );
        assert_eq!(
            results_ready(&uploaded_run(&["a"])),
            Err(ValidationError::ModelNotTrained)
        );
    }

    #[test]
    fn check_entry_dispatches_on_input_stage() {
        let run = uploaded_run(&["label"]);
        assert!(check_entry(&run, &StageInput::Preview).is_ok());
        assert_eq!(
            check_entry(&run, &StageInput::Model { model: None }),
            Err(ValidationError::NoModelSelected)
        );
        assert_eq!(
            check_entry(&run, &StageInput::Results),
            Err(ValidationError::ModelNotTrained)
        );
    }
}
