use crate::app::command_support::{http_orchestrator, load_settings, FlagArgs};
use crate::app::render::{
    render_preview, render_report_page, render_results_summary, render_split, stage_message,
};
use crate::pipeline::{
    PipelineError, PipelineOrchestrator, SplitRatio, Stage, StageInput, StageKey,
    DEFAULT_TEST_FRACTION,
};
use crate::remote::{PreprocessStep, RunService, UploadFile};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

const VALUED_FLAGS: &[&str] = &[
    "--file",
    "--target",
    "--model",
    "--test-fraction",
    "--preview-page",
    "--report-page",
    "--save-matrix",
];
const SWITCH_FLAGS: &[&str] = &["--standardize", "--normalize"];

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub file: PathBuf,
    pub target: String,
    pub model: String,
    pub steps: BTreeSet<PreprocessStep>,
    pub test_fraction: f64,
    pub preview_page: u32,
    pub report_page: u32,
    pub save_matrix: Option<PathBuf>,
}

pub fn parse_run_options(args: &[String]) -> Result<RunOptions, String> {
    let flags = FlagArgs::parse(args, VALUED_FLAGS, SWITCH_FLAGS)?;
    let mut steps = BTreeSet::new();
    if flags.has("--standardize") {
        steps.insert(PreprocessStep::Standardize);
    }
    if flags.has("--normalize") {
        steps.insert(PreprocessStep::Normalize);
    }
    Ok(RunOptions {
        file: PathBuf::from(flags.required("--file")?),
        target: flags.required("--target")?.to_string(),
        model: flags.required("--model")?.to_string(),
        steps,
        test_fraction: flags
            .parsed::<f64>("--test-fraction")?
            .unwrap_or(DEFAULT_TEST_FRACTION),
        preview_page: flags.parsed::<u32>("--preview-page")?.unwrap_or(1),
        report_page: flags.parsed::<u32>("--report-page")?.unwrap_or(1),
        save_matrix: flags.value("--save-matrix").map(PathBuf::from),
    })
}

pub fn cmd_run(args: &[String]) -> Result<String, String> {
    let options = parse_run_options(args)?;
    let settings = load_settings()?;
    let orchestrator = http_orchestrator(&settings);
    run_pipeline(&orchestrator, &options)
}

fn stage_err(stage: Stage) -> impl Fn(PipelineError) -> String {
    move |err| format!("{stage} failed: {err}")
}

/// Walks every stage once and reports what each produced.
pub fn run_pipeline<S: RunService>(
    orchestrator: &PipelineOrchestrator<S>,
    options: &RunOptions,
) -> Result<String, String> {
    let file = UploadFile::from_path(&options.file)
        .map_err(|e| format!("failed to read {}: {e}", options.file.display()))?;
    let mut lines = Vec::new();

    orchestrator
        .advance(StageInput::upload(file))
        .map_err(stage_err(Stage::Upload))?;
    let run = orchestrator.snapshot();
    lines.push(format!(
        "run_id={}\nrows={}\ncolumns={}",
        run.run_id().map(|id| id.as_str()).unwrap_or("none"),
        run.stage_field(StageKey::Upload, "rows")
            .map(|v| v.to_string())
            .unwrap_or_default(),
        run.stage_field(StageKey::Upload, "columns")
            .map(|v| v.to_string())
            .unwrap_or_default(),
    ));

    let preview = orchestrator
        .preview_page(options.preview_page)
        .map_err(stage_err(Stage::Preview))?;
    lines.push(render_preview(&preview));
    orchestrator
        .advance(StageInput::Preview)
        .map_err(stage_err(Stage::Preview))?;

    orchestrator
        .advance(StageInput::Preprocess {
            target: Some(options.target.clone()),
            steps: options.steps.clone(),
        })
        .map_err(stage_err(Stage::Preprocess))?;
    push_message(&mut lines, orchestrator, StageKey::Preprocess);

    orchestrator
        .advance(StageInput::split(options.test_fraction))
        .map_err(stage_err(Stage::Split))?;
    lines.push(render_split(SplitRatio::new(options.test_fraction)));
    push_message(&mut lines, orchestrator, StageKey::Split);

    orchestrator
        .advance(StageInput::model(options.model.clone()))
        .map_err(stage_err(Stage::Model))?;
    push_message(&mut lines, orchestrator, StageKey::Model);

    let report = orchestrator
        .fetch_results()
        .map_err(stage_err(Stage::Results))?;
    lines.push(render_results_summary(&report));
    let page = orchestrator
        .report_page(options.report_page)
        .map_err(stage_err(Stage::Results))?;
    lines.push(render_report_page(&page));

    if let Some(path) = options.save_matrix.as_ref() {
        let png = report
            .confusion_matrix_png()
            .map_err(|e| format!("confusion matrix is not valid base64: {e}"))?;
        fs::write(path, &png).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        lines.push(format!("confusion_matrix={}", path.display()));
    }
    Ok(lines.join("\n"))
}

fn push_message<S: RunService>(
    lines: &mut Vec<String>,
    orchestrator: &PipelineOrchestrator<S>,
    key: StageKey,
) {
    if let Some(message) = stage_message(&orchestrator.snapshot(), key) {
        lines.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn run_options_apply_defaults() {
        let options = parse_run_options(&args(&[
            "--file",
            "iris.csv",
            "--target",
            "species",
            "--model",
            "logistic",
            "--normalize",
        ]))
        .expect("options");
        assert_eq!(options.file, PathBuf::from("iris.csv"));
        assert_eq!(options.test_fraction, DEFAULT_TEST_FRACTION);
        assert_eq!(options.preview_page, 1);
        assert_eq!(
            options.steps.into_iter().collect::<Vec<_>>(),
            vec![PreprocessStep::Normalize]
        );
        assert_eq!(options.save_matrix, None);
    }

    #[test]
    fn run_options_require_file_target_and_model() {
        assert_eq!(
            parse_run_options(&args(&["--target", "y", "--model", "logistic"])),
            Err("missing required `--file`".to_string())
        );
        assert_eq!(
            parse_run_options(&args(&["--file", "a.csv", "--model", "logistic"])),
            Err("missing required `--target`".to_string())
        );
    }
}
