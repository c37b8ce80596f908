//! Plain-text views of pipeline state for the CLI surfaces.

use crate::pipeline::{
    format_metric, PageView, ReportRow, ResultsReport, Run, SplitRatio, Stage, StageKey,
    PROGRESS_STEP_LABELS,
};
use crate::remote::PreviewRow;
use serde_json::Value;

/// `step 2/5: Data Preprocessing (stage 3 preprocess)`.
pub fn render_progress(stage: Stage) -> String {
    let step = stage.progress();
    format!(
        "step {}/{}: {} (stage {} {})",
        step.index,
        PROGRESS_STEP_LABELS.len(),
        step.label,
        stage.number(),
        stage
    )
}

pub fn render_status(run: &Run) -> String {
    let mut lines = vec![
        render_progress(run.current_stage()),
        format!(
            "run_id={}",
            run.run_id().map(|id| id.as_str()).unwrap_or("none")
        ),
    ];
    for (key, payload) in run.accumulated_data() {
        let mut fields: Vec<String> = payload
            .iter()
            .map(|(field, value)| format!("{field}={}", display_value(value)))
            .collect();
        fields.sort();
        lines.push(format!("{key}: {}", fields.join(" ")));
    }
    lines.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn page_header(label: &str, page_number: Option<u32>, total_pages: Option<u32>) -> String {
    match (page_number, total_pages) {
        (Some(page), Some(total)) => format!("{label} page {page} of {}", total.max(1)),
        _ => format!("{label} (no page loaded)"),
    }
}

/// Trailing line for a page that was asked for but is not the one shown.
fn request_status<T>(view: &PageView<T>) -> Option<String> {
    let other = view.requested_page.filter(|page| Some(*page) != view.page_number);
    match (&view.error, other) {
        (Some(err), Some(page)) => Some(format!("error loading page {page}: {err}")),
        (Some(err), None) => Some(format!("error: {err}")),
        (None, Some(page)) if view.pending => Some(format!("loading page {page}")),
        (None, _) => None,
    }
}

/// Tab-separated rows; columns come from the first row's field order.
pub fn render_preview(view: &PageView<PreviewRow>) -> String {
    let mut lines = vec![page_header("preview", view.page_number, view.total_pages)];
    if let Some(first) = view.items.first() {
        let columns: Vec<&String> = first.keys().collect();
        lines.push(
            columns
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join("\t"),
        );
        for row in &view.items {
            lines.push(
                columns
                    .iter()
                    .map(|column| row.get(*column).map(display_value).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\t"),
            );
        }
    }
    lines.extend(request_status(view));
    lines.join("\n")
}

pub fn render_split(ratio: SplitRatio) -> String {
    format!(
        "train {}% / test {}% (test_fraction={})",
        ratio.train_percent(),
        ratio.test_percent(),
        ratio.test_fraction()
    )
}

pub fn render_results_summary(report: &ResultsReport) -> String {
    [
        format!("accuracy={}", report.accuracy_percent()),
        format!("precision_weighted={}", report.weighted_precision_percent()),
        format!("f1_weighted={}", report.weighted_f1_percent()),
    ]
    .join("\n")
}

pub fn render_report_page(view: &PageView<ReportRow>) -> String {
    let mut lines = vec![
        page_header("report", view.page_number, view.total_pages),
        "class\tprecision\trecall\tf1-score".to_string(),
    ];
    for row in &view.items {
        lines.push(format!(
            "{}\t{}\t{}\t{}",
            row.label,
            format_metric(row.precision),
            format_metric(row.recall),
            format_metric(row.f1_score)
        ));
    }
    lines.extend(request_status(view));
    lines.join("\n")
}

/// Message recorded by the last successful call for `key`, if any.
pub fn stage_message(run: &Run, key: StageKey) -> Option<&str> {
    run.stage_str(key, "message").filter(|m| !m.is_empty())
}
