//! Results summary and classification report rows.

use crate::pipeline::paging::{Page, PageSource, PageWindow};
use crate::remote::{RemoteError, ResultsPayload};
use base64::Engine;
use serde_json::{Map, Value};

pub const NOT_AVAILABLE: &str = "N/A";
const WEIGHTED_AVG_LABEL: &str = "weighted avg";
const ACCURACY_LABEL: &str = "accuracy";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    pub support: Option<f64>,
}

impl ReportRow {
    fn from_metrics(label: &str, metrics: &Map<String, Value>) -> Self {
        let metric = |name: &str| metrics.get(name).and_then(Value::as_f64);
        Self {
            label: label.to_string(),
            precision: metric("precision"),
            recall: metric("recall"),
            f1_score: metric("f1-score"),
            support: metric("support"),
        }
    }
}

/// Fetched results in display form. Rows keep the backend's order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsReport {
    pub accuracy: f64,
    pub rows: Vec<ReportRow>,
    pub confusion_matrix_image: String,
}

/// Formats a 0..1 fraction as a one-decimal percentage, e.g. `0.85` -> `85.0%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn format_metric(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

impl ResultsReport {
    /// Entries that are not metric objects, such as the scalar `accuracy`, are not rows.
    pub fn from_payload(payload: ResultsPayload) -> Self {
        let rows = payload
            .classification_report
            .iter()
            .filter(|(label, _)| label.as_str() != ACCURACY_LABEL)
            .filter_map(|(label, value)| {
                value
                    .as_object()
                    .map(|metrics| ReportRow::from_metrics(label, metrics))
            })
            .collect();
        Self {
            accuracy: payload.accuracy,
            rows,
            confusion_matrix_image: payload.confusion_matrix_image,
        }
    }

    fn weighted_avg(&self) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.label == WEIGHTED_AVG_LABEL)
    }

    pub fn accuracy_percent(&self) -> String {
        format_percent(self.accuracy)
    }

    pub fn weighted_precision_percent(&self) -> String {
        self.weighted_avg()
            .and_then(|row| row.precision)
            .map(format_percent)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn weighted_f1_percent(&self) -> String {
        self.weighted_avg()
            .and_then(|row| row.f1_score)
            .map(format_percent)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn total_pages(&self, rows_per_page: u32) -> u32 {
        let per_page = rows_per_page.max(1) as usize;
        self.rows.len().div_ceil(per_page) as u32
    }

    pub fn rows_page(&self, page_number: u32, rows_per_page: u32) -> &[ReportRow] {
        let per_page = rows_per_page.max(1) as usize;
        let start = (page_number.max(1) as usize - 1) * per_page;
        if start >= self.rows.len() {
            return &[];
        }
        let end = (start + per_page).min(self.rows.len());
        &self.rows[start..end]
    }

    pub fn confusion_matrix_png(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.confusion_matrix_image.trim())
    }
}

impl PageSource<ReportRow> for ResultsReport {
    fn fetch_page(&self, window: &PageWindow) -> Result<Page<ReportRow>, RemoteError> {
        Ok(Page {
            items: self
                .rows_page(window.page_number, window.items_per_page)
                .to_vec(),
            total_pages: self.total_pages(window.items_per_page),
        })
    }
}
