use crate::shared::ids::RunId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const SUPPORTED_UPLOAD_EXTENSIONS: &[&str] = &["csv", "xls", "xlsx"];

/// A dataset picked on the local side, not yet part of any run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { filename, bytes })
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
    }

    pub fn has_supported_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SUPPORTED_UPLOAD_EXTENSIONS.contains(&ext.as_str()))
    }

    pub(crate) fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("csv") => "text/csv",
            Some("xls") => "application/vnd.ms-excel",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            _ => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub run_id: RunId,
    #[serde(default)]
    pub filename: String,
    #[serde(rename = "rows")]
    pub row_count: u64,
    #[serde(rename = "columns")]
    pub column_count: u64,
    pub column_names: Vec<String>,
}

pub type PreviewRow = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PreviewPage {
    #[serde(rename = "preview")]
    pub rows: Vec<PreviewRow>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessStep {
    Standardize,
    Normalize,
}

impl PreprocessStep {
    pub const ALL: [PreprocessStep; 2] = [PreprocessStep::Standardize, PreprocessStep::Normalize];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standardize => "standardize",
            Self::Normalize => "normalize",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standardize" => Ok(Self::Standardize),
            "normalize" => Ok(Self::Normalize),
            _ => Err("preprocessing step must be one of: standardize, normalize".to_string()),
        }
    }
}

impl std::fmt::Display for PreprocessStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "logistic")]
    Logistic,
    #[serde(rename = "decision-tree")]
    DecisionTree,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Logistic, ModelKind::DecisionTree];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logistic => "logistic",
            Self::DecisionTree => "decision-tree",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "logistic" => Some(Self::Logistic),
            "decision-tree" => Some(Self::DecisionTree),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Logistic => "Logistic Regression",
            Self::DecisionTree => "Decision Tree",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreprocessRequest {
    pub run_id: RunId,
    pub steps: BTreeSet<PreprocessStep>,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreprocessAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitRequest {
    pub run_id: RunId,
    #[serde(rename = "test_size")]
    pub test_fraction: f64,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SplitAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub train_rows: Option<u64>,
    #[serde(default)]
    pub test_rows: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainRequest {
    pub run_id: RunId,
    pub model: ModelKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainAck {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultsPayload {
    pub accuracy: f64,
    pub classification_report: Map<String, Value>,
    /// Base64-encoded PNG.
    #[serde(rename = "confusion_matrix")]
    pub confusion_matrix_image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_receipt_reads_backend_field_names() {
        let receipt: UploadReceipt = serde_json::from_value(json!({
            "run_id": "run-1",
            "filename": "iris.csv",
            "rows": 150,
            "columns": 5,
            "column_names": ["a", "b", "c", "d", "species"]
        }))
        .expect("receipt");
        assert_eq!(receipt.run_id.as_str(), "run-1");
        assert_eq!(receipt.row_count, 150);
        assert_eq!(receipt.column_count, 5);
        assert_eq!(receipt.column_names.len(), 5);
    }

    #[test]
    fn requests_serialize_to_wire_shape() {
        let run_id = RunId::parse("run-1").expect("run id");
        let preprocess = PreprocessRequest {
            run_id: run_id.clone(),
            steps: [PreprocessStep::Normalize, PreprocessStep::Standardize, PreprocessStep::Normalize]
                .into_iter()
                .collect(),
            target: "label".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&preprocess).expect("encode"),
            json!({"run_id": "run-1", "steps": ["standardize", "normalize"], "target": "label"})
        );

        let split = SplitRequest {
            run_id: run_id.clone(),
            test_fraction: 0.25,
            target: "label".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&split).expect("encode"),
            json!({"run_id": "run-1", "test_size": 0.25, "target": "label"})
        );

        let train = TrainRequest {
            run_id,
            model: ModelKind::DecisionTree,
        };
        assert_eq!(
            serde_json::to_value(&train).expect("encode"),
            json!({"run_id": "run-1", "model": "decision-tree"})
        );
    }

    #[test]
    fn upload_file_extension_checks_are_case_insensitive() {
        assert!(UploadFile::new("Data.CSV", vec![]).has_supported_extension());
        assert!(UploadFile::new("book.xlsx", vec![]).has_supported_extension());
        assert!(!UploadFile::new("notes.txt", vec![]).has_supported_extension());
        assert!(!UploadFile::new("no_extension", vec![]).has_supported_extension());
        assert_eq!(UploadFile::new("d.xls", vec![]).content_type(), "application/vnd.ms-excel");
    }

    #[test]
    fn model_kind_parses_only_supported_ids() {
        assert_eq!(ModelKind::parse("logistic"), Some(ModelKind::Logistic));
        assert_eq!(ModelKind::parse("Decision-Tree"), Some(ModelKind::DecisionTree));
        assert_eq!(ModelKind::parse("svm"), None);
    }
}
