use serde::{Deserialize, Serialize};

/// The six ordered pipeline stages. Execution order is the declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Preview,
    Preprocess,
    Split,
    Model,
    Results,
}

/// Stages that persist output into the run's accumulated data. Preview is read-only
/// and has no key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    Upload,
    Preprocess,
    Split,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStep {
    pub index: u8,
    pub label: &'static str,
}

pub const PROGRESS_STEP_LABELS: [&str; 5] = [
    "Dataset Upload",
    "Data Preprocessing",
    "Train-Test Split",
    "Model Selection",
    "Model Output & Results",
];

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Upload,
        Stage::Preview,
        Stage::Preprocess,
        Stage::Split,
        Stage::Model,
        Stage::Results,
    ];

    pub const FIRST: Stage = Stage::Upload;
    pub const TERMINAL: Stage = Stage::Results;

    pub fn number(self) -> u8 {
        match self {
            Stage::Upload => 1,
            Stage::Preview => 2,
            Stage::Preprocess => 3,
            Stage::Split => 4,
            Stage::Model => 5,
            Stage::Results => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    pub fn data_key(self) -> Option<StageKey> {
        match self {
            Stage::Upload => Some(StageKey::Upload),
            Stage::Preprocess => Some(StageKey::Preprocess),
            Stage::Split => Some(StageKey::Split),
            Stage::Model => Some(StageKey::Model),
            Stage::Preview | Stage::Results => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Preview => "preview",
            Stage::Preprocess => "preprocess",
            Stage::Split => "split",
            Stage::Model => "model",
            Stage::Results => "results",
        }
    }

    /// Position on the five-step progress indicator; upload and preview share step 1.
    pub fn progress(self) -> ProgressStep {
        let index = match self {
            Stage::Upload | Stage::Preview => 1,
            Stage::Preprocess => 2,
            Stage::Split => 3,
            Stage::Model => 4,
            Stage::Results => 5,
        };
        ProgressStep {
            index,
            label: PROGRESS_STEP_LABELS[usize::from(index) - 1],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKey::Upload => "upload",
            StageKey::Preprocess => "preprocess",
            StageKey::Split => "split",
            StageKey::Model => "model",
        }
    }

    pub fn stage(self) -> Stage {
        match self {
            StageKey::Upload => Stage::Upload,
            StageKey::Preprocess => Stage::Preprocess,
            StageKey::Split => Stage::Split,
            StageKey::Model => Stage::Model,
        }
    }
}

impl std::fmt::Display for StageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
