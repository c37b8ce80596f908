use crate::pipeline::stage::Stage;
use crate::remote::{PreprocessStep, UploadFile};
use std::collections::BTreeSet;

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const SPLIT_SLIDER_MIN: f64 = 0.1;
pub const SPLIT_SLIDER_MAX: f64 = 0.9;
pub const SPLIT_SLIDER_STEP: f64 = 0.05;

/// User input for the current stage, handed to `advance`.
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    Upload {
        file: Option<UploadFile>,
    },
    Preview,
    Preprocess {
        target: Option<String>,
        steps: BTreeSet<PreprocessStep>,
    },
    Split {
        test_fraction: f64,
    },
    Model {
        model: Option<String>,
    },
    Results,
}

impl StageInput {
    pub fn stage(&self) -> Stage {
        match self {
            StageInput::Upload { .. } => Stage::Upload,
            StageInput::Preview => Stage::Preview,
            StageInput::Preprocess { .. } => Stage::Preprocess,
            StageInput::Split { .. } => Stage::Split,
            StageInput::Model { .. } => Stage::Model,
            StageInput::Results => Stage::Results,
        }
    }

    pub fn upload(file: UploadFile) -> Self {
        StageInput::Upload { file: Some(file) }
    }

    pub fn preprocess(
        target: impl Into<String>,
        steps: impl IntoIterator<Item = PreprocessStep>,
    ) -> Self {
        StageInput::Preprocess {
            target: Some(target.into()),
            steps: steps.into_iter().collect(),
        }
    }

    pub fn split(test_fraction: f64) -> Self {
        StageInput::Split { test_fraction }
    }

    pub fn model(model: impl Into<String>) -> Self {
        StageInput::Model {
            model: Some(model.into()),
        }
    }
}

/// Train/test proportions derived from the test fraction. Display only; the remote
/// call always receives the test fraction itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatio {
    test_fraction: f64,
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::new(DEFAULT_TEST_FRACTION)
    }
}

impl SplitRatio {
    pub fn new(test_fraction: f64) -> Self {
        Self { test_fraction }
    }

    pub fn test_fraction(self) -> f64 {
        self.test_fraction
    }

    pub fn train_fraction(self) -> f64 {
        1.0 - self.test_fraction
    }

    pub fn train_percent(self) -> u32 {
        (self.train_fraction() * 100.0).round() as u32
    }

    pub fn test_percent(self) -> u32 {
        (self.test_fraction * 100.0).round() as u32
    }
}

/// In-progress choices a host collects while the user works through the stages.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDraft {
    pub file: Option<UploadFile>,
    pub target: Option<String>,
    pub steps: BTreeSet<PreprocessStep>,
    pub test_fraction: f64,
    pub model: Option<String>,
}

impl Default for StageDraft {
    fn default() -> Self {
        Self {
            file: None,
            target: None,
            steps: BTreeSet::new(),
            test_fraction: DEFAULT_TEST_FRACTION,
            model: None,
        }
    }
}

impl StageDraft {
    /// Flips a preprocessing step on or off; returns whether it is now selected.
    pub fn toggle_step(&mut self, step: PreprocessStep) -> bool {
        if self.steps.remove(&step) {
            false
        } else {
            self.steps.insert(step);
            true
        }
    }

    pub fn split_ratio(&self) -> SplitRatio {
        SplitRatio::new(self.test_fraction)
    }

    pub fn input_for(&self, stage: Stage) -> StageInput {
        match stage {
            Stage::Upload => StageInput::Upload {
                file: self.file.clone(),
            },
            Stage::Preview => StageInput::Preview,
            Stage::Preprocess => StageInput::Preprocess {
                target: self.target.clone(),
                steps: self.steps.clone(),
            },
            Stage::Split => StageInput::Split {
                test_fraction: self.test_fraction,
            },
            Stage::Model => StageInput::Model {
                model: self.model.clone(),
            },
            Stage::Results => StageInput::Results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_split_displays_eighty_twenty() {
        let ratio = SplitRatio::default();
        assert_eq!(ratio.train_percent(), 80);
        assert_eq!(ratio.test_percent(), 20);
        assert_eq!(ratio.test_fraction(), 0.2);
    }

    #[test]
    fn slider_extremes_round_to_whole_percents() {
        assert_eq!(SplitRatio::new(SPLIT_SLIDER_MIN).train_percent(), 90);
        assert_eq!(SplitRatio::new(SPLIT_SLIDER_MAX).test_percent(), 90);
        assert_eq!(SplitRatio::new(0.35).train_percent(), 65);
        assert_eq!(SplitRatio::new(0.35).test_percent(), 35);
    }

    #[test]
    fn toggling_steps_is_a_set_operation() {
        let mut draft = StageDraft::default();
        assert!(draft.toggle_step(PreprocessStep::Normalize));
        assert!(draft.toggle_step(PreprocessStep::Standardize));
        assert!(!draft.toggle_step(PreprocessStep::Normalize));
        assert_eq!(
            draft.steps.iter().copied().collect::<Vec<_>>(),
            vec![PreprocessStep::Standardize]
        );
    }

    #[test]
    fn draft_builds_input_for_each_stage() {
        let draft = StageDraft {
            target: Some("label".to_string()),
            model: Some("logistic".to_string()),
            ..StageDraft::default()
        };
        for stage in Stage::ALL {
            assert_eq!(draft.input_for(stage).stage(), stage);
        }
        assert_eq!(
            draft.input_for(Stage::Split),
            StageInput::Split { test_fraction: 0.2 }
        );
    }
}
