//! Stage, step and brief types shared by the templates and the engine.

use crate::agent_activity::AgentName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator used when appending or prepending to existing input text.
pub const INPUT_SEPARATOR: &str = "\n\n";

/// Kind of interaction a stage asks of the user.
///
/// These are tags, not states: the engine's state is the
/// `(workflow type, stage index)` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    Input,
    Selection,
    Processing,
    Approval,
    Editor,
}

impl std::fmt::Display for StageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StageType::Input => "input",
            StageType::Selection => "selection",
            StageType::Processing => "processing",
            StageType::Approval => "approval",
            StageType::Editor => "editor",
        };
        write!(f, "{}", label)
    }
}

/// Where a processing stage's mock output is routed once progress completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Output populates the workflow brief.
    Brief,
    /// Output replaces the editor content.
    Content,
    #[default]
    None,
}

/// A selectable option on a selection stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One scripted step in a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStage {
    pub id: String,
    /// Timeline step this stage belongs to.
    pub step_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub stage_type: StageType,
    #[serde(default = "default_can_go_back")]
    pub can_go_back: bool,

    // Selection payload
    #[serde(default)]
    pub options: Vec<StageOption>,
    #[serde(default)]
    pub selected_option: Option<String>,

    // Input payload
    #[serde(default)]
    pub input_value: String,
    #[serde(default)]
    pub placeholder: Option<String>,

    // Processing payload
    /// Simulated progress, 0..=100.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub agent: Option<AgentName>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub output_kind: OutputKind,
    #[serde(default)]
    pub mock_output: Option<Value>,
    /// Raw output copied onto the stage after a brief completes.
    #[serde(default)]
    pub output: Option<Value>,
}

fn default_can_go_back() -> bool {
    true
}

impl WorkflowStage {
    pub fn is_processing(&self) -> bool {
        self.stage_type == StageType::Processing
    }
}

/// Partial update for the current stage. Set fields overwrite, unset fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_go_back: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<StageOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_kind: Option<OutputKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl StagePatch {
    pub fn input_value(value: impl Into<String>) -> Self {
        Self {
            input_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn selected_option(option_id: impl Into<String>) -> Self {
        Self {
            selected_option: Some(option_id.into()),
            ..Self::default()
        }
    }

    /// Shallow merge into `stage`. No check against the stage's type.
    pub fn apply_to(self, stage: &mut WorkflowStage) {
        if let Some(title) = self.title {
            stage.title = title;
        }
        if let Some(description) = self.description {
            stage.description = description;
        }
        if let Some(can_go_back) = self.can_go_back {
            stage.can_go_back = can_go_back;
        }
        if let Some(options) = self.options {
            stage.options = options;
        }
        if let Some(selected) = self.selected_option {
            stage.selected_option = Some(selected);
        }
        if let Some(input) = self.input_value {
            stage.input_value = input;
        }
        if let Some(placeholder) = self.placeholder {
            stage.placeholder = Some(placeholder);
        }
        if let Some(progress) = self.progress {
            stage.progress = progress.min(100);
        }
        if let Some(message) = self.message {
            stage.message = Some(message);
        }
        if let Some(reasoning) = self.reasoning {
            stage.reasoning = Some(reasoning);
        }
        if let Some(agent) = self.agent {
            stage.agent = Some(agent);
        }
        if let Some(kind) = self.output_kind {
            stage.output_kind = kind;
        }
        if let Some(output) = self.mock_output {
            stage.mock_output = Some(output);
        }
        if let Some(output) = self.output {
            stage.output = Some(output);
        }
    }
}

/// Timeline status of a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Completed,
    InProgress,
    Pending,
}

/// Coarse timeline marker grouping one or more stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStep {
    pub id: String,
    pub status: StepStatus,
}

/// Derives the step list as the unique `step_id`s in stage order.
/// The first step starts in progress, the rest pending.
pub fn derive_steps(stages: &[WorkflowStage]) -> Vec<WorkflowStep> {
    let mut steps: Vec<WorkflowStep> = Vec::new();
    for stage in stages {
        if steps.iter().any(|step| step.id == stage.step_id) {
            continue;
        }
        let status = if steps.is_empty() {
            StepStatus::InProgress
        } else {
            StepStatus::Pending
        };
        steps.push(WorkflowStep {
            id: stage.step_id.clone(),
            status,
        });
    }
    steps
}

/// Content brief produced by a brief-generation stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub title: String,
    #[serde(default)]
    pub target_word_count: u32,
    #[serde(default)]
    pub estimated_read_time: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Where `insert_into_input` places new text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    #[default]
    Replace,
    Append,
    Prepend,
}

/// Computes the new input value. Append and prepend only add the
/// separator when there is existing content.
pub fn insert_text(existing: &str, text: &str, position: InsertPosition) -> String {
    match position {
        InsertPosition::Replace => text.to_string(),
        InsertPosition::Append if existing.is_empty() => text.to_string(),
        InsertPosition::Append => format!("{}{}{}", existing, INPUT_SEPARATOR, text),
        InsertPosition::Prepend if existing.is_empty() => text.to_string(),
        InsertPosition::Prepend => format!("{}{}{}", text, INPUT_SEPARATOR, existing),
    }
}

/// Extracts the editor body from a content-kind output.
pub fn content_from_output(output: &Value) -> Option<&str> {
    output.get("content").and_then(Value::as_str)
}
