//! Read-only snapshot of workflow state.
//!
//! Subscribers NEVER mutate this; they receive new snapshots via watch channel.

use crate::state::WorkflowState;
use crate::workflow::{Brief, WorkflowStage, WorkflowStep};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StateSnapshot {
    pub active_workflow: Option<String>,
    pub workflow_id: Option<String>,
    pub current_stage_index: usize,
    pub stages: Vec<WorkflowStage>,
    pub steps: Vec<WorkflowStep>,

    pub editor_content: String,
    pub editor_title: String,
    pub brief: Option<Brief>,

    /// Current run generation
    pub generation: u64,
    /// Whether the progress loop is running for the current generation
    pub progress_running: bool,
}

impl StateSnapshot {
    pub fn current_stage(&self) -> Option<&WorkflowStage> {
        self.stages.get(self.current_stage_index)
    }

    /// True once the workflow sits on its last stage.
    pub fn is_final_stage(&self) -> bool {
        !self.stages.is_empty() && self.current_stage_index + 1 == self.stages.len()
    }
}

impl From<&WorkflowState> for StateSnapshot {
    fn from(state: &WorkflowState) -> Self {
        Self {
            active_workflow: state.active_workflow.clone(),
            workflow_id: state.workflow_id.clone(),
            current_stage_index: state.current_stage_index,
            stages: state.stages.clone(),
            steps: state.steps.clone(),
            editor_content: state.editor_content.clone(),
            editor_title: state.editor_title.clone(),
            brief: state.brief.clone(),
            generation: state.generation,
            progress_running: state.progress_running(),
        }
    }
}
