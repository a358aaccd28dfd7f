use crate::persistence::WorkflowProgressEntry;
use crate::workflow::{derive_steps, Brief, StepStatus, WorkflowStage, WorkflowStep};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used for editor content when no brief exists yet.
pub const UNTITLED_EDITOR_TITLE: &str = "Untitled Draft";

/// Direction of a stage movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Everything the workflow engine owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub active_workflow: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub current_stage_index: usize,
    pub stages: Vec<WorkflowStage>,
    pub steps: Vec<WorkflowStep>,

    #[serde(default)]
    pub editor_content: String,
    #[serde(default)]
    pub editor_title: String,
    #[serde(default)]
    pub brief: Option<Brief>,

    /// Advances on every stage movement and workflow reset. Timers carry the
    /// generation they were scheduled under and are ignored once it moves on.
    #[serde(default)]
    pub generation: u64,

    /// Generation whose progress loop is running, if any.
    #[serde(default)]
    pub progress_generation: Option<u64>,

    pub updated_at: DateTime<Utc>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            active_workflow: None,
            workflow_id: None,
            current_stage_index: 0,
            stages: Vec::new(),
            steps: Vec::new(),
            editor_content: String::new(),
            editor_title: String::new(),
            brief: None,
            generation: 0,
            progress_generation: None,
            updated_at: Utc::now(),
        }
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole workflow with `stages`, clearing editor and brief state.
    pub fn begin(&mut self, workflow_type: &str, stages: Vec<WorkflowStage>) {
        self.steps = derive_steps(&stages);
        self.stages = stages;
        self.active_workflow = Some(workflow_type.to_string());
        self.workflow_id = Some(Uuid::new_v4().to_string());
        self.current_stage_index = 0;
        self.editor_content.clear();
        self.editor_title.clear();
        self.brief = None;
        self.bump_generation();
    }

    /// Clears the workflow but keeps editor content, editor title and brief.
    pub fn clear_workflow(&mut self) {
        self.active_workflow = None;
        self.workflow_id = None;
        self.current_stage_index = 0;
        self.stages.clear();
        self.steps.clear();
        self.bump_generation();
    }

    pub fn bump_generation(&mut self) {
        self.generation += 1;
        self.progress_generation = None;
    }

    pub fn current_stage(&self) -> Option<&WorkflowStage> {
        self.stages.get(self.current_stage_index)
    }

    pub fn current_stage_mut(&mut self) -> Option<&mut WorkflowStage> {
        self.stages.get_mut(self.current_stage_index)
    }

    pub fn is_final_stage(&self) -> bool {
        !self.stages.is_empty() && self.current_stage_index + 1 == self.stages.len()
    }

    pub fn progress_running(&self) -> bool {
        self.progress_generation == Some(self.generation)
    }

    /// Moves to `to` and updates step statuses when the owning step changes.
    ///
    /// Returns the step ids whose status changed. The caller is responsible
    /// for bounds checking.
    pub fn move_to(&mut self, to: usize) -> Vec<(String, StepStatus)> {
        let from = self.current_stage_index;
        let direction = if to > from {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let from_step = self.stages.get(from).map(|s| s.step_id.clone());
        let to_step = self.stages.get(to).map(|s| s.step_id.clone());

        self.current_stage_index = to;
        self.bump_generation();

        let (Some(from_step), Some(to_step)) = (from_step, to_step) else {
            return Vec::new();
        };
        if from_step == to_step {
            return Vec::new();
        }

        let vacated = match direction {
            Direction::Forward => StepStatus::Completed,
            Direction::Backward => StepStatus::Pending,
        };
        let mut changed = Vec::new();
        if self.set_step_status(&from_step, vacated) {
            changed.push((from_step, vacated));
        }
        if self.set_step_status(&to_step, StepStatus::InProgress) {
            changed.push((to_step, StepStatus::InProgress));
        }
        changed
    }

    fn set_step_status(&mut self, step_id: &str, status: StepStatus) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) if step.status != status => {
                step.status = status;
                true
            }
            _ => false,
        }
    }

    /// Routes a finished brief into the workflow.
    pub fn apply_brief(&mut self, brief: Brief) {
        self.brief = Some(brief);
    }

    /// Replaces the editor content, titled from the brief when one exists.
    pub fn apply_content(&mut self, content: &str) {
        self.editor_content = content.to_string();
        self.editor_title = self
            .brief
            .as_ref()
            .map(|b| b.title.clone())
            .unwrap_or_else(|| UNTITLED_EDITOR_TITLE.to_string());
    }

    /// Progress entry for the active workflow, if one is running.
    pub fn progress_entry(&self) -> Option<WorkflowProgressEntry> {
        let workflow_type = self.active_workflow.clone()?;
        let workflow_id = self.workflow_id.clone()?;
        Some(WorkflowProgressEntry {
            workflow_id,
            workflow_type,
            current_stage_index: self.current_stage_index,
            total_stages: self.stages.len(),
            current_stage_title: self
                .current_stage()
                .map(|s| s.title.clone())
                .unwrap_or_default(),
            updated_at: self.updated_at,
        })
    }

    pub fn set_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
