//! Commands that can mutate workflow state.
//!
//! All state changes MUST go through the engine's `apply()` method.

use crate::workflow::{InsertPosition, StagePatch};
use serde::Serialize;

/// Commands that can mutate workflow state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StateCommand {
    // Lifecycle
    /// Load the template for `workflow_type`, replacing any running workflow
    StartWorkflow { workflow_type: String },
    /// Clear the workflow, keeping editor content and brief
    PauseWorkflow,

    // Navigation
    NextStage,
    PreviousStage,
    /// Finish the current stage; processing stages start their progress loop
    CompleteStage,

    // Stage data
    /// Shallow-merge into the current stage
    UpdateStageData { patch: StagePatch },
    /// Write text into the current input stage
    InsertIntoInput {
        text: String,
        position: InsertPosition,
    },

    // Timers. Both carry the generation they were scheduled under.
    /// Delayed `CompleteStage` after entering a processing stage
    AutoComplete { generation: u64 },
    /// One step of the progress loop
    ProgressTick { generation: u64 },
}
