//! Workflow stage scripts and the types the engine operates on.

mod templates;
mod types;

pub use templates::WorkflowTemplates;
pub use types::{
    content_from_output, derive_steps, insert_text, Brief, InsertPosition, OutputKind,
    StageOption, StagePatch, StageType, StepStatus, WorkflowStage, WorkflowStep,
    INPUT_SEPARATOR,
};
