//! Events emitted by the engine after processing commands.
//!
//! The runtime reacts to these (ledger updates, timers); subscribers read
//! state through the watch channel's `StateSnapshot`.

use crate::agent_activity::AgentName;
use crate::workflow::StepStatus;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StateEvent {
    WorkflowStarted {
        workflow_type: String,
        workflow_id: String,
        stage_count: usize,
    },
    /// Start requested for a type with no template; the workflow is empty
    UnknownWorkflowType { workflow_type: String },
    WorkflowPaused,
    StageChanged {
        from: usize,
        to: usize,
        stage_id: String,
    },
    StepStatusChanged { step_id: String, status: StepStatus },
    StageDataUpdated { stage_id: String },
    InputInserted { stage_id: String },

    // Timer requests for the runtime
    AutoCompleteScheduled { generation: u64 },
    ProgressStarted { stage_id: String, generation: u64 },

    ProgressAdvanced { stage_id: String, progress: u32 },
    ProgressFinished { stage_id: String },

    AgentWorkStarted {
        agent: AgentName,
        task: String,
        reasoning: Option<String>,
    },
    AgentWorkCompleted { agent: AgentName },
    /// The progress loop was abandoned before finishing
    AgentWorkInterrupted { agent: AgentName },

    BriefUpdated { title: String },
    EditorContentUpdated { title: String },

    /// A timer command arrived after its generation was superseded
    StaleTimerIgnored { generation: u64, current: u64 },
    /// The command was valid but had nothing to act on
    Ignored { reason: String },
}
