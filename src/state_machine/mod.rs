//! Centralized state machine for content workflows.
//!
//! This module provides the ONLY place where workflow state transitions
//! happen. The engine owns the state, applies commands, emits events,
//! and broadcasts snapshots to subscribers via a watch channel.
//!
//! The engine never sleeps. Timed behavior (auto-complete, progress ticks)
//! is requested through events and fed back in as generation-tagged
//! commands by the runtime.

mod commands;
mod events;
mod snapshot;

pub use commands::StateCommand;
pub use events::StateEvent;
pub use snapshot::StateSnapshot;

use crate::state::WorkflowState;
use crate::structured_logger::StructuredLogger;
use crate::workflow::{
    content_from_output, insert_text, Brief, OutputKind, StageType, StagePatch, WorkflowTemplates,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Default progress increment per tick, in percent.
pub const DEFAULT_PROGRESS_STEP: u32 = 10;

pub struct WorkflowEngine {
    state: WorkflowState,
    templates: Arc<WorkflowTemplates>,
    progress_step: u32,
    snapshot_tx: watch::Sender<StateSnapshot>,
    logger: Arc<StructuredLogger>,
    seq: u64,
}

impl WorkflowEngine {
    /// Creates an engine with no active workflow.
    ///
    /// Returns the engine and a watch receiver for state snapshots.
    pub fn new(
        templates: Arc<WorkflowTemplates>,
        logger: Arc<StructuredLogger>,
    ) -> (Self, watch::Receiver<StateSnapshot>) {
        let state = WorkflowState::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(StateSnapshot::from(&state));

        let engine = Self {
            state,
            templates,
            progress_step: DEFAULT_PROGRESS_STEP,
            snapshot_tx,
            logger,
            seq: 0,
        };

        (engine, snapshot_rx)
    }

    pub fn with_progress_step(mut self, step: u32) -> Self {
        self.progress_step = step.clamp(1, 100);
        self
    }

    /// All mutations go through this single method.
    /// Returns events for the runtime; broadcasts the snapshot automatically.
    pub fn apply(&mut self, command: StateCommand) -> Vec<StateEvent> {
        self.seq += 1;
        self.logger.log_command(self.seq, &command);

        let events = self.apply_internal(command);

        for event in &events {
            self.logger.log_event(self.seq, event);
        }

        self.state.set_updated_at();
        let _ = self.snapshot_tx.send(StateSnapshot::from(&self.state));

        events
    }

    fn apply_internal(&mut self, command: StateCommand) -> Vec<StateEvent> {
        use StateCommand::*;

        match command {
            StartWorkflow { workflow_type } => self.start_workflow(&workflow_type),
            PauseWorkflow => {
                let mut events: Vec<StateEvent> = self.interrupt_progress().into_iter().collect();
                self.state.clear_workflow();
                tracing::info!("Workflow paused");
                events.push(StateEvent::WorkflowPaused);
                events
            }
            NextStage => self.next_stage(),
            PreviousStage => self.previous_stage(),
            CompleteStage => self.complete_stage(),
            UpdateStageData { patch } => self.update_stage_data(patch),
            InsertIntoInput { text, position } => {
                let Some(stage) = self.state.current_stage() else {
                    return vec![ignored("no current stage")];
                };
                if stage.stage_type != StageType::Input {
                    return vec![ignored("current stage is not an input stage")];
                }
                let value = insert_text(&stage.input_value, &text, position);
                let stage_id = stage.id.clone();
                self.update_stage_data(StagePatch::input_value(value));
                vec![StateEvent::InputInserted { stage_id }]
            }
            AutoComplete { generation } => {
                if generation != self.state.generation {
                    return vec![self.stale(generation)];
                }
                self.complete_stage()
            }
            ProgressTick { generation } => {
                if generation != self.state.generation {
                    return vec![self.stale(generation)];
                }
                if !self.state.progress_running() {
                    return vec![ignored("progress loop not running")];
                }
                self.progress_tick()
            }
        }
    }

    fn start_workflow(&mut self, workflow_type: &str) -> Vec<StateEvent> {
        let mut events: Vec<StateEvent> = self.interrupt_progress().into_iter().collect();
        if !self.templates.contains(workflow_type) {
            tracing::warn!(workflow_type, "Unknown workflow type; starting empty workflow");
            events.push(StateEvent::UnknownWorkflowType {
                workflow_type: workflow_type.to_string(),
            });
        }

        let stages = self.templates.stages_for(workflow_type);
        self.state.begin(workflow_type, stages);
        self.logger.increment_run_id();

        let workflow_id = self.state.workflow_id.clone().unwrap_or_default();
        tracing::info!(
            workflow_type,
            workflow_id = %workflow_id,
            stages = self.state.stages.len(),
            "Workflow started"
        );
        events.push(StateEvent::WorkflowStarted {
            workflow_type: workflow_type.to_string(),
            workflow_id,
            stage_count: self.state.stages.len(),
        });
        events
    }

    fn next_stage(&mut self) -> Vec<StateEvent> {
        let next = self.state.current_stage_index + 1;
        if next >= self.state.stages.len() {
            return vec![ignored("already at the final stage")];
        }
        self.move_to(next)
    }

    fn previous_stage(&mut self) -> Vec<StateEvent> {
        if self.state.stages.is_empty() || self.state.current_stage_index == 0 {
            return vec![ignored("already at the first stage")];
        }
        self.move_to(self.state.current_stage_index - 1)
    }

    fn move_to(&mut self, to: usize) -> Vec<StateEvent> {
        let from = self.state.current_stage_index;
        let mut events: Vec<StateEvent> = self.interrupt_progress().into_iter().collect();
        let changed = self.state.move_to(to);

        let Some(stage) = self.state.current_stage() else {
            return events;
        };
        tracing::debug!(from, to, stage_id = %stage.id, "Stage changed");

        events.push(StateEvent::StageChanged {
            from,
            to,
            stage_id: stage.id.clone(),
        });
        events.extend(
            changed
                .into_iter()
                .map(|(step_id, status)| StateEvent::StepStatusChanged { step_id, status }),
        );
        if to > from && stage.is_processing() {
            events.push(StateEvent::AutoCompleteScheduled {
                generation: self.state.generation,
            });
        }
        events
    }

    fn update_stage_data(&mut self, patch: StagePatch) -> Vec<StateEvent> {
        let Some(stage) = self.state.current_stage_mut() else {
            return vec![ignored("no current stage")];
        };
        patch.apply_to(stage);
        vec![StateEvent::StageDataUpdated {
            stage_id: stage.id.clone(),
        }]
    }

    fn complete_stage(&mut self) -> Vec<StateEvent> {
        let Some(stage) = self.state.current_stage() else {
            return vec![ignored("no current stage")];
        };
        if !stage.is_processing() {
            return self.next_stage();
        }
        if self.state.progress_running() {
            return vec![ignored("progress loop already running")];
        }

        let mut events = Vec::new();
        if let Some(agent) = stage.agent {
            events.push(StateEvent::AgentWorkStarted {
                agent,
                task: stage.title.clone(),
                reasoning: stage.reasoning.clone(),
            });
        }
        let stage_id = stage.id.clone();

        if let Some(stage) = self.state.current_stage_mut() {
            stage.progress = 0;
        }
        self.state.progress_generation = Some(self.state.generation);
        events.push(StateEvent::ProgressStarted {
            stage_id,
            generation: self.state.generation,
        });
        events
    }

    fn progress_tick(&mut self) -> Vec<StateEvent> {
        let step = self.progress_step;
        let Some(stage) = self.state.current_stage_mut() else {
            return vec![ignored("no current stage")];
        };
        stage.progress = (stage.progress + step).min(100);

        let mut events = vec![StateEvent::ProgressAdvanced {
            stage_id: stage.id.clone(),
            progress: stage.progress,
        }];
        if stage.progress < 100 {
            return events;
        }

        let stage_id = stage.id.clone();
        let agent = stage.agent;
        let output_kind = stage.output_kind;
        let output = stage.mock_output.clone();

        self.state.progress_generation = None;
        events.push(StateEvent::ProgressFinished {
            stage_id: stage_id.clone(),
        });
        if let Some(agent) = agent {
            events.push(StateEvent::AgentWorkCompleted { agent });
        }
        events.extend(self.route_output(&stage_id, output_kind, output));
        events.extend(self.next_stage());
        events
    }

    /// Routes a finished stage's mock output by its declared kind.
    fn route_output(
        &mut self,
        stage_id: &str,
        kind: OutputKind,
        output: Option<serde_json::Value>,
    ) -> Option<StateEvent> {
        if kind == OutputKind::None {
            return None;
        }
        let Some(output) = output else {
            tracing::warn!(stage_id, ?kind, "Processing stage finished without mock output");
            return None;
        };

        match kind {
            OutputKind::Brief => match serde_json::from_value::<Brief>(output.clone()) {
                Ok(brief) => {
                    let title = brief.title.clone();
                    if let Some(stage) = self.state.current_stage_mut() {
                        stage.output = Some(output);
                    }
                    self.state.apply_brief(brief);
                    Some(StateEvent::BriefUpdated { title })
                }
                Err(e) => {
                    tracing::warn!(stage_id, error = %e, "Mock output is not a valid brief");
                    None
                }
            },
            OutputKind::Content => match content_from_output(&output) {
                Some(content) => {
                    self.state.apply_content(content);
                    Some(StateEvent::EditorContentUpdated {
                        title: self.state.editor_title.clone(),
                    })
                }
                None => {
                    tracing::warn!(stage_id, "Mock output has no content field");
                    None
                }
            },
            OutputKind::None => None,
        }
    }

    /// Agent whose progress loop is about to be abandoned by a reset or move.
    fn interrupt_progress(&self) -> Option<StateEvent> {
        if !self.state.progress_running() {
            return None;
        }
        let agent = self.state.current_stage()?.agent?;
        tracing::debug!(%agent, "Progress loop interrupted");
        Some(StateEvent::AgentWorkInterrupted { agent })
    }

    fn stale(&self, generation: u64) -> StateEvent {
        tracing::debug!(
            generation,
            current = self.state.generation,
            "Ignoring stale timer"
        );
        StateEvent::StaleTimerIgnored {
            generation,
            current: self.state.generation,
        }
    }

    /// Returns immutable reference to current state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn templates(&self) -> &WorkflowTemplates {
        &self.templates
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from(&self.state)
    }
}

fn ignored(reason: &str) -> StateEvent {
    StateEvent::Ignored {
        reason: reason.to_string(),
    }
}
