//! The studio runtime: one handle over the workflow engine, the demo store
//! and the context mailbox.
//!
//! The engine decides; the runtime executes. Engine events are turned into
//! ledger writes, workflow-progress updates and tokio timer tasks. Timer
//! tasks feed generation-tagged commands back through [`Studio::dispatch`].

use crate::agent_activity::AgentName;
use crate::config::{StudioConfig, TimingConfig};
use crate::context::{ContextMailbox, CrossModuleContext};
use crate::demo_store::DemoStore;
use crate::paths;
use crate::persistence::{
    DemoSnapshot, FileSessionStorage, SessionStorage, WorkflowProgressEntry,
};
use crate::state_machine::{StateCommand, StateEvent, StateSnapshot, WorkflowEngine};
use crate::structured_logger::StructuredLogger;
use crate::workflow::{InsertPosition, StagePatch, WorkflowTemplates};
use anyhow::Result;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Floor for scaled timer durations.
const MIN_TIMER_DURATION: Duration = Duration::from_millis(1);

/// Cheap-to-clone handle to the whole studio.
#[derive(Clone)]
pub struct Studio {
    inner: Arc<StudioInner>,
}

struct StudioInner {
    engine: Mutex<WorkflowEngine>,
    demo: Mutex<DemoStore>,
    mailbox: Mutex<ContextMailbox>,
    /// Timer tasks tagged with the generation they were scheduled under.
    timers: Mutex<Vec<(u64, JoinHandle<()>)>>,
    timing: TimingConfig,
    snapshot_rx: watch::Receiver<StateSnapshot>,
    logger: Arc<StructuredLogger>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Studio {
    pub fn new(
        templates: WorkflowTemplates,
        storage: Box<dyn SessionStorage>,
        timing: TimingConfig,
        logger: Arc<StructuredLogger>,
    ) -> Self {
        let (engine, snapshot_rx) = WorkflowEngine::new(Arc::new(templates), Arc::clone(&logger));
        let engine = engine.with_progress_step(timing.progress_step);

        Self {
            inner: Arc::new(StudioInner {
                engine: Mutex::new(engine),
                demo: Mutex::new(DemoStore::load(storage)),
                mailbox: Mutex::new(ContextMailbox::new()),
                timers: Mutex::new(Vec::new()),
                timing,
                snapshot_rx,
                logger,
            }),
        }
    }

    /// Builds a studio backed by file storage and the home logs directory.
    pub fn from_config(config: &StudioConfig, session_id: &str) -> Result<Self> {
        config.validate()?;
        let templates = config.load_templates()?;
        let storage = FileSessionStorage::new(config.session_dir()?)?;
        let logger = Arc::new(StructuredLogger::new(session_id, &paths::logs_dir()?)?);

        let studio = Self::new(templates, Box::new(storage), config.timing.clone(), logger);
        if let Some(speed) = config.simulation.speed {
            studio.set_simulation_speed(speed);
        }
        tracing::debug!(session_id, "Studio initialized");
        Ok(studio)
    }

    /// Applies one command and reacts to the resulting events.
    pub fn dispatch(&self, command: StateCommand) -> Vec<StateEvent> {
        let (events, advanced, generation, previous_id, progress) = {
            let mut engine = lock(&self.inner.engine);
            let before = engine.state().generation;
            let previous_id = engine.state().workflow_id.clone();
            let events = engine.apply(command);
            let state = engine.state();
            (
                events,
                state.generation != before,
                state.generation,
                previous_id,
                state.progress_entry(),
            )
        };

        if advanced {
            self.cancel_stale_timers(generation);
        }
        self.react(&events, previous_id, progress);
        events
    }

    fn react(
        &self,
        events: &[StateEvent],
        previous_id: Option<String>,
        progress: Option<WorkflowProgressEntry>,
    ) {
        let mut progress_changed = false;
        for event in events {
            match event {
                StateEvent::AgentWorkStarted {
                    agent,
                    task,
                    reasoning,
                } => lock(&self.inner.demo).start_agent_work(*agent, task, reasoning.as_deref()),
                StateEvent::AgentWorkCompleted { agent } => {
                    lock(&self.inner.demo).complete_agent_work(*agent)
                }
                StateEvent::AgentWorkInterrupted { agent } => {
                    lock(&self.inner.demo).set_agent_idle(*agent)
                }
                StateEvent::AutoCompleteScheduled { generation } => {
                    self.schedule_auto_complete(*generation)
                }
                StateEvent::ProgressStarted { generation, .. } => {
                    self.spawn_progress_loop(*generation)
                }
                StateEvent::WorkflowStarted { .. } => {
                    if let Some(old) = previous_id.as_deref() {
                        lock(&self.inner.demo).remove_workflow_progress(old);
                    }
                    progress_changed = true;
                }
                StateEvent::WorkflowPaused => {
                    if let Some(old) = previous_id.as_deref() {
                        lock(&self.inner.demo).remove_workflow_progress(old);
                    }
                }
                StateEvent::StageChanged { .. } => progress_changed = true,
                _ => {}
            }
        }

        if !progress_changed {
            return;
        }
        match progress {
            Some(entry) if entry.reached_final_stage() => {
                lock(&self.inner.demo).remove_workflow_progress(&entry.workflow_id)
            }
            Some(entry) => lock(&self.inner.demo).upsert_workflow_progress(entry),
            None => {}
        }
    }

    fn schedule_auto_complete(&self, generation: u64) {
        let delay = self.scaled(self.inner.timing.auto_complete_delay());
        let studio = self.clone();
        self.spawn_timer(generation, async move {
            tokio::time::sleep(delay).await;
            studio.dispatch(StateCommand::AutoComplete { generation });
        });
    }

    fn spawn_progress_loop(&self, generation: u64) {
        let period = self.scaled(self.inner.timing.progress_interval());
        let studio = self.clone();
        self.spawn_timer(generation, async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let events = studio.dispatch(StateCommand::ProgressTick { generation });
                let advanced = events
                    .iter()
                    .any(|e| matches!(e, StateEvent::ProgressAdvanced { .. }));
                let finished = events
                    .iter()
                    .any(|e| matches!(e, StateEvent::ProgressFinished { .. }));
                if !advanced || finished {
                    break;
                }
            }
        });
    }

    fn spawn_timer<F>(&self, generation: u64, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime available; timer not scheduled");
            return;
        };
        let mut timers = lock(&self.inner.timers);
        timers.retain(|(_, timer)| !timer.is_finished());
        timers.push((generation, handle.spawn(task)));
    }

    /// Aborts timers scheduled under a generation older than `current`.
    ///
    /// Timers of `current` or later stay: another dispatch may already have
    /// advanced the engine and scheduled them before this call runs.
    fn cancel_stale_timers(&self, current: u64) {
        let stale: Vec<JoinHandle<()>> = {
            let mut timers = lock(&self.inner.timers);
            let (stale, live): (Vec<_>, Vec<_>) =
                timers.drain(..).partition(|(generation, _)| *generation < current);
            *timers = live;
            stale.into_iter().map(|(_, timer)| timer).collect()
        };
        self.abort_timers(current, stale);
    }

    fn abort_timers(&self, generation: u64, timers: Vec<JoinHandle<()>>) {
        let pending: Vec<_> = timers.into_iter().filter(|t| !t.is_finished()).collect();
        if pending.is_empty() {
            return;
        }
        self.inner.logger.log_timer_cancelled(generation, pending.len());
        for timer in pending {
            timer.abort();
        }
    }

    /// Stops all timers, e.g. before shutdown.
    pub fn shutdown(&self) {
        let generation = lock(&self.inner.engine).state().generation;
        let all: Vec<JoinHandle<()>> = lock(&self.inner.timers)
            .drain(..)
            .map(|(_, timer)| timer)
            .collect();
        self.abort_timers(generation, all);
    }

    fn scaled(&self, base: Duration) -> Duration {
        let speed = lock(&self.inner.demo).simulation_speed();
        scale_duration(base, speed)
    }

    // Workflow operations

    pub fn start_workflow(&self, workflow_type: &str) -> Vec<StateEvent> {
        self.dispatch(StateCommand::StartWorkflow {
            workflow_type: workflow_type.to_string(),
        })
    }

    pub fn pause_workflow(&self) -> Vec<StateEvent> {
        self.dispatch(StateCommand::PauseWorkflow)
    }

    pub fn next_stage(&self) -> Vec<StateEvent> {
        self.dispatch(StateCommand::NextStage)
    }

    pub fn previous_stage(&self) -> Vec<StateEvent> {
        self.dispatch(StateCommand::PreviousStage)
    }

    pub fn complete_stage(&self) -> Vec<StateEvent> {
        self.dispatch(StateCommand::CompleteStage)
    }

    pub fn update_stage_data(&self, patch: StagePatch) -> Vec<StateEvent> {
        self.dispatch(StateCommand::UpdateStageData { patch })
    }

    pub fn insert_into_input(&self, text: &str, position: InsertPosition) -> Vec<StateEvent> {
        self.dispatch(StateCommand::InsertIntoInput {
            text: text.to_string(),
            position,
        })
    }

    /// Consumes the mailbox, starts `workflow_type` and seeds the first
    /// stage's input with the context when that stage takes input.
    pub fn start_workflow_from_context(&self, workflow_type: &str) -> Vec<StateEvent> {
        let context = lock(&self.inner.mailbox).take_context();
        let mut events = self.start_workflow(workflow_type);
        if let Some(context) = context {
            tracing::info!(
                source = ?context.source,
                source_id = %context.source_id,
                workflow_type,
                "Seeding workflow from context"
            );
            events.extend(self.insert_into_input(&context.seed_text(), InsertPosition::Replace));
        }
        events
    }

    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.inner.snapshot_rx.clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.snapshot_rx.borrow().clone()
    }

    pub fn workflow_types(&self) -> Vec<String> {
        lock(&self.inner.engine)
            .templates()
            .workflow_types()
            .map(str::to_string)
            .collect()
    }

    // Context mailbox

    pub fn set_context(&self, context: Option<CrossModuleContext>) {
        lock(&self.inner.mailbox).set_context(context);
    }

    pub fn clear_context(&self) {
        lock(&self.inner.mailbox).clear_context();
    }

    pub fn context(&self) -> Option<CrossModuleContext> {
        lock(&self.inner.mailbox).context().cloned()
    }

    // Demo store

    /// Runs `f` with exclusive access to the demo store.
    pub fn with_demo<R>(&self, f: impl FnOnce(&mut DemoStore) -> R) -> R {
        f(&mut lock(&self.inner.demo))
    }

    pub fn demo_snapshot(&self) -> DemoSnapshot {
        lock(&self.inner.demo).snapshot()
    }

    pub fn set_simulation_speed(&self, speed: f64) -> bool {
        lock(&self.inner.demo).set_simulation_speed(speed)
    }

    /// Marks `agent` working on `task`, waits `base / speed`, then completes it.
    pub async fn simulate_agent_task(&self, agent: AgentName, task: &str, base: Duration) {
        lock(&self.inner.demo).start_agent_work(agent, task, None);
        let delay = self.scaled(base);
        tokio::time::sleep(delay).await;
        lock(&self.inner.demo).complete_agent_work(agent);
    }
}

/// Divides `base` by the simulation speed, never going below one millisecond.
pub fn scale_duration(base: Duration, speed: f64) -> Duration {
    if !speed.is_finite() || speed <= 0.0 {
        return base.max(MIN_TIMER_DURATION);
    }
    Duration::try_from_secs_f64(base.as_secs_f64() / speed)
        .unwrap_or(Duration::MAX)
        .max(MIN_TIMER_DURATION)
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
