//! Demo-wide state: agent ledger, brain documents, workflow progress and
//! simulation settings. Every mutation writes the full snapshot.

use crate::agent_activity::{AgentLedger, AgentName};
use crate::brain::{BrainDocument, BrainStore};
use crate::persistence::{
    load_from_storage, save_to_storage, DemoSnapshot, SessionStorage, WorkflowProgressEntry,
};

pub struct DemoStore {
    ledger: AgentLedger,
    brain: BrainStore,
    workflows_in_progress: Vec<WorkflowProgressEntry>,
    show_agent_details: bool,
    simulation_speed: f64,
    storage: Box<dyn SessionStorage>,
}

impl DemoStore {
    /// Builds the store from whatever snapshot `storage` holds.
    pub fn load(storage: Box<dyn SessionStorage>) -> Self {
        let snapshot = load_from_storage(storage.as_ref());
        let simulation_speed = if is_valid_speed(snapshot.simulation_speed) {
            snapshot.simulation_speed
        } else {
            tracing::warn!(
                speed = snapshot.simulation_speed,
                "Ignoring persisted simulation speed"
            );
            DemoSnapshot::default().simulation_speed
        };

        Self {
            ledger: AgentLedger::from_parts(snapshot.active_agents, snapshot.agent_history),
            brain: BrainStore::from_parts(
                snapshot.brain_documents,
                snapshot.active_brain_documents,
            ),
            workflows_in_progress: snapshot.workflows_in_progress,
            show_agent_details: snapshot.show_agent_details,
            simulation_speed,
            storage,
        }
    }

    pub fn snapshot(&self) -> DemoSnapshot {
        DemoSnapshot {
            active_agents: self.ledger.active().to_vec(),
            agent_history: self.ledger.history().to_vec(),
            brain_documents: self.brain.documents().to_vec(),
            active_brain_documents: self.brain.active_ids().to_vec(),
            workflows_in_progress: self.workflows_in_progress.clone(),
            show_agent_details: self.show_agent_details,
            simulation_speed: self.simulation_speed,
        }
    }

    pub fn save_to_storage(&self) {
        save_to_storage(self.storage.as_ref(), &self.snapshot());
    }

    // Agent ledger

    pub fn start_agent_work(&mut self, agent: AgentName, task: &str, reasoning: Option<&str>) {
        self.ledger.start_agent_work(agent, task, reasoning);
        tracing::debug!(%agent, task, "Agent started work");
        self.save_to_storage();
    }

    pub fn complete_agent_work(&mut self, agent: AgentName) {
        if self.ledger.complete_agent_work(agent) {
            tracing::debug!(%agent, "Agent completed work");
        }
        self.save_to_storage();
    }

    pub fn set_agent_idle(&mut self, agent: AgentName) {
        self.ledger.set_agent_idle(agent);
        self.save_to_storage();
    }

    pub fn clear_agent_activity(&mut self) {
        self.ledger.clear_agent_activity();
        self.save_to_storage();
    }

    pub fn ledger(&self) -> &AgentLedger {
        &self.ledger
    }

    // Brain documents

    pub fn add_document(&mut self, document: BrainDocument) {
        self.brain.add_document(document);
        self.save_to_storage();
    }

    pub fn remove_document(&mut self, id: &str) -> Option<BrainDocument> {
        let removed = self.brain.remove_document(id);
        self.save_to_storage();
        removed
    }

    pub fn toggle_document_active(&mut self, id: &str) -> Option<bool> {
        let active = self.brain.toggle_document_active(id);
        self.save_to_storage();
        active
    }

    pub fn brain(&self) -> &BrainStore {
        &self.brain
    }

    // Workflow progress

    /// Inserts or replaces the entry with the same workflow id.
    pub fn upsert_workflow_progress(&mut self, entry: WorkflowProgressEntry) {
        match self
            .workflows_in_progress
            .iter_mut()
            .find(|e| e.workflow_id == entry.workflow_id)
        {
            Some(existing) => *existing = entry,
            None => self.workflows_in_progress.push(entry),
        }
        self.save_to_storage();
    }

    pub fn remove_workflow_progress(&mut self, workflow_id: &str) {
        self.workflows_in_progress
            .retain(|e| e.workflow_id != workflow_id);
        self.save_to_storage();
    }

    pub fn workflows_in_progress(&self) -> &[WorkflowProgressEntry] {
        &self.workflows_in_progress
    }

    // Settings

    pub fn set_show_agent_details(&mut self, show: bool) {
        self.show_agent_details = show;
        self.save_to_storage();
    }

    pub fn show_agent_details(&self) -> bool {
        self.show_agent_details
    }

    /// Sets the simulation speed multiplier. Non-positive or non-finite
    /// values are rejected and leave the speed unchanged.
    pub fn set_simulation_speed(&mut self, speed: f64) -> bool {
        if !is_valid_speed(speed) {
            tracing::warn!(speed, "Rejecting invalid simulation speed");
            return false;
        }
        self.simulation_speed = speed;
        self.save_to_storage();
        true
    }

    pub fn simulation_speed(&self) -> f64 {
        self.simulation_speed
    }
}

fn is_valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

#[cfg(test)]
#[path = "tests/demo_store_tests.rs"]
mod tests;
