//! Simulated agent activity: who is "working" right now and what they did before.
//!
//! Display-only state. Nothing here affects workflow correctness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of completed activities kept in history.
pub const MAX_AGENT_HISTORY: usize = 50;

/// The closed set of simulated agents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AgentName {
    Research,
    Strategist,
    Copywriter,
    Editor,
    Analyst,
}

impl AgentName {
    pub const ALL: [AgentName; 5] = [
        AgentName::Research,
        AgentName::Strategist,
        AgentName::Copywriter,
        AgentName::Editor,
        AgentName::Analyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Research => "Research",
            AgentName::Strategist => "Strategist",
            AgentName::Copywriter => "Copywriter",
            AgentName::Editor => "Editor",
            AgentName::Analyst => "Analyst",
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentName::ALL
            .into_iter()
            .find(|agent| agent.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown agent '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Working,
    Completed,
}

/// One simulated worker's current or past task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub id: String,
    pub agent: AgentName,
    pub task: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub reasoning: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Active set plus bounded, newest-first history.
///
/// The active set never holds two entries for the same agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentLedger {
    active: Vec<AgentActivity>,
    history: Vec<AgentActivity>,
}

impl AgentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a ledger from persisted parts, re-establishing the invariants
    /// (one active entry per agent, bounded history).
    pub fn from_parts(active: Vec<AgentActivity>, mut history: Vec<AgentActivity>) -> Self {
        let mut ledger = Self::new();
        for activity in active {
            ledger.active.retain(|a| a.agent != activity.agent);
            ledger.active.push(activity);
        }
        history.truncate(MAX_AGENT_HISTORY);
        ledger.history = history;
        ledger
    }

    /// Starts work for `agent`, replacing any entry it already has in the active set.
    pub fn start_agent_work(&mut self, agent: AgentName, task: &str, reasoning: Option<&str>) {
        let reasoning = reasoning
            .map(str::to_string)
            .unwrap_or_else(|| format!("Working on: {}", task));

        self.active.retain(|a| a.agent != agent);
        self.active.push(AgentActivity {
            id: Uuid::new_v4().to_string(),
            agent,
            task: task.to_string(),
            status: AgentStatus::Working,
            reasoning: Some(reasoning),
            started_at: Utc::now(),
            completed_at: None,
        });
    }

    /// Moves the agent's active entry into history. Returns false if it had none.
    pub fn complete_agent_work(&mut self, agent: AgentName) -> bool {
        let Some(pos) = self.active.iter().position(|a| a.agent == agent) else {
            return false;
        };
        let mut activity = self.active.remove(pos);
        activity.status = AgentStatus::Completed;
        activity.completed_at = Some(Utc::now());

        self.history.insert(0, activity);
        self.history.truncate(MAX_AGENT_HISTORY);
        true
    }

    /// Drops the agent from the active set without recording history.
    pub fn set_agent_idle(&mut self, agent: AgentName) -> bool {
        let before = self.active.len();
        self.active.retain(|a| a.agent != agent);
        self.active.len() != before
    }

    /// Drops every active entry without recording history.
    pub fn clear_agent_activity(&mut self) {
        self.active.clear();
    }

    pub fn active(&self) -> &[AgentActivity] {
        &self.active
    }

    pub fn history(&self) -> &[AgentActivity] {
        &self.history
    }

    pub fn is_working(&self, agent: AgentName) -> bool {
        self.activity_for(agent).is_some()
    }

    pub fn activity_for(&self, agent: AgentName) -> Option<&AgentActivity> {
        self.active.iter().find(|a| a.agent == agent)
    }
}

#[cfg(test)]
#[path = "tests/agent_activity_tests.rs"]
mod tests;
