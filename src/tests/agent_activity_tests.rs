use super::*;
use proptest::prelude::*;

#[test]
fn test_start_replaces_existing_entry_for_agent() {
    let mut ledger = AgentLedger::new();
    ledger.start_agent_work(AgentName::Research, "task1", None);
    ledger.start_agent_work(AgentName::Research, "task2", None);

    let research: Vec<_> = ledger
        .active()
        .iter()
        .filter(|a| a.agent == AgentName::Research)
        .collect();
    assert_eq!(research.len(), 1);
    assert_eq!(research[0].task, "task2");
}

#[test]
fn test_default_reasoning() {
    let mut ledger = AgentLedger::new();
    ledger.start_agent_work(AgentName::Copywriter, "Write intro", None);
    let activity = ledger.activity_for(AgentName::Copywriter).unwrap();
    assert_eq!(activity.reasoning.as_deref(), Some("Working on: Write intro"));
    assert_eq!(activity.status, AgentStatus::Working);
}

#[test]
fn test_explicit_reasoning_kept() {
    let mut ledger = AgentLedger::new();
    ledger.start_agent_work(AgentName::Analyst, "Score", Some("Comparing baselines"));
    assert_eq!(
        ledger.activity_for(AgentName::Analyst).unwrap().reasoning.as_deref(),
        Some("Comparing baselines")
    );
}

#[test]
fn test_complete_moves_to_history() {
    let mut ledger = AgentLedger::new();
    ledger.start_agent_work(AgentName::Editor, "Polish", None);

    assert!(ledger.complete_agent_work(AgentName::Editor));
    assert!(ledger.active().is_empty());
    assert_eq!(ledger.history().len(), 1);
    let done = &ledger.history()[0];
    assert_eq!(done.status, AgentStatus::Completed);
    assert!(done.completed_at.is_some());
}

#[test]
fn test_complete_without_active_is_noop() {
    let mut ledger = AgentLedger::new();
    assert!(!ledger.complete_agent_work(AgentName::Strategist));
    assert!(ledger.history().is_empty());
}

#[test]
fn test_history_bounded_newest_first() {
    let mut ledger = AgentLedger::new();
    for i in 0..60 {
        ledger.start_agent_work(AgentName::Research, &format!("task-{}", i), None);
        ledger.complete_agent_work(AgentName::Research);
    }

    assert_eq!(ledger.history().len(), MAX_AGENT_HISTORY);
    assert_eq!(ledger.history()[0].task, "task-59");
    assert_eq!(ledger.history()[49].task, "task-10");
}

#[test]
fn test_idle_and_clear_skip_history() {
    let mut ledger = AgentLedger::new();
    ledger.start_agent_work(AgentName::Research, "a", None);
    ledger.start_agent_work(AgentName::Analyst, "b", None);

    assert!(ledger.set_agent_idle(AgentName::Research));
    assert!(!ledger.is_working(AgentName::Research));
    assert!(ledger.is_working(AgentName::Analyst));

    ledger.clear_agent_activity();
    assert!(ledger.active().is_empty());
    assert!(ledger.history().is_empty());
}

#[test]
fn test_from_parts_restores_invariants() {
    let mut source = AgentLedger::new();
    source.start_agent_work(AgentName::Research, "old", None);
    let mut duplicate = source.active()[0].clone();
    duplicate.task = "new".to_string();

    let history = vec![source.active()[0].clone(); MAX_AGENT_HISTORY + 5];
    let ledger = AgentLedger::from_parts(vec![source.active()[0].clone(), duplicate], history);

    assert_eq!(ledger.active().len(), 1);
    assert_eq!(ledger.active()[0].task, "new");
    assert_eq!(ledger.history().len(), MAX_AGENT_HISTORY);
}

#[test]
fn test_agent_name_parse() {
    assert_eq!("research".parse::<AgentName>(), Ok(AgentName::Research));
    assert_eq!("Copywriter".parse::<AgentName>(), Ok(AgentName::Copywriter));
    assert!("Designer".parse::<AgentName>().is_err());
}

#[test]
fn test_activity_serializes_camel_case() {
    let mut ledger = AgentLedger::new();
    ledger.start_agent_work(AgentName::Research, "a", None);
    let json = serde_json::to_value(&ledger.active()[0]).unwrap();
    assert!(json.get("startedAt").is_some());
    assert_eq!(json["agent"], "Research");
    assert_eq!(json["status"], "working");
}

fn agent_strategy() -> impl Strategy<Value = AgentName> {
    prop::sample::select(AgentName::ALL.to_vec())
}

#[derive(Debug, Clone)]
enum Op {
    Start(AgentName),
    Complete(AgentName),
    Idle(AgentName),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => agent_strategy().prop_map(Op::Start),
        4 => agent_strategy().prop_map(Op::Complete),
        1 => agent_strategy().prop_map(Op::Idle),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn prop_active_set_unique_and_history_bounded(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut ledger = AgentLedger::new();
        for op in ops {
            match op {
                Op::Start(agent) => ledger.start_agent_work(agent, "task", None),
                Op::Complete(agent) => {
                    ledger.complete_agent_work(agent);
                }
                Op::Idle(agent) => {
                    ledger.set_agent_idle(agent);
                }
                Op::Clear => ledger.clear_agent_activity(),
            }

            for agent in AgentName::ALL {
                let count = ledger.active().iter().filter(|a| a.agent == agent).count();
                prop_assert!(count <= 1);
            }
            prop_assert!(ledger.history().len() <= MAX_AGENT_HISTORY);
            prop_assert!(ledger.history().iter().all(|a| a.status == AgentStatus::Completed));
        }
    }
}
