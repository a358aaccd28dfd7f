use super::*;
use crate::brain::DocumentKind;
use crate::persistence::{MemorySessionStorage, STORAGE_KEY};
use chrono::Utc;

fn create_test_store() -> (DemoStore, MemorySessionStorage) {
    let storage = MemorySessionStorage::new();
    let store = DemoStore::load(Box::new(storage.clone()));
    (store, storage)
}

fn persisted(storage: &MemorySessionStorage) -> DemoSnapshot {
    load_from_storage(storage)
}

fn progress(id: &str, index: usize) -> WorkflowProgressEntry {
    WorkflowProgressEntry {
        workflow_id: id.to_string(),
        workflow_type: "blog".to_string(),
        current_stage_index: index,
        total_stages: 7,
        current_stage_title: format!("stage {}", index),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_every_ledger_mutation_persists() {
    let (mut store, storage) = create_test_store();
    assert!(storage.get_item(STORAGE_KEY).unwrap().is_none());

    store.start_agent_work(AgentName::Research, "Scan sources", None);
    assert_eq!(persisted(&storage).active_agents.len(), 1);

    store.complete_agent_work(AgentName::Research);
    let snapshot = persisted(&storage);
    assert!(snapshot.active_agents.is_empty());
    assert_eq!(snapshot.agent_history.len(), 1);

    store.start_agent_work(AgentName::Analyst, "Score", None);
    store.set_agent_idle(AgentName::Analyst);
    assert!(persisted(&storage).active_agents.is_empty());
    assert_eq!(persisted(&storage).agent_history.len(), 1);
}

#[test]
fn test_reload_restores_state() {
    let (mut store, storage) = create_test_store();
    store.start_agent_work(AgentName::Copywriter, "Draft", Some("Long-form"));
    store.start_agent_work(AgentName::Editor, "Polish", None);
    store.complete_agent_work(AgentName::Editor);
    let doc = BrainDocument::new("Voice.md", DocumentKind::Uploaded);
    let doc_id = doc.id.clone();
    store.add_document(doc);
    store.toggle_document_active(&doc_id);
    store.set_show_agent_details(false);
    store.set_simulation_speed(4.0);
    store.upsert_workflow_progress(progress("wf-1", 3));

    let reloaded = DemoStore::load(Box::new(storage.clone()));
    assert_eq!(reloaded.snapshot(), store.snapshot());
    assert!(reloaded.ledger().is_working(AgentName::Copywriter));
    assert_eq!(reloaded.brain().active_ids(), &[doc_id]);
}

#[test]
fn test_upsert_replaces_by_workflow_id() {
    let (mut store, _storage) = create_test_store();
    store.upsert_workflow_progress(progress("wf-1", 0));
    store.upsert_workflow_progress(progress("wf-2", 0));
    store.upsert_workflow_progress(progress("wf-1", 4));

    let entries = store.workflows_in_progress();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].current_stage_index, 4);

    store.remove_workflow_progress("wf-1");
    assert_eq!(store.workflows_in_progress().len(), 1);
    assert_eq!(store.workflows_in_progress()[0].workflow_id, "wf-2");
}

#[test]
fn test_invalid_speed_rejected() {
    let (mut store, _storage) = create_test_store();
    assert!(!store.set_simulation_speed(0.0));
    assert!(!store.set_simulation_speed(-1.0));
    assert!(!store.set_simulation_speed(f64::NAN));
    assert!(!store.set_simulation_speed(f64::INFINITY));
    assert_eq!(store.simulation_speed(), 1.0);

    assert!(store.set_simulation_speed(0.5));
    assert_eq!(store.simulation_speed(), 0.5);
}

#[test]
fn test_persisted_invalid_speed_falls_back() {
    let storage = MemorySessionStorage::new();
    storage
        .set_item(STORAGE_KEY, r#"{"simulationSpeed": -2.0, "showAgentDetails": false}"#)
        .unwrap();
    let store = DemoStore::load(Box::new(storage));
    assert_eq!(store.simulation_speed(), 1.0);
    assert!(!store.show_agent_details());
}

#[test]
fn test_quota_failure_does_not_propagate() {
    let storage = MemorySessionStorage::with_quota(8);
    let mut store = DemoStore::load(Box::new(storage.clone()));

    store.start_agent_work(AgentName::Research, "Scan", None);
    store.complete_agent_work(AgentName::Research);

    assert_eq!(store.ledger().history().len(), 1);
    assert!(storage.get_item(STORAGE_KEY).unwrap().is_none());
}

#[test]
fn test_remove_document_persists() {
    let (mut store, storage) = create_test_store();
    let mut doc = BrainDocument::new("Old deck.pdf", DocumentKind::Uploaded);
    doc.active = true;
    let id = doc.id.clone();
    store.add_document(doc);
    assert_eq!(persisted(&storage).active_brain_documents, vec![id.clone()]);

    assert!(store.remove_document(&id).is_some());
    let snapshot = persisted(&storage);
    assert!(snapshot.brain_documents.is_empty());
    assert!(snapshot.active_brain_documents.is_empty());
}
