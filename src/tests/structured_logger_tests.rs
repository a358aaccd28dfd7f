use super::*;
use tempfile::TempDir;

fn create_test_logger() -> (StructuredLogger, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logger =
        StructuredLogger::new("test-session", temp_dir.path()).expect("Failed to create logger");
    (logger, temp_dir)
}

fn read_entries(temp_dir: &TempDir) -> Vec<LogEntry> {
    let content = std::fs::read_to_string(temp_dir.path().join("events.jsonl"))
        .expect("Failed to read log file");
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse log entry"))
        .collect()
}

#[test]
fn test_log_entries_are_valid_json() {
    let (logger, temp_dir) = create_test_logger();

    logger.log("TestComponent", serde_json::json!({"key": "value1"}));
    logger.log("TestComponent", serde_json::json!({"key": "value2"}));

    let entries = read_entries(&temp_dir);
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert_eq!(entry.session_id, "test-session");
        assert_eq!(entry.component, "TestComponent");
    }
}

#[test]
fn test_sequence_numbers_monotonic() {
    let (logger, temp_dir) = create_test_logger();

    for i in 0..10 {
        logger.log("Test", serde_json::json!({"iteration": i}));
    }

    let mut prev_seq = 0u64;
    for entry in read_entries(&temp_dir) {
        assert!(
            entry.seq > prev_seq,
            "Sequence numbers should be monotonically increasing"
        );
        prev_seq = entry.seq;
    }
}

#[test]
fn test_run_id_increments() {
    let (logger, temp_dir) = create_test_logger();

    logger.log("Test", serde_json::json!({"msg": "first"}));
    logger.increment_run_id();
    logger.log("Test", serde_json::json!({"msg": "second"}));

    let entries = read_entries(&temp_dir);
    assert_eq!(entries[0].run_id, 1);
    assert_eq!(entries[1].run_id, 2);
    assert_eq!(logger.run_id(), 2);
}

#[test]
fn test_concurrent_logging() {
    use std::sync::Arc;
    use std::thread;

    let (logger, temp_dir) = create_test_logger();
    let logger = Arc::new(logger);

    let handles: Vec<_> = (0..5)
        .map(|t| {
            let logger_clone = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..20 {
                    logger_clone.log("Thread", serde_json::json!({"thread": t, "iteration": i}));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(read_entries(&temp_dir).len(), 100);
}

#[test]
fn test_timestamp_format() {
    let (logger, temp_dir) = create_test_logger();

    logger.log("Test", serde_json::json!({"msg": "test"}));

    let entry = read_entries(&temp_dir).remove(0);
    assert!(entry.ts.contains('T'));
    assert!(entry.ts.ends_with('Z'));
    let micros_part = entry.ts.split('.').nth(1).unwrap();
    assert_eq!(micros_part.len(), 7); // 6 digits + 'Z'
}

#[test]
fn test_command_and_event_logging() {
    let (logger, temp_dir) = create_test_logger();

    logger.log_command(
        1,
        &StateCommand::StartWorkflow {
            workflow_type: "blog".to_string(),
        },
    );
    logger.log_event(
        1,
        &StateEvent::UnknownWorkflowType {
            workflow_type: "blog".to_string(),
        },
    );
    logger.log_timer_cancelled(3, 2);

    let entries = read_entries(&temp_dir);
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].component, "Engine");
    assert_eq!(entries[0].event["type"], "Command");
    assert_eq!(entries[0].event["command"]["type"], "StartWorkflow");
    assert_eq!(entries[0].event["command"]["workflow_type"], "blog");

    assert_eq!(entries[1].event["type"], "Event");
    assert_eq!(entries[1].event["event"]["type"], "UnknownWorkflowType");

    assert_eq!(entries[2].component, "Timer");
    assert_eq!(entries[2].event["generation"], 3);
}
