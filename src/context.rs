//! Single-slot hand-off of a content seed between otherwise decoupled modules.
//!
//! Setting overwrites any unread value; there is no queue and no expiry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a content seed originated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Research,
    Calendar,
    Brain,
    Strategy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossModuleContext {
    pub source: ContextSource,
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl CrossModuleContext {
    pub fn new(source: ContextSource, source_id: &str, title: &str) -> Self {
        Self {
            source,
            source_id: source_id.to_string(),
            title: title.to_string(),
            description: None,
            payload: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Text used to seed an input stage: the title, then the description if any.
    pub fn seed_text(&self) -> String {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => {
                format!("{}\n\n{}", self.title, description)
            }
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextMailbox {
    slot: Option<CrossModuleContext>,
}

impl ContextMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot. An unread previous value is discarded.
    pub fn set_context(&mut self, context: Option<CrossModuleContext>) {
        if let (Some(old), Some(new)) = (&self.slot, &context) {
            tracing::debug!(
                discarded = %old.source_id,
                replacement = %new.source_id,
                "Overwriting unread cross-module context"
            );
        }
        self.slot = context;
    }

    pub fn clear_context(&mut self) {
        self.slot = None;
    }

    /// Peeks without consuming.
    pub fn context(&self) -> Option<&CrossModuleContext> {
        self.slot.as_ref()
    }

    /// Consumes the value; the next reader sees nothing.
    pub fn take_context(&mut self) -> Option<CrossModuleContext> {
        self.slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finding(id: &str) -> CrossModuleContext {
        CrossModuleContext::new(ContextSource::Research, id, &format!("Finding {}", id))
    }

    #[test]
    fn test_set_overwrites_unread_value() {
        let mut mailbox = ContextMailbox::new();
        mailbox.set_context(Some(finding("a")));
        mailbox.set_context(Some(finding("b")));

        assert_eq!(mailbox.context().map(|c| c.source_id.as_str()), Some("b"));

        mailbox.clear_context();
        assert!(mailbox.context().is_none());
    }

    #[test]
    fn test_set_none_clears() {
        let mut mailbox = ContextMailbox::new();
        mailbox.set_context(Some(finding("a")));
        mailbox.set_context(None);
        assert!(mailbox.context().is_none());
    }

    #[test]
    fn test_take_consumes() {
        let mut mailbox = ContextMailbox::new();
        mailbox.set_context(Some(finding("a")));

        let taken = mailbox.take_context().unwrap();
        assert_eq!(taken.source_id, "a");
        assert!(mailbox.take_context().is_none());
    }

    #[test]
    fn test_seed_text() {
        let plain = finding("a");
        assert_eq!(plain.seed_text(), "Finding a");

        let described = finding("b").with_description("Churn is up 4% in SMB");
        assert_eq!(described.seed_text(), "Finding b\n\nChurn is up 4% in SMB");
    }

    #[test]
    fn test_serializes_camel_case() {
        let ctx = CrossModuleContext::new(ContextSource::Calendar, "slot-3", "Week 3")
            .with_payload(json!({"channel": "blog"}));
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["sourceId"], "slot-3");
        assert_eq!(value["source"], "calendar");
        assert_eq!(value["payload"]["channel"], "blog");
    }
}
