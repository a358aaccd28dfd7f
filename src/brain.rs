//! "Marketing Brain" documents and which of them are in the assistant's context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Uploaded,
    Generated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrainDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl BrainDocument {
    pub fn new(name: &str, kind: DocumentKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            content: None,
            active: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }
}

/// Documents plus the ordered list of ids currently in context.
///
/// `active` flags and `active_ids` are kept in agreement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrainStore {
    documents: Vec<BrainDocument>,
    active_ids: Vec<String>,
}

impl BrainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores from persisted parts. Ids in `active_ids` that name no document
    /// are dropped, and flags are re-derived from the id list.
    pub fn from_parts(mut documents: Vec<BrainDocument>, active_ids: Vec<String>) -> Self {
        let mut kept_ids: Vec<String> = Vec::new();
        for id in active_ids {
            if documents.iter().any(|d| d.id == id) && !kept_ids.contains(&id) {
                kept_ids.push(id);
            }
        }
        for doc in &mut documents {
            doc.active = kept_ids.contains(&doc.id);
        }
        Self {
            documents,
            active_ids: kept_ids,
        }
    }

    pub fn add_document(&mut self, document: BrainDocument) {
        if document.active && !self.active_ids.contains(&document.id) {
            self.active_ids.push(document.id.clone());
        }
        self.documents.push(document);
    }

    pub fn remove_document(&mut self, id: &str) -> Option<BrainDocument> {
        let pos = self.documents.iter().position(|d| d.id == id)?;
        self.active_ids.retain(|active| active != id);
        Some(self.documents.remove(pos))
    }

    /// Flips whether the document is in context. Returns the new flag, or
    /// `None` if no document has that id.
    pub fn toggle_document_active(&mut self, id: &str) -> Option<bool> {
        let doc = self.documents.iter_mut().find(|d| d.id == id)?;
        doc.active = !doc.active;
        if doc.active {
            self.active_ids.push(doc.id.clone());
        } else {
            self.active_ids.retain(|active| active != id);
        }
        Some(doc.active)
    }

    pub fn documents(&self) -> &[BrainDocument] {
        &self.documents
    }

    pub fn active_ids(&self) -> &[String] {
        &self.active_ids
    }

    pub fn active_documents(&self) -> impl Iterator<Item = &BrainDocument> {
        self.documents.iter().filter(|d| d.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_keeps_flags_and_ids_in_sync() {
        let mut store = BrainStore::new();
        let doc = BrainDocument::new("Brand voice.pdf", DocumentKind::Uploaded);
        let id = doc.id.clone();
        store.add_document(doc);

        assert_eq!(store.toggle_document_active(&id), Some(true));
        assert_eq!(store.active_ids(), &[id.clone()]);
        assert_eq!(store.active_documents().count(), 1);

        assert_eq!(store.toggle_document_active(&id), Some(false));
        assert!(store.active_ids().is_empty());
        assert_eq!(store.active_documents().count(), 0);
    }

    #[test]
    fn test_toggle_unknown_id() {
        let mut store = BrainStore::new();
        assert_eq!(store.toggle_document_active("missing"), None);
    }

    #[test]
    fn test_remove_drops_active_id() {
        let mut store = BrainStore::new();
        let mut doc = BrainDocument::new("ICP.md", DocumentKind::Generated);
        doc.active = true;
        let id = doc.id.clone();
        store.add_document(doc);
        assert_eq!(store.active_ids().len(), 1);

        let removed = store.remove_document(&id).unwrap();
        assert_eq!(removed.name, "ICP.md");
        assert!(store.active_ids().is_empty());
        assert!(store.documents().is_empty());
    }

    #[test]
    fn test_from_parts_reconciles() {
        let a = BrainDocument::new("a", DocumentKind::Uploaded);
        let b = BrainDocument::new("b", DocumentKind::Uploaded);
        let store = BrainStore::from_parts(
            vec![a.clone(), b.clone()],
            vec![b.id.clone(), "ghost".to_string(), b.id.clone()],
        );

        assert_eq!(store.active_ids(), &[b.id.clone()]);
        let active: Vec<&str> = store.active_documents().map(|d| d.name.as_str()).collect();
        assert_eq!(active, vec!["b"]);
    }
}
