//! Open document store

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tower_lsp::lsp_types::Url;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub uri: Url,
    pub language_id: String,
    pub version: i32,
    pub text: String,
}

/// Documents the client has opened, keyed by URI
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Mutex<HashMap<Url, TextDocument>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, document: TextDocument) {
        debug!(uri = %document.uri, version = document.version, "Document opened");
        self.lock().insert(document.uri.clone(), document);
    }

    /// Replaces the full text of an open document.
    ///
    /// Returns false if the document is not open.
    pub fn replace(&self, uri: &Url, version: i32, text: String) -> bool {
        let mut documents = self.lock();
        let Some(document) = documents.get_mut(uri) else {
            return false;
        };
        document.version = version;
        document.text = text;
        true
    }

    pub fn close(&self, uri: &Url) -> Option<TextDocument> {
        self.lock().remove(uri)
    }

    pub fn get(&self, uri: &Url) -> Option<TextDocument> {
        self.lock().get(uri).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Url, TextDocument>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(uri: &str, text: &str) -> TextDocument {
        TextDocument {
            uri: Url::parse(uri).unwrap(),
            language_id: "json".to_string(),
            version: 1,
            text: text.to_string(),
        }
    }

    #[test]
    fn open_then_get_returns_document() {
        let store = DocumentStore::new();
        store.open(document("file:///a.json", "{}"));

        let uri = Url::parse("file:///a.json").unwrap();
        assert_eq!(store.get(&uri).unwrap().text, "{}");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_updates_text_and_version() {
        let store = DocumentStore::new();
        store.open(document("file:///a.json", "{}"));
        let uri = Url::parse("file:///a.json").unwrap();

        assert!(store.replace(&uri, 2, "[]".to_string()));
        let updated = store.get(&uri).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.text, "[]");
    }

    #[test]
    fn replace_unknown_document_is_rejected() {
        let store = DocumentStore::new();
        let uri = Url::parse("file:///missing.json").unwrap();
        assert!(!store.replace(&uri, 2, "[]".to_string()));
        assert!(store.is_empty());
    }

    #[test]
    fn close_removes_document() {
        let store = DocumentStore::new();
        store.open(document("file:///a.json", "{}"));
        let uri = Url::parse("file:///a.json").unwrap();

        assert!(store.close(&uri).is_some());
        assert!(store.get(&uri).is_none());
    }
}
