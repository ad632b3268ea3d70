// FAQ document store: one document per blank-line separated record
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::Result;

/// Record separator
pub const RECORD_SEPARATOR: &str = "\n\n";

/// One FAQ record; `index` is its position in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub index: usize,
    pub text: String,
}

impl Document {
    /// First `max_chars` characters, for display
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// Ordered, immutable document collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Split on blank lines, trim each record, drop empty ones
    ///
    /// CRLF line endings are read as LF.
    pub fn from_text(text: &str) -> Self {
        let text = text.replace("\r\n", "\n");
        let documents = text
            .trim()
            .split(RECORD_SEPARATOR)
            .map(str::trim)
            .filter(|record| !record.is_empty())
            .enumerate()
            .map(|(index, record)| Document {
                index,
                text: record.to_string(),
            })
            .collect();
        Self { documents }
    }

    /// Load a UTF-8 FAQ file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let store = Self::from_text(&text);
        tracing::debug!(path = %path.display(), documents = store.len(), "loaded FAQ");
        Ok(store)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
