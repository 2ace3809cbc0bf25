use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{DocId, Document};

/// Id-keyed table of full documents, the canonical store returned on query.
///
/// Written only by the ingestion pass; each lock is held for a single insert
/// or lookup so queries keep flowing while indexing runs.
#[derive(Default)]
pub struct Corpus {
    docs: RwLock<HashMap<DocId, Document>>,
}

impl Corpus {
    pub fn new() -> Self { Self::default() }

    /// Last write wins on id; returns the document that was replaced, if any.
    pub fn insert(&self, doc: Document) -> Option<Document> {
        self.docs.write().insert(doc.id, doc)
    }

    pub fn get(&self, id: DocId) -> Option<Document> {
        self.docs.read().get(&id).cloned()
    }

    /// Lookup that never fails; misses come back as the zero-value document.
    pub fn get_or_default(&self, id: DocId) -> Document {
        self.get(id).unwrap_or_default()
    }

    pub fn len(&self) -> usize { self.docs.read().len() }

    pub fn is_empty(&self) -> bool { self.docs.read().is_empty() }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.docs.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: DocId, text: &str) -> Document {
        Document { id, text: text.into(), ..Default::default() }
    }

    #[test]
    fn last_write_wins() {
        let corpus = Corpus::new();
        assert!(corpus.insert(doc(1, "first")).is_none());
        let replaced = corpus.insert(doc(1, "second")).unwrap();
        assert_eq!(replaced.text, "first");
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get(1).unwrap().text, "second");
    }

    #[test]
    fn miss_yields_zero_document() {
        let corpus = Corpus::new();
        assert!(corpus.is_empty());
        assert_eq!(corpus.get_or_default(7), Document::default());
    }
}
