//! The indexing-engine capability and its in-process implementation.

use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use thiserror::Error;

use crate::scoring::{IndexedDocument, ScoreVector, ScoringCriteria, ScoringFields};
use crate::tokenizer::{query_terms, tokenize};
use crate::DocId;

const BM25_K1: f32 = 2.0;
const BM25_B: f32 = 0.75;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("index is closed")]
    Closed,
}

/// One ranked candidate: the document id, its score vector and the query tokens it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    pub doc_id: DocId,
    pub scores: ScoreVector,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutput {
    /// Query tokens after analysis.
    pub tokens: Vec<String>,
    /// Ranked page of hits, best first.
    pub docs: Vec<RankedHit>,
    /// Matching documents before offset/limit.
    pub total_hits: usize,
}

/// Document-ingestion and search capability the service is built against.
pub trait Indexer: Send + Sync {
    /// Queue a document for indexing. It becomes searchable after [`Indexer::flush`].
    fn register_document(&self, id: DocId, text: &str, fields: ScoringFields) -> Result<(), IndexerError>;

    /// Make every registered document visible to searches.
    fn flush(&self);

    fn search(&self, query: &str, criteria: &dyn ScoringCriteria, offset: usize, max_outputs: usize) -> SearchOutput;

    /// Flush buffered state and stop accepting work.
    fn close(&self);

    /// Number of searchable documents.
    fn num_documents(&self) -> usize;

    /// True once [`Indexer::close`] has run; long-running producers stop feeding the engine.
    fn is_closed(&self) -> bool;
}

#[derive(Debug, Clone)]
struct DocEntry {
    len: usize,
    terms: Vec<String>,
    fields: ScoringFields,
}

#[derive(Default)]
struct InvertedIndex {
    /// term -> doc -> ordered token positions
    postings: HashMap<String, HashMap<DocId, Vec<usize>>>,
    docs: HashMap<DocId, DocEntry>,
    total_len: usize,
}

impl InvertedIndex {
    fn remove(&mut self, id: DocId) {
        let Some(old) = self.docs.remove(&id) else { return };
        self.total_len -= old.len;
        for term in old.terms {
            if let Some(plist) = self.postings.get_mut(&term) {
                plist.remove(&id);
                if plist.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    fn insert(&mut self, id: DocId, text: &str, fields: ScoringFields) {
        self.remove(id);
        let tokens = tokenize(text);
        let len = tokens.len();
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (term, pos) in tokens {
            positions.entry(term).or_default().push(pos);
        }
        let terms: Vec<String> = positions.keys().cloned().collect();
        for (term, locs) in positions {
            self.postings.entry(term).or_default().insert(id, locs);
        }
        self.total_len += len;
        self.docs.insert(id, DocEntry { len, terms, fields });
    }

    fn avg_len(&self) -> f32 {
        if self.docs.is_empty() {
            return 1.0;
        }
        (self.total_len as f32 / self.docs.len() as f32).max(1.0)
    }

    fn bm25(&self, tfs: &[(usize, usize)], doc_len: usize) -> f32 {
        let n = self.docs.len() as f32;
        let avg = self.avg_len();
        tfs.iter()
            .map(|&(tf, df)| {
                let idf = (1.0 + n / df.max(1) as f32).ln();
                let tf = tf as f32;
                idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len as f32 / avg))
            })
            .sum()
    }
}

/// Minimum over one occurrence per term of the summed gaps between
/// consecutive terms, where adjacent terms in query order have gap 0.
pub fn token_proximity(positions: &[&[usize]]) -> u32 {
    let Some((first, rest)) = positions.split_first() else { return 0 };
    if first.is_empty() {
        return 0;
    }
    let mut prev_locs: &[usize] = first;
    let mut prev_cost: Vec<i64> = vec![0; first.len()];
    for locs in rest {
        let cost: Vec<i64> = locs
            .iter()
            .map(|&loc| {
                prev_locs
                    .iter()
                    .zip(prev_cost.iter())
                    .map(|(&p, &c)| c + (loc as i64 - p as i64 - 1).abs())
                    .min()
                    .unwrap_or(0)
            })
            .collect();
        prev_locs = locs;
        prev_cost = cost;
    }
    prev_cost.into_iter().min().unwrap_or(0) as u32
}

/// In-memory positional index with BM25 and proximity signals.
///
/// Registrations are buffered until [`Indexer::flush`] so a partially
/// ingested batch never shows up half-applied in search results.
#[derive(Default)]
pub struct MemoryIndexer {
    index: RwLock<InvertedIndex>,
    pending: Mutex<Vec<(DocId, String, ScoringFields)>>,
    closed: AtomicBool,
}

impl MemoryIndexer {
    pub fn new() -> Self { Self::default() }

    pub fn num_terms(&self) -> usize { self.index.read().postings.len() }

    pub fn num_pending(&self) -> usize { self.pending.lock().len() }
}

impl Indexer for MemoryIndexer {
    fn register_document(&self, id: DocId, text: &str, fields: ScoringFields) -> Result<(), IndexerError> {
        if self.is_closed() {
            return Err(IndexerError::Closed);
        }
        self.pending.lock().push((id, text.to_string(), fields));
        Ok(())
    }

    fn flush(&self) {
        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return;
        }
        let count = batch.len();
        let mut index = self.index.write();
        for (id, text, fields) in batch {
            index.insert(id, &text, fields);
        }
        tracing::debug!(count, docs = index.docs.len(), terms = index.postings.len(), "flushed index");
    }

    fn search(&self, query: &str, criteria: &dyn ScoringCriteria, offset: usize, max_outputs: usize) -> SearchOutput {
        let tokens = query_terms(query);
        if tokens.is_empty() || self.is_closed() {
            return SearchOutput { tokens, ..Default::default() };
        }
        let index = self.index.read();
        let lists: Option<Vec<&HashMap<DocId, Vec<usize>>>> =
            tokens.iter().map(|t| index.postings.get(t)).collect();
        let Some(lists) = lists else {
            return SearchOutput { tokens, ..Default::default() };
        };
        let Some(shortest) = lists.iter().min_by_key(|l| l.len()) else {
            return SearchOutput { tokens, ..Default::default() };
        };

        let candidates: HashSet<DocId> = shortest
            .keys()
            .copied()
            .filter(|id| lists.iter().all(|l| l.contains_key(id)))
            .collect();

        let mut ranked: Vec<RankedHit> = Vec::with_capacity(candidates.len());
        for doc_id in candidates {
            let Some(entry) = index.docs.get(&doc_id) else { continue };
            let locs: Vec<&[usize]> = lists.iter().map(|l| l[&doc_id].as_slice()).collect();
            let tfs: Vec<(usize, usize)> = lists.iter().zip(locs.iter()).map(|(l, p)| (p.len(), l.len())).collect();
            let signals = IndexedDocument {
                doc_id,
                bm25: index.bm25(&tfs, entry.len),
                token_proximity: token_proximity(&locs),
            };
            let scores = criteria.score(&signals, &entry.fields);
            ranked.push(RankedHit { doc_id, scores, tokens: tokens.clone() });
        }

        ranked.sort_by(|a, b| match b.scores.compare(&a.scores) {
            Ordering::Equal => a.doc_id.cmp(&b.doc_id),
            ord => ord,
        });
        let total_hits = ranked.len();
        let docs = ranked.into_iter().skip(offset).take(max_outputs).collect();
        SearchOutput { tokens, docs, total_hits }
    }

    fn close(&self) {
        self.flush();
        self.closed.store(true, AtomicOrdering::SeqCst);
        tracing::info!(docs = self.num_documents(), "index closed");
    }

    fn num_documents(&self) -> usize { self.index.read().docs.len() }

    fn is_closed(&self) -> bool { self.closed.load(AtomicOrdering::SeqCst) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{PostFields, PostScoringCriteria};

    fn post(timestamp: u64, reposts_count: u64) -> ScoringFields {
        ScoringFields::Post(PostFields { timestamp, reposts_count })
    }

    fn proximity(lists: &[Vec<usize>]) -> u32 {
        let refs: Vec<&[usize]> = lists.iter().map(|l| l.as_slice()).collect();
        token_proximity(&refs)
    }

    #[test]
    fn proximity_of_adjacent_terms_is_zero() {
        assert_eq!(proximity(&[vec![3], vec![4]]), 0);
        assert_eq!(proximity(&[vec![0], vec![5]]), 4);
        assert_eq!(proximity(&[vec![0, 9], vec![5, 10]]), 0);
        assert_eq!(proximity(&[vec![7]]), 0);
        assert_eq!(proximity(&[]), 0);
    }

    #[test]
    fn registrations_are_invisible_until_flush() {
        let idx = MemoryIndexer::new();
        idx.register_document(1, "hello world", post(0, 0)).unwrap();
        assert_eq!(idx.search("hello", &PostScoringCriteria, 0, 10).docs.len(), 0);
        assert_eq!(idx.num_pending(), 1);
        idx.flush();
        assert_eq!(idx.search("hello", &PostScoringCriteria, 0, 10).docs.len(), 1);
        assert_eq!(idx.num_documents(), 1);
    }

    #[test]
    fn all_query_terms_must_match() {
        let idx = MemoryIndexer::new();
        idx.register_document(1, "hello world", post(0, 0)).unwrap();
        idx.register_document(2, "hello rust", post(0, 0)).unwrap();
        idx.flush();
        let out = idx.search("hello rust", &PostScoringCriteria, 0, 10);
        assert_eq!(out.docs.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(out.tokens, vec!["hello".to_string(), "rust".to_string()]);
        assert!(idx.search("missing", &PostScoringCriteria, 0, 10).docs.is_empty());
    }

    #[test]
    fn tight_match_beats_popular_loose_match() {
        let idx = MemoryIndexer::new();
        idx.register_document(1, "rust search engine", post(0, 0)).unwrap();
        idx.register_document(2, "rust makes a fast, small and dependable search", post(86_400 * 300, 1_000_000)).unwrap();
        idx.flush();
        let out = idx.search("rust search", &PostScoringCriteria, 0, 10);
        assert_eq!(out.docs[0].doc_id, 1);
        assert_eq!(out.docs[1].doc_id, 2);
    }

    #[test]
    fn reregistering_replaces_document() {
        let idx = MemoryIndexer::new();
        idx.register_document(1, "old text", post(0, 0)).unwrap();
        idx.flush();
        idx.register_document(1, "new text", post(0, 0)).unwrap();
        idx.flush();
        assert!(idx.search("old", &PostScoringCriteria, 0, 10).docs.is_empty());
        assert_eq!(idx.search("new", &PostScoringCriteria, 0, 10).docs.len(), 1);
        assert_eq!(idx.num_documents(), 1);
    }

    #[test]
    fn unscored_documents_rank_last() {
        let idx = MemoryIndexer::new();
        idx.register_document(1, "hello", ScoringFields::None).unwrap();
        idx.register_document(2, "hello", post(0, 0)).unwrap();
        idx.flush();
        let out = idx.search("hello", &PostScoringCriteria, 0, 10);
        assert_eq!(out.docs[0].doc_id, 2);
        assert!(out.docs[1].scores.is_empty());
    }

    #[test]
    fn offset_and_limit_page_results() {
        let idx = MemoryIndexer::new();
        for id in 0..5 {
            idx.register_document(id, "hello", post(0, id)).unwrap();
        }
        idx.flush();
        let out = idx.search("hello", &PostScoringCriteria, 1, 2);
        assert_eq!(out.total_hits, 5);
        assert_eq!(out.docs.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn close_flushes_then_rejects() {
        let idx = MemoryIndexer::new();
        idx.register_document(1, "hello", post(0, 0)).unwrap();
        idx.close();
        assert_eq!(idx.num_documents(), 1);
        assert!(idx.is_closed());
        assert!(matches!(idx.register_document(2, "hello", post(0, 0)), Err(IndexerError::Closed)));
        assert!(idx.search("hello", &PostScoringCriteria, 0, 10).docs.is_empty());
    }
}
