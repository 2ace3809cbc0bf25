//! Query-time relevance scoring.
//!
//! The engine computes the match signals ([`IndexedDocument`]) and hands them,
//! together with the metadata attached at registration, to a
//! [`ScoringCriteria`]. The resulting [`ScoreVector`]s are compared
//! lexicographically, factor 0 first.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{DocId, Document};

pub const SECONDS_IN_A_DAY: u64 = 86_400;
/// Proximity distances at or below this count as a perfect cluster.
pub const MAX_TOKEN_PROXIMITY: u32 = 2;
/// Width of one recency bucket.
pub const RECENCY_BUCKET_SECS: u64 = SECONDS_IN_A_DAY * 3;
pub const REPOST_BOOST_DIVISOR: f32 = 10_000.0;

/// Scoring-only fields of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFields {
    pub timestamp: u64,
    pub reposts_count: u64,
}

impl From<&Document> for PostFields {
    fn from(doc: &Document) -> Self {
        Self { timestamp: doc.timestamp, reposts_count: doc.reposts_count }
    }
}

/// Metadata attached to a document at registration. Opaque to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringFields {
    Post(PostFields),
    #[default]
    None,
}

/// Match signals the engine computed for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedDocument {
    pub doc_id: DocId,
    pub bm25: f32,
    /// Lower means the query terms sit closer together.
    pub token_proximity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreVector(pub Vec<f32>);

impl ScoreVector {
    pub fn empty() -> Self { Self(Vec::new()) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn factors(&self) -> &[f32] { &self.0 }

    /// Lexicographic comparison by position. An empty vector is not
    /// comparable and sorts below every non-empty one.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                for (a, b) in self.0.iter().zip(other.0.iter()) {
                    match a.total_cmp(b) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                self.0.len().cmp(&other.0.len())
            }
        }
    }
}

pub trait ScoringCriteria: Send + Sync {
    fn score(&self, doc: &IndexedDocument, fields: &ScoringFields) -> ScoreVector;
}

/// Ranks posts by proximity, then three-day recency bucket, then BM25 boosted by reposts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostScoringCriteria;

impl ScoringCriteria for PostScoringCriteria {
    fn score(&self, doc: &IndexedDocument, fields: &ScoringFields) -> ScoreVector {
        let ScoringFields::Post(fields) = fields else {
            return ScoreVector::empty();
        };
        ScoreVector(vec![
            proximity_factor(doc.token_proximity),
            recency_factor(fields.timestamp),
            engagement_factor(doc.bm25, fields.reposts_count),
        ])
    }
}

pub fn proximity_factor(proximity: u32) -> f32 {
    if proximity > MAX_TOKEN_PROXIMITY {
        1.0 / proximity as f32
    } else {
        1.0
    }
}

pub fn recency_factor(timestamp: u64) -> f32 {
    (timestamp / RECENCY_BUCKET_SECS) as f32
}

pub fn engagement_factor(bm25: f32, reposts_count: u64) -> f32 {
    bm25 * (1.0 + reposts_count as f32 / REPOST_BOOST_DIVISOR)
}
