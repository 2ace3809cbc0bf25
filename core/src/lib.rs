pub mod corpus;
pub mod document;
pub mod index;
pub mod scoring;
pub mod tokenizer;

pub type DocId = u64;

pub use corpus::Corpus;
pub use document::{normalize, normalize_all, try_normalize, CrawlFile, Document, NormalizeError, RawRecord, UserProfile};
pub use index::{Indexer, IndexerError, MemoryIndexer, RankedHit, SearchOutput};
pub use scoring::{IndexedDocument, PostFields, PostScoringCriteria, ScoreVector, ScoringCriteria, ScoringFields};
