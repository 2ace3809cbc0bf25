use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::DocId;

/// One crawler output file: the profile of the crawled account plus its posts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrawlFile {
    pub user: UserProfile,
    pub weibo: Vec<RawRecord>,
}

/// Account profile as written by the crawler. Only carried along; nothing here is indexed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: String,
    pub screen_name: String,
    pub gender: String,
    pub location: String,
    pub description: String,
    pub statuses_count: i64,
    pub followers_count: i64,
    pub follow_count: i64,
    pub verified: bool,
}

/// A crawled post exactly as the crawler emits it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub user_id: u64,
    pub screen_name: String,
    pub id: DocId,
    pub bid: String,
    pub text: String,
    pub article_url: String,
    pub pics: String,
    pub video_url: String,
    pub location: String,
    pub created_at: String,
    pub source: String,
    pub attitudes_count: i64,
    pub comments_count: i64,
    pub reposts_count: i64,
    pub topics: String,
    pub at_users: String,
    pub full_created_at: String,
}

/// Canonical indexable post. Serialized as-is in query responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub user_name: String,
    pub reposts_count: u64,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unparseable timestamp {raw:?}: {source}")]
    InvalidTimestamp {
        raw: String,
        #[source]
        source: time::error::Parse,
    },
    #[error("timestamp {0} is before the unix epoch")]
    TimestampBeforeEpoch(i64),
}

/// Parse the crawler's `YYYY-MM-DD HH:MM:SS` layout as UTC epoch seconds.
pub fn parse_timestamp(raw: &str) -> Result<u64, NormalizeError> {
    let layout = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let parsed = PrimitiveDateTime::parse(raw.trim(), layout).map_err(|source| {
        NormalizeError::InvalidTimestamp { raw: raw.to_string(), source }
    })?;
    let secs = parsed.assume_utc().unix_timestamp();
    u64::try_from(secs).map_err(|_| NormalizeError::TimestampBeforeEpoch(secs))
}

/// Convert a raw record into a [`Document`], reporting why it could not be.
pub fn try_normalize(raw: &RawRecord) -> Result<Document, NormalizeError> {
    let timestamp = parse_timestamp(&raw.full_created_at)?;
    Ok(Document {
        id: raw.id,
        timestamp,
        user_name: raw.screen_name.clone(),
        reposts_count: raw.reposts_count.max(0) as u64,
        text: raw.text.clone(),
    })
}

/// Like [`try_normalize`], but logs and drops malformed records.
pub fn normalize(raw: &RawRecord) -> Option<Document> {
    match try_normalize(raw) {
        Ok(doc) => Some(doc),
        Err(err) => {
            tracing::warn!(id = raw.id, error = %err, "dropping record");
            None
        }
    }
}

/// Normalize a batch; the output shrinks by one for every malformed record.
pub fn normalize_all<'a, I>(records: I) -> Vec<Document>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    records.into_iter().filter_map(normalize).collect()
}
