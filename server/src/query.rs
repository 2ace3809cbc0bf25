use mbsearch_core::{Corpus, Document, Indexer, PostScoringCriteria};
use serde::Serialize;

pub const MAX_OUTPUTS: usize = 100;
const HIGHLIGHT_OPEN: &str = "<font color=red>";
const HIGHLIGHT_CLOSE: &str = "</font>";

#[derive(Debug, Default, Serialize)]
pub struct JsonResponse {
    pub docs: Vec<Document>,
}

/// Wrap every occurrence of each token in a highlight marker.
///
/// Plain substring replacement: a token is also marked inside unrelated
/// words that happen to contain it.
pub fn highlight_tokens(text: &str, tokens: &[String]) -> String {
    let mut out = text.to_string();
    for token in tokens {
        if token.is_empty() { continue; }
        out = out.replace(token.as_str(), &format!("{HIGHLIGHT_OPEN}{token}{HIGHLIGHT_CLOSE}"));
    }
    out
}

/// Rank `query` against the engine and join hits back to full documents,
/// preserving engine order.
pub fn run_query(corpus: &Corpus, engine: &dyn Indexer, query: &str) -> JsonResponse {
    let output = engine.search(query, &PostScoringCriteria, 0, MAX_OUTPUTS);
    let docs = output
        .docs
        .into_iter()
        .map(|hit| {
            let mut doc = corpus.get(hit.doc_id).unwrap_or_else(|| {
                tracing::debug!(id = hit.doc_id, "hit missing from document table");
                Document::default()
            });
            doc.text = highlight_tokens(&doc.text, &hit.tokens);
            doc
        })
        .collect();
    JsonResponse { docs }
}
