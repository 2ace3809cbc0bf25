use mbsearch_core::{normalize_all, Corpus, Indexer, MemoryIndexer, PostFields, PostScoringCriteria, RawRecord, ScoringFields};

fn record(id: u64, text: &str, ts: &str, reposts: i64) -> RawRecord {
    RawRecord {
        id,
        screen_name: format!("user{id}"),
        text: text.into(),
        full_created_at: ts.into(),
        reposts_count: reposts,
        ..Default::default()
    }
}

#[test]
fn normalized_posts_rank_by_recency_then_engagement() {
    let records = vec![
        record(1, "hello world", "2021-01-01 00:00:00", 0),
        record(2, "hello there", "2021-01-01 00:00:00", 5_000),
        record(3, "hello again", "2021-03-01 00:00:00", 0),
        record(4, "goodbye", "not a date", 0),
    ];
    let corpus = Corpus::new();
    for doc in normalize_all(&records) {
        corpus.insert(doc);
    }
    assert_eq!(corpus.ids(), vec![1, 2, 3]);

    let engine = MemoryIndexer::new();
    for id in corpus.ids() {
        let doc = corpus.get_or_default(id);
        engine.register_document(id, &doc.text, ScoringFields::Post(PostFields::from(&doc))).unwrap();
    }
    engine.flush();

    let out = engine.search("hello", &PostScoringCriteria, 0, 100);
    let ids: Vec<u64> = out.docs.iter().map(|h| h.doc_id).collect();
    // newest bucket first, then the reposted post within the shared bucket
    assert_eq!(ids, vec![3, 2, 1]);
}
