use criterion::{criterion_group, criterion_main, Criterion};
use mbsearch_core::{Indexer, MemoryIndexer, PostFields, PostScoringCriteria, ScoringFields};

const WORDS: &[&str] = &["rust", "search", "engine", "index", "weibo", "fast", "query", "rank", "post", "news"];

fn build_engine(n: u64) -> MemoryIndexer {
    let engine = MemoryIndexer::new();
    for id in 0..n {
        let text: Vec<&str> = (0..12).map(|i| WORDS[((id * 7 + i * 3) % WORDS.len() as u64) as usize]).collect();
        let fields = ScoringFields::Post(PostFields { timestamp: 1_600_000_000 + id * 600, reposts_count: id % 97 });
        let _ = engine.register_document(id, &text.join(" "), fields);
    }
    engine.flush();
    engine
}

fn bench_search(c: &mut Criterion) {
    let engine = build_engine(10_000);
    c.bench_function("search_two_terms", |b| b.iter(|| engine.search("rust search", &PostScoringCriteria, 0, 100)));
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
