//! Background ingestion of crawler output into the document table and search engine.

use anyhow::{bail, Context, Result};
use mbsearch_core::{normalize, Corpus, CrawlFile, Indexer, IndexerError, PostFields, ScoringFields};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// Counters for one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files_read: usize,
    pub files_skipped: usize,
    pub records_seen: usize,
    pub records_dropped: usize,
    pub documents_indexed: usize,
}

/// Regular files directly inside `dir`, in file-name order. Sub-directories are ignored.
///
/// Failing to open `dir` itself is fatal; unreadable entries inside it are skipped.
pub fn corpus_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        match entry {
            Ok(e) if e.depth() == 0 => {
                if !e.file_type().is_dir() {
                    bail!("corpus path {} is not a directory", dir.display());
                }
            }
            Ok(e) if e.file_type().is_file() => files.push(e.into_path()),
            Ok(_) => {}
            Err(err) if err.depth() == 0 => {
                return Err(err).with_context(|| format!("reading corpus directory {}", dir.display()));
            }
            Err(err) => tracing::warn!(error = %err, "skipping unreadable entry"),
        }
    }
    Ok(files)
}

fn ensure_open(engine: &dyn Indexer) -> Result<()> {
    if engine.is_closed() {
        return Err(IndexerError::Closed).context("indexing cancelled");
    }
    Ok(())
}

fn read_crawl_file(path: &Path) -> Result<CrawlFile> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let file: CrawlFile = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(file)
}

/// Normalize every post under `dir` into `corpus`, register the resulting
/// documents with `engine`, then flush once.
///
/// Malformed files and records are logged and skipped. An unreadable corpus
/// directory is an error, and so is the engine being closed mid-pass: the
/// pass stops at the next file or document instead of draining the corpus.
pub fn build_index(dir: &Path, corpus: &Corpus, engine: &dyn Indexer) -> Result<IndexReport> {
    let files = corpus_files(dir)?;
    let mut report = IndexReport::default();

    for path in files {
        ensure_open(engine)?;
        let file = match read_crawl_file(&path) {
            Ok(file) => file,
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::warn!(path = %path.display(), error = %reason, "skipping file");
                report.files_skipped += 1;
                continue;
            }
        };
        report.files_read += 1;
        tracing::debug!(path = %path.display(), posts = file.weibo.len(), "read crawl file");
        for raw in &file.weibo {
            report.records_seen += 1;
            match normalize(raw) {
                Some(doc) => {
                    corpus.insert(doc);
                }
                None => report.records_dropped += 1,
            }
        }
    }

    tracing::info!(docs = corpus.len(), "registering documents");
    for id in corpus.ids() {
        ensure_open(engine)?;
        let Some(doc) = corpus.get(id) else { continue };
        engine
            .register_document(id, &doc.text, ScoringFields::Post(PostFields::from(&doc)))
            .with_context(|| format!("registering document {id}"))?;
        report.documents_indexed += 1;
    }
    engine.flush();

    tracing::info!(
        files_read = report.files_read,
        files_skipped = report.files_skipped,
        records_dropped = report.records_dropped,
        docs = report.documents_indexed,
        "indexing complete"
    );
    Ok(report)
}

/// Marks the pass finished when dropped, so a panicking pass still reports completion.
struct CompletionSignal(watch::Sender<bool>);

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        let _ = self.0.send(true);
    }
}

/// Completion handle for a background ingestion pass.
pub struct IndexingHandle {
    done: watch::Receiver<bool>,
    task: JoinHandle<Result<IndexReport>>,
}

impl IndexingHandle {
    pub fn is_complete(&self) -> bool { *self.done.borrow() }

    /// Receiver that flips to `true` once the pass has finished, whether it
    /// succeeded, failed or panicked.
    pub fn status(&self) -> watch::Receiver<bool> { self.done.clone() }

    pub async fn wait(self) -> Result<IndexReport> {
        self.task.await.context("indexing task panicked")?
    }
}

/// Run [`build_index`] on the blocking pool without holding up the caller.
pub fn spawn_indexing(dir: PathBuf, corpus: Arc<Corpus>, engine: Arc<dyn Indexer>) -> IndexingHandle {
    let (tx, done) = watch::channel(false);
    let task = tokio::task::spawn_blocking(move || {
        let _signal = CompletionSignal(tx);
        let result = build_index(&dir, &corpus, engine.as_ref());
        if let Err(err) = &result {
            let reason = format!("{err:#}");
            tracing::error!(error = %reason, "indexing failed");
        }
        result
    });
    IndexingHandle { done, task }
}
