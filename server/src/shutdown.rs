use mbsearch_core::Indexer;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Waits for `signal`, closes the engine, then flips the returned receiver so
/// the server stops.
///
/// If the signal cannot be listened for, the receiver never flips and the
/// server keeps running.
pub fn spawn_shutdown_watcher<F>(signal: F, engine: Arc<dyn Indexer>) -> watch::Receiver<bool>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = signal.await {
            tracing::error!(error = %err, "failed to listen for interrupt, shutdown on signal disabled");
            // hold the sender so receivers never see the channel close
            let _keep_open = tx;
            std::future::pending::<()>().await;
            return;
        }
        tracing::info!("interrupt received, closing index");
        engine.close();
        let _ = tx.send(true);
    });
    rx
}

/// Resolves once the watcher has closed the engine.
pub async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|closed| *closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbsearch_core::MemoryIndexer;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_closes_engine_then_stops_server() {
        let engine = Arc::new(MemoryIndexer::new());
        let rx = spawn_shutdown_watcher(async { Ok::<(), std::io::Error>(()) }, engine.clone());
        tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(rx)).await.unwrap();
        assert!(engine.is_closed());
    }

    #[tokio::test]
    async fn failed_listener_keeps_server_running() {
        let engine = Arc::new(MemoryIndexer::new());
        let rx = spawn_shutdown_watcher(
            async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler")) },
            engine.clone(),
        );
        let waited = tokio::time::timeout(Duration::from_millis(100), wait_for_shutdown(rx)).await;
        assert!(waited.is_err());
        assert!(!engine.is_closed());
    }
}
