//! Background import worker
//!
//! Runs one import on a dedicated thread. The caller receives every listener
//! callback as an [`ImportEvent`] over a channel and joins the handle for the
//! final result. The channel disconnects once the worker is done.

use super::listener::{ChannelListener, ImportEvent};
use super::pipeline::{ImportOutcome, PackImportPipeline};
use crate::content::ContentSource;
use crate::storage::ImportStore;
use crate::{Error, Result};
use crossbeam::channel::{self, Receiver};
use std::sync::Arc;
use std::thread;

pub struct ImportWorker;

impl ImportWorker {
    /// Start importing `locator` with `pipeline` on a new thread.
    pub fn spawn<S, C>(mut pipeline: PackImportPipeline<S, C>, locator: impl Into<String>) -> ImportHandle
    where
        S: ImportStore + Send + 'static,
        C: ContentSource + 'static,
    {
        let locator = locator.into();
        let (tx, rx) = channel::unbounded::<ImportEvent>();
        pipeline.add_listener(Arc::new(ChannelListener::new(tx.clone())));

        let handle = thread::Builder::new()
            .name("natibo-import".to_string())
            .spawn(move || {
                let result = pipeline.import_pack(&locator);
                if let Ok(outcome) = &result {
                    tx.send(ImportEvent::Finished(outcome.clone())).ok();
                }
                result
            });

        ImportHandle { events: rx, handle }
    }
}

/// A running import.
pub struct ImportHandle {
    events: Receiver<ImportEvent>,
    handle: std::io::Result<thread::JoinHandle<Result<ImportOutcome>>>,
}

impl ImportHandle {
    /// Events in the order the pipeline produced them
    pub fn events(&self) -> &Receiver<ImportEvent> {
        &self.events
    }

    /// Wait for the import to finish
    pub fn join(self) -> Result<ImportOutcome> {
        let handle = self
            .handle
            .map_err(|e| Error::Worker(format!("failed to spawn import thread: {}", e)))?;
        handle
            .join()
            .map_err(|_| Error::Worker("import thread panicked".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LocalContentSource;
    use crate::import::{ImportError, ImportOptions, ImportState};
    use crate::storage::SqliteStore;
    use crate::test_support::sample_pack;

    fn pipeline(dir: &std::path::Path) -> PackImportPipeline<SqliteStore, LocalContentSource> {
        let options = ImportOptions {
            media_dir: dir.join("media"),
            ..Default::default()
        };
        PackImportPipeline::new(
            SqliteStore::open(&dir.join("natibo.db")).unwrap(),
            LocalContentSource::new(),
            options,
        )
    }

    #[test]
    fn test_worker_delivers_events_then_disconnects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en_basics.pack");
        std::fs::write(&path, sample_pack(&["Hello", "World"], 2)).unwrap();

        let handle = ImportWorker::spawn(pipeline(dir.path()), path.to_string_lossy());
        let events: Vec<ImportEvent> = handle.events().iter().collect();
        let outcome = handle.join().unwrap();

        assert!(outcome.is_completed());
        assert_eq!(events.first(), Some(&ImportEvent::StateChanged(ImportState::ExtractingMetadata)));
        assert!(events.contains(&ImportEvent::Notification("Reading sentence: 2".to_string())));
        assert_eq!(events.last(), Some(&ImportEvent::Finished(outcome)));
    }

    #[test]
    fn test_worker_reports_import_errors() {
        let dir = tempfile::tempdir().unwrap();
        let handle = ImportWorker::spawn(pipeline(dir.path()), "/nowhere/en_basics.pack");

        let errors: Vec<ImportError> = handle
            .events()
            .iter()
            .filter_map(|e| match e {
                ImportEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect();
        let outcome = handle.join().unwrap();

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ImportError::UnreadableSource(_)));
        assert_eq!(outcome, ImportOutcome::Failed(errors[0].clone()));
    }

    #[test]
    fn test_concurrent_imports_share_language() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ja_one.pack", "ja_two.pack"] {
            std::fs::write(dir.path().join(name), sample_pack(&["こんにちは"], 1)).unwrap();
        }
        SqliteStore::open(&dir.path().join("natibo.db")).unwrap();

        let handles: Vec<_> = ["ja_one.pack", "ja_two.pack"]
            .iter()
            .map(|name| {
                ImportWorker::spawn(pipeline(dir.path()), dir.path().join(name).to_string_lossy())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_completed());
        }

        let store = SqliteStore::open(&dir.path().join("natibo.db")).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!((stats.languages, stats.packs, stats.sentences), (1, 2, 2));
    }
}
