use crate::import::naming;
use crate::ui::{self, Icons};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::SystemTime;

/// File size and modification time. A pack is imported again only when this changes.
type Signature = (u64, Option<SystemTime>);

/// Watches a drop folder and imports every pack file that lands in it.
pub struct Watcher<F> {
    path: PathBuf,
    importer: F,
    seen: HashMap<PathBuf, Signature>,
}

impl<F> Watcher<F>
where
    F: FnMut(&Path) -> anyhow::Result<()>,
{
    pub fn new(path: PathBuf, importer: F) -> Self {
        Self {
            path,
            importer,
            seen: HashMap::new(),
        }
    }

    /// Import packs already in the folder
    pub fn scan_existing(&mut self) -> anyhow::Result<usize> {
        let mut imported = 0;
        for entry in std::fs::read_dir(&self.path)? {
            let path = entry?.path();
            if self.process_file(&path) {
                imported += 1;
            }
        }
        Ok(imported)
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        ui::status(Icons::EYE, "Watching for packs in", &self.path.display().to_string());

        for res in rx {
            match res {
                Ok(event) => self.handle_event(event),
                Err(e) => tracing::warn!("watch error: {:?}", e),
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: notify::Event) {
        use notify::EventKind;
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                for path in event.paths {
                    self.process_file(&path);
                }
            }
            EventKind::Remove(_) => {
                for path in event.paths {
                    self.seen.remove(&path);
                }
            }
            _ => {}
        }
    }

    fn process_file(&mut self, path: &Path) -> bool {
        let Some(signature) = self.should_import(path) else {
            return false;
        };

        tracing::info!("Importing dropped pack {}", path.display());
        match (self.importer)(path) {
            Ok(()) => {
                self.seen.insert(path.to_path_buf(), signature);
                true
            }
            Err(e) => {
                ui::error(&format!("{}: {:#}", path.display(), e));
                false
            }
        }
    }

    /// Signature of `path` when it is a pack that has not been imported in its current form
    fn should_import(&self, path: &Path) -> Option<Signature> {
        if !is_pack_file(path) {
            return None;
        }
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }
        let signature = (metadata.len(), metadata.modified().ok());
        match self.seen.get(path) {
            Some(previous) if *previous == signature => None,
            _ => Some(signature),
        }
    }
}

/// Named like a pack: `<code>_<name>.pack` or `.gls`
pub fn is_pack_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| naming::parse_pack_file_name(n).is_ok())
        .unwrap_or(false)
}
