//! Content sources - turn a locator into a readable byte stream

use crate::locator::Locator;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Opens byte streams for locators.
///
/// Streams are single-pass; callers that need a second pass open a new one.
pub trait ContentSource: Send + Sync {
    fn open_stream(&self, locator: &Locator) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves `file` locators and bare paths directly, and `content` locators
/// against a root directory registered for their authority.
#[derive(Debug, Clone, Default)]
pub struct LocalContentSource {
    providers: BTreeMap<String, PathBuf>,
}

impl LocalContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the directory backing `content://<authority>/...`
    pub fn with_provider(mut self, authority: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.providers.insert(authority.into(), root.into());
        self
    }

    /// Filesystem path a locator resolves to
    pub fn resolve(&self, locator: &Locator) -> io::Result<PathBuf> {
        let path = locator
            .local_path()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        if locator.scheme.is_local() {
            return Ok(path);
        }

        let authority = locator.authority.as_deref().unwrap_or_default();
        let root = self.providers.get(authority).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no content provider registered for '{}'", authority),
            )
        })?;
        let relative = path.strip_prefix("/").unwrap_or(&path);
        if escapes_root(relative) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("content path escapes provider root: {}", relative.display()),
            ));
        }
        Ok(root.join(relative))
    }
}

fn escapes_root(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

impl ContentSource for LocalContentSource {
    fn open_stream(&self, locator: &Locator) -> io::Result<Box<dyn Read + Send>> {
        let path = self.resolve(locator)?;
        tracing::debug!("Opening {} -> {}", locator, path.display());
        let file = File::open(&path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}
