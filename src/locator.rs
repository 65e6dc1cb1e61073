//! Locator - identifies the source archive of an import
//!
//! Accepted forms:
//! - `file:///sdcard/Download/en_basics.pack`
//! - `content://downloads/packs/en_basics.pack`
//! - `/home/me/packs/en_basics.pack` (bare path)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How a locator is resolved to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `file://` URI
    File,
    /// `content://<authority>/...` content-provider reference
    Content,
    /// Plain filesystem path without a scheme
    Path,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::Content => "content",
            Scheme::Path => "path",
        }
    }

    /// Whether the locator points straight at the local filesystem
    pub fn is_local(&self) -> bool {
        matches!(self, Scheme::File | Scheme::Path)
    }
}

/// A parsed locator.
///
/// `path` is kept exactly as written (percent-encoded where the caller
/// encoded it); use [`Locator::file_name`] or [`Locator::local_path`] for
/// decoded forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub scheme: Scheme,
    /// Content-provider authority (`downloads` in `content://downloads/x`)
    pub authority: Option<String>,
    pub path: String,
}

impl Locator {
    /// Locator for a local file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            scheme: Scheme::Path,
            authority: None,
            path: path.to_string_lossy().into_owned(),
        }
    }

    /// Parse a locator string
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::InvalidLocator("locator is empty".to_string()));
        }

        let Some((scheme, rest)) = locator.split_once("://") else {
            return Ok(Self {
                scheme: Scheme::Path,
                authority: None,
                path: locator.to_string(),
            });
        };

        match scheme.to_ascii_lowercase().as_str() {
            "file" => {
                // file:///abs/path or file://localhost/abs/path
                let path = match rest.find('/') {
                    Some(0) => rest.to_string(),
                    Some(i) => rest[i..].to_string(),
                    None => {
                        return Err(Error::InvalidLocator(format!(
                            "file locator has no path: {}",
                            locator
                        )));
                    }
                };
                Ok(Self {
                    scheme: Scheme::File,
                    authority: None,
                    path,
                })
            }
            "content" => {
                let (authority, path) = rest.split_once('/').ok_or_else(|| {
                    Error::InvalidLocator(format!("content locator has no path: {}", locator))
                })?;
                if authority.is_empty() {
                    return Err(Error::InvalidLocator(format!(
                        "content locator has no authority: {}",
                        locator
                    )));
                }
                Ok(Self {
                    scheme: Scheme::Content,
                    authority: Some(authority.to_string()),
                    path: format!("/{}", path),
                })
            }
            other => Err(Error::InvalidLocator(format!("unsupported scheme: {}", other))),
        }
    }

    /// Last path segment, percent-decoded
    pub fn file_name(&self) -> Result<Cow<'_, str>> {
        let raw = self
            .path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        if self.scheme == Scheme::Path {
            return Ok(Cow::Borrowed(raw));
        }
        urlencoding::decode(raw)
            .map_err(|e| Error::InvalidLocator(format!("bad percent-encoding in {}: {}", raw, e)))
    }

    /// Decoded path, relative to the authority root for content locators
    pub fn local_path(&self) -> Result<PathBuf> {
        if self.scheme == Scheme::Path {
            return Ok(PathBuf::from(&self.path));
        }
        let decoded = urlencoding::decode(&self.path).map_err(|e| {
            Error::InvalidLocator(format!("bad percent-encoding in {}: {}", self.path, e))
        })?;
        Ok(PathBuf::from(decoded.into_owned()))
    }

    /// Convert to locator string
    pub fn to_locator_string(&self) -> String {
        match self.scheme {
            Scheme::File => format!("file://{}", self.path),
            Scheme::Content => format!(
                "content://{}{}",
                self.authority.as_deref().unwrap_or_default(),
                self.path
            ),
            Scheme::Path => self.path.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_locator_string())
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Locator {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_locator_string())
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Locator::parse(&s).map_err(serde::de::Error::custom)
    }
}
