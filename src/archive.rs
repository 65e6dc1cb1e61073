//! Pack archive access
//!
//! Content streams are not seekable, and the zip central directory sits at the
//! end of the file, so a stream is buffered in full before its entries can be
//! listed. Each pass over an import reads a freshly opened stream.

use crate::import::ImportError;
use crate::Result;
use std::io::Read;
use std::path::{Component, Path};

/// Manifest entry extensions
pub const MANIFEST_EXTENSIONS: &[&str] = &["gsp", "tsv"];

/// A fully buffered pack archive.
pub struct PackArchive {
    data: Vec<u8>,
}

impl PackArchive {
    /// Buffer a stream. Read failures count as an unreadable source.
    pub fn from_reader<R: Read>(mut reader: R) -> std::result::Result<Self, ImportError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| ImportError::UnreadableSource(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Names of all file entries, in archive order
    pub fn file_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.visit(|name, _| {
            names.push(name.to_string());
            Ok(Visit::Skip)
        })?;
        Ok(names)
    }

    /// Call `visit` with every file entry and its decompressed contents.
    pub fn for_each_file<F>(&self, visit: F) -> Result<()>
    where
        F: FnMut(&str, &mut dyn Read) -> Result<()>,
    {
        self.for_each_file_matching(|_| true, visit)
    }

    /// Like [`for_each_file`](Self::for_each_file), but entries rejected by
    /// `predicate` are never decompressed.
    pub fn for_each_file_matching<P, F>(&self, predicate: P, mut visit: F) -> Result<()>
    where
        P: Fn(&str) -> bool,
        F: FnMut(&str, &mut dyn Read) -> Result<()>,
    {
        self.visit(|name, reader| match reader {
            None if !predicate(name) => Ok(Visit::Skip),
            None => Ok(Visit::Read),
            Some(reader) => {
                visit(name, reader)?;
                Ok(Visit::Read)
            }
        })
    }

    /// Decompressed contents of the first entry matching `predicate`
    pub fn read_first<P>(&self, predicate: P) -> Result<Option<(String, Vec<u8>)>>
    where
        P: Fn(&str) -> bool,
    {
        let mut found = None;
        self.visit(|name, reader| {
            if found.is_some() || !predicate(name) {
                return Ok(Visit::Skip);
            }
            let Some(reader) = reader else {
                return Ok(Visit::Read);
            };
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map_err(|e| {
                ImportError::InvalidArchive(format!("failed to read {}: {}", name, e))
            })?;
            found = Some((name.to_string(), buf));
            Ok(Visit::Skip)
        })?;
        Ok(found)
    }

    /// Walks the central directory. The callback first sees each name with
    /// no reader; answering `Visit::Read` calls it again with the contents.
    fn visit<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(&str, Option<&mut dyn Read>) -> Result<Visit>,
    {
        let archive = rawzip::ZipArchive::from_slice(&self.data)
            .map_err(|e| ImportError::InvalidArchive(format!("invalid zip archive: {:?}", e)))?;

        for entry in archive.entries() {
            let entry = entry
                .map_err(|e| ImportError::InvalidArchive(format!("zip entry error: {:?}", e)))?;
            if entry.is_dir() {
                continue;
            }

            let name = entry
                .file_path()
                .try_normalize()
                .map_err(|e| {
                    ImportError::InvalidArchive(format!("failed to normalize zip path: {:?}", e))
                })?
                .as_ref()
                .to_string();

            let path = Path::new(&name);
            if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(ImportError::InvalidArchive(format!(
                    "unsupported or malicious path in zip: {}",
                    name
                ))
                .into());
            }

            if let Visit::Skip = callback(&name, None)? {
                continue;
            }

            let slice_entry = archive.get_entry(entry.wayfinder()).map_err(|e| {
                ImportError::InvalidArchive(format!("failed to get entry data: {:?}", e))
            })?;
            let data = slice_entry.data();

            let mut reader: Box<dyn Read + '_> = match entry.compression_method() {
                rawzip::CompressionMethod::Store => Box::new(data),
                rawzip::CompressionMethod::Deflate => {
                    Box::new(flate2::read::DeflateDecoder::new(data))
                }
                method => {
                    return Err(ImportError::InvalidArchive(format!(
                        "unsupported compression method {:?} for {}",
                        method, name
                    ))
                    .into());
                }
            };
            callback(&name, Some(&mut *reader))?;
        }
        Ok(())
    }
}

enum Visit {
    Skip,
    Read,
}

/// Lowercase extension of an entry name
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether an entry is audio, given lowercase extensions such as `["mp3"]`
pub fn is_audio(name: &str, audio_extensions: &[String]) -> bool {
    extension_of(name).is_some_and(|ext| audio_extensions.iter().any(|a| *a == ext))
}

pub fn is_manifest(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext.as_str()))
}
