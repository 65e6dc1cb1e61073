//! Sentence manifest parsing
//!
//! The manifest is a UTF-8, tab-separated file inside the pack archive. The
//! first line names the columns:
//!
//! ```text
//! index	sentence	translation	IPA	romanization
//! 1	Hello	Hola	həˈloʊ
//! ```
//!
//! Column names are case-insensitive and unknown columns are ignored. Only
//! `sentence` is required; without `index`, sentences are numbered from 1.

use crate::archive::{is_manifest, PackArchive};
use crate::model::SentenceDraft;
use super::ImportError;
use std::io::Read;

#[derive(Debug, Clone, Default)]
struct Columns {
    index: Option<usize>,
    sentence: usize,
    translation: Option<usize>,
    ipa: Option<usize>,
    romanization: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, ImportError> {
        let mut sentence = None;
        let mut columns = Columns::default();
        for (i, name) in header.split('\t').enumerate() {
            match name.trim().to_lowercase().as_str() {
                "index" => columns.index = Some(i),
                "sentence" => sentence = Some(i),
                "translation" => columns.translation = Some(i),
                "ipa" => columns.ipa = Some(i),
                "romanization" => columns.romanization = Some(i),
                other => tracing::debug!("Ignoring manifest column '{}'", other),
            }
        }
        columns.sentence = sentence.ok_or_else(|| {
            ImportError::MalformedManifest("header has no 'sentence' column".to_string())
        })?;
        Ok(columns)
    }
}

/// Lazily parsed manifest lines.
///
/// Yields drafts in manifest order and stops after the first error. A fresh
/// sequence needs a fresh stream.
#[derive(Debug)]
pub struct SentenceDrafts {
    text: String,
    cursor: usize,
    line_no: usize,
    produced: u32,
    columns: Columns,
    failed: bool,
}

impl SentenceDrafts {
    /// Parse manifest text; only the header is read up front.
    pub fn from_manifest(text: String) -> Result<Self, ImportError> {
        let mut drafts = Self {
            text,
            cursor: 0,
            line_no: 0,
            produced: 0,
            columns: Columns::default(),
            failed: false,
        };
        let header = drafts
            .next_line()
            .map(str::to_string)
            .ok_or_else(|| ImportError::MalformedManifest("manifest is empty".to_string()))?;
        let header = header.strip_prefix('\u{feff}').unwrap_or(header.as_str());
        drafts.columns = Columns::from_header(header)?;
        Ok(drafts)
    }

    fn next_line(&mut self) -> Option<&str> {
        if self.cursor >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.cursor..];
        let (line, advance) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.cursor += advance;
        self.line_no += 1;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    fn parse_line(&self, line: &str) -> Result<SentenceDraft, ImportError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |column: Option<usize>| {
            column
                .and_then(|i| fields.get(i))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let manifest_index = match field(self.columns.index) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ImportError::MalformedManifest(format!(
                    "line {}: invalid index '{}'",
                    self.line_no, raw
                ))
            })?,
            None if self.columns.index.is_none() => self.produced + 1,
            None => {
                return Err(ImportError::MalformedManifest(format!(
                    "line {}: missing index",
                    self.line_no
                )));
            }
        };

        let text = field(Some(self.columns.sentence)).ok_or_else(|| {
            ImportError::MalformedManifest(format!("line {}: missing sentence", self.line_no))
        })?;

        Ok(SentenceDraft {
            manifest_index,
            text,
            translation: field(self.columns.translation),
            ipa: field(self.columns.ipa),
            romanization: field(self.columns.romanization),
        })
    }
}

impl Iterator for SentenceDrafts {
    type Item = Result<SentenceDraft, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = self.next_line()?.to_string();
            if line.trim().is_empty() {
                continue;
            }
            let parsed = self.parse_line(&line);
            match parsed {
                Ok(_) => self.produced += 1,
                Err(_) => self.failed = true,
            }
            return Some(parsed);
        }
    }
}

/// Find the manifest inside a pack stream and start parsing it.
pub fn parse_sentences<R: Read>(stream: R) -> crate::Result<SentenceDrafts> {
    let archive = PackArchive::from_reader(stream)?;
    let (name, bytes) = archive
        .read_first(is_manifest)?
        .ok_or_else(|| ImportError::MalformedManifest("pack has no sentence manifest".to_string()))?;

    tracing::debug!("Reading manifest {} ({} bytes)", name, bytes.len());
    let text = String::from_utf8(bytes).map_err(|e| {
        ImportError::MalformedManifest(format!("{} is not valid UTF-8: {}", name, e))
    })?;
    Ok(SentenceDrafts::from_manifest(text)?)
}
