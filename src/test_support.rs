//! Helpers shared by unit tests: an in-memory zip writer and a recording
//! listener.

use crate::import::{ImportError, ImportListener, ImportState};
use std::io::Write;
use std::sync::Mutex;

struct PendingEntry {
    name: String,
    method: u16,
    crc: u32,
    uncompressed: u32,
    payload: Vec<u8>,
}

/// Builds zip archives with stored, deflated or raw entries.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<PendingEntry>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        let contents = contents.as_ref();
        self.entries.push(PendingEntry {
            name: name.to_string(),
            method: 0,
            crc: crc32fast::hash(contents),
            uncompressed: contents.len() as u32,
            payload: contents.to_vec(),
        });
        self
    }

    pub fn deflated_file(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        let contents = contents.as_ref();
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(contents).unwrap();
        self.entries.push(PendingEntry {
            name: name.to_string(),
            method: 8,
            crc: crc32fast::hash(contents),
            uncompressed: contents.len() as u32,
            payload: encoder.finish().unwrap(),
        });
        self
    }

    /// An entry whose payload is written as-is under compression `method`
    pub fn raw_file(mut self, name: &str, method: u16, payload: impl AsRef<[u8]>) -> Self {
        let payload = payload.as_ref();
        self.entries.push(PendingEntry {
            name: name.to_string(),
            method,
            crc: crc32fast::hash(payload),
            uncompressed: payload.len() as u32,
            payload: payload.to_vec(),
        });
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(PendingEntry {
            name: name.to_string(),
            method: 0,
            crc: 0,
            uncompressed: 0,
            payload: Vec::new(),
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = out.len() as u32;
            let name = entry.name.as_bytes();

            out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes()); // version needed
            out.extend_from_slice(&0x0800u16.to_le_bytes()); // utf-8 names
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // time
            out.extend_from_slice(&0x0021u16.to_le_bytes()); // date: 1980-01-01
            out.extend_from_slice(&entry.crc.to_le_bytes());
            out.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&entry.uncompressed.to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra
            out.extend_from_slice(name);
            out.extend_from_slice(&entry.payload);

            central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
            central.extend_from_slice(&20u16.to_le_bytes()); // version made by
            central.extend_from_slice(&20u16.to_le_bytes()); // version needed
            central.extend_from_slice(&0x0800u16.to_le_bytes());
            central.extend_from_slice(&entry.method.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&0x0021u16.to_le_bytes());
            central.extend_from_slice(&entry.crc.to_le_bytes());
            central.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
            central.extend_from_slice(&entry.uncompressed.to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // extra
            central.extend_from_slice(&0u16.to_le_bytes()); // comment
            central.extend_from_slice(&0u16.to_le_bytes()); // disk start
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            let external: u32 = if entry.name.ends_with('/') { 0x10 } else { 0 };
            central.extend_from_slice(&external.to_le_bytes());
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(name);
        }

        let central_offset = out.len() as u32;
        let count = self.entries.len() as u16;
        out.extend_from_slice(&central);

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }
}

/// A pack with a manifest and one audio file per sentence.
pub fn sample_pack(sentences: &[&str], audio_files: usize) -> Vec<u8> {
    let mut manifest = String::from("index\tsentence\ttranslation\n");
    for (i, text) in sentences.iter().enumerate() {
        manifest.push_str(&format!("{}\t{}\t{} (es)\n", i + 1, text, text));
    }
    let mut builder = ZipBuilder::new().file("EN-ES.gsp", manifest);
    for i in 1..=audio_files {
        builder = builder.file(&format!("EN - Basics - {:04}.mp3", i), format!("audio {}", i));
    }
    builder.build()
}

/// Everything a listener was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Notification(String),
    Error(ImportError),
    State(ImportState),
}

#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<Recorded>>,
}

impl RecordingListener {
    pub fn notifications(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Recorded::Notification(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ImportError> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Recorded::Error(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<ImportState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Recorded::State(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl ImportListener for RecordingListener {
    fn on_notification_update(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Notification(message.to_string()));
    }

    fn on_error(&self, error: &ImportError) {
        self.events.lock().unwrap().push(Recorded::Error(error.clone()));
    }

    fn on_state_change(&self, state: ImportState) {
        self.events.lock().unwrap().push(Recorded::State(state));
    }
}
