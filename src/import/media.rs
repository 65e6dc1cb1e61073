//! Audio files inside packs: counting and copying into app storage

use crate::archive::{is_audio, PackArchive};
use crate::Result;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const BUFFER_SIZE: usize = 64 * 1024;

static AUDIO_NUMBER: OnceLock<Regex> = OnceLock::new();

/// Sentence number carried by an audio entry name:
/// `EN - Basics - 0001.mp3` -> 1
pub fn audio_number(entry_name: &str) -> Option<u32> {
    let file_name = Path::new(entry_name).file_name()?.to_str()?;
    let re = AUDIO_NUMBER
        .get_or_init(|| Regex::new(r"(\d+)\.[^.]+$").expect("audio number pattern is valid"));
    re.captures(file_name)?[1].parse().ok()
}

/// `<media_dir>/<language_id>/<pack_id>`
pub fn pack_media_dir(media_dir: &Path, language_id: i64, pack_id: i64) -> PathBuf {
    media_dir.join(language_id.to_string()).join(pack_id.to_string())
}

/// Count audio entries without decompressing them
pub fn count_audio_files<R: Read>(stream: R, audio_extensions: &[String]) -> Result<usize> {
    let archive = PackArchive::from_reader(stream)?;
    Ok(archive
        .file_names()?
        .iter()
        .filter(|name| is_audio(name, audio_extensions))
        .count())
}

/// One copied audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedAudio {
    pub entry: String,
    pub path: PathBuf,
    pub manifest_index: Option<u32>,
}

/// Copy every audio entry into `dest_dir`, calling `on_copied` after each.
///
/// Entries land flat under their file name. When two entries share a file
/// name, the later one keeps its archive folders instead of overwriting.
/// Files already written stay in place if a later copy fails.
pub fn copy_audio_files<R, F>(
    stream: R,
    audio_extensions: &[String],
    dest_dir: &Path,
    mut on_copied: F,
) -> Result<Vec<CopiedAudio>>
where
    R: Read,
    F: FnMut(&CopiedAudio) -> Result<()>,
{
    let archive = PackArchive::from_reader(stream)?;
    std::fs::create_dir_all(dest_dir)?;

    let mut copied = Vec::new();
    let mut written: HashSet<PathBuf> = HashSet::new();
    archive.for_each_file_matching(
        |name| is_audio(name, audio_extensions),
        |name, reader| {
            let Some(file_name) = Path::new(name).file_name() else {
                return Ok(());
            };

            let mut path = dest_dir.join(file_name);
            if written.contains(&path) {
                tracing::warn!(
                    "Audio file name {} appears twice; keeping {} under its folders",
                    file_name.to_string_lossy(),
                    name
                );
                path = dest_dir.join(name);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let mut out = BufWriter::with_capacity(BUFFER_SIZE, File::create(&path)?);
            std::io::copy(reader, &mut out)?;
            out.flush()?;
            written.insert(path.clone());

            let audio = CopiedAudio {
                entry: name.to_string(),
                path,
                manifest_index: audio_number(name),
            };
            on_copied(&audio)?;
            copied.push(audio);
            Ok(())
        },
    )?;
    Ok(copied)
}
