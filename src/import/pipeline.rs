use super::listener::{ImportListener, ListenerId, Listeners};
use super::manifest::{self, SentenceDrafts};
use super::media::{self, CopiedAudio};
use super::naming;
use super::state::{ImportJob, ImportState};
use super::ImportError;
use crate::content::ContentSource;
use crate::languages;
use crate::locator::Locator;
use crate::model::{Language, Pack, SentenceDraft};
use crate::storage::{ImportStore, LanguageStore, PackStore, SentenceStore};
use crate::{Error, Result};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Where imported media goes and what counts as audio.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub media_dir: PathBuf,
    /// Lowercase extensions without the dot
    pub audio_extensions: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from(".natibo").join("media"),
            audio_extensions: vec!["mp3".to_string()],
        }
    }
}

/// Summary of a completed import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub locator: String,
    pub language: Language,
    pub pack: Pack,
    /// Audio entries found in the archive
    pub audio_files: usize,
    pub sentences: usize,
    pub audio_copied: usize,
    /// Copied files that were attached to a sentence
    pub audio_linked: usize,
    pub media_dir: PathBuf,
}

impl ImportReport {
    /// Audio and sentence counts differ. Not treated as a failure.
    pub fn count_mismatch(&self) -> bool {
        self.audio_files != self.sentences
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Completed(ImportReport),
    Failed(ImportError),
}

impl ImportOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ImportOutcome::Completed(_))
    }
}

/// Imports content packs into a store.
///
/// Steps run strictly in order on the calling thread; use
/// [`ImportWorker`](super::ImportWorker) to run them in the background.
pub struct PackImportPipeline<S, C> {
    store: S,
    content: C,
    options: ImportOptions,
    listeners: Listeners,
}

impl<S: ImportStore, C: ContentSource> PackImportPipeline<S, C> {
    pub fn new(store: S, content: C, options: ImportOptions) -> Self {
        Self {
            store,
            content,
            options,
            listeners: Listeners::default(),
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ImportListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    // ========== Steps ==========

    pub fn extract_language_and_pack_name(
        &self,
        locator: &Locator,
    ) -> std::result::Result<(String, String), ImportError> {
        naming::extract_language_and_pack_name(locator)
    }

    /// Fetch or create the language for `code`
    pub fn resolve_language(&self, code: &str) -> Result<Language> {
        let name = languages::display_name(code).ok_or_else(|| {
            ImportError::LanguageCreationFailed(format!("{} is not a known language code", code))
        })?;
        let language = self.store.get_or_create_language(code, name)?;
        if language.id <= 0 {
            return Err(ImportError::LanguageCreationFailed(code.to_string()).into());
        }
        Ok(language)
    }

    /// Fetch or create the pack `name` of language `language_code`
    pub fn resolve_pack(&self, name: &str, language_code: &str) -> Result<Pack> {
        self.store
            .get_or_create_pack(name, language_code)?
            .ok_or_else(|| {
                ImportError::PackCreationFailed(format!(
                    "language {} does not exist for pack {}",
                    language_code, name
                ))
                .into()
            })
    }

    pub fn open_content(
        &self,
        locator: &Locator,
    ) -> std::result::Result<Box<dyn Read + Send>, ImportError> {
        self.content
            .open_stream(locator)
            .map_err(|e| ImportError::UnreadableSource(format!("{}: {}", locator, e)))
    }

    pub fn count_audio_files<R: Read>(&self, stream: R) -> Result<usize> {
        media::count_audio_files(stream, &self.options.audio_extensions)
    }

    pub fn parse_sentences<R: Read>(&self, stream: R) -> Result<SentenceDrafts> {
        manifest::parse_sentences(stream)
    }

    /// Store drafts in order, announcing each one
    pub fn persist_sentences(
        &mut self,
        language_id: i64,
        pack_id: i64,
        drafts: &[SentenceDraft],
    ) -> Result<usize> {
        let listeners = &self.listeners;
        self.store.insert_sentences(language_id, pack_id, drafts, &mut |n| {
            listeners.notify(&format!("Reading sentence: {}", n));
        })
    }

    /// Copy audio into the pack's media directory and attach each file to
    /// the sentence carrying the same number.
    pub fn copy_audio_files<R: Read>(
        &self,
        stream: R,
        language_id: i64,
        pack_id: i64,
    ) -> Result<(Vec<CopiedAudio>, usize)> {
        let dest = media::pack_media_dir(&self.options.media_dir, language_id, pack_id);
        let mut linked = 0;
        let copied = media::copy_audio_files(
            stream,
            &self.options.audio_extensions,
            &dest,
            |audio| {
                let Some(index) = audio.manifest_index else {
                    tracing::debug!("No sentence number in {}", audio.entry);
                    return Ok(());
                };
                let path = audio.path.to_string_lossy();
                if self.store.set_sentence_audio(pack_id, index, &path)? {
                    linked += 1;
                } else {
                    tracing::debug!("No sentence {} for {}", index, audio.entry);
                }
                Ok(())
            },
        )?;
        Ok((copied, linked))
    }

    // ========== Orchestration ==========

    /// Run a whole import.
    ///
    /// [`ImportError`]s are delivered to listeners and returned as
    /// `ImportOutcome::Failed`; anything else (storage, I/O while copying)
    /// is returned as `Err`. Nothing created before a failure is removed.
    pub fn import_pack(&mut self, locator: &str) -> Result<ImportOutcome> {
        let mut job = ImportJob::new(locator);
        tracing::info!("Importing {}", locator);
        if self.listeners.is_empty() {
            tracing::debug!("No listeners registered for {}", locator);
        } else {
            tracing::debug!("Reporting {} to {} listeners", locator, self.listeners.len());
        }

        match self.run(&mut job) {
            Ok(report) => {
                self.enter(&mut job, ImportState::Completed)?;
                self.notify(&mut job, "Import complete");
                tracing::info!(
                    "Imported {} sentences into {}/{}",
                    report.sentences,
                    report.language.code,
                    report.pack.name
                );
                Ok(ImportOutcome::Completed(report))
            }
            Err(Error::Import(error)) => {
                tracing::warn!("Import of {} failed: {}", locator, error);
                self.fail(&mut job)?;
                self.listeners.error(&error);
                Ok(ImportOutcome::Failed(error))
            }
            Err(other) => {
                tracing::error!("Import of {} aborted: {}", locator, other);
                self.fail(&mut job)?;
                Err(other)
            }
        }
    }

    fn run(&mut self, job: &mut ImportJob) -> Result<ImportReport> {
        // Listeners hear about this state only once the source proved readable
        job.transition(ImportState::ExtractingMetadata)?;
        let locator = Locator::parse(&job.locator)
            .map_err(|e| ImportError::UnreadableSource(e.to_string()))?;
        let (language_code, pack_name) = self.extract_language_and_pack_name(&locator)?;
        // Opened before any record exists so an unreadable source leaves no trace
        let audio_stream = self.open_content(&locator)?;
        self.listeners.state_changed(ImportState::ExtractingMetadata);

        self.enter(job, ImportState::ResolvingRecords)?;
        let language = self.resolve_language(&language_code)?;
        let pack = self.resolve_pack(&pack_name, &language_code)?;

        self.enter(job, ImportState::ParsingContent)?;
        let audio_files = self.count_audio_files(audio_stream)?;
        job.expected_audio_files = Some(audio_files);

        let drafts = self
            .parse_sentences(self.open_content(&locator)?)?
            .collect::<std::result::Result<Vec<_>, ImportError>>()?;
        job.parsed_sentences = Some(drafts.len());

        // TODO: product decision pending on whether an audio/sentence count mismatch fails the import
        if audio_files != drafts.len() {
            tracing::warn!(
                "{} has {} audio files for {} sentences",
                locator,
                audio_files,
                drafts.len()
            );
        }
        if let Some(last) = drafts.last() {
            self.notify(job, &last.text);
        }

        self.enter(job, ImportState::PersistingSentences)?;
        let sentences = self.persist_sentences(language.id, pack.id, &drafts)?;

        self.enter(job, ImportState::CopyingMedia)?;
        let (copied, audio_linked) =
            self.copy_audio_files(self.open_content(&locator)?, language.id, pack.id)?;
        self.notify(job, "Audio files copied");

        Ok(ImportReport {
            locator: job.locator.clone(),
            media_dir: media::pack_media_dir(&self.options.media_dir, language.id, pack.id),
            language,
            pack,
            audio_files,
            sentences,
            audio_copied: copied.len(),
            audio_linked,
        })
    }

    fn enter(&self, job: &mut ImportJob, state: ImportState) -> Result<()> {
        job.transition(state)?;
        self.listeners.state_changed(state);
        Ok(())
    }

    /// Move to `Failed`, telling listeners only if they saw the import start
    fn fail(&self, job: &mut ImportJob) -> Result<()> {
        let announced = job.history().contains(&ImportState::ResolvingRecords);
        job.transition(ImportState::Failed)?;
        if announced {
            self.listeners.state_changed(ImportState::Failed);
        }
        Ok(())
    }

    fn notify(&self, job: &mut ImportJob, message: &str) {
        job.last_message = Some(message.to_string());
        self.listeners.notify(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LocalContentSource;
    use crate::storage::{LanguageStore, PackStore, SentenceStore, SqliteStore};
    use crate::test_support::{sample_pack, RecordingListener, ZipBuilder};
    use std::path::Path;

    struct Fixture {
        dir: tempfile::TempDir,
        pipeline: PackImportPipeline<SqliteStore, LocalContentSource>,
        listener: Arc<RecordingListener>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let options = ImportOptions {
                media_dir: dir.path().join("media"),
                ..Default::default()
            };
            let content = LocalContentSource::new().with_provider("downloads", dir.path());
            let mut pipeline =
                PackImportPipeline::new(SqliteStore::open_in_memory().unwrap(), content, options);
            let listener = Arc::new(RecordingListener::default());
            pipeline.add_listener(listener.clone());
            Self { dir, pipeline, listener }
        }

        fn write_pack(&self, file_name: &str, bytes: &[u8]) -> String {
            let path = self.dir.path().join(file_name);
            std::fs::write(&path, bytes).unwrap();
            format!("file://{}", path.display())
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }
    }

    #[test]
    fn test_end_to_end_import() {
        let mut fx = Fixture::new();
        let locator = fx.write_pack("en_basics.pack", &sample_pack(&["Hello", "World"], 2));

        let outcome = fx.pipeline.import_pack(&locator).unwrap();
        let report = match outcome {
            ImportOutcome::Completed(report) => report,
            other => panic!("import failed: {:?}", other),
        };

        assert_eq!(report.language.code, "en");
        assert_eq!(report.language.name, "English");
        assert_eq!(report.pack.name, "basics");
        assert_eq!(report.sentences, 2);
        assert_eq!(report.audio_copied, 2);
        assert_eq!(report.audio_linked, 2);
        assert!(!report.count_mismatch());

        let store = fx.pipeline.store();
        let pack = store.find_pack_by_name_and_language("basics", "en").unwrap().unwrap();
        let sentences = store.list_sentences(pack.id).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!((sentences[0].order_index, sentences[0].text.as_str()), (0, "Hello"));
        assert_eq!((sentences[1].order_index, sentences[1].text.as_str()), (1, "World"));
        assert_eq!(sentences[0].translation.as_deref(), Some("Hello (es)"));

        let audio = PathBuf::from(sentences[1].audio_path.as_ref().unwrap());
        assert_eq!(audio, report.media_dir.join("EN - Basics - 0002.mp3"));
        assert_eq!(std::fs::read_to_string(audio).unwrap(), "audio 2");
        assert!(report.media_dir.starts_with(fx.path().join("media")));

        assert_eq!(
            fx.listener.notifications(),
            vec![
                "World",
                "Reading sentence: 1",
                "Reading sentence: 2",
                "Audio files copied",
                "Import complete",
            ]
        );
        assert!(fx.listener.errors().is_empty());
        assert_eq!(
            fx.listener.states(),
            vec![
                ImportState::ExtractingMetadata,
                ImportState::ResolvingRecords,
                ImportState::ParsingContent,
                ImportState::PersistingSentences,
                ImportState::CopyingMedia,
                ImportState::Completed,
            ]
        );
    }

    #[test]
    fn test_unreadable_source() {
        let mut fx = Fixture::new();
        let locator = format!("file://{}/en_basics.pack", fx.path().display());

        let outcome = fx.pipeline.import_pack(&locator).unwrap();

        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::UnreadableSource(_))));
        assert!(fx.listener.notifications().is_empty());
        let errors = fx.listener.errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ImportError::UnreadableSource(_)));
        assert!(fx.listener.states().is_empty());
        assert_eq!(fx.listener.events.lock().unwrap().len(), 1);

        let stats = fx.pipeline.store().stats().unwrap();
        assert_eq!((stats.languages, stats.packs, stats.sentences), (0, 0, 0));
    }

    #[test]
    fn test_malformed_name_mutates_nothing() {
        let mut fx = Fixture::new();
        let locator = fx.write_pack("basics.pack", &sample_pack(&["Hello"], 1));

        let outcome = fx.pipeline.import_pack(&locator).unwrap();

        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::MalformedName(_))));
        assert_eq!(fx.listener.errors().len(), 1);
        assert!(fx.pipeline.store().list_languages().unwrap().is_empty());
        assert_eq!(fx.pipeline.store().count_packs().unwrap(), 0);
    }

    #[test]
    fn test_unknown_language_code() {
        let mut fx = Fixture::new();
        let locator = fx.write_pack("xx_basics.pack", &sample_pack(&["Hello"], 1));

        let outcome = fx.pipeline.import_pack(&locator).unwrap();

        assert!(matches!(
            outcome,
            ImportOutcome::Failed(ImportError::LanguageCreationFailed(_))
        ));
        assert_eq!(fx.pipeline.store().count_languages().unwrap(), 0);
    }

    #[test]
    fn test_resolve_language_twice_creates_one_record() {
        let fx = Fixture::new();
        let first = fx.pipeline.resolve_language("de").unwrap();
        let second = fx.pipeline.resolve_language("de").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(fx.pipeline.store().count_languages().unwrap(), 1);
    }

    #[test]
    fn test_resolve_pack_without_language() {
        let fx = Fixture::new();
        let err = fx.pipeline.resolve_pack("basics", "en").unwrap_err();
        assert!(matches!(err, Error::Import(ImportError::PackCreationFailed(_))));
        assert_eq!(fx.pipeline.store().count_packs().unwrap(), 0);
    }

    #[test]
    fn test_count_mismatch_still_completes() {
        let mut fx = Fixture::new();
        let locator = fx.write_pack("en_basics.pack", &sample_pack(&["Hello", "World", "Again"], 2));

        let outcome = fx.pipeline.import_pack(&locator).unwrap();
        let report = match outcome {
            ImportOutcome::Completed(report) => report,
            other => panic!("import failed: {:?}", other),
        };

        assert_eq!(report.audio_files, 2);
        assert_eq!(report.sentences, 3);
        assert!(report.count_mismatch());
        assert_eq!(report.audio_linked, 2);
        assert_eq!(fx.listener.notifications().last().unwrap(), "Import complete");
    }

    #[test]
    fn test_persist_preserves_manifest_order() {
        let mut fx = Fixture::new();
        let texts: Vec<String> = (0..25).map(|i| format!("Sentence {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let locator = fx.write_pack("fr_order.pack", &sample_pack(&refs, 0));

        assert!(fx.pipeline.import_pack(&locator).unwrap().is_completed());

        let pack = fx.pipeline.store().find_pack_by_name_and_language("order", "fr").unwrap().unwrap();
        for (n, sentence) in fx.pipeline.store().list_sentences(pack.id).unwrap().iter().enumerate() {
            assert_eq!(sentence.order_index as usize, n);
            assert_eq!(sentence.text, texts[n]);
        }
    }

    #[test]
    fn test_reimport_reuses_records() {
        let mut fx = Fixture::new();
        let locator = fx.write_pack("en_basics.pack", &sample_pack(&["Hello", "World"], 2));

        fx.pipeline.import_pack(&locator).unwrap();
        fx.pipeline.import_pack(&locator).unwrap();

        let stats = fx.pipeline.store().stats().unwrap();
        assert_eq!((stats.languages, stats.packs, stats.sentences), (1, 1, 2));
    }

    #[test]
    fn test_reimport_smaller_pack_replaces_sentences() {
        let mut fx = Fixture::new();
        let locator = fx.write_pack("en_basics.pack", &sample_pack(&["A", "B", "C"], 3));
        assert!(fx.pipeline.import_pack(&locator).unwrap().is_completed());

        fx.write_pack("en_basics.pack", &sample_pack(&["X", "Y"], 0));
        assert!(fx.pipeline.import_pack(&locator).unwrap().is_completed());

        let store = fx.pipeline.store();
        let pack = store.find_pack_by_name_and_language("basics", "en").unwrap().unwrap();
        let rows: Vec<_> = store
            .list_sentences(pack.id)
            .unwrap()
            .into_iter()
            .map(|s| (s.text, s.audio_path.is_some()))
            .collect();
        assert_eq!(rows, vec![("X".to_string(), false), ("Y".to_string(), false)]);
    }

    #[test]
    fn test_undecodable_cover_image_does_not_fail_import() {
        let mut fx = Fixture::new();
        let pack = ZipBuilder::new()
            .file("EN-ES.gsp", "index\tsentence\n1\tHello\n")
            .file("EN - Basics - 0001.mp3", "audio 1")
            .raw_file("cover.jpg", 14, b"lzma payload")
            .build();
        let locator = fx.write_pack("en_cover.pack", &pack);

        let report = match fx.pipeline.import_pack(&locator).unwrap() {
            ImportOutcome::Completed(report) => report,
            other => panic!("import failed: {:?}", other),
        };
        assert_eq!((report.sentences, report.audio_copied, report.audio_linked), (1, 1, 1));
    }

    #[test]
    fn test_failure_after_start_reports_failed_state() {
        let mut fx = Fixture::new();
        let pack = ZipBuilder::new().file("EN-ES.gsp", "index\tsentence\nx\tHello\n").build();
        let locator = fx.write_pack("en_broken.pack", &pack);

        fx.pipeline.import_pack(&locator).unwrap();

        assert_eq!(
            fx.listener.states(),
            vec![
                ImportState::ExtractingMetadata,
                ImportState::ResolvingRecords,
                ImportState::ParsingContent,
                ImportState::Failed,
            ]
        );
    }

    #[test]
    fn test_bad_manifest_keeps_created_records() {
        let mut fx = Fixture::new();
        let pack = ZipBuilder::new()
            .file("EN-ES.gsp", "index\tsentence\n1\tHello\nnope\tWorld\n")
            .build();
        let locator = fx.write_pack("en_broken.pack", &pack);

        let outcome = fx.pipeline.import_pack(&locator).unwrap();

        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::MalformedManifest(_))));
        let stats = fx.pipeline.store().stats().unwrap();
        assert_eq!((stats.languages, stats.packs, stats.sentences), (1, 1, 0));
    }

    #[test]
    fn test_content_provider_locator() {
        let mut fx = Fixture::new();
        fx.write_pack("es_food.gls", &sample_pack(&["Hola"], 1));

        let outcome = fx.pipeline.import_pack("content://downloads/es_food.gls").unwrap();

        assert!(outcome.is_completed());
        assert!(fx.pipeline.store().find_language_by_code("es").unwrap().is_some());
    }

    #[test]
    fn test_unsupported_scheme_is_unreadable() {
        let mut fx = Fixture::new();
        let outcome = fx.pipeline.import_pack("https://example.com/en_basics.pack").unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed(ImportError::UnreadableSource(_))));
    }

    #[test]
    fn test_removed_listener_hears_nothing() {
        let mut fx = Fixture::new();
        let extra = Arc::new(RecordingListener::default());
        let id = fx.pipeline.add_listener(extra.clone());
        assert!(fx.pipeline.remove_listener(id));

        let locator = fx.write_pack("en_basics.pack", &sample_pack(&["Hello"], 1));
        fx.pipeline.import_pack(&locator).unwrap();

        assert!(extra.events.lock().unwrap().is_empty());
        assert!(!fx.listener.notifications().is_empty());
    }
}
