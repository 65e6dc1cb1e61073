use crate::{emit_success, OutputMode};
use natibo::config::{self, NatiboConfig};
use natibo::content::LocalContentSource;
use natibo::languages;
use natibo::storage::{LanguageStore, PackStore, SentenceStore, SqliteStore};
use natibo::ui::{self, Icons, ProgressManager};
use natibo::watcher::Watcher;
use natibo::{ImportOutcome, ImportWorker, PackImportPipeline};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Settings resolved from the config file and command-line overrides.
pub struct AppContext {
    pub base: PathBuf,
    pub config: NatiboConfig,
    pub database: PathBuf,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>, database: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = config::load_config(config_path)?.unwrap_or_default();
        let base = match config_path.and_then(Path::parent) {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        let database = database.unwrap_or_else(|| config.database_path(&base));
        tracing::debug!("Using database {}", database.display());
        Ok(Self { base, config, database })
    }

    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        config::ensure_db_dir(&self.database)?;
        Ok(SqliteStore::open(&self.database)?)
    }

    /// A fresh pipeline with its own connection
    pub fn pipeline(&self) -> anyhow::Result<PackImportPipeline<SqliteStore, LocalContentSource>> {
        Ok(PackImportPipeline::new(
            self.open_store()?,
            self.config.content_source(&self.base),
            self.config.import_options(&self.base),
        ))
    }
}

pub fn run_init(config_path: Option<&Path>, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    let natibo_config = NatiboConfig::initial(Path::new(".natibo/natibo.db"), Path::new(".natibo/media"));
    config::write_config(&path, &natibo_config, force)?;

    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    config::ensure_db_dir(&natibo_config.database_path(&base))?;
    std::fs::create_dir_all(natibo_config.media_dir(&base))?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::info("Database", &natibo_config.database_path(&base).display().to_string());
        ui::info("Media", &natibo_config.media_dir(&base).display().to_string());
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "config": path }))?;
    }
    Ok(())
}

pub fn run_import(ctx: &AppContext, locators: Vec<String>, output_mode: OutputMode) -> anyhow::Result<()> {
    let results = import_batch(ctx, locators, 1, output_mode)?;
    report_results("import", &results, output_mode)
}

pub fn run_import_dir(
    ctx: &AppContext,
    dir: &Path,
    pattern: &str,
    jobs: usize,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let full_pattern = dir.join(pattern);
    let mut locators = Vec::new();
    for entry in glob::glob(&full_pattern.to_string_lossy())? {
        let path = entry?;
        if path.is_file() {
            locators.push(path.to_string_lossy().to_string());
        }
    }
    locators.sort();

    if locators.is_empty() {
        if output_mode.is_human() {
            ui::warn(&format!("No packs match {}", full_pattern.display()));
        }
        return emit_success(output_mode, "import-dir", serde_json::json!([]));
    }

    if output_mode.is_human() {
        ui::header(&format!("Importing {} packs from {}", locators.len(), dir.display()));
    }
    let results = import_batch(ctx, locators, jobs.max(1), output_mode)?;
    report_results("import-dir", &results, output_mode)
}

/// Result of one locator in a batch. `Err` is a failure outside the import
/// pipeline's own error kinds (storage, worker) and does not stop the batch.
type BatchResult = (String, anyhow::Result<ImportOutcome>);

/// Import `locators`, running up to `jobs` workers at once.
fn import_batch(
    ctx: &AppContext,
    locators: Vec<String>,
    jobs: usize,
    output_mode: OutputMode,
) -> anyhow::Result<Vec<BatchResult>> {
    let started = Instant::now();
    let progress = if output_mode.is_human() {
        ProgressManager::new()
    } else {
        ProgressManager::hidden()
    };
    let mut results: Vec<BatchResult> = Vec::with_capacity(locators.len());

    for chunk in locators.chunks(jobs) {
        let mut handles = Vec::with_capacity(chunk.len());
        for locator in chunk {
            match ctx.pipeline() {
                Ok(pipeline) => {
                    handles.push((locator.clone(), ImportWorker::spawn(pipeline, locator.clone())))
                }
                Err(e) => results.push((locator.clone(), Err(e))),
            }
        }

        let mut tracked: Vec<_> = handles
            .iter()
            .map(|(locator, handle)| (progress.track(locator), handle.events()))
            .collect();
        progress.follow_all(&mut tracked);
        drop(tracked);

        for (locator, handle) in handles {
            let result = handle.join().map_err(anyhow::Error::from);
            if let Err(e) = &result {
                tracing::error!("Import of {} aborted: {:#}", locator, e);
            }
            results.push((locator, result));
        }
    }

    if output_mode.is_human() {
        let completed: Vec<_> = results
            .iter()
            .filter_map(|(_, result)| match result {
                Ok(ImportOutcome::Completed(report)) => Some(report),
                _ => None,
            })
            .collect();
        progress.finish_with_summary(
            started.elapsed(),
            completed.len(),
            completed.iter().map(|r| r.sentences).sum(),
            completed.iter().map(|r| r.audio_copied).sum(),
        );
    }
    Ok(results)
}

fn report_results(command: &str, results: &[BatchResult], output_mode: OutputMode) -> anyhow::Result<()> {
    let failed = results
        .iter()
        .filter(|(_, result)| !matches!(result, Ok(outcome) if outcome.is_completed()))
        .count();

    if output_mode.is_human() {
        for (locator, result) in results {
            match result {
                Ok(ImportOutcome::Completed(report)) => {
                    ui::section(&format!(" {} ", locator));
                    ui::summary_row(
                        "Language:",
                        &format!("{} ({})", report.language.name, ui::accent(&report.language.code)),
                    );
                    ui::summary_row("Pack:", &ui::accent(&report.pack.name));
                    ui::summary_row("Sentences:", &report.sentences.to_string());
                    ui::summary_row(
                        "Audio:",
                        &format!("{} copied, {} linked", report.audio_copied, report.audio_linked),
                    );
                    ui::summary_row("Media:", &ui::muted(&report.media_dir.display().to_string()));
                    if report.count_mismatch() {
                        ui::warn(&format!(
                            "{} audio files for {} sentences",
                            report.audio_files, report.sentences
                        ));
                    }
                }
                Ok(ImportOutcome::Failed(error)) => {
                    ui::error(&format!("{}: {}", locator, error));
                }
                Err(e) => {
                    ui::error(&format!("{}: {:#}", locator, e));
                }
            }
        }
    } else {
        let data: Vec<serde_json::Value> = results
            .iter()
            .map(|(locator, result)| match result {
                Ok(ImportOutcome::Completed(report)) => serde_json::json!({
                    "locator": locator,
                    "status": "completed",
                    "report": report,
                }),
                Ok(ImportOutcome::Failed(error)) => serde_json::json!({
                    "locator": locator,
                    "status": "failed",
                    "kind": error.kind(),
                    "error": error.to_string(),
                }),
                Err(e) => serde_json::json!({
                    "locator": locator,
                    "status": "aborted",
                    "error": format!("{:#}", e),
                }),
            })
            .collect();
        emit_success(output_mode, command, serde_json::Value::Array(data))?;
    }

    if failed > 0 {
        anyhow::bail!("{} of {} imports failed", failed, results.len());
    }
    Ok(())
}

pub fn run_watch(ctx: &AppContext, dir: PathBuf, scan: bool) -> anyhow::Result<()> {
    let mut watcher = Watcher::new(dir, |path: &Path| -> anyhow::Result<()> {
        let locator = path.to_string_lossy().to_string();
        let progress = ProgressManager::new();
        let handle = ImportWorker::spawn(ctx.pipeline()?, locator.clone());
        progress.track(&locator).follow(handle.events());
        progress.clear();

        match handle.join()? {
            ImportOutcome::Completed(report) => {
                ui::status(
                    Icons::PACKAGE,
                    &format!("{}/{}", report.language.code, report.pack.name),
                    &format!("{} sentences", report.sentences),
                );
                Ok(())
            }
            ImportOutcome::Failed(error) => Err(error.into()),
        }
    });

    if scan {
        let imported = watcher.scan_existing()?;
        tracing::info!("Imported {} existing packs", imported);
    }
    watcher.run()
}

pub fn run_languages(ctx: &AppContext, output_mode: OutputMode) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let languages = store.list_languages()?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "languages", serde_json::to_value(&languages)?);
    }
    if languages.is_empty() {
        ui::warn("No languages yet. Import a pack first.");
    } else {
        println!("{}", ui::language_table(&languages));
    }
    Ok(())
}

pub fn run_packs(ctx: &AppContext, language: Option<&str>, output_mode: OutputMode) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let language = language.map(str::to_ascii_lowercase);
    if let Some(code) = language.as_deref() {
        if !languages::is_known_code(code) {
            anyhow::bail!("'{}' is not an ISO-639 language code", code);
        }
    }
    let packs = store.list_packs(language.as_deref())?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "packs", serde_json::to_value(&packs)?);
    }
    if packs.is_empty() {
        ui::warn("No packs found.");
    } else {
        println!("{}", ui::pack_table(&packs));
    }
    Ok(())
}

pub fn run_sentences(
    ctx: &AppContext,
    language: &str,
    pack: &str,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let language = language.to_ascii_lowercase();
    if !languages::is_known_code(&language) {
        anyhow::bail!("'{}' is not an ISO-639 language code", language);
    }
    let Some(found) = store.find_pack_by_name_and_language(pack, &language)? else {
        anyhow::bail!("no pack '{}' for language '{}'", pack, language);
    };
    let sentences = store.list_sentences(found.id)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "sentences", serde_json::to_value(&sentences)?);
    }
    ui::header(&format!("{}/{} ({} sentences)", language, found.name, sentences.len()));
    if !sentences.is_empty() {
        println!("{}", ui::sentence_table(&sentences));
    }
    Ok(())
}

pub fn run_stats(ctx: &AppContext, output_mode: OutputMode) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "stats", serde_json::to_value(&stats)?);
    }
    ui::status(Icons::DATABASE, "Database", &ctx.database.display().to_string());
    println!("{}", ui::stats_table(&stats));
    Ok(())
}
