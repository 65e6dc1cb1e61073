use crate::content::LocalContentSource;
use crate::import::ImportOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NatiboConfig {
    pub database: Option<String>,
    pub media_dir: Option<String>,
    pub audio_extensions: Option<Vec<String>>,
    /// `content://<authority>/...` -> directory
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content_providers: BTreeMap<String, String>,
}

impl NatiboConfig {
    /// Defaults written by `natibo init`
    pub fn initial(database: &Path, media_dir: &Path) -> Self {
        Self {
            database: Some(database.to_string_lossy().to_string()),
            media_dir: Some(media_dir.to_string_lossy().to_string()),
            audio_extensions: Some(vec!["mp3".to_string()]),
            content_providers: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(exts) = &self.audio_extensions {
            if exts.iter().any(|e| e.trim().trim_start_matches('.').is_empty()) {
                return Err(Error::Config("audio_extensions contains an empty entry".to_string()));
            }
        }
        for authority in self.content_providers.keys() {
            if authority.is_empty() || authority.contains('/') {
                return Err(Error::Config(format!(
                    "invalid content provider authority: {:?}",
                    authority
                )));
            }
        }
        Ok(())
    }

    /// Lowercased, without leading dots. Falls back to `mp3`.
    pub fn audio_extensions(&self) -> Vec<String> {
        match &self.audio_extensions {
            Some(exts) if !exts.is_empty() => exts
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            _ => ImportOptions::default().audio_extensions,
        }
    }

    pub fn database_path(&self, base: &Path) -> PathBuf {
        self.database
            .as_deref()
            .map(|p| base.join(p))
            .unwrap_or_else(|| default_database_path_in(base))
    }

    pub fn media_dir(&self, base: &Path) -> PathBuf {
        self.media_dir
            .as_deref()
            .map(|p| base.join(p))
            .unwrap_or_else(|| default_media_dir_in(base))
    }

    /// Relative provider roots resolve against `base`
    pub fn content_source(&self, base: &Path) -> LocalContentSource {
        self.content_providers
            .iter()
            .fold(LocalContentSource::new(), |source, (authority, root)| {
                source.with_provider(authority.clone(), base.join(root))
            })
    }

    pub fn import_options(&self, base: &Path) -> ImportOptions {
        ImportOptions {
            media_dir: self.media_dir(base),
            audio_extensions: self.audio_extensions(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("natibo.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".natibo").join("natibo.db")
}

pub fn default_media_dir_in(base: &Path) -> PathBuf {
    base.join(".natibo").join("media")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<NatiboConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: NatiboConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &NatiboConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
