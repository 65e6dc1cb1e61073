//! Natibo CLI - import language-learning content packs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "natibo")]
#[command(version)]
#[command(about = "Import language-learning content packs into a local sentence database")]
#[command(long_about = r#"
Natibo imports content packs (zip archives named <language>_<pack>.pack)
into a local SQLite database and copies their audio into a media folder.

Example usage:
  natibo init
  natibo import ~/Downloads/en_basics.pack
  natibo import content://downloads/ja_travel.pack
  natibo import-dir ~/Downloads --pattern "*.pack"
  natibo sentences --language en --pack basics
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./natibo.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a natibo.toml with default settings
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Import one or more packs by locator (path, file:// or content://)
    Import {
        #[arg(required = true)]
        locators: Vec<String>,
    },

    /// Import every pack in a directory
    ImportDir {
        path: PathBuf,

        /// Glob pattern for pack files
        #[arg(short, long, default_value = "*.pack")]
        pattern: String,

        /// Imports to run at the same time
        #[arg(short, long, default_value = "2")]
        jobs: usize,
    },

    /// Watch a drop folder and import packs as they appear
    Watch {
        path: PathBuf,

        /// Do not import packs already in the folder
        #[arg(long)]
        no_scan: bool,
    },

    /// List known languages
    Languages,

    /// List imported packs
    Packs {
        /// Only packs of this language code
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List the sentences of a pack
    Sentences {
        /// Language code of the pack
        #[arg(short, long)]
        language: String,

        /// Pack name
        #[arg(short, long)]
        pack: String,
    },

    /// Show database statistics
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a `{"ok": true, "command": ..., "data": ...}` envelope in JSON mode.
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Commands::Init { force } = cli.command {
        return commands::run_init(cli.config.as_deref(), force, output_mode);
    }

    let ctx = commands::AppContext::load(cli.config.as_deref(), cli.database)?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Import { locators } => commands::run_import(&ctx, locators, output_mode),
        Commands::ImportDir { path, pattern, jobs } => {
            commands::run_import_dir(&ctx, &path, &pattern, jobs, output_mode)
        }
        Commands::Watch { path, no_scan } => commands::run_watch(&ctx, path, !no_scan),
        Commands::Languages => commands::run_languages(&ctx, output_mode),
        Commands::Packs { language } => commands::run_packs(&ctx, language.as_deref(), output_mode),
        Commands::Sentences { language, pack } => {
            commands::run_sentences(&ctx, &language, &pack, output_mode)
        }
        Commands::Stats => commands::run_stats(&ctx, output_mode),
    }
}
