pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "translorc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrent batch-translation orchestration core with a rate-limited LLM scheduler", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long, default_value = "false")]
        force: bool,
    },

    /// Run a translation session to completion (or until stopped)
    Run {
        /// Path to the source file to translate
        #[arg(required = true)]
        source: PathBuf,

        /// Output folder for cache snapshots and final results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Source language
        #[arg(long, value_enum, default_value = "other")]
        source_lang: LanguageArg,

        /// Target language
        #[arg(long, value_enum, default_value = "other")]
        target_lang: LanguageArg,

        /// Resume a previously interrupted session instead of starting fresh
        #[arg(long, default_value = "false")]
        resume: bool,
    },

    /// Request a graceful stop of a session started with `run` in this process
    ///
    /// Only meaningful while `run` is executing in the same process (e.g. an
    /// embedding that drives both from one event loop); the standalone CLI has no
    /// cross-process signaling, so `run` itself reacts to Ctrl-C.
    Stop,

    /// Re-export the current cache contents without running a new session
    Export {
        /// Output folder containing the cache to export
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// Print the project's current status and progress counters
    Status {
        /// Output folder containing the cache to inspect
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LanguageArg {
    Ja,
    Ko,
    Zh,
    #[default]
    Other,
}

impl From<LanguageArg> for crate::response::Language {
    fn from(value: LanguageArg) -> Self {
        match value {
            LanguageArg::Ja => crate::response::Language::Ja,
            LanguageArg::Ko => crate::response::Language::Ko,
            LanguageArg::Zh => crate::response::Language::Zh,
            LanguageArg::Other => crate::response::Language::Other,
        }
    }
}
