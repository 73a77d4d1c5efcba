//! warcsift: resumable, parallel corpus builder for web-archive crawls
//!
//! Streams Common Crawl WARC archives group by group and writes one filtered,
//! deduplicated, zstd-compressed JSONL file per group.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use warcsift::config::{init_logging, Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "warcsift")]
#[command(about = "Build a filtered text corpus from web-archive crawls")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build corpus groups
    Create {
        /// Crawl identifier (e.g. CC-MAIN-2024-51)
        #[arg(long)]
        corpus: Option<String>,

        /// Groups to build: ALL, 28, 10-50 or 1,8,13
        #[arg(short, long)]
        groups: Option<String>,

        /// Output directory
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Read the archive listing from a local warc.paths(.gz) file
        #[arg(long)]
        paths_file: Option<PathBuf>,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Allowed languages, comma separated, or ALL
        #[arg(short, long, value_delimiter = ',')]
        languages: Option<Vec<String>>,

        /// Minimum text length in characters
        #[arg(long)]
        min_length: Option<usize>,

        /// Bloom filter reference for paragraph dedup (`none` disables)
        #[arg(long)]
        bloom_filter: Option<String>,

        /// Scoring model directory reference (`none` disables)
        #[arg(long)]
        scoring_models: Option<String>,

        /// Load every scoring model before starting
        #[arg(long)]
        load_models_early: bool,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the languages known to the language detector
    ListLanguages,

    /// Show the state of a group's output and progress files
    Status {
        /// Group index
        group: usize,

        /// Output directory
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Create {
            corpus,
            groups,
            destination,
            paths_file,
            workers,
            languages,
            min_length,
            bloom_filter,
            scoring_models,
            load_models_early,
            quiet,
        } => {
            if let Some(corpus) = corpus {
                config.corpus.name = corpus;
            }
            if let Some(groups) = groups {
                config.corpus.groups = groups;
            }
            if let Some(destination) = destination {
                config.output.destination = destination;
            }
            if paths_file.is_some() {
                config.corpus.paths_file = paths_file;
            }
            if let Some(workers) = workers {
                config.workers.count = workers;
            }
            if let Some(languages) = languages {
                config.filter.languages = languages;
            }
            if let Some(min_length) = min_length {
                config.filter.min_length = min_length;
            }
            if bloom_filter.is_some() {
                config.filter.bloom_filter = bloom_filter;
            }
            if scoring_models.is_some() {
                config.filter.scoring_models = scoring_models;
            }
            if load_models_early {
                config.filter.load_models_early = true;
            }
            config.validate()?;
            commands::create::create_corpus(config, quiet)
        }
        Commands::ListLanguages => commands::languages::list_languages(config),
        Commands::Status { group, destination } => {
            if let Some(destination) = destination {
                config.output.destination = destination;
            }
            commands::status::show_status(config, group)
        }
        Commands::Init { path, force } => commands::init::init_config(path, force),
    }
}
