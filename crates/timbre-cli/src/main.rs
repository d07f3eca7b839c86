use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use timbre_analysis::{Config, SignalExtractor};
use timbre_core::AnalysisDepth;
use timbre_search::SimilarityIndex;
use timbre_service::TimbreService;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "timbre", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the similarity index (default: ~/.local/share/timbre/index)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Analyze one audio file and print its descriptors and feature vector
    Analyze {
        /// Path to the audio file
        path: PathBuf,
        /// Analysis depth: lightweight, standard or comprehensive
        #[arg(long)]
        depth: Option<AnalysisDepth>,
        /// Keep only this descriptor (repeatable)
        #[arg(long = "descriptor", value_name = "NAME")]
        descriptors: Vec<String>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze every audio file under a directory, reporting progress
    Batch {
        /// Directory to scan for audio files
        dir: PathBuf,
        #[arg(long)]
        depth: Option<AnalysisDepth>,
        #[arg(long = "descriptor", value_name = "NAME")]
        descriptors: Vec<String>,
    },
    /// Analyze a directory and add its tracks to the similarity index
    ///
    /// Each track is indexed under its file path. The index is built on first
    /// use and grown afterwards; pass --rebuild to replace it.
    Index {
        /// Directory to scan for audio files
        dir: PathBuf,
        #[arg(long)]
        depth: Option<AnalysisDepth>,
        /// Discard the existing index and build a new one
        #[arg(long)]
        rebuild: bool,
    },
    /// Build the index from a JSON file of {"id", "vector"} items
    ///
    /// Vectors are base64-encoded little-endian f32 bytes, as printed by
    /// `timbre vectorize` and `timbre analyze --json`.
    Build {
        /// JSON file containing an array of items
        items: PathBuf,
        /// Append to the existing index instead of replacing it
        #[arg(long)]
        append: bool,
    },
    /// Find the indexed items most similar to a track or a vector
    Similar {
        /// Audio file to use as the query
        #[arg(long, conflicts_with = "vector", required_unless_present = "vector")]
        track: Option<PathBuf>,
        /// Base64-encoded query vector
        #[arg(long)]
        vector: Option<String>,
        /// Number of matches to return
        #[arg(short, long, default_value_t = 10)]
        k: usize,
    },
    /// Build a feature vector from a JSON object of descriptors
    Vectorize {
        /// JSON file such as {"tempo": 120, "energy": "0.8", "key": "A"}
        descriptors: PathBuf,
    },
    /// Show index status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get { key: Option<String> },
    /// Set a value in the config file
    Set { key: String, value: String },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.index_dir {
        Some(dir) => Config::load_with_index_path(dir)?,
        None => Config::load()?,
    };

    if let Err(e) = twyg::setup(config.logging.clone()) {
        eprintln!("Warning: failed to set up logging: {e:?}");
    }

    if let Commands::Config { action } = cli.command {
        return match action {
            ConfigAction::Show => commands::config::show_config(&config),
            ConfigAction::Get { key } => commands::config::get_config(&config, key),
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value),
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config(),
        };
    }

    let index = Arc::new(SimilarityIndex::open(&config.index_path));
    let service = TimbreService::new(Arc::new(SignalExtractor::new()), index)
        .with_default_depth(config.default_depth);

    match cli.command {
        Commands::Analyze {
            path,
            depth,
            descriptors,
            json,
        } => commands::run_analyze(&service, path, depth, descriptors, json).await?,
        Commands::Batch {
            dir,
            depth,
            descriptors,
        } => commands::run_batch(&service, &dir, depth, descriptors).await?,
        Commands::Index {
            dir,
            depth,
            rebuild,
        } => commands::run_index(&service, &dir, depth, rebuild).await?,
        Commands::Build { items, append } => commands::run_build(&service, &items, append).await?,
        Commands::Similar { track, vector, k } => {
            commands::run_similar(&service, track, vector, k).await?;
        }
        Commands::Vectorize { descriptors } => commands::run_vectorize(&descriptors)?,
        Commands::Status => commands::show_status(&service, &config),
        Commands::Config { .. } => {}
    }

    Ok(())
}
