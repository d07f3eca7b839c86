use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::Deserialize;
use std::path::PathBuf;
use timbre_core::AnalysisDepth;

/// Default port the similarity service listens on.
pub const DEFAULT_LISTEN_PORT: u16 = 50051;

/// Configuration for timbre.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (TIMBRE_* prefix)
/// 3. Config file (~/.config/timbre/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory holding the persisted similarity index.
    ///
    /// Can be set via:
    /// - CLI: --index-dir /path/to/index
    /// - ENV: TIMBRE_INDEX_PATH
    /// - Config: index_path = "/path/to/index"
    /// - Default: ~/.local/share/timbre/index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Port for the similarity service.
    ///
    /// Can be set via:
    /// - ENV: TIMBRE_LISTEN_PORT
    /// - Config: listen_port = 50051
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Analysis depth used when a request does not name one.
    #[serde(default)]
    pub default_depth: AnalysisDepth,

    /// Logger options, passed straight to twyg.
    #[serde(default)]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            listen_port: DEFAULT_LISTEN_PORT,
            default_depth: AnalysisDepth::default(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/timbre/config.toml
    /// Reads environment variables with TIMBRE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .with_context(|| format!("Failed to load config file {}", config_path.display()))?;
        }

        let env_opts = env::Options::with_top_level("timbre");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;
        Ok(config)
    }

    /// Load configuration, overriding the index location.
    ///
    /// This is used when the --index-dir CLI flag is provided.
    pub fn load_with_index_path(index_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.index_path = index_path;
        Ok(config)
    }
}

/// Returns: ~/.local/share/timbre/index (or platform equivalent)
fn default_index_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("timbre")
        .join("index")
}

const fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/timbre/config.toml
/// - macOS: ~/Library/Application Support/timbre/config.toml
/// - Windows: %APPDATA%\timbre\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("timbre")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Timbre Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (TIMBRE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Directory holding the similarity index (hnsw.bin + metadata.json)
#
# Can also be set via:
# - CLI: timbre --index-dir /custom/index similar ...
# - Environment: TIMBRE_INDEX_PATH=/custom/index
#
# Default: Platform-specific data directory
#index_path = "/path/to/timbre/index"

# Port the similarity service listens on
listen_port = 50051

# Analysis depth when none is requested: lightweight, standard, comprehensive
default_depth = "standard"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
