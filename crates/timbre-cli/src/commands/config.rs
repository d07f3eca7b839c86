use anyhow::{Context, Result};
use timbre_analysis::{config, Config};
use timbre_core::AnalysisDepth;
use toml_edit::{value, DocumentMut};

const VALID_KEYS: &str = "index_path, listen_port, default_depth";

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!("  index_path: {}", config.index_path.display());
    println!("  listen_port: {}", config.listen_port);
    println!("  default_depth: {}", config.default_depth);
    println!("  logging: {:?}", config.logging);

    println!("\nPriority: CLI args > ENV vars (TIMBRE_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value, or the whole file when no key is given.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    let Some(key) = key else {
        let config_path = config::config_file_path();
        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'timbre config init' to create it.");
        }
        return Ok(());
    };

    match key.as_str() {
        "index_path" => println!("{}", config.index_path.display()),
        "listen_port" => println!("{}", config.listen_port),
        "default_depth" => println!("{}", config.default_depth),
        _ => anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, VALID_KEYS),
    }
    Ok(())
}

/// Set a config value, keeping the rest of the file (comments included) intact.
pub fn set_config(key: &str, raw: &str) -> Result<()> {
    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let mut doc: DocumentMut = contents
        .parse()
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    match key {
        "index_path" => doc[key] = value(raw),
        "listen_port" => {
            let port: u16 = raw
                .parse()
                .with_context(|| format!("Invalid port: {raw}"))?;
            doc[key] = value(i64::from(port));
        }
        "default_depth" => {
            let depth: AnalysisDepth = raw.parse()?;
            doc[key] = value(depth.as_str());
        }
        _ => anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, VALID_KEYS),
    }

    std::fs::write(&config_path, doc.to_string()).context("Failed to write config file")?;

    println!("✓ Updated {} = {}", key, raw);
    println!("  in {}", config_path.display());
    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure timbre.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }
    Ok(())
}
