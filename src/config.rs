use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database file used when neither the CLI nor the config file names one
pub const DEFAULT_DATABASE: &str = "feira_livre.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeiraConfig {
    pub database: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("feira.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<FeiraConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: FeiraConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &FeiraConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Pick the database path: explicit flag, then config file, then the default.
pub fn resolve_database(cli: Option<PathBuf>, config: Option<&FeiraConfig>) -> PathBuf {
    cli.or_else(|| config.and_then(|c| c.database.as_ref()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
