use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Executable invoked for every download unless overridden.
pub const DEFAULT_TOOL: &str = "yt-dlp";

/// User settings loaded from `~/.config/replica/config.toml`.
///
/// Only resolved values leave this struct: the front end reads it once and
/// passes save dir, certificate flag and streaming flag into each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Directory the external tool writes into.
    pub save_dir: PathBuf,
    /// Pass `--no-check-certificate` to the tool.
    pub skip_cert_check: bool,
    /// Stream the tool's stdout while downloading.
    pub show_output: bool,
    /// Program name or path of the external downloader.
    pub tool_path: String,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            skip_cert_check: false,
            show_output: true,
            tool_path: DEFAULT_TOOL.to_string(),
        }
    }
}

/// `$HOME/Downloads/Replica`, or `./Downloads/Replica` when HOME is unset.
pub fn default_save_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join("Downloads").join("Replica")
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("replica")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReplicaConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<ReplicaConfig> {
    if !path.exists() {
        let default_cfg = ReplicaConfig::default();
        save_at(path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ReplicaConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

pub fn save(cfg: &ReplicaConfig) -> Result<()> {
    save_at(&config_path()?, cfg)
}

pub fn save_at(path: &Path, cfg: &ReplicaConfig) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("writing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ReplicaConfig::default();
        assert!(!cfg.skip_cert_check);
        assert!(cfg.show_output);
        assert_eq!(cfg.tool_path, "yt-dlp");
        assert!(cfg.save_dir.ends_with("Downloads/Replica"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ReplicaConfig {
            save_dir: PathBuf::from("/srv/media"),
            skip_cert_check: true,
            show_output: false,
            tool_path: "/opt/yt-dlp".to_string(),
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ReplicaConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_fills_defaults() {
        let toml = r#"
            skip_cert_check = true
        "#;
        let cfg: ReplicaConfig = toml::from_str(toml).unwrap();
        assert!(cfg.skip_cert_check);
        assert!(cfg.show_output);
        assert_eq!(cfg.tool_path, DEFAULT_TOOL);
        assert_eq!(cfg.save_dir, default_save_dir());
    }

    #[test]
    fn load_or_init_creates_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let created = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, ReplicaConfig::default());

        let mut changed = created.clone();
        changed.show_output = false;
        changed.save_dir = dir.path().join("out");
        save_at(&path, &changed).unwrap();
        assert_eq!(load_or_init_at(&path).unwrap(), changed);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "show_output = \"maybe\"").unwrap();
        assert!(load_or_init_at(&path).is_err());
    }
}
