//! `replica config show|set` – inspect and persist settings.

use anyhow::Result;
use replica_core::config::{self, ReplicaConfig};
use std::path::{Path, PathBuf};

pub fn run_config_show(path: &Path, cfg: &ReplicaConfig) {
    println!("config file:      {}", path.display());
    println!("save_dir:         {}", cfg.save_dir.display());
    println!("skip_cert_check:  {}", cfg.skip_cert_check);
    println!("show_output:      {}", cfg.show_output);
    println!("tool_path:        {}", cfg.tool_path);
}

pub fn run_config_set(
    path: &Path,
    cfg: ReplicaConfig,
    save_dir: Option<PathBuf>,
    skip_cert_check: Option<bool>,
    show_output: Option<bool>,
    tool: Option<String>,
) -> Result<()> {
    let updated = apply_changes(cfg.clone(), save_dir, skip_cert_check, show_output, tool);
    if updated == cfg {
        println!("No settings changed.");
        return Ok(());
    }
    config::save_at(path, &updated)?;
    tracing::info!(path = %path.display(), "settings updated");
    if updated.skip_cert_check != cfg.skip_cert_check {
        if updated.skip_cert_check {
            println!("TLS certificate verification disabled.");
        } else {
            println!("TLS certificate verification enabled.");
        }
    }
    if updated.save_dir != cfg.save_dir {
        println!("New default save directory: {}", updated.save_dir.display());
    }
    println!("Saved settings to {}", path.display());
    Ok(())
}

fn apply_changes(
    mut cfg: ReplicaConfig,
    save_dir: Option<PathBuf>,
    skip_cert_check: Option<bool>,
    show_output: Option<bool>,
    tool: Option<String>,
) -> ReplicaConfig {
    if let Some(dir) = save_dir {
        cfg.save_dir = dir;
    }
    if let Some(skip) = skip_cert_check {
        cfg.skip_cert_check = skip;
    }
    if let Some(show) = show_output {
        cfg.show_output = show;
    }
    if let Some(tool) = tool {
        cfg.tool_path = tool;
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_changes_only_touches_given_fields() {
        let base = ReplicaConfig::default();
        let cfg = apply_changes(base.clone(), None, Some(true), None, None);
        assert!(cfg.skip_cert_check);
        assert_eq!(cfg.save_dir, base.save_dir);
        assert_eq!(cfg.show_output, base.show_output);
        assert_eq!(cfg.tool_path, base.tool_path);
    }

    #[test]
    fn config_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        run_config_set(
            &path,
            ReplicaConfig::default(),
            Some(dir.path().join("media")),
            None,
            Some(false),
            None,
        )
        .unwrap();
        let saved = config::load_or_init_at(&path).unwrap();
        assert_eq!(saved.save_dir, dir.path().join("media"));
        assert!(!saved.show_output);
    }

    #[test]
    fn config_set_without_changes_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        run_config_set(&path, ReplicaConfig::default(), None, None, None, None).unwrap();
        assert!(!path.exists());
    }
}
