use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `<name>.<extension>` catalog files.
    pub source_dir: PathBuf,
    /// JSON manifest listing the sources.
    pub manifest: PathBuf,
    pub extension: String,
}

impl Config {
    /// `GLASSCAT_CONFIG` must name an existing file; the default location may be absent.
    pub fn load() -> Result<Self> {
        match std::env::var_os("GLASSCAT_CONFIG") {
            Some(path) => Self::load_required(Path::new(&path)),
            None => Self::load_from(&config_home().join("config.json")),
        }
    }

    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file {} does not exist", path.display());
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_home = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            source_dir: data_home.join("glasscat").join("agf"),
            manifest: config_home().join("sources.json"),
            extension: "agf".to_string(),
        }
    }
}

fn config_home() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glasscat")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.extension, "agf");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "source_dir": "/srv/agf" }"#).unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.source_dir, PathBuf::from("/srv/agf"));
        assert_eq!(cfg.extension, "agf");
        assert_eq!(cfg.manifest, Config::default().manifest);
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let err = Config::load_required(&path).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        std::fs::write(&path, r#"{ "extension": "AGF" }"#).unwrap();
        assert_eq!(Config::load_required(&path).unwrap().extension, "AGF");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }
}
