//! XDG-compliant path resolution for ebb-graph.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Global XDG-compliant directories for ebb-graph.
#[derive(Debug, Clone)]
pub struct EbbPaths {
    /// `$XDG_CONFIG_HOME/ebb-graph/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/ebb-graph/`
    pub data_dir: PathBuf,
}

impl EbbPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> Result<Self, ConfigError> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve using an explicit variable lookup.
    pub fn resolve_with(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let home = var("HOME").map(PathBuf::from).ok_or(ConfigError::NoHome)?;

        let config_dir = var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".config"))
            .join("ebb-graph");

        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".local/share"))
            .join("ebb-graph");

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Path to the server config file.
    pub fn server_config_file(&self) -> PathBuf {
        self.config_dir.join("server.toml")
    }

    /// Default directory for the durable graph store.
    pub fn graph_dir(&self) -> PathBuf {
        self.data_dir.join("graph")
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.config_dir, &self.data_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_home() {
        let paths = EbbPaths::resolve_with(|k| match k {
            "HOME" => Some("/home/op".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/home/op/.config/ebb-graph"));
        assert_eq!(
            paths.data_dir,
            PathBuf::from("/home/op/.local/share/ebb-graph")
        );
        assert_eq!(
            paths.graph_dir(),
            PathBuf::from("/home/op/.local/share/ebb-graph/graph")
        );
    }

    #[test]
    fn xdg_overrides_win() {
        let paths = EbbPaths::resolve_with(|k| match k {
            "HOME" => Some("/home/op".into()),
            "XDG_CONFIG_HOME" => Some("/cfg".into()),
            "XDG_DATA_HOME" => Some("/data".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            paths.server_config_file(),
            PathBuf::from("/cfg/ebb-graph/server.toml")
        );
        assert_eq!(paths.data_dir, PathBuf::from("/data/ebb-graph"));
    }

    #[test]
    fn missing_home_is_an_error() {
        let err = EbbPaths::resolve_with(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoHome));
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = EbbPaths {
            config_dir: tmp.path().join("cfg"),
            data_dir: tmp.path().join("data"),
        };
        paths.ensure_dirs().unwrap();
        assert!(paths.config_dir.is_dir());
        assert!(paths.data_dir.is_dir());
    }
}
