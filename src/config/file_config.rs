//! Configuration file discovery and generation.
//!
//! # Configuration File Format
//!
//! ```toml
//! [crossref]
//! mail_to = "librarian@example.org"
//! rows = 10
//!
//! [scopus]
//! api_key = "your-elsevier-key"
//! fan_out_limit = 8
//!
//! [risc]
//! user_code = "your-user-code"
//!
//! [wos]
//! username = "user"
//! password = "secret"
//!
//! [http]
//! timeout_secs = 30
//!
//! [server]
//! bind = "127.0.0.1:3000"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

const LOCAL_CONFIG: &str = "articles-searcher.toml";

/// Path of the per-user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("articles-searcher").join("config.toml"))
}

/// Find a configuration file: `./articles-searcher.toml`, then the per-user file
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

/// Write the default configuration as TOML
pub fn write_default_config(path: &Path) -> Result<(), ConfigFileError> {
    let content = toml::to_string_pretty(&Config::default())
        .map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::tempdir;

    #[test]
    fn test_written_default_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_default_config_path_is_namespaced() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("articles-searcher/config.toml"));
        }
    }
}
