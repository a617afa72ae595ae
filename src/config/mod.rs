//! Configuration management.
//!
//! Settings come from an optional TOML file layered under environment
//! variables prefixed with `ARTICLES_SEARCHER_`; nested keys use `__`
//! (e.g. `ARTICLES_SEARCHER_SCOPUS__API_KEY`).

mod file_config;

pub use file_config::{default_config_path, find_config_file, write_default_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CrossRef DOI registry
    pub crossref: CrossRefConfig,

    /// Scopus abstract and citation index
    pub scopus: ScopusConfig,

    /// eLibrary RISC library index
    pub risc: RiscConfig,

    /// Web of Science Links AMR
    pub wos: WosConfig,

    /// Outbound HTTP transport
    pub http: HttpConfig,

    /// HTTP facade server
    pub server: ServerConfig,
}

/// CrossRef settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossRefConfig {
    pub base_url: String,
    pub rows: usize,
    pub agent_name: String,
    pub agent_version: String,
    /// Contact address sent in the User-Agent (required by the polite pool)
    pub mail_to: Option<String>,
}

impl Default for CrossRefConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.crossref.org/works".to_string(),
            rows: default_rows(),
            agent_name: "CrossrefSearcher".to_string(),
            agent_version: "1.0.0".to_string(),
            mail_to: None,
        }
    }
}

/// Scopus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopusConfig {
    pub base_url: String,
    pub rows: usize,
    pub api_key: Option<String>,
    /// Maximum concurrent affiliation requests per call; unset means unbounded
    pub fan_out_limit: Option<usize>,
}

impl Default for ScopusConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elsevier.com/content".to_string(),
            rows: default_rows(),
            api_key: None,
            fan_out_limit: None,
        }
    }
}

/// eLibrary RISC settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiscConfig {
    pub base_url: String,
    pub user_code: Option<String>,
}

impl Default for RiscConfig {
    fn default() -> Self {
        Self {
            base_url: "http://elibrary.ru/projects/API-NEB/API_NEB.aspx".to_string(),
            user_code: None,
        }
    }
}

/// Web of Science settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WosConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Fields requested from Links AMR
    pub retrieve: Vec<String>,
}

impl Default for WosConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ws.isiknowledge.com/cps/xrpc".to_string(),
            username: None,
            password: None,
            retrieve: [
                "doi",
                "ut",
                "timesCited",
                "sourceURL",
                "citingArticlesURL",
                "relatedRecordsURL",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Facade server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

fn default_rows() -> usize {
    10
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    builder
        .add_source(
            config::Environment::with_prefix("ARTICLES_SEARCHER")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}
