//! Environment overrides of the configuration file.
//!
//! Kept in its own test binary: environment variables are process-wide.

use articles_searcher::config::load_config;
use std::env;
use tempfile::tempdir;

const API_KEY_VAR: &str = "ARTICLES_SEARCHER_SCOPUS__API_KEY";

#[test]
fn test_environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("articles-searcher.toml");
    std::fs::write(
        &path,
        r#"
[scopus]
api_key = "from-file"
rows = 5
"#,
    )
    .unwrap();

    let original = env::var(API_KEY_VAR).ok();
    env::set_var(API_KEY_VAR, "from-env");
    let config = load_config(Some(&path));
    match original {
        Some(value) => env::set_var(API_KEY_VAR, value),
        None => env::remove_var(API_KEY_VAR),
    }

    let config = config.unwrap();
    assert_eq!(config.scopus.api_key.as_deref(), Some("from-env"));
    assert_eq!(config.scopus.rows, 5);
    assert_eq!(config.scopus.base_url, "https://api.elsevier.com/content");
}
