//! Registry of configured provider adapters.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ArticleSource, SourceError};
use crate::config::Config;
use crate::utils::Transport;

bitflags::bitflags! {
    /// Operations a provider can serve
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const FIND_ARTICLE = 1 << 0;
        const FIND_ARTICLES = 1 << 1;
        const AFFILIATIONS = 1 << 2;
        const FULL_AFFILIATIONS = 1 << 3;
        const CITATIONS = 1 << 4;
        const QUARTILE = 1 << 5;
        const AUTHORS = 1 << 6;
    }
}

/// Registry for all configured providers
///
/// Adapters are keyed by [`ArticleSource::id`], which is also their route
/// prefix in the facade.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn ArticleSource>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every compiled-in provider whose credentials are configured.
    ///
    /// All adapters share one transport. A provider that cannot be built is
    /// skipped with a warning.
    #[allow(unused_mut, unused_variables)]
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "source-crossref")]
        registry.register_or_skip(
            "crossref",
            super::CrossRefSource::new(&config.crossref, transport.clone()),
        );
        #[cfg(feature = "source-scopus")]
        registry.register_or_skip(
            "scopus",
            super::ScopusSource::new(&config.scopus, transport.clone()),
        );
        #[cfg(feature = "source-risc")]
        registry.register_or_skip("risc", super::RiscSource::new(&config.risc, transport.clone()));
        #[cfg(feature = "source-wos")]
        registry.register_or_skip("wos", super::WosSource::new(&config.wos, transport.clone()));

        tracing::info!(providers = ?registry.ids().collect::<Vec<_>>(), "providers registered");
        registry
    }

    #[allow(dead_code)]
    fn register_or_skip<S>(&mut self, id: &str, source: Result<S, SourceError>)
    where
        S: ArticleSource + 'static,
    {
        match source {
            Ok(source) => self.register(Arc::new(source)),
            Err(err) => tracing::warn!(provider = id, error = %err, "provider not registered"),
        }
    }

    /// Register a new source
    pub fn register(&mut self, source: Arc<dyn ArticleSource>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn ArticleSource>> {
        self.sources.get(id)
    }

    /// Get a source by ID, returning an error if not found
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn ArticleSource>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::Config(format!("Provider '{}' is not registered", id)))
    }

    /// Get all registered sources
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn ArticleSource>> {
        self.sources.values()
    }

    /// Get all source IDs, sorted
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        let mut ids: Vec<&str> = self.sources.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids.into_iter()
    }

    /// Get sources that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn ArticleSource>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(all(
    test,
    feature = "source-crossref",
    feature = "source-scopus",
    feature = "source-risc",
    feature = "source-wos"
))]
mod tests {
    use super::*;
    use crate::sources::MockTransport;

    fn configured() -> Config {
        let mut config = Config::default();
        config.crossref.mail_to = Some("librarian@example.org".to_string());
        config.scopus.api_key = Some("KEY".to_string());
        config.risc.user_code = Some("UCODE".to_string());
        config.wos.username = Some("user".to_string());
        config.wos.password = Some("secret".to_string());
        config
    }

    #[test]
    fn test_registry_basic() {
        let registry = SourceRegistry::from_config(&configured(), Arc::new(MockTransport::new()));

        assert_eq!(registry.len(), 4);
        assert!(!registry.is_empty());
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["crossref", "risc", "scopus", "wos"]
        );
    }

    #[test]
    fn test_unconfigured_providers_are_skipped() {
        let registry = SourceRegistry::from_config(&Config::default(), Arc::new(MockTransport::new()));
        assert!(registry.is_empty());

        let mut config = Config::default();
        config.risc.user_code = Some("UCODE".to_string());
        let registry = SourceRegistry::from_config(&config, Arc::new(MockTransport::new()));
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["risc"]);
    }

    #[test]
    fn test_get_source() {
        let registry = SourceRegistry::from_config(&configured(), Arc::new(MockTransport::new()));

        let scopus = registry.get("scopus");
        assert!(scopus.is_some());
        assert_eq!(scopus.unwrap().name(), "Scopus");

        assert!(registry.get("nonexistent").is_none());
        assert!(matches!(
            registry.get_required("nonexistent"),
            Err(SourceError::Config(_))
        ));
    }

    #[test]
    fn test_capabilities() {
        let registry = SourceRegistry::from_config(&configured(), Arc::new(MockTransport::new()));

        let quartile: Vec<_> = registry
            .with_capability(SourceCapabilities::QUARTILE)
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(quartile, vec!["scopus"]);

        let mut affiliations: Vec<_> = registry
            .with_capability(SourceCapabilities::AFFILIATIONS)
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        affiliations.sort();
        assert_eq!(affiliations, vec!["crossref", "scopus"]);

        let wos = registry.get("wos").unwrap();
        assert_eq!(
            wos.capabilities(),
            SourceCapabilities::FIND_ARTICLE | SourceCapabilities::FIND_ARTICLES
        );
    }
}
