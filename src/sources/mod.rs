//! Provider adapters with a shared trait-based contract.
//!
//! This module defines the [`ArticleSource`] trait that every bibliographic
//! provider implements. Each adapter translates the generic "find one" /
//! "find many" contract into the provider's native protocol and exposes its
//! provider-specific enrichments through a static route table.
//!
//! # Feature Flags
//!
//! Individual providers can be disabled at compile time using Cargo features:
//!
//! - `crossref` - CrossRef DOI registry (default: enabled)
//! - `scopus` - Scopus abstract/citation index (default: enabled)
//! - `risc` - eLibrary RISC library index (default: enabled)
//! - `wos` - Web of Science Links AMR (default: enabled)
//!
//! # Runtime Configuration
//!
//! Providers that need credentials are only registered when those
//! credentials are configured; see [`crate::config`].

#[cfg(feature = "source-scopus")]
mod affiliations;
#[cfg(feature = "source-crossref")]
mod crossref;
#[cfg(feature = "source-risc")]
mod risc;
#[cfg(feature = "source-scopus")]
mod scopus;
#[cfg(feature = "source-wos")]
mod wos;

mod registry;

pub mod mock;

#[cfg(feature = "source-scopus")]
pub use affiliations::{AffiliationAggregator, AffiliationFetcher};
#[cfg(feature = "source-crossref")]
pub use crossref::{pair_contributors, CrossRefSource};
pub use mock::MockTransport;
pub use registry::{SourceCapabilities, SourceRegistry};
#[cfg(feature = "source-risc")]
pub use risc::RiscSource;
#[cfg(feature = "source-scopus")]
pub use scopus::{quartile_from_percentile, ScopusSource};
#[cfg(feature = "source-wos")]
pub use wos::WosSource;

use std::fmt;

use async_trait::async_trait;

use crate::models::{Article, Operation, Query, Route, RouteParams};

/// Routes every provider answers.
pub const COMMON_ROUTES: &[Route] = &[
    Route::new("/article/*", Operation::FindArticle),
    Route::new("/articles", Operation::FindArticles),
];

/// The ArticleSource trait defines the interface for all provider adapters.
///
/// # Implementing a New Provider
///
/// 1. Create a struct holding the provider settings and an `Arc<dyn Transport>`
/// 2. Implement `id`, `name`, `find_article` and `find_articles`
/// 3. Declare extra operations in `routes` and handle them in `enrich`
/// 4. Register the adapter in `SourceRegistry::from_config`
#[async_trait]
pub trait ArticleSource: Send + Sync + fmt::Debug {
    /// Unique identifier for this provider (used as the route prefix, e.g. "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// Describe the capabilities of this provider
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FIND_ARTICLE | SourceCapabilities::FIND_ARTICLES
    }

    /// Static route table, relative to `/<id>`
    fn routes(&self) -> &'static [Route] {
        COMMON_ROUTES
    }

    /// Find a single article by its provider identifier.
    ///
    /// A provider reporting zero results yields [`DomainErrorKind::NotFound`].
    async fn find_article(&self, id: &str) -> Result<Article, SourceError>;

    /// Find all articles matching the query.
    ///
    /// Zero matches is an empty vector, never an error.
    async fn find_articles(&self, query: &Query) -> Result<Vec<Article>, SourceError>;

    /// Run a provider-specific operation declared in [`ArticleSource::routes`]
    async fn enrich(
        &self,
        _operation: Operation,
        _params: &RouteParams,
    ) -> Result<Article, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// The closed set of classified failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainErrorKind {
    NotFound,
    BadRequest,
    Rejected,
    Unavailable,
}

impl DomainErrorKind {
    /// Stable status code rendered to callers
    pub fn code(&self) -> &'static str {
        match self {
            DomainErrorKind::NotFound => "DATA_API_NOT_FOUND_DATA",
            DomainErrorKind::BadRequest => "DATA_API_BAD_REQUEST",
            DomainErrorKind::Rejected => "DATA_API_REJECT_REQUEST",
            DomainErrorKind::Unavailable => "DATA_API_UNAVAILABLE",
        }
    }

    /// Default message for this kind
    pub fn message(&self) -> &'static str {
        match self {
            DomainErrorKind::NotFound => "data service found no matching data",
            DomainErrorKind::BadRequest => "request executed with invalid parameters",
            DomainErrorKind::Rejected => "data service could not process the request",
            DomainErrorKind::Unavailable => "data service is not responding",
        }
    }
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified, provider-agnostic failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DomainError {
    pub kind: DomainErrorKind,
    pub message: String,
}

impl DomainError {
    pub fn new(kind: DomainErrorKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(DomainErrorKind::NotFound)
    }
}

impl From<DomainErrorKind> for DomainError {
    fn from(kind: DomainErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Errors that can occur when interacting with a provider
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A classified transport failure or envelope-level emptiness
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The request could not be built or sent at all
    #[error("Request error: {0}")]
    Request(String),

    /// The provider answered with a payload we cannot read (JSON, XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Adapter construction failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// An author references an affiliation the record does not contain
    #[error("Author '{author}' references unknown affiliation '{affiliation}'")]
    UnresolvedAffiliation { author: String, affiliation: String },

    /// The requested operation is not offered by this provider
    #[error("Operation not implemented for this source")]
    NotImplemented,
}

impl SourceError {
    /// The domain error kind, if this failure was classified
    pub fn kind(&self) -> Option<DomainErrorKind> {
        match self {
            SourceError::Domain(err) => Some(err.kind),
            _ => None,
        }
    }

    pub fn not_found() -> Self {
        SourceError::Domain(DomainError::not_found())
    }
}

impl From<DomainErrorKind> for SourceError {
    fn from(kind: DomainErrorKind) -> Self {
        SourceError::Domain(kind.into())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::new(DomainErrorKind::BadRequest);
        assert_eq!(
            err.to_string(),
            "DATA_API_BAD_REQUEST: request executed with invalid parameters"
        );
    }

    #[test]
    fn test_source_error_kind() {
        let err: SourceError = DomainErrorKind::Unavailable.into();
        assert_eq!(err.kind(), Some(DomainErrorKind::Unavailable));
        assert_eq!(SourceError::Parse("x".into()).kind(), None);
        assert_eq!(
            SourceError::not_found().to_string(),
            "DATA_API_NOT_FOUND_DATA: data service found no matching data"
        );
    }
}
