//! # Articles Searcher
//!
//! One normalized contract over several bibliographic-metadata providers:
//! "find one article by identifier", "find articles matching a query", plus
//! provider-specific enrichments such as author-affiliation resolution,
//! citing documents and journal quartiles.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Generic queries, JSON-like articles and route tables
//! - [`sources`]: Provider adapters behind the [`ArticleSource`] trait, the
//!   [`SourceRegistry`] and the affiliation aggregator
//! - [`service`]: The [`ServiceFacade`] and its HTTP server
//! - [`utils`]: Transport, error classification, query encoding and XML
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod service;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Article, Query};
pub use service::ServiceFacade;
pub use sources::{ArticleSource, DomainError, DomainErrorKind, SourceError, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
