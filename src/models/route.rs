//! Static route declarations for provider operations.

use super::Query;

/// An operation a provider can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindArticle,
    FindArticles,
    /// Authors with their affiliation summaries
    Affiliations,
    /// Authors with fully fetched affiliation records
    FullAffiliations,
    /// Documents citing an article
    Citing,
    /// Journal quartile for an ISSN
    Quartile,
    /// Authors belonging to an organisation
    OrgAuthors,
    /// Metadata of a single author
    Author,
    /// Author search
    Authors,
}

/// A route relative to the provider prefix.
///
/// Patterns ending in `/*` capture the whole remaining path (identifiers
/// such as DOIs contain slashes); other patterns match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub pattern: &'static str,
    pub operation: Operation,
}

impl Route {
    pub const fn new(pattern: &'static str, operation: Operation) -> Self {
        Self { pattern, operation }
    }

    /// Match a provider-relative path.
    ///
    /// Returns the captured tail for wildcard routes, `Some(None)` for exact
    /// matches and `None` otherwise. An empty wildcard capture does not match.
    pub fn matches<'a>(&self, path: &'a str) -> Option<Option<&'a str>> {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => path
                .strip_prefix(prefix)
                .filter(|tail| !tail.is_empty())
                .map(Some),
            None => {
                let path = path.trim_end_matches('/');
                (path == self.pattern).then_some(None)
            }
        }
    }
}

/// Parameters extracted from a matched route
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    /// Wildcard capture, e.g. the DOI of `/article/*`
    pub tail: Option<String>,
    /// Query string parameters
    pub query: Query,
}

impl RouteParams {
    pub fn new(tail: Option<String>, query: Query) -> Self {
        Self { tail, query }
    }

    pub fn with_tail(tail: impl Into<String>) -> Self {
        Self {
            tail: Some(tail.into()),
            query: Query::new(),
        }
    }

    pub fn with_query(query: Query) -> Self {
        Self { tail: None, query }
    }

    /// Wildcard capture, or an unclassified `SourceError::Request` when the
    /// route captured nothing
    pub fn require_tail(&self) -> Result<&str, crate::sources::SourceError> {
        self.tail.as_deref().ok_or_else(|| {
            crate::sources::SourceError::Request("route requires an identifier".to_string())
        })
    }
}
