//! Query codec: generic field/value queries to provider-native query strings.

use crate::models::Query;
use crate::sources::SourceError;

/// How a generic field is written in the provider's grammar
#[derive(Debug, Clone, Copy)]
pub enum FieldFormat {
    /// `native=value`
    Native(&'static str),
    /// A formatting function producing the whole term, e.g. `TITLE("value")`
    Format(fn(&str) -> String),
}

/// Token joining encoded terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    /// `a=1&b=2`
    Ampersand,
    /// `A("1") AND B("2")`
    And,
}

impl Conjunction {
    pub fn token(&self) -> &'static str {
        match self {
            Conjunction::Ampersand => "&",
            Conjunction::And => " AND ",
        }
    }
}

/// One encoded query term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Pair(&'static str, String),
    Formatted(String),
}

impl Term {
    fn render(&self) -> String {
        match self {
            Term::Pair(name, value) => format!("{}={}", name, value),
            Term::Formatted(term) => term.clone(),
        }
    }
}

/// Immutable per-adapter mapping from generic field names to native syntax
#[derive(Debug, Clone, Copy)]
pub struct QueryScheme {
    fields: &'static [(&'static str, FieldFormat)],
    conjunction: Conjunction,
}

impl QueryScheme {
    pub const fn new(fields: &'static [(&'static str, FieldFormat)], conjunction: Conjunction) -> Self {
        Self {
            fields,
            conjunction,
        }
    }

    pub fn lookup(&self, field: &str) -> Option<FieldFormat> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, format)| *format)
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    /// Check that every allow-listed field has a scheme entry.
    ///
    /// Adapters call this at construction so a missing entry never surfaces
    /// at request time.
    pub fn validate(&self, allowed: &[&str]) -> Result<(), SourceError> {
        match allowed.iter().find(|field| self.lookup(field).is_none()) {
            Some(field) => Err(SourceError::Config(format!(
                "allowed query field '{}' has no native mapping",
                field
            ))),
            None => Ok(()),
        }
    }

    /// Allow-listed terms of a query; unknown fields are dropped
    pub fn terms(&self, query: &Query, allowed: &[&str]) -> Vec<Term> {
        query
            .iter()
            .filter(|(field, _)| allowed.contains(field))
            .filter_map(|(field, value)| {
                self.lookup(field).map(|format| match format {
                    FieldFormat::Native(native) => Term::Pair(native, value.to_string()),
                    FieldFormat::Format(apply) => Term::Formatted(apply(value)),
                })
            })
            .collect()
    }
}

/// Encode a query into a provider-native, percent-encoded query string.
///
/// Terms are joined first and the result is percent-encoded once, so quotes
/// and parentheses introduced by formatting functions are encoded exactly
/// once. An empty filtered query encodes to an empty string.
pub fn encode(query: &Query, allowed: &[&str], scheme: &QueryScheme) -> String {
    let joined = scheme
        .terms(query, allowed)
        .iter()
        .map(Term::render)
        .collect::<Vec<_>>()
        .join(scheme.conjunction().token());

    percent_encode(&joined)
}

const QUERY_BASE: &str = "http://query.invalid/";

/// Percent-encode a raw query string with URI query rules.
///
/// Reserved separators (`&`, `=`, `(`, `)`) are kept; spaces, quotes and
/// other unsafe characters are escaped. A literal `%` becomes `%25`, so
/// values never reach the provider pre-decoded.
pub fn percent_encode(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let raw = raw.replace('%', "%25");
    url::Url::parse(QUERY_BASE)
        .map(|mut url| {
            url.set_query(Some(&raw));
            url.query().unwrap_or_default().to_string()
        })
        .unwrap_or(raw)
}
