//! Author/affiliation graph reconstruction.
//!
//! Abstract-retrieval records list affiliations and authors as sibling
//! collections. Authors only carry references (`{"@id": ...}`, one or many)
//! into the affiliation collection, so rebuilding "author with
//! affiliations" means joining by identifier, optionally after fetching
//! every affiliation's full record.

use async_trait::async_trait;
use futures_util::future::try_join_all;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{field_text, one_or_many, text_of};
use crate::sources::SourceError;

/// Provider calls the aggregator depends on
#[async_trait]
pub trait AffiliationFetcher: Send + Sync {
    /// Abstract-retrieval record of an article, `None` when the provider has
    /// no author/affiliation data for it
    async fn fetch_record(&self, article_id: &str) -> Result<Option<Value>, SourceError>;

    /// Full record of one affiliation
    async fn fetch_affiliation(&self, affiliation_id: &str) -> Result<Value, SourceError>;
}

/// Resolves authors' affiliation references against affiliation records
pub struct AffiliationAggregator<'a> {
    fetcher: &'a dyn AffiliationFetcher,
    fan_out_limit: Option<usize>,
}

impl<'a> AffiliationAggregator<'a> {
    pub fn new(fetcher: &'a dyn AffiliationFetcher) -> Self {
        Self {
            fetcher,
            fan_out_limit: None,
        }
    }

    /// Cap the number of concurrent full-record requests
    pub fn fan_out_limit(mut self, limit: Option<usize>) -> Self {
        self.fan_out_limit = limit;
        self
    }

    /// Authors of an article with their affiliation references replaced by
    /// the referenced records.
    ///
    /// With `full`, every affiliation is fetched concurrently and the call
    /// waits for all of them; one failed fetch fails the whole call. A
    /// reference to an affiliation the record does not list is
    /// [`SourceError::UnresolvedAffiliation`].
    pub async fn resolve(&self, article_id: &str, full: bool) -> Result<Vec<Value>, SourceError> {
        let Some(record) = self.fetcher.fetch_record(article_id).await? else {
            return Ok(Vec::new());
        };

        let summaries = one_or_many(record.get("affiliation"));
        let authors = one_or_many(record.get("authors").and_then(|a| a.get("author")));

        let affiliations = if full {
            self.fetch_full(&summaries).await?
        } else {
            summaries
                .iter()
                .filter_map(|s| affiliation_id(s).map(|id| (id, (*s).clone())))
                .collect()
        };

        authors
            .into_iter()
            .map(|author| resolve_author(author, &affiliations))
            .collect()
    }

    async fn fetch_full(&self, summaries: &[&Value]) -> Result<HashMap<String, Value>, SourceError> {
        let mut ids: Vec<String> = Vec::new();
        for id in summaries.iter().filter_map(|s| affiliation_id(s)) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        tracing::debug!(count = ids.len(), limit = ?self.fan_out_limit, "fetching full affiliations");

        let requests: Vec<_> = ids
            .iter()
            .map(|id| self.fetcher.fetch_affiliation(id))
            .collect();
        let records: Vec<Value> = match self.fan_out_limit {
            None => try_join_all(requests).await?,
            Some(limit) => {
                stream::iter(requests)
                    .buffered(limit.max(1))
                    .try_collect()
                    .await?
            }
        };

        Ok(ids.into_iter().zip(records).collect())
    }
}

fn affiliation_id(value: &Value) -> Option<String> {
    field_text(value, "@id").or_else(|| match value {
        Value::String(_) | Value::Number(_) => text_of(value),
        _ => None,
    })
}

fn author_label(author: &Value) -> String {
    field_text(author, "ce:indexed-name")
        .or_else(|| field_text(author, "@auid"))
        .unwrap_or_else(|| "unknown author".to_string())
}

fn resolve_author(author: &Value, affiliations: &HashMap<String, Value>) -> Result<Value, SourceError> {
    let mut resolved = Vec::new();
    for reference in one_or_many(author.get("affiliation")) {
        let id = affiliation_id(reference).ok_or_else(|| {
            SourceError::Parse(format!(
                "affiliation reference of '{}' has no id",
                author_label(author)
            ))
        })?;
        let record = affiliations
            .get(&id)
            .ok_or_else(|| SourceError::UnresolvedAffiliation {
                author: author_label(author),
                affiliation: id.clone(),
            })?;
        resolved.push(record.clone());
    }

    let mut author = author.clone();
    let Value::Object(fields) = &mut author else {
        return Err(SourceError::Parse("author entry is not an object".to_string()));
    };
    fields.insert("affiliation".to_string(), Value::Array(resolved));
    Ok(author)
}
