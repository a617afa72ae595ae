//! Scopus abstract and citation index adapter.
//!
//! Uses the Elsevier Scopus APIs: boolean predicate queries
//! (`TITLE("x") AND AUTHORS("y")`), an `apiKey` query parameter and JSON
//! responses. Besides search it resolves author affiliations, citing
//! documents and journal quartiles.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ScopusConfig;
use crate::models::{field_text, one_or_many, Article, Operation, Query, Route, RouteParams};
use crate::sources::{
    AffiliationAggregator, AffiliationFetcher, ArticleSource, DomainErrorKind, SourceCapabilities,
    SourceError,
};
use crate::utils::{
    encode, fetch_json, percent_encode, Conjunction, FieldFormat, QueryScheme, Transport,
    TransportRequest,
};

const ALLOWED_QUERY: &[&str] = &["title", "authors", "keywords", "affiliation"];

fn predicate(name: &str, value: &str) -> String {
    format!("{}(\"{}\")", name, value)
}

fn title(value: &str) -> String {
    predicate("TITLE", value)
}

fn authors(value: &str) -> String {
    predicate("AUTHORS", value)
}

fn keywords(value: &str) -> String {
    predicate("KEYWORDS", value)
}

fn affiliation(value: &str) -> String {
    predicate("AFFIL", value)
}

const QUERY_SCHEME: QueryScheme = QueryScheme::new(
    &[
        ("title", FieldFormat::Format(title)),
        ("authors", FieldFormat::Format(authors)),
        ("keywords", FieldFormat::Format(keywords)),
        ("affiliation", FieldFormat::Format(affiliation)),
    ],
    Conjunction::And,
);

const ROUTES: &[Route] = &[
    Route::new("/article/*", Operation::FindArticle),
    Route::new("/articles", Operation::FindArticles),
    Route::new("/affiliations/*", Operation::Affiliations),
    Route::new("/full/affiliations/*", Operation::FullAffiliations),
    Route::new("/citing", Operation::Citing),
    Route::new("/quartile/*", Operation::Quartile),
];

/// Field added to an article when the journal quartile is known
pub const QUARTILE_FIELD: &str = "publisherQuartile";

/// Bucket a 0-100 citation percentile into a quartile: `4 - floor(p / 25)`.
///
/// 0-24.9 is quartile 4 and 75-99.9 is quartile 1; exactly 100 yields 0.
pub fn quartile_from_percentile(percentile: f64) -> i64 {
    4 - (percentile / 25.0).floor() as i64
}

/// Scopus research source
#[derive(Debug, Clone)]
pub struct ScopusSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    rows: usize,
    api_key: String,
    fan_out_limit: Option<usize>,
}

impl ScopusSource {
    pub fn new(config: &ScopusConfig, transport: Arc<dyn Transport>) -> Result<Self, SourceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SourceError::Config("Scopus requires scopus.api_key".to_string()))?;
        QUERY_SCHEME.validate(ALLOWED_QUERY)?;

        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rows: config.rows,
            api_key,
            fan_out_limit: config.fan_out_limit,
        })
    }

    async fn get_json(&self, url: String) -> Result<Value, SourceError> {
        let request = TransportRequest::get(url).header("Accept", "application/json");
        fetch_json(self.transport.as_ref(), request).await
    }

    fn search_url(&self, query: &str, start: Option<usize>) -> String {
        let mut url = format!(
            "{}/search/scopus?apiKey={}&count={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            self.rows
        );
        if let Some(start) = start {
            url.push_str(&format!("&start={}", start));
        }
        url.push_str("&query=");
        url.push_str(query);
        url
    }

    /// URL of the search for a generic query; `None` when no field survives the allow-list
    pub fn articles_url(&self, query: &Query) -> Option<String> {
        let encoded = encode(query, ALLOWED_QUERY, &QUERY_SCHEME);
        (!encoded.is_empty()).then(|| self.search_url(&encoded, None))
    }

    /// The search entry for a DOI, without enrichment
    async fn find_entry(&self, doi: &str) -> Result<Value, SourceError> {
        let query = percent_encode(&predicate("DOI", doi));
        let data = self.get_json(self.search_url(&query, None)).await?;
        search_entries(data)
            .into_iter()
            .next()
            .ok_or_else(SourceError::not_found)
    }

    /// Journal quartile from the serial title's citation percentile.
    ///
    /// `None` when the journal has no current metric.
    pub async fn journal_quartile(&self, issn: &str) -> Result<Option<i64>, SourceError> {
        let url = format!(
            "{}/serial/title/issn/{}?apiKey={}",
            self.base_url,
            urlencoding::encode(issn),
            urlencoding::encode(&self.api_key)
        );
        let data = self.get_json(url).await?;
        let percentile = one_or_many(
            data.get("serial-metadata-response")
                .and_then(|r| r.get("entry")),
        )
        .first()
        .and_then(|entry| entry.get("citeScoreYearInfoList"))
        .and_then(|info| field_text(info, "citeScoreCurrentMetric"))
        .and_then(|metric| metric.trim().parse::<f64>().ok());

        Ok(percentile.map(quartile_from_percentile))
    }

    /// Quartile lookup where only a missing or unreachable metric is tolerated
    async fn try_quartile(&self, issn: &str) -> Result<Option<i64>, SourceError> {
        match self.journal_quartile(issn).await {
            Err(SourceError::Domain(err)) => {
                tracing::warn!(provider = "scopus", issn, error = %err, "quartile lookup failed");
                Ok(None)
            }
            other => other,
        }
    }

    /// Documents whose reference lists include the article
    pub async fn find_citing(&self, doi: &str, start: usize) -> Result<Vec<Article>, SourceError> {
        let entry = self.find_entry(doi).await?;
        let eid = field_text(&entry, "eid").ok_or_else(SourceError::not_found)?;
        let query = percent_encode(&predicate("REFEID", &eid));
        let data = self.get_json(self.search_url(&query, Some(start))).await?;
        Ok(search_entries(data))
    }

    /// Authors of an article with resolved affiliations
    pub async fn find_affiliations(&self, doi: &str, full: bool) -> Result<Vec<Value>, SourceError> {
        AffiliationAggregator::new(self)
            .fan_out_limit(self.fan_out_limit)
            .resolve(doi, full)
            .await
    }

    fn with_api_key(&self, href: &str) -> String {
        let separator = if href.contains('?') { '&' } else { '?' };
        format!(
            "{}{}apiKey={}",
            href,
            separator,
            urlencoding::encode(&self.api_key)
        )
    }
}

/// Entries of a `search-results` envelope.
///
/// Scopus reports zero results as `opensearch:totalResults = "0"` with a
/// single `{"error": "Result set was empty"}` entry; both are treated as
/// an empty result set.
fn search_entries(mut data: Value) -> Vec<Value> {
    let Some(results) = data.get_mut("search-results") else {
        return Vec::new();
    };
    if field_text(results, "opensearch:totalResults").as_deref() == Some("0") {
        return Vec::new();
    }
    let entries = match results.get_mut("entry").map(Value::take) {
        Some(Value::Array(entries)) => entries,
        None | Some(Value::Null) => Vec::new(),
        Some(entry) => vec![entry],
    };
    entries
        .into_iter()
        .filter(|entry| entry.get("error").is_none())
        .collect()
}

#[async_trait]
impl AffiliationFetcher for ScopusSource {
    async fn fetch_record(&self, article_id: &str) -> Result<Option<Value>, SourceError> {
        let entry = self.find_entry(article_id).await?;
        let href = one_or_many(entry.get("link"))
            .into_iter()
            .find(|link| field_text(link, "@ref").as_deref() == Some("author-affiliation"))
            .and_then(|link| field_text(link, "@href"));

        let Some(href) = href else {
            tracing::debug!(provider = "scopus", doi = article_id, "no author-affiliation link");
            return Ok(None);
        };

        let mut data = self.get_json(self.with_api_key(&href)).await?;
        data.get_mut("abstracts-retrieval-response")
            .map(|record| Some(record.take()))
            .ok_or_else(|| {
                SourceError::Parse("Scopus response has no abstracts-retrieval-response".to_string())
            })
    }

    async fn fetch_affiliation(&self, affiliation_id: &str) -> Result<Value, SourceError> {
        let url = format!(
            "{}/affiliation/affiliation_id/{}?apiKey={}",
            self.base_url,
            urlencoding::encode(affiliation_id),
            urlencoding::encode(&self.api_key)
        );
        let mut data = self.get_json(url).await?;
        Ok(match data.get_mut("affiliation-retrieval-response") {
            Some(record) => record.take(),
            None => data,
        })
    }
}

#[async_trait]
impl ArticleSource for ScopusSource {
    fn id(&self) -> &str {
        "scopus"
    }

    fn name(&self) -> &str {
        "Scopus"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FIND_ARTICLE
            | SourceCapabilities::FIND_ARTICLES
            | SourceCapabilities::AFFILIATIONS
            | SourceCapabilities::FULL_AFFILIATIONS
            | SourceCapabilities::CITATIONS
            | SourceCapabilities::QUARTILE
    }

    fn routes(&self) -> &'static [Route] {
        ROUTES
    }

    async fn find_article(&self, id: &str) -> Result<Article, SourceError> {
        tracing::debug!(provider = "scopus", doi = id, "find article");
        let mut entry = self.find_entry(id).await?;

        let issn = field_text(&entry, "prism:issn").or_else(|| field_text(&entry, "prism:eIssn"));
        if let Some(issn) = issn {
            if let Some(quartile) = self.try_quartile(&issn).await? {
                if let Value::Object(fields) = &mut entry {
                    fields.insert(QUARTILE_FIELD.to_string(), Value::String(quartile.to_string()));
                }
            }
        }

        Ok(entry)
    }

    async fn find_articles(&self, query: &Query) -> Result<Vec<Article>, SourceError> {
        tracing::debug!(provider = "scopus", fields = query.len(), "find articles");
        // Scopus rejects a search without predicates
        let url = self
            .articles_url(query)
            .ok_or(SourceError::from(DomainErrorKind::BadRequest))?;
        let data = self.get_json(url).await?;
        Ok(search_entries(data))
    }

    async fn enrich(&self, operation: Operation, params: &RouteParams) -> Result<Article, SourceError> {
        match operation {
            Operation::Affiliations => Ok(Value::Array(
                self.find_affiliations(params.require_tail()?, false).await?,
            )),
            Operation::FullAffiliations => Ok(Value::Array(
                self.find_affiliations(params.require_tail()?, true).await?,
            )),
            Operation::Citing => {
                let doi = params
                    .query
                    .get("doi")
                    .ok_or(SourceError::from(DomainErrorKind::BadRequest))?;
                let start = match params.query.get("start") {
                    Some(start) => start
                        .parse::<usize>()
                        .map_err(|_| SourceError::from(DomainErrorKind::BadRequest))?,
                    None => 0,
                };
                Ok(Value::Array(self.find_citing(doi, start).await?))
            }
            Operation::Quartile => {
                let quartile = self.journal_quartile(params.require_tail()?).await?;
                Ok(quartile.map(Value::from).unwrap_or(Value::Bool(false)))
            }
            _ => Err(SourceError::NotImplemented),
        }
    }
}
