//! CrossRef DOI registry adapter.
//!
//! Uses the CrossRef REST API: flat `key=value` queries against `/works`,
//! JSON responses wrapped in a `message` envelope.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::CrossRefConfig;
use crate::models::{one_or_many, Article, Operation, Query, Route, RouteParams};
use crate::sources::{ArticleSource, SourceCapabilities, SourceError};
use crate::utils::{
    encode, fetch_json, Conjunction, FieldFormat, QueryScheme, Transport, TransportRequest,
};

const ALLOWED_QUERY: &[&str] = &["query", "author", "bibliographic", "affiliation"];

const QUERY_SCHEME: QueryScheme = QueryScheme::new(
    &[
        ("query", FieldFormat::Native("query")),
        ("author", FieldFormat::Native("query.author")),
        ("bibliographic", FieldFormat::Native("query.bibliographic")),
        ("affiliation", FieldFormat::Native("query.affiliation")),
    ],
    Conjunction::Ampersand,
);

const ROUTES: &[Route] = &[
    Route::new("/article/*", Operation::FindArticle),
    Route::new("/articles", Operation::FindArticles),
    Route::new("/affiliations/*", Operation::Affiliations),
];

/// CrossRef research source
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    rows: usize,
    user_agent: String,
}

impl CrossRefSource {
    /// Create the adapter; `mail_to` is required by the CrossRef etiquette
    pub fn new(config: &CrossRefConfig, transport: Arc<dyn Transport>) -> Result<Self, SourceError> {
        let mail_to = config
            .mail_to
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| SourceError::Config("CrossRef requires crossref.mail_to".to_string()))?;
        QUERY_SCHEME.validate(ALLOWED_QUERY)?;

        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rows: config.rows,
            user_agent: format!(
                "{}/{} (mailto:{})",
                config.agent_name, config.agent_version, mail_to
            ),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn request(&self, url: String) -> TransportRequest {
        TransportRequest::get(url).header("User-Agent", self.user_agent.as_str())
    }

    /// URL of the `/works` search for a query
    pub fn articles_url(&self, query: &Query) -> String {
        let encoded = encode(query, ALLOWED_QUERY, &QUERY_SCHEME);
        if encoded.is_empty() {
            format!("{}?rows={}", self.base_url, self.rows)
        } else {
            format!("{}?rows={}&{}", self.base_url, self.rows, encoded)
        }
    }

    async fn fetch_message(&self, url: String) -> Result<Value, SourceError> {
        let mut envelope: Value = fetch_json(self.transport.as_ref(), self.request(url)).await?;
        match envelope.get_mut("message") {
            Some(message) => Ok(message.take()),
            None => Err(SourceError::Parse(
                "CrossRef response has no message".to_string(),
            )),
        }
    }

    /// Contributors of a work paired with their inferred institutions
    pub async fn find_affiliations(&self, doi: &str) -> Result<Vec<Value>, SourceError> {
        let work = self.find_article(doi).await?;
        let contributors: Vec<Value> = one_or_many(work.get("author"))
            .into_iter()
            .cloned()
            .collect();
        Ok(pair_contributors(&contributors))
    }
}

#[async_trait]
impl ArticleSource for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FIND_ARTICLE
            | SourceCapabilities::FIND_ARTICLES
            | SourceCapabilities::AFFILIATIONS
    }

    fn routes(&self) -> &'static [Route] {
        ROUTES
    }

    async fn find_article(&self, id: &str) -> Result<Article, SourceError> {
        tracing::debug!(provider = "crossref", doi = id, "find article");
        let url = format!("{}/{}", self.base_url, urlencoding::encode(id));
        self.fetch_message(url).await
    }

    async fn find_articles(&self, query: &Query) -> Result<Vec<Article>, SourceError> {
        tracing::debug!(provider = "crossref", fields = query.len(), "find articles");
        let mut message = self.fetch_message(self.articles_url(query)).await?;
        match message.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Ok(vec![other]),
        }
    }

    async fn enrich(&self, operation: Operation, params: &RouteParams) -> Result<Article, SourceError> {
        match operation {
            Operation::Affiliations => {
                let doi = params.require_tail()?;
                Ok(Value::Array(self.find_affiliations(doi).await?))
            }
            _ => Err(SourceError::NotImplemented),
        }
    }
}

fn is_person(contributor: &Value) -> bool {
    contributor.get("given").is_some()
}

fn is_institution(contributor: &Value) -> bool {
    !is_person(contributor) && contributor.get("name").is_some()
}

fn is_first_author(contributor: &Value) -> bool {
    contributor.get("sequence").and_then(Value::as_str) == Some("first")
}

/// Pair people with institutions by list position.
///
/// CrossRef lists organisations as contributors next to people, with no
/// link between them. Contributors with a `given` name are people; those
/// with only an organisation `name` are institutions. Each person gets the
/// nearest institution listed before them; a first author with no
/// preceding institution gets the first institution in the list; anyone
/// else without a match gets an empty affiliation list. This relies on
/// publishers listing an institution before its members, which CrossRef
/// does not guarantee.
///
/// Returns the people only, each with `affiliation` replaced by the paired
/// institution (zero or one entries).
pub fn pair_contributors(contributors: &[Value]) -> Vec<Value> {
    contributors
        .iter()
        .enumerate()
        .filter(|(_, contributor)| is_person(contributor))
        .map(|(position, person)| {
            let institution = contributors[..position]
                .iter()
                .rev()
                .find(|c| is_institution(c))
                .or_else(|| {
                    if is_first_author(person) {
                        contributors.iter().find(|c| is_institution(c))
                    } else {
                        None
                    }
                });

            let mut person = person.clone();
            if let Value::Object(fields) = &mut person {
                fields.insert(
                    "affiliation".to_string(),
                    Value::Array(institution.cloned().into_iter().collect()),
                );
            }
            person
        })
        .collect()
}
