//! eLibrary RISC library index adapter.
//!
//! The NEB API is a single endpoint; a numeric service id (`sid`) selects
//! the operation and every response is an XML document.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::RiscConfig;
use crate::models::{one_or_many, text_of, Article, Operation, Query, Route, RouteParams};
use crate::sources::{
    ArticleSource, DomainError, DomainErrorKind, SourceCapabilities, SourceError,
};
use crate::utils::{
    encode, fetch_text, parse_xml, Conjunction, FieldFormat, QueryScheme, Transport,
    TransportRequest,
};

/// Service ids of the NEB API
mod sid {
    pub const GET_ITEMS: &str = "011";
    pub const GET_AUTHORS: &str = "013";
    pub const FIND_AUTHOR: &str = "018";
    pub const GET_AUTHOR_METADATA: &str = "024";
    pub const GET_ITEM_METADATA: &str = "026";
}

const ARTICLE_QUERY: &[&str] = &["authorid", "titleid", "orgid", "year"];

const AUTHOR_QUERY: &[&str] = &[
    "spin",
    "authorid",
    "name",
    "lastName",
    "firstName",
    "initials",
    "country",
    "countryCode",
    "city",
    "orgName",
];

const QUERY_SCHEME: QueryScheme = QueryScheme::new(
    &[
        ("authorid", FieldFormat::Native("authorid")),
        ("titleid", FieldFormat::Native("titleid")),
        ("orgid", FieldFormat::Native("orgid")),
        ("year", FieldFormat::Native("yearpubl")),
        ("spin", FieldFormat::Native("spin")),
        ("name", FieldFormat::Native("au")),
        ("lastName", FieldFormat::Native("aulast")),
        ("firstName", FieldFormat::Native("aufirst")),
        ("initials", FieldFormat::Native("auinit")),
        ("country", FieldFormat::Native("co")),
        ("countryCode", FieldFormat::Native("cc")),
        ("city", FieldFormat::Native("city")),
        ("orgName", FieldFormat::Native("inst")),
    ],
    Conjunction::Ampersand,
);

const ROUTES: &[Route] = &[
    Route::new("/article/*", Operation::FindArticle),
    Route::new("/articles", Operation::FindArticles),
    Route::new("/orgAuthors/*", Operation::OrgAuthors),
    Route::new("/author/*", Operation::Author),
    Route::new("/authors", Operation::Authors),
];

/// eLibrary RISC research source
#[derive(Debug, Clone)]
pub struct RiscSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    user_code: String,
}

impl RiscSource {
    pub fn new(config: &RiscConfig, transport: Arc<dyn Transport>) -> Result<Self, SourceError> {
        let user_code = config
            .user_code
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SourceError::Config("RISC requires risc.user_code".to_string()))?;
        QUERY_SCHEME.validate(ARTICLE_QUERY)?;
        QUERY_SCHEME.validate(AUTHOR_QUERY)?;

        Ok(Self {
            transport,
            base_url: config.base_url.clone(),
            user_code,
        })
    }

    /// URL of one NEB command; `params` is already encoded
    pub fn command_url(&self, sid: &str, params: &str) -> String {
        let mut url = format!(
            "{}?ucode={}&sid={}",
            self.base_url,
            urlencoding::encode(&self.user_code),
            sid
        );
        if !params.is_empty() {
            url.push('&');
            url.push_str(params);
        }
        url
    }

    async fn command(&self, sid: &str, params: &str) -> Result<Value, SourceError> {
        let url = self.command_url(sid, params);
        let body = fetch_text(self.transport.as_ref(), TransportRequest::get(url)).await?;
        let data = parse_xml(&body)?;
        reject_on_error(&data)?;
        Ok(data)
    }

    /// Authors affiliated with an organisation
    pub async fn find_org_authors(&self, orgid: &str) -> Result<Vec<Value>, SourceError> {
        tracing::debug!(provider = "risc", orgid, "find organisation authors");
        let params = format!("orgid={}", urlencoding::encode(orgid));
        let data = self.command(sid::GET_AUTHORS, &params).await?;
        Ok(collect(&data, "authors", "author"))
    }

    /// Metadata of one author
    pub async fn find_author(&self, authorid: &str) -> Result<Value, SourceError> {
        tracing::debug!(provider = "risc", authorid, "find author");
        let params = format!("authorid={}", urlencoding::encode(authorid));
        let data = self.command(sid::GET_AUTHOR_METADATA, &params).await?;
        first(&data, "authors", "author").ok_or_else(SourceError::not_found)
    }

    /// Authors matching a query over the author allow-list
    pub async fn find_authors(&self, query: &Query) -> Result<Vec<Value>, SourceError> {
        tracing::debug!(provider = "risc", fields = query.len(), "find authors");
        let params = encode(query, AUTHOR_QUERY, &QUERY_SCHEME);
        let data = self.command(sid::FIND_AUTHOR, &params).await?;
        Ok(collect(&data, "authors", "author"))
    }
}

/// An `<error>` element in a response is a refusal with the provider's message
fn reject_on_error(data: &Value) -> Result<(), SourceError> {
    let Some(error) = data.get("error") else {
        return Ok(());
    };
    let message = text_of(error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DomainErrorKind::Rejected.message().to_string());
    Err(DomainError {
        kind: DomainErrorKind::Rejected,
        message,
    }
    .into())
}

/// Elements named `element`, either at the top level or inside `container`
fn collect(data: &Value, container: &str, element: &str) -> Vec<Value> {
    let found = data
        .get(container)
        .and_then(|c| c.get(element))
        .or_else(|| data.get(element));
    one_or_many(found).into_iter().cloned().collect()
}

fn first(data: &Value, container: &str, element: &str) -> Option<Value> {
    collect(data, container, element).into_iter().next()
}

#[async_trait]
impl ArticleSource for RiscSource {
    fn id(&self) -> &str {
        "risc"
    }

    fn name(&self) -> &str {
        "eLibrary RISC"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::FIND_ARTICLE
            | SourceCapabilities::FIND_ARTICLES
            | SourceCapabilities::AUTHORS
    }

    fn routes(&self) -> &'static [Route] {
        ROUTES
    }

    async fn find_article(&self, id: &str) -> Result<Article, SourceError> {
        tracing::debug!(provider = "risc", itemid = id, "find article");
        let params = format!("itemid={}", urlencoding::encode(id));
        let data = self.command(sid::GET_ITEM_METADATA, &params).await?;
        first(&data, "items", "item").ok_or_else(SourceError::not_found)
    }

    async fn find_articles(&self, query: &Query) -> Result<Vec<Article>, SourceError> {
        tracing::debug!(provider = "risc", fields = query.len(), "find articles");
        let params = encode(query, ARTICLE_QUERY, &QUERY_SCHEME);
        let data = self.command(sid::GET_ITEMS, &params).await?;
        Ok(collect(&data, "items", "item"))
    }

    async fn enrich(&self, operation: Operation, params: &RouteParams) -> Result<Article, SourceError> {
        match operation {
            Operation::OrgAuthors => Ok(Value::Array(
                self.find_org_authors(params.require_tail()?).await?,
            )),
            Operation::Author => self.find_author(params.require_tail()?).await,
            Operation::Authors => Ok(Value::Array(self.find_authors(&params.query).await?)),
            _ => Err(SourceError::NotImplemented),
        }
    }
}
