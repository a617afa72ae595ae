//! Service facade: maps `/<provider>/<route>` requests onto adapter calls.
//!
//! Every provider is mounted under its id. The facade owns no protocol
//! logic; it resolves the provider, matches the provider's static route
//! table and renders the outcome:
//!
//! - success: the article(s) as JSON
//! - [`DomainError`](crate::sources::DomainError): `"<code>: <message>"` text
//!   with a success status
//! - any other failure: a generic server error (details are only logged)
//! - unknown provider or route: not found

mod server;

pub use server::{router, serve};

use std::borrow::Cow;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;

use crate::models::{Operation, Query, RouteParams};
use crate::sources::{ArticleSource, SourceError, SourceRegistry};

const SERVER_ERROR: &str = "Internal Server Error";

/// Rendered outcome of a facade request
#[derive(Debug, Clone, PartialEq)]
pub enum FacadeResponse {
    Json(Value),
    /// Plain text, used for banners and rendered domain errors
    Text(String),
    NotFound,
    ServerError,
}

impl FacadeResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            FacadeResponse::Json(_) | FacadeResponse::Text(_) => StatusCode::OK,
            FacadeResponse::NotFound => StatusCode::NOT_FOUND,
            FacadeResponse::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> String {
        match self {
            FacadeResponse::Json(value) => value.to_string(),
            FacadeResponse::Text(text) => text.clone(),
            FacadeResponse::NotFound => "Not Found".to_string(),
            FacadeResponse::ServerError => SERVER_ERROR.to_string(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FacadeResponse::Json(_) => "application/json",
            _ => "text/plain; charset=utf-8",
        }
    }
}

/// Routes requests to the registered provider adapters
#[derive(Debug, Clone)]
pub struct ServiceFacade {
    registry: Arc<SourceRegistry>,
}

impl ServiceFacade {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Handle `GET <path>?<raw_query>`
    pub async fn dispatch(&self, path: &str, raw_query: &str) -> FacadeResponse {
        let trimmed = path.trim_start_matches('/');
        let (provider, rest) = match trimmed.find('/') {
            Some(index) => trimmed.split_at(index),
            None => (trimmed, ""),
        };

        if provider.is_empty() {
            return FacadeResponse::Json(Value::from(
                self.registry.ids().map(String::from).collect::<Vec<_>>(),
            ));
        }

        let Some(source) = self.registry.get(provider) else {
            tracing::debug!(provider, "unknown provider");
            return FacadeResponse::NotFound;
        };

        if rest.trim_end_matches('/').is_empty() {
            return FacadeResponse::Text(format!("api-service: {}", source.name()));
        }

        let Some((operation, tail)) = source
            .routes()
            .iter()
            .find_map(|route| route.matches(rest).map(|tail| (route.operation, tail)))
        else {
            tracing::debug!(provider, path = rest, "no matching route");
            return FacadeResponse::NotFound;
        };

        let params = RouteParams::new(tail.map(decode_tail), Query::from_query_string(raw_query));
        tracing::debug!(provider, ?operation, "dispatching");

        render(provider, run(source.as_ref(), operation, &params).await)
    }
}

fn decode_tail(tail: &str) -> String {
    urlencoding::decode(tail)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| tail.to_string())
}

async fn run(
    source: &dyn ArticleSource,
    operation: Operation,
    params: &RouteParams,
) -> Result<Value, SourceError> {
    match operation {
        Operation::FindArticle => source.find_article(params.require_tail()?).await,
        Operation::FindArticles => Ok(Value::Array(source.find_articles(&params.query).await?)),
        other => source.enrich(other, params).await,
    }
}

fn render(provider: &str, result: Result<Value, SourceError>) -> FacadeResponse {
    match result {
        Ok(value) => FacadeResponse::Json(value),
        Err(SourceError::Domain(err)) => {
            tracing::debug!(provider, kind = %err.kind, "domain error");
            FacadeResponse::Text(err.to_string())
        }
        Err(err) => {
            tracing::error!(provider, error = %err, "request failed");
            FacadeResponse::ServerError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Route};
    use crate::sources::{DomainErrorKind, SourceCapabilities};
    use async_trait::async_trait;

    const ROUTES: &[Route] = &[
        Route::new("/article/*", Operation::FindArticle),
        Route::new("/articles", Operation::FindArticles),
        Route::new("/author/*", Operation::Author),
    ];

    /// Adapter answering from the request parameters
    #[derive(Debug)]
    struct EchoSource;

    #[async_trait]
    impl ArticleSource for EchoSource {
        fn id(&self) -> &str {
            "echo"
        }

        fn name(&self) -> &str {
            "Echo"
        }

        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities::FIND_ARTICLE | SourceCapabilities::FIND_ARTICLES
        }

        fn routes(&self) -> &'static [Route] {
            ROUTES
        }

        async fn find_article(&self, id: &str) -> Result<Article, SourceError> {
            match id {
                "missing" => Err(SourceError::not_found()),
                "broken" => Err(SourceError::Parse("unexpected payload".to_string())),
                _ => Ok(serde_json::json!({ "id": id })),
            }
        }

        async fn find_articles(&self, query: &Query) -> Result<Vec<Article>, SourceError> {
            if query.get("title") == Some("bad") {
                return Err(DomainErrorKind::BadRequest.into());
            }
            Ok(query
                .iter()
                .map(|(k, v)| serde_json::json!({ k: v }))
                .collect())
        }
    }

    fn facade() -> ServiceFacade {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(EchoSource));
        ServiceFacade::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_find_article_decodes_tail() {
        let response = facade().dispatch("/echo/article/10.1000%2F182", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response, FacadeResponse::Json(serde_json::json!({"id": "10.1000/182"})));
    }

    #[tokio::test]
    async fn test_find_articles_passes_query() {
        let response = facade()
            .dispatch("/echo/articles", "title=clean+code&year=2008")
            .await;
        assert_eq!(
            response.body(),
            r#"[{"title":"clean code"},{"year":"2008"}]"#
        );
        assert_eq!(response.content_type(), "application/json");
    }

    #[tokio::test]
    async fn test_domain_error_renders_as_text() {
        let response = facade().dispatch("/echo/article/missing", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.body(),
            "DATA_API_NOT_FOUND_DATA: data service found no matching data"
        );

        let response = facade().dispatch("/echo/articles", "title=bad").await;
        assert_eq!(
            response.body(),
            "DATA_API_BAD_REQUEST: request executed with invalid parameters"
        );
    }

    #[tokio::test]
    async fn test_unclassified_error_is_server_error() {
        let response = facade().dispatch("/echo/article/broken", "").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body().contains("unexpected payload"));
    }

    #[tokio::test]
    async fn test_operation_without_implementation_is_server_error() {
        let response = facade().dispatch("/echo/author/1", "").await;
        assert_eq!(response, FacadeResponse::ServerError);
    }

    #[tokio::test]
    async fn test_unknown_provider_and_route() {
        assert_eq!(facade().dispatch("/nope/article/1", "").await, FacadeResponse::NotFound);
        assert_eq!(facade().dispatch("/echo/unknown", "").await, FacadeResponse::NotFound);
        assert_eq!(facade().dispatch("/echo/article/", "").await, FacadeResponse::NotFound);
    }

    #[tokio::test]
    async fn test_banner_and_index() {
        assert_eq!(
            facade().dispatch("/echo/", "").await,
            FacadeResponse::Text("api-service: Echo".to_string())
        );
        assert_eq!(
            facade().dispatch("/", "").await,
            FacadeResponse::Json(serde_json::json!(["echo"]))
        );
    }
}
