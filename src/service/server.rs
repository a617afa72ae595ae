//! HTTP surface of the facade.

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::ServiceFacade;

/// Build the axum application; every GET is delegated to the facade
pub fn router(facade: ServiceFacade) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(Arc::new(facade))
        .layer(TraceLayer::new_for_http())
}

async fn handle(State(facade): State<Arc<ServiceFacade>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let response = facade
        .dispatch(uri.path(), uri.query().unwrap_or_default())
        .await;
    (
        response.status(),
        [(header::CONTENT_TYPE, response.content_type())],
        response.body(),
    )
        .into_response()
}

/// Serve the facade until the process is stopped
pub async fn serve(facade: ServiceFacade, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(facade)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Query};
    use crate::sources::{ArticleSource, SourceError, SourceRegistry};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct FixedSource;

    #[async_trait]
    impl ArticleSource for FixedSource {
        fn id(&self) -> &str {
            "fixed"
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        async fn find_article(&self, id: &str) -> Result<Article, SourceError> {
            if id == "gone" {
                return Err(SourceError::not_found());
            }
            Ok(serde_json::json!({ "id": id }))
        }

        async fn find_articles(&self, _query: &Query) -> Result<Vec<Article>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn app() -> Router {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(FixedSource));
        router(ServiceFacade::new(Arc::new(registry)))
    }

    async fn get(uri: &str) -> (StatusCode, String, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_article_as_json() {
        let (status, content_type, body) = get("/fixed/article/10.1000/182").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/json");
        assert_eq!(body, r#"{"id":"10.1000/182"}"#);
    }

    #[tokio::test]
    async fn test_empty_search_is_empty_list() {
        let (status, _, body) = get("/fixed/articles?title=nothing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_domain_error_is_text() {
        let (status, content_type, body) = get("/fixed/article/gone").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body, "DATA_API_NOT_FOUND_DATA: data service found no matching data");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (status, _, _) = get("/missing/article/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_only_get_is_served() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/fixed/articles")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
