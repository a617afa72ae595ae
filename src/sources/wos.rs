//! Web of Science Links AMR adapter.
//!
//! Links AMR is an XML-RPC style service: every lookup is a POST of a
//! `LinksAMR.retrieve` call carrying credentials, the list of fields to
//! return and a `cite_1` map of citation fields to match.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::WosConfig;
use crate::models::{field_text, one_or_many, text_of, Article, Query};
use crate::sources::{ArticleSource, DomainError, DomainErrorKind, SourceError};
use crate::utils::{
    fetch_text, parse_xml, Conjunction, FieldFormat, QueryScheme, Term, Transport,
    TransportRequest, XmlNode,
};

const XRPC_NAMESPACE: &str = "http://www.isinet.com/xrpc42";
const RETRIEVE_FN: &str = "LinksAMR.retrieve";
const CITATION_MAP: &str = "cite_1";
const COLLECTION: &str = "WOS";
const NO_RESULT: &str = "No Result Found";

const ALLOWED_QUERY: &[&str] = &["title", "author", "authors", "year", "issn"];

const QUERY_SCHEME: QueryScheme = QueryScheme::new(
    &[
        ("title", FieldFormat::Native("atitle")),
        ("author", FieldFormat::Native("author")),
        ("authors", FieldFormat::Native("authors")),
        ("year", FieldFormat::Native("year")),
        ("issn", FieldFormat::Native("issn")),
    ],
    Conjunction::Ampersand,
);

/// Web of Science research source
#[derive(Debug, Clone)]
pub struct WosSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    username: String,
    password: String,
    retrieve: Vec<String>,
}

impl WosSource {
    pub fn new(config: &WosConfig, transport: Arc<dyn Transport>) -> Result<Self, SourceError> {
        let credential = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let (Some(username), Some(password)) =
            (credential(&config.username), credential(&config.password))
        else {
            return Err(SourceError::Config(
                "Web of Science requires wos.username and wos.password".to_string(),
            ));
        };
        QUERY_SCHEME.validate(ALLOWED_QUERY)?;

        Ok(Self {
            transport,
            base_url: config.base_url.clone(),
            username,
            password,
            retrieve: config.retrieve.clone(),
        })
    }

    /// Build the `LinksAMR.retrieve` request document for citation fields
    pub fn request_document(&self, citation: &[(&str, &str)]) -> Result<String, SourceError> {
        let credentials = XmlNode::new("map").children([
            XmlNode::new("val").attr("name", "username").text(&self.username),
            XmlNode::new("val").attr("name", "password").text(&self.password),
        ]);

        let retrieve = XmlNode::new("map").child(
            XmlNode::new("list")
                .attr("name", COLLECTION)
                .children(self.retrieve.iter().map(|field| XmlNode::new("val").text(field))),
        );

        let lookup = XmlNode::new("map").child(
            XmlNode::new("map").attr("name", CITATION_MAP).children(
                citation
                    .iter()
                    .map(|(name, value)| XmlNode::new("val").attr("name", *name).text(*value)),
            ),
        );

        XmlNode::new("request")
            .attr("xmlns", XRPC_NAMESPACE)
            .child(
                XmlNode::new("fn").attr("name", RETRIEVE_FN).child(
                    XmlNode::new("list")
                        .child(credentials)
                        .child(retrieve)
                        .child(lookup),
                ),
            )
            .to_document()
    }

    async fn retrieve(&self, citation: &[(&str, &str)]) -> Result<Option<Article>, SourceError> {
        let body = self.request_document(citation)?;
        let request =
            TransportRequest::post(self.base_url.as_str(), body).header("Content-Type", "application/xml");
        let response = fetch_text(self.transport.as_ref(), request).await?;
        read_response(&parse_xml(&response)?)
    }
}

fn named<'a>(value: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    one_or_many(value)
        .into_iter()
        .find(|node| field_text(node, "name").as_deref() == Some(name))
}

/// Flatten the `WOS` value map of a response into `{ field: value }`.
///
/// `Ok(None)` when Links AMR reports no match.
fn read_response(data: &Value) -> Result<Option<Article>, SourceError> {
    let call = data
        .get("fn")
        .ok_or_else(|| SourceError::Parse("Links AMR response has no fn element".to_string()))?;

    if field_text(call, "rc").as_deref() != Some("OK") {
        let message = call
            .get("error")
            .and_then(text_of)
            .unwrap_or_else(|| DomainErrorKind::Rejected.message().to_string());
        return Err(DomainError {
            kind: DomainErrorKind::Rejected,
            message,
        }
        .into());
    }

    let citation = named(call.get("map").and_then(|m| m.get("map")), CITATION_MAP);
    let Some(values) = citation.and_then(|c| named(c.get("map"), COLLECTION)) else {
        return Ok(None);
    };

    let mut article = Map::new();
    for val in one_or_many(values.get("val")) {
        if let Some(name) = field_text(val, "name") {
            let value = text_of(val).map(Value::String).unwrap_or(Value::Null);
            article.insert(name, value);
        }
    }

    if article.get("message").and_then(Value::as_str) == Some(NO_RESULT) {
        return Ok(None);
    }
    Ok(Some(Value::Object(article)))
}

#[async_trait]
impl ArticleSource for WosSource {
    fn id(&self) -> &str {
        "wos"
    }

    fn name(&self) -> &str {
        "Web of Science"
    }

    async fn find_article(&self, id: &str) -> Result<Article, SourceError> {
        tracing::debug!(provider = "wos", doi = id, "find article");
        self.retrieve(&[("doi", id)])
            .await?
            .ok_or_else(SourceError::not_found)
    }

    async fn find_articles(&self, query: &Query) -> Result<Vec<Article>, SourceError> {
        tracing::debug!(provider = "wos", fields = query.len(), "find articles");
        let terms = QUERY_SCHEME.terms(query, ALLOWED_QUERY);
        let citation: Vec<(&str, &str)> = terms
            .iter()
            .filter_map(|term| match term {
                Term::Pair(name, value) => Some((*name, value.as_str())),
                Term::Formatted(_) => None,
            })
            .collect();
        if citation.is_empty() {
            return Err(DomainErrorKind::BadRequest.into());
        }

        Ok(self.retrieve(&citation).await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockTransport;
    use crate::utils::Method;

    const FOUND: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<response xmlns="http://www.isinet.com/xrpc42" src="app.id=API Demo">
  <fn name="LinksAMR.retrieve" rc="OK">
    <map>
      <map name="cite_1">
        <map name="WOS">
          <val name="timesCited">42</val>
          <val name="ut">000270372400005</val>
          <val name="doi">10.1000/182</val>
          <val name="sourceURL">http://gateway.webofknowledge.com/source</val>
        </map>
      </map>
    </map>
  </fn>
</response>"#;

    const NOT_FOUND: &str = r#"<response xmlns="http://www.isinet.com/xrpc42">
  <fn name="LinksAMR.retrieve" rc="OK">
    <map><map name="cite_1"><map name="WOS"><val name="message">No Result Found</val></map></map></map>
  </fn>
</response>"#;

    fn config() -> WosConfig {
        WosConfig {
            username: Some("user".to_string()),
            password: Some("p&ss".to_string()),
            retrieve: vec!["doi".to_string(), "timesCited".to_string()],
            ..WosConfig::default()
        }
    }

    fn source(transport: Arc<MockTransport>) -> WosSource {
        WosSource::new(&config(), transport).unwrap()
    }

    #[test]
    fn test_requires_credentials() {
        let config = WosConfig {
            username: Some("user".to_string()),
            ..WosConfig::default()
        };
        let err = WosSource::new(&config, Arc::new(MockTransport::new())).unwrap_err();
        assert!(matches!(err, SourceError::Config(_)));
    }

    #[test]
    fn test_request_document() {
        let source = source(Arc::new(MockTransport::new()));
        let document = source.request_document(&[("doi", "10.1000/182")]).unwrap();

        assert_eq!(
            document,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<request xmlns="http://www.isinet.com/xrpc42">"#,
                r#"<fn name="LinksAMR.retrieve"><list>"#,
                r#"<map><val name="username">user</val><val name="password">p&amp;ss</val></map>"#,
                r#"<map><list name="WOS"><val>doi</val><val>timesCited</val></list></map>"#,
                r#"<map><map name="cite_1"><val name="doi">10.1000/182</val></map></map>"#,
                r#"</list></fn></request>"#
            )
        );
    }

    #[tokio::test]
    async fn test_find_article_flattens_values() {
        let transport = Arc::new(MockTransport::new().respond("/cps/xrpc", FOUND));
        let article = source(transport.clone()).find_article("10.1000/182").await.unwrap();

        assert_eq!(article["timesCited"], "42");
        assert_eq!(article["ut"], "000270372400005");
        assert_eq!(article["doi"], "10.1000/182");

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert!(request
            .body
            .as_deref()
            .unwrap()
            .contains(r#"<val name="doi">10.1000/182</val>"#));
    }

    #[tokio::test]
    async fn test_no_result_is_not_found_for_article() {
        let transport = Arc::new(MockTransport::new().respond("/cps/xrpc", NOT_FOUND));
        let err = source(transport).find_article("10.1/none").await.unwrap_err();
        assert_eq!(err.kind(), Some(DomainErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_no_result_is_empty_search() {
        let transport = Arc::new(MockTransport::new().respond("/cps/xrpc", NOT_FOUND));
        let articles = source(transport)
            .find_articles(&Query::new().field("title", "nothing").field("year", "1900"))
            .await
            .unwrap();
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_search_maps_native_names() {
        let transport = Arc::new(MockTransport::new().respond("/cps/xrpc", FOUND));
        let articles = source(transport.clone())
            .find_articles(&Query::new().field("title", "Clean Code").field("doi", "ignored"))
            .await
            .unwrap();

        assert_eq!(articles.len(), 1);
        let body = transport.requests()[0].body.clone().unwrap();
        assert!(body.contains(r#"<map name="cite_1"><val name="atitle">Clean Code</val></map>"#));
        assert!(!body.contains("ignored"));
    }

    #[tokio::test]
    async fn test_search_without_allowed_fields_is_bad_request() {
        let transport = Arc::new(MockTransport::new());
        let err = source(transport.clone())
            .find_articles(&Query::new().field("doi", "10.1/x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(DomainErrorKind::BadRequest));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_call_is_rejected_with_message() {
        let transport = Arc::new(MockTransport::new().respond(
            "/cps/xrpc",
            r#"<response><fn name="LinksAMR.retrieve" rc="ERROR"><error code="Server.authentication">No matches returned for Username</error></fn></response>"#,
        ));
        let err = source(transport).find_article("10.1000/182").await.unwrap_err();

        assert_eq!(err.kind(), Some(DomainErrorKind::Rejected));
        assert_eq!(
            err.to_string(),
            "DATA_API_REJECT_REQUEST: No matches returned for Username"
        );
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let transport = Arc::new(MockTransport::new().status("/cps/xrpc", 500));
        let err = source(transport).find_article("10.1000/182").await.unwrap_err();
        assert_eq!(err.kind(), Some(DomainErrorKind::Rejected));
    }
}
