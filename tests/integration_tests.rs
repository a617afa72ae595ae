//! Integration tests for Articles Searcher
//!
//! These tests drive the service facade end to end: route matching, the
//! provider adapters and response rendering, over a scripted transport.

use articles_searcher::config::Config;
use articles_searcher::service::{FacadeResponse, ServiceFacade};
use articles_searcher::sources::{MockTransport, SourceRegistry};
use articles_searcher::utils::TransportError;
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;

fn configured() -> Config {
    let mut config = Config::default();
    config.crossref.mail_to = Some("librarian@example.org".to_string());
    config.scopus.api_key = Some("KEY".to_string());
    config.risc.user_code = Some("UCODE".to_string());
    config.wos.username = Some("user".to_string());
    config.wos.password = Some("secret".to_string());
    config
}

fn facade(transport: &Arc<MockTransport>) -> ServiceFacade {
    let registry = SourceRegistry::from_config(&configured(), transport.clone());
    ServiceFacade::new(Arc::new(registry))
}

fn json_body(response: &FacadeResponse) -> serde_json::Value {
    match response {
        FacadeResponse::Json(value) => value.clone(),
        other => panic!("expected JSON, got {:?}", other),
    }
}

const CROSSREF_WORKS: &str = r#"{"status":"ok","message-type":"work-list","message":{
    "total-results":3,
    "items":[
        {"DOI":"10.1000/1","title":["Clean Code"],"author":[{"given":"Robert","family":"Martin","sequence":"first"}]},
        {"DOI":"10.1000/2","title":["Clean Architecture"]},
        {"DOI":"10.1000/3","title":["The Clean Coder"]}
    ]
}}"#;

#[tokio::test]
async fn test_crossref_search() {
    let transport = Arc::new(MockTransport::new().respond("api.crossref.org/works?", CROSSREF_WORKS));
    let response = facade(&transport)
        .dispatch("/crossref/articles", "query=robert%20martin&unknown=dropped")
        .await;

    let articles = json_body(&response);
    assert_eq!(articles.as_array().unwrap().len(), 3);
    assert_eq!(articles[0]["DOI"], "10.1000/1");

    let url = &transport.urls()[0];
    assert!(url.contains("rows=10&query=robert%20martin"));
    assert!(!url.contains("unknown"));
}

#[tokio::test]
async fn test_crossref_empty_search_is_empty_list() {
    let transport = Arc::new(MockTransport::new().respond(
        "api.crossref.org/works?",
        r#"{"status":"ok","message":{"total-results":0,"items":[]}}"#,
    ));
    let response = facade(&transport)
        .dispatch("/crossref/articles", "query=zzzzzz")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "[]");
}

#[tokio::test]
async fn test_crossref_missing_doi_is_not_found_text() {
    let transport = Arc::new(MockTransport::new().status("api.crossref.org/works/", 404));
    let response = facade(&transport)
        .dispatch("/crossref/article/10.1000/unknown", "")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.body(),
        "DATA_API_NOT_FOUND_DATA: data service found no matching data"
    );
}

#[tokio::test]
async fn test_crossref_affiliations_pairing() {
    let transport = Arc::new(MockTransport::new().respond(
        "api.crossref.org/works/10.1000%2F182",
        r#"{"status":"ok","message":{"DOI":"10.1000/182","author":[
            {"name":"Object Mentor Inc.","sequence":"additional"},
            {"given":"Robert","family":"Martin","sequence":"first"},
            {"given":"Michael","family":"Feathers","sequence":"additional"}
        ]}}"#,
    ));
    let response = facade(&transport)
        .dispatch("/crossref/affiliations/10.1000/182", "")
        .await;

    let people = json_body(&response);
    assert_eq!(people.as_array().unwrap().len(), 2);
    assert_eq!(people[0]["affiliation"][0]["name"], "Object Mentor Inc.");
    assert_eq!(people[1]["affiliation"][0]["name"], "Object Mentor Inc.");
}

#[tokio::test]
async fn test_provider_bad_request_is_rendered() {
    let transport = Arc::new(MockTransport::new().status("/search/scopus", 400));
    let response = facade(&transport)
        .dispatch("/scopus/articles", "title=clean%20code")
        .await;

    assert_eq!(
        response.body(),
        "DATA_API_BAD_REQUEST: request executed with invalid parameters"
    );
}

#[tokio::test]
async fn test_unreachable_provider_is_unavailable() {
    let transport = Arc::new(MockTransport::new().fail(
        "/search/scopus",
        TransportError::NoResponse("connection timed out".to_string()),
    ));
    let response = facade(&transport)
        .dispatch("/scopus/article/10.1000/182", "")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "DATA_API_UNAVAILABLE: data service is not responding");
}

#[tokio::test]
async fn test_malformed_payload_is_server_error() {
    let transport = Arc::new(MockTransport::new().respond("/search/scopus", "<html>oops</html>"));
    let response = facade(&transport)
        .dispatch("/scopus/articles", "title=x")
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_scopus_quartile_route() {
    let transport = Arc::new(MockTransport::new().respond(
        "/serial/title/issn/01234567",
        r#"{"serial-metadata-response":{"entry":[{"citeScoreYearInfoList":{"citeScoreCurrentMetric":"42.5"}}]}}"#,
    ));
    let response = facade(&transport)
        .dispatch("/scopus/quartile/01234567", "")
        .await;

    assert_eq!(json_body(&response), json!(3));
}

#[tokio::test]
async fn test_scopus_full_affiliations_route() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(
                "field=author,affiliation",
                r#"{"abstracts-retrieval-response":{
                    "affiliation":[{"@id":"60001"},{"@id":"60002"}],
                    "authors":{"author":[
                        {"@auid":"1","ce:indexed-name":"Martin R.","affiliation":{"@id":"60001"}},
                        {"@auid":"2","ce:indexed-name":"Feathers M.","affiliation":[{"@id":"60001"},{"@id":"60002"}]}
                    ]}
                }}"#,
            )
            .respond(
                "/search/scopus",
                r#"{"search-results":{"opensearch:totalResults":"1","entry":[{"eid":"2-s2.0-1","link":[
                    {"@ref":"author-affiliation","@href":"https://api.elsevier.com/content/abstract/scopus_id/1?field=author,affiliation"}
                ]}]}}"#,
            )
            .respond(
                "/affiliation/affiliation_id/60001",
                r#"{"affiliation-retrieval-response":{"affiliation-name":"First University"}}"#,
            )
            .respond(
                "/affiliation/affiliation_id/60002",
                r#"{"affiliation-retrieval-response":{"affiliation-name":"Second Institute"}}"#,
            ),
    );
    let response = facade(&transport)
        .dispatch("/scopus/full/affiliations/10.1000/182", "")
        .await;

    let authors = json_body(&response);
    assert_eq!(authors[0]["affiliation"][0]["affiliation-name"], "First University");
    assert_eq!(authors[1]["affiliation"][1]["affiliation-name"], "Second Institute");
    // record lookup, abstract record, then one fetch per distinct affiliation
    assert_eq!(transport.requests().len(), 4);
}

#[tokio::test]
async fn test_scopus_unknown_affiliation_reference_is_server_error() {
    let transport = Arc::new(
        MockTransport::new()
            .respond(
                "field=author,affiliation",
                r#"{"abstracts-retrieval-response":{
                    "affiliation":{"@id":"60001"},
                    "authors":{"author":{"@auid":"1","affiliation":{"@id":"99999"}}}
                }}"#,
            )
            .respond(
                "/search/scopus",
                r#"{"search-results":{"entry":[{"link":{"@ref":"author-affiliation","@href":"https://api.elsevier.com/content/abstract/scopus_id/1?field=author,affiliation"}}]}}"#,
            ),
    );
    let response = facade(&transport)
        .dispatch("/scopus/affiliations/10.1000/182", "")
        .await;

    assert_eq!(response, FacadeResponse::ServerError);
}

#[tokio::test]
async fn test_risc_author_route() {
    let transport = Arc::new(MockTransport::new().respond(
        "sid=024&authorid=77",
        r#"<?xml version="1.0" encoding="utf-8"?>
<eLibrary><authors><author authorid="77"><lastname>Martin</lastname><spin>1234-5678</spin></author></authors></eLibrary>"#,
    ));
    let response = facade(&transport).dispatch("/risc/author/77", "").await;

    let author = json_body(&response);
    assert_eq!(author["authorid"], "77");
    assert_eq!(author["spin"], "1234-5678");
}

#[tokio::test]
async fn test_wos_article_and_no_result() {
    let transport = Arc::new(
        MockTransport::new().respond(
            "ws.isiknowledge.com",
            r#"<response><fn name="LinksAMR.retrieve" rc="OK"><map><map name="cite_1"><map name="WOS">
                <val name="message">No Result Found</val>
            </map></map></map></fn></response>"#,
        ),
    );
    let facade = facade(&transport);

    let response = facade.dispatch("/wos/article/10.1/none", "").await;
    assert_eq!(
        response.body(),
        "DATA_API_NOT_FOUND_DATA: data service found no matching data"
    );

    let response = facade.dispatch("/wos/articles", "title=nothing").await;
    assert_eq!(json_body(&response), json!([]));
}

#[tokio::test]
async fn test_unconfigured_provider_is_not_served() {
    let transport = Arc::new(MockTransport::new());
    let registry = SourceRegistry::from_config(&Config::default(), transport.clone());
    let facade = ServiceFacade::new(Arc::new(registry));

    let response = facade.dispatch("/scopus/article/10.1000/182", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_provider_index() {
    let transport = Arc::new(MockTransport::new());
    let response = facade(&transport).dispatch("/", "").await;
    assert_eq!(json_body(&response), json!(["crossref", "risc", "scopus", "wos"]));
}
