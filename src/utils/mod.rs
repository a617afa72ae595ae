//! Utility modules shared by the provider adapters.
//!
//! - [`Transport`]: the outbound request collaborator, with [`HttpClient`] as
//!   its reqwest-backed implementation
//! - [`classify`] / [`classify_error`]: map transport failures onto domain error kinds
//! - [`encode`]: translate a generic [`Query`](crate::models::Query) into a
//!   provider-native query string through a [`QueryScheme`]
//! - [`parse_xml`]: parse XML responses into the JSON-like article shape
//! - [`XmlNode`]: typed document tree for XML request bodies
//!
//! # Query Encoding
//!
//! ```rust
//! use articles_searcher::models::Query;
//! use articles_searcher::utils::{encode, Conjunction, FieldFormat, QueryScheme};
//!
//! const SCHEME: QueryScheme = QueryScheme::new(
//!     &[("author", FieldFormat::Native("query.author"))],
//!     Conjunction::Ampersand,
//! );
//!
//! let query = Query::new().field("author", "Robert Martin").field("unknown", "x");
//! assert_eq!(encode(&query, &["author"], &SCHEME), "query.author=Robert%20Martin");
//! ```

mod classify;
mod codec;
mod http;
mod xml;

pub use classify::{classify, classify_error, fetch_json, fetch_text};
pub use codec::{encode, percent_encode, Conjunction, FieldFormat, QueryScheme, Term};
pub use http::{HttpClient, Method, Transport, TransportError, TransportRequest, TransportResponse};
pub use xml::{parse_xml, XmlContent, XmlNode};
