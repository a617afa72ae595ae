//! Core data models for queries, articles and routes.

mod article;
mod query;
mod route;

pub use article::{field_text, one_or_many, text_of, Article, TEXT_KEY};
pub use query::Query;
pub use route::{Operation, Route, RouteParams};
