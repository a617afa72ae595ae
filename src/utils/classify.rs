//! Maps transport outcomes onto the closed set of domain error kinds.
//!
//! This is the only place status codes are interpreted; adapters must not
//! invent their own mapping.

use serde::de::DeserializeOwned;

use crate::sources::{DomainErrorKind, SourceError};
use crate::utils::{Transport, TransportError, TransportRequest, TransportResponse};

/// Classify a transport failure.
///
/// | outcome                          | kind          |
/// |----------------------------------|---------------|
/// | HTTP 400                         | `BadRequest`  |
/// | HTTP 404                         | `NotFound`    |
/// | any other HTTP error             | `Rejected`    |
/// | sent, no response                | `Unavailable` |
///
/// A request that could not be sent is returned as [`SourceError::Request`]
/// with the underlying message untouched.
pub fn classify_error(error: TransportError) -> SourceError {
    match error {
        TransportError::Status { status: 400, .. } => DomainErrorKind::BadRequest.into(),
        TransportError::Status { status: 404, .. } => DomainErrorKind::NotFound.into(),
        TransportError::Status { .. } => DomainErrorKind::Rejected.into(),
        TransportError::NoResponse(_) => DomainErrorKind::Unavailable.into(),
        TransportError::Request(message) => SourceError::Request(message),
    }
}

/// Pass a payload through, classify a failure
pub fn classify(
    outcome: Result<TransportResponse, TransportError>,
) -> Result<TransportResponse, SourceError> {
    outcome.map_err(classify_error)
}

/// Send a request and return the classified body
pub async fn fetch_text(
    transport: &dyn Transport,
    request: TransportRequest,
) -> Result<String, SourceError> {
    tracing::debug!(method = ?request.method, url = %request.url, "sending request");
    let outcome = transport.send(request).await;
    if let Err(err) = &outcome {
        tracing::debug!(error = %err, "request failed");
    }
    classify(outcome).map(|response| response.body)
}

/// Send a request and decode the JSON body
pub async fn fetch_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: TransportRequest,
) -> Result<T, SourceError> {
    let body = fetch_text(transport, request).await?;
    Ok(serde_json::from_str(&body)?)
}
