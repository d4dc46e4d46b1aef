//! Caller identity extraction.
//!
//! The service sits behind an identity provider that verifies tokens and
//! forwards the authenticated subject in request headers. The core
//! consumes only `{subject_id, email}` and trusts it as
//! pre-authenticated; token and session mechanics stay outside.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Header carrying the verified identity subject.
pub const SUBJECT_HEADER: &str = "x-subject-id";

/// Header carrying the verified identity email (optional).
pub const EMAIL_HEADER: &str = "x-subject-email";

/// The verified caller identity forwarded by the identity provider.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject_id: String,
    pub email: Option<String>,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject_id = parts
            .headers
            .get(SUBJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .ok_or_else(ApiError::no_identity)?;

        let email = parts
            .headers
            .get(EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(Identity { subject_id, email })
    }
}
