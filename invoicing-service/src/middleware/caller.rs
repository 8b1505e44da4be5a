//! Caller identity extractor.
//!
//! The authenticating gateway in front of this service resolves the session
//! and forwards the caller as `X-User-ID` and `X-User-Role`. Handlers take a
//! [`CallerIdentity`] argument instead of reading any global auth state.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Role assumed when the gateway sends none.
pub const DEFAULT_ROLE: &str = "member";

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Recorded as `changed_by` in the status history.
    pub subject: String,
    pub role: String,
}

impl CallerIdentity {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = header(parts, USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing X-User-ID header"))
        })?;
        let role = header(parts, USER_ROLE_HEADER).unwrap_or(DEFAULT_ROLE);

        let span = tracing::Span::current();
        span.record("user_id", subject);

        Ok(CallerIdentity::new(subject, role))
    }
}
