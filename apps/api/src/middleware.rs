//! Request guards applied ahead of the handlers.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use cambo_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::auth::SESSION_USER_KEY;
use crate::error::ApiResult;

/// Rejects requests without a session identity and stashes the identity in
/// the request extensions for the handlers behind it.
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity: UserIdentity = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("session lookup failed: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Refuses state-changing requests whose browser-declared origin is not the
/// configured frontend.
///
/// Requests carrying no origin signal at all pass through: those come from
/// non-browser clients, which CSRF does not reach because they hold no
/// ambient session cookie.
pub async fn block_cross_origin_mutations(
    State(allowed_origin): State<String>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing(request.method())
        && !origin_is_acceptable(request.headers(), &allowed_origin)
    {
        return Err(AppError::Forbidden("request origin is not allowed".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn origin_is_acceptable(headers: &HeaderMap, allowed_origin: &str) -> bool {
    if headers
        .get("sec-fetch-site")
        .is_some_and(|site| site == "cross-site")
    {
        return false;
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok());

    match (origin, referer) {
        (None, None) => true,
        (origin, referer) => {
            origin == Some(allowed_origin)
                || referer.is_some_and(|value| value.starts_with(allowed_origin))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, Method, header};

    use super::{is_state_changing, origin_is_acceptable};

    const FRONTEND: &str = "http://localhost:3000";

    #[test]
    fn reads_are_never_origin_checked() {
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::HEAD));
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::DELETE));
    }

    #[test]
    fn headerless_requests_pass() {
        let headers = HeaderMap::new();
        assert!(origin_is_acceptable(&headers, FRONTEND));
    }

    #[test]
    fn matching_origin_passes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(FRONTEND));
        assert!(origin_is_acceptable(&headers, FRONTEND));
    }

    #[test]
    fn foreign_origin_is_refused() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://evil.example"),
        );
        assert!(!origin_is_acceptable(&headers, FRONTEND));
    }

    #[test]
    fn frontend_referer_passes_without_an_origin_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("http://localhost:3000/admin/roles"),
        );
        assert!(origin_is_acceptable(&headers, FRONTEND));
    }

    #[test]
    fn cross_site_fetch_metadata_overrides_a_matching_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(FRONTEND));
        headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
        assert!(!origin_is_acceptable(&headers, FRONTEND));
    }
}
