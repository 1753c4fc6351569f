// src/handlers/mod.rs

pub mod result;
pub mod stage;

use axum::http::HeaderMap;

/// Header carrying the caller's quiz session id.
pub const SESSION_HEADER: &str = "x-diagnosis-session";

/// Resolves the caller's session id, minting a fresh one when the header is
/// absent or unreadable. The handlers echo it back so the client can keep
/// submitting into the same session.
pub(crate) fn resolve_session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_session_id_prefers_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(resolve_session_id(&headers), "abc-123");
    }

    #[test]
    fn test_resolve_session_id_mints_when_absent() {
        let minted = resolve_session_id(&HeaderMap::new());
        assert!(!minted.is_empty());
        assert_ne!(minted, resolve_session_id(&HeaderMap::new()));
    }
}
