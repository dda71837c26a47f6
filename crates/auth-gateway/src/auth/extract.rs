//! Bearer token extraction.
//!
//! Absence of a token is a normal outcome, not an error: the extractor
//! returns `None` and the middleware decides what that means. A token
//! that is present but invalid is for the strategies to judge.

use axum::http::{header, HeaderMap};

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from the `Authorization` header.
///
/// The `Bearer ` prefix is matched case-insensitively per RFC 7235
/// (auth schemes are case-insensitive). Returns `None` when the header
/// is missing, shorter than the prefix, or carries a different scheme.
/// A well-formed header with nothing after the prefix yields an empty
/// token, which callers treat the same as absence.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    if value.len() < BEARER_PREFIX.len() {
        return None;
    }

    // Header values that survive to_str() are visible ASCII, so the
    // byte split below cannot land inside a multi-byte character.
    let (scheme, token) = value.split_at(BEARER_PREFIX.len());
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    Some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_extracts_token() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        for prefix in ["bearer ", "BEARER ", "BeArEr "] {
            let headers = headers_with_auth(&format!("{}tok", prefix));
            assert_eq!(bearer_token(&headers), Some("tok"), "prefix {:?}", prefix);
        }
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_wrong_scheme() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_header_shorter_than_prefix() {
        let headers = headers_with_auth("Bearer");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_empty_token_after_prefix() {
        // Present prefix with nothing after it: extraction succeeds with
        // an empty token; the middleware treats it as no token.
        let headers = headers_with_auth("Bearer ");
        assert_eq!(bearer_token(&headers), Some(""));
    }

    #[test]
    fn test_prefix_without_space_is_rejected() {
        let headers = headers_with_auth("Bearertoken");
        assert_eq!(bearer_token(&headers), None);
    }
}
