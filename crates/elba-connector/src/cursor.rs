//! Pagination cursor codec.
//!
//! Every vendor paginates differently: offset integers, opaque continuation
//! tokens, `Link` response headers, ready-to-fetch next URLs, GraphQL page
//! counters. This module normalizes all of them into one contract: an opaque
//! [`Cursor`] string, where `None` in a request means "first page" and `None`
//! decoded from a response means "no further pages".
//!
//! Decode rules are total: every response shape, including the terminal one,
//! maps to `Some(cursor)` or `None`. Only the request side can fail, when a
//! chain carries a cursor this client never produced.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Opaque pagination continuation value, vendor-defined encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a vendor-produced continuation value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw continuation value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the raw continuation value.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ── Request side ──────────────────────────────────────────────────────

/// Interpret a request cursor as a record offset. Absent cursor means
/// offset 0.
pub fn offset_from_request(cursor: Option<&Cursor>) -> ConnectorResult<u32> {
    match cursor {
        None => Ok(0),
        Some(cursor) => cursor
            .as_str()
            .parse()
            .map_err(|_| ConnectorError::InvalidCursor {
                value: cursor.as_str().to_string(),
            }),
    }
}

/// Interpret a request cursor as a 1-based page number. Absent cursor means
/// page 1.
pub fn page_from_request(cursor: Option<&Cursor>) -> ConnectorResult<u32> {
    match cursor {
        None => Ok(1),
        Some(cursor) => cursor
            .as_str()
            .parse()
            .map_err(|_| ConnectorError::InvalidCursor {
                value: cursor.as_str().to_string(),
            }),
    }
}

// ── Response side (total: defined cursor or explicit None, never an error) ──

/// Offset pagination: next offset is `current + page_size`, unless the page
/// came back short, which is the terminal signal.
#[must_use]
pub fn next_from_offset(current_offset: u32, page_size: u32, returned: usize) -> Option<Cursor> {
    if returned < page_size as usize {
        None
    } else {
        Some(Cursor::new((current_offset + page_size).to_string()))
    }
}

/// Page-number pagination: next page is `current + 1`, unless the page came
/// back short.
#[must_use]
pub fn next_from_page(current_page: u32, page_size: u32, returned: usize) -> Option<Cursor> {
    if returned < page_size as usize {
        None
    } else {
        Some(Cursor::new((current_page + 1).to_string()))
    }
}

/// Page-counter pagination where only an empty page terminates (GraphQL
/// connectors that return full pages without a total count).
#[must_use]
pub fn next_from_page_until_empty(current_page: u32, returned: usize) -> Option<Cursor> {
    if returned == 0 {
        None
    } else {
        Some(Cursor::new((current_page + 1).to_string()))
    }
}

/// Opaque continuation token: present and non-empty, or terminal.
#[must_use]
pub fn next_from_token(token: Option<String>) -> Option<Cursor> {
    token.filter(|t| !t.is_empty()).map(Cursor::new)
}

/// Ready-to-fetch next URL, carried verbatim.
#[must_use]
pub fn next_from_url(url: Option<String>) -> Option<Cursor> {
    next_from_token(url)
}

/// RFC 5988-style `Link` header: find the `rel="next"` entry and extract the
/// named query parameter from its target URL.
///
/// Absence of the header, of a `next` relation, of a parseable target, or of
/// the parameter all mean the same thing: no further pages.
#[must_use]
pub fn next_from_link_header(header: Option<&str>, param: &str) -> Option<Cursor> {
    let target = link_next_target(header?)?;
    let url = url::Url::parse(target).ok()?;
    url.query_pairs()
        .find(|(name, _)| name == param)
        .map(|(_, value)| Cursor::new(value.into_owned()))
}

/// Extract the `rel="next"` target from a `Link` header value. Malformed
/// entries are skipped, not fatal.
fn link_next_target(header: &str) -> Option<&str> {
    for entry in header.split(',') {
        let mut segments = entry.split(';');
        let Some(target) = segments
            .next()
            .map(str::trim)
            .and_then(|target| target.strip_prefix('<'))
            .and_then(|target| target.strip_suffix('>'))
        else {
            continue;
        };
        for attribute in segments {
            let mut parts = attribute.splitn(2, '=');
            let name = parts.next().unwrap_or("").trim();
            let value = parts.next().unwrap_or("").trim().trim_matches('"');
            if name.eq_ignore_ascii_case("rel") && value == "next" {
                return Some(target);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_request_defaults_to_zero() {
        assert_eq!(offset_from_request(None).unwrap(), 0);
        assert_eq!(
            offset_from_request(Some(&Cursor::new("200"))).unwrap(),
            200
        );
    }

    #[test]
    fn page_request_defaults_to_one() {
        assert_eq!(page_from_request(None).unwrap(), 1);
        assert_eq!(page_from_request(Some(&Cursor::new("7"))).unwrap(), 7);
    }

    #[test]
    fn corrupted_numeric_cursor_is_rejected() {
        let err = offset_from_request(Some(&Cursor::new("abc"))).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidCursor { .. }));
        assert!(page_from_request(Some(&Cursor::new(""))).is_err());
    }

    #[test]
    fn offset_advances_on_full_page() {
        assert_eq!(
            next_from_offset(0, 100, 100),
            Some(Cursor::new("100"))
        );
        assert_eq!(
            next_from_offset(100, 100, 100),
            Some(Cursor::new("200"))
        );
    }

    #[test]
    fn offset_terminates_on_short_page() {
        assert_eq!(next_from_offset(200, 100, 42), None);
        assert_eq!(next_from_offset(0, 100, 0), None);
    }

    #[test]
    fn page_number_rules() {
        assert_eq!(next_from_page(1, 50, 50), Some(Cursor::new("2")));
        assert_eq!(next_from_page(3, 50, 49), None);
    }

    #[test]
    fn page_until_empty_continues_on_short_page() {
        // Full and short pages both continue; only an empty page terminates.
        assert_eq!(next_from_page_until_empty(1, 50), Some(Cursor::new("2")));
        assert_eq!(next_from_page_until_empty(2, 3), Some(Cursor::new("3")));
        assert_eq!(next_from_page_until_empty(3, 0), None);
    }

    #[test]
    fn token_absence_and_emptiness_terminate() {
        assert_eq!(next_from_token(None), None);
        assert_eq!(next_from_token(Some(String::new())), None);
        assert_eq!(
            next_from_token(Some("abc123".into())),
            Some(Cursor::new("abc123"))
        );
    }

    #[test]
    fn next_url_carried_verbatim() {
        let url = "https://api.example.com/users?cursor=xyz";
        assert_eq!(
            next_from_url(Some(url.into())),
            Some(Cursor::new(url))
        );
        assert_eq!(next_from_url(None), None);
    }

    #[test]
    fn link_header_next_param_extracted() {
        let header = r#"<https://gitlab.example.com/api/v4/users?id_after=42&per_page=100>; rel="next", <https://gitlab.example.com/api/v4/users?per_page=100>; rel="first""#;
        assert_eq!(
            next_from_link_header(Some(header), "id_after"),
            Some(Cursor::new("42"))
        );
    }

    #[test]
    fn link_header_without_next_relation_terminates() {
        let header = r#"<https://example.com/users?page=1>; rel="first", <https://example.com/users?page=9>; rel="last""#;
        assert_eq!(next_from_link_header(Some(header), "page"), None);
        assert_eq!(next_from_link_header(None, "page"), None);
    }

    #[test]
    fn link_header_next_without_param_terminates() {
        let header = r#"<https://example.com/users>; rel="next""#;
        assert_eq!(next_from_link_header(Some(header), "id_after"), None);
    }

    #[test]
    fn link_header_unquoted_rel_accepted() {
        let header = "<https://example.com/users?cursor=abc>; rel=next";
        assert_eq!(
            next_from_link_header(Some(header), "cursor"),
            Some(Cursor::new("abc"))
        );
    }

    #[test]
    fn link_header_garbage_is_terminal_not_fatal() {
        for garbage in ["", "nonsense", "<unclosed; rel=\"next\"", "<not a url>; rel=\"next\""] {
            assert_eq!(next_from_link_header(Some(garbage), "cursor"), None);
        }
    }

    #[test]
    fn link_header_skips_malformed_entries() {
        let header = "garbage, <https://example.com/users?cursor=ok>; rel=\"next\"";
        assert_eq!(
            next_from_link_header(Some(header), "cursor"),
            Some(Cursor::new("ok"))
        );
    }

    #[test]
    fn cursor_serde_is_transparent() {
        let cursor = Cursor::new("p2");
        assert_eq!(serde_json::to_string(&cursor).unwrap(), r#""p2""#);
        let parsed: Cursor = serde_json::from_str(r#""p2""#).unwrap();
        assert_eq!(parsed, cursor);
    }
}
