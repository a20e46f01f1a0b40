/*!
 * Request Validation
 * Field checks that run before handler logic and collect every failure
 * into a single `400 {"errors": [...]}` response.
 */
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

lazy_static::lazy_static! {
    /// Letters, digits, spaces and hyphens only.
    static ref SEARCH_REGEX: Regex = Regex::new(r"^[A-Za-z0-9 \-]+$").unwrap();
}

/// Where the offending value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Params,
    Query,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub msg: String,
    pub path: String,
    pub location: Location,
}

impl FieldError {
    pub fn new(
        location: Location,
        path: impl Into<String>,
        value: Option<Value>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            kind: "field",
            value,
            msg: msg.into(),
            path: path.into(),
            location,
        }
    }
}

/// Accumulates field errors for one request.
///
/// Parsing helpers return a placeholder (nil id, default number) on failure;
/// the placeholder is never observed because `finish` rejects the request.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        location: Location,
        path: &str,
        value: Option<Value>,
        msg: impl Into<String>,
    ) {
        self.errors.push(FieldError::new(location, path, value, msg));
    }

    /// Records `msg` unless `ok` holds.
    pub fn check(
        &mut self,
        ok: bool,
        location: Location,
        path: &str,
        value: Option<&Value>,
        msg: &str,
    ) -> &mut Self {
        if !ok {
            self.push(location, path, value.cloned(), msg);
        }
        self
    }

    /// An id taken from the URL path.
    pub fn param_id(&mut self, path: &str, raw: &str, msg: &str) -> Uuid {
        match parse_id(raw) {
            Some(id) => id,
            None => {
                self.push(Location::Params, path, Some(Value::from(raw)), msg);
                Uuid::nil()
            }
        }
    }

    /// A required body id with a single failure message.
    pub fn body_id(&mut self, body: &Value, path: &str, msg: &str) -> Uuid {
        let value = body.get(path);
        match value.and_then(Value::as_str).and_then(|s| parse_id(s.trim())) {
            Some(id) => id,
            None => {
                self.push(Location::Body, path, value.cloned(), msg);
                Uuid::nil()
            }
        }
    }

    /// A required body id that reports emptiness separately from a bad format.
    /// An empty value fails both checks.
    pub fn body_id_non_empty(
        &mut self,
        body: &Value,
        path: &str,
        empty_msg: &str,
        invalid_msg: &str,
    ) -> Uuid {
        let value = body.get(path);
        let raw = value.and_then(Value::as_str).map(str::trim).unwrap_or("");
        if raw.is_empty() {
            self.push(Location::Body, path, Some(Value::from(raw)), empty_msg);
        }
        match parse_id(raw) {
            Some(id) => id,
            None => {
                self.push(Location::Body, path, Some(Value::from(raw)), invalid_msg);
                Uuid::nil()
            }
        }
    }

    /// An optional body id; absent yields `None`, present must parse.
    pub fn optional_body_id(&mut self, body: &Value, path: &str, msg: &str) -> Option<Uuid> {
        let value = body.get(path).filter(|v| !v.is_null())?;
        match value.as_str().and_then(|s| parse_id(s.trim())) {
            Some(id) => Some(id),
            None => {
                self.push(Location::Body, path, Some(value.clone()), msg);
                None
            }
        }
    }

    /// An optional integer query parameter bounded by `min..=max`.
    pub fn query_int(
        &mut self,
        raw: Option<&String>,
        path: &str,
        min: i64,
        max: Option<i64>,
        default: i64,
        msg: &str,
    ) -> i64 {
        let Some(raw) = raw else {
            return default;
        };
        match raw.parse::<i64>() {
            Ok(n) if n >= min && max.map_or(true, |max| n <= max) => n,
            _ => {
                self.push(Location::Query, path, Some(Value::from(raw.as_str())), msg);
                default
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(count = self.errors.len(), "request failed validation");
            Err(ApiError::Validation(self.errors))
        }
    }
}

pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

/// Validate a lone path id, failing the request on a bad format.
pub fn path_id(path: &str, raw: &str, msg: &str) -> ApiResult<Uuid> {
    let mut v = Validator::new();
    let id = v.param_id(path, raw, msg);
    v.finish()?;
    Ok(id)
}

/// Pagination for feed-style listings: `limit` 1..=100 (default 10), `page` >= 1.
pub fn pagination(
    v: &mut Validator,
    query: &std::collections::HashMap<String, String>,
) -> (i64, i64) {
    let limit = v.query_int(
        query.get("limit"),
        "limit",
        1,
        Some(100),
        10,
        "Limit must be a number between 1 and 100.",
    );
    let page = v.query_int(
        query.get("page"),
        "page",
        1,
        None,
        1,
        "Page must be a number greater than 0.",
    );
    (page, limit)
}

/// True for a user search term made of letters, digits, spaces or hyphens.
pub fn is_valid_search(term: &str) -> bool {
    SEARCH_REGEX.is_match(term)
}

/// Escape characters that are significant in HTML.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
        .replace('/', "&#x2F;")
        .replace('\\', "&#x5C;")
        .replace('`', "&#96;")
}

/// User-written markup reduced to the allowed subset, then trimmed.
/// Length rules apply to this value since it is what gets stored.
pub fn sanitize_content(raw: &str) -> String {
    ammonia::clean(raw.trim()).trim().to_string()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `Some(vec)` for an array made only of strings.
pub fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Length in characters, not bytes.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_param_id_rejects_garbage() {
        let mut v = Validator::new();
        let id = v.param_id("postId", "not-an-id", "Post ID must be a valid id.");
        assert!(id.is_nil());
        let err = v.finish().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].msg, "Post ID must be a valid id.");
                assert_eq!(errors[0].location, Location::Params);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_param_id_accepts_uuid() {
        let mut v = Validator::new();
        let raw = Uuid::new_v4();
        assert_eq!(v.param_id("postId", &raw.to_string(), "bad"), raw);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_empty_followed_id_reports_both_messages() {
        let mut v = Validator::new();
        v.body_id_non_empty(
            &json!({ "followedId": "  " }),
            "followedId",
            "Followed id can't be empty.",
            "Must be valid id",
        );
        let ApiError::Validation(errors) = v.finish().unwrap_err() else {
            panic!("expected validation error");
        };
        let msgs: Vec<_> = errors.iter().map(|e| e.msg.as_str()).collect();
        assert_eq!(msgs, vec!["Followed id can't be empty.", "Must be valid id"]);
    }

    #[test]
    fn test_optional_body_id() {
        let mut v = Validator::new();
        assert_eq!(v.optional_body_id(&json!({}), "userId", "Invalid User ID"), None);
        assert!(v.is_empty());
        v.optional_body_id(&json!({ "userId": 42 }), "userId", "Invalid User ID");
        assert!(!v.is_empty());
    }

    #[test]
    fn test_pagination_bounds() {
        let mut query = HashMap::new();
        query.insert("limit".to_string(), "500".to_string());
        let mut v = Validator::new();
        pagination(&mut v, &query);
        let ApiError::Validation(errors) = v.finish().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].msg, "Limit must be a number between 1 and 100.");

        let mut query = HashMap::new();
        query.insert("page".to_string(), "0".to_string());
        let mut v = Validator::new();
        pagination(&mut v, &query);
        assert!(!v.is_empty());

        let mut v = Validator::new();
        assert_eq!(pagination(&mut v, &HashMap::new()), (1, 10));
        assert!(v.is_empty());
    }

    #[test]
    fn test_search_term() {
        assert!(is_valid_search("Jane Doe-Smith"));
        assert!(!is_valid_search("drop;table"));
        assert!(!is_valid_search(""));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;&#x2F;b&gt;"
        );
    }

    #[test]
    fn test_parse_iso_date() {
        assert!(parse_iso_date("1990-04-12").is_some());
        assert!(parse_iso_date("1990-04-12T10:00:00Z").is_some());
        assert!(parse_iso_date("12/04/1990").is_none());
    }

    #[test]
    fn test_string_array() {
        assert_eq!(
            string_array(&json!(["chess", "go"])),
            Some(vec!["chess".to_string(), "go".to_string()])
        );
        assert_eq!(string_array(&json!(["chess", 1])), None);
        assert_eq!(string_array(&json!("chess")), None);
    }
}
