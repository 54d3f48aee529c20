//! Assertions evaluated against HTTP responses.
//!
//! Monitors carry assertions as raw JSON tagged by `type`. They are parsed into
//! [`Assertion`] before a job probes anything, so an unknown or malformed
//! assertion aborts the job instead of reading as a failed check.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AssertionError;

/// Comparators available to status code assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberComparator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl NumberComparator {
    pub fn compare(&self, value: i64, target: i64) -> bool {
        match self {
            NumberComparator::Eq => value == target,
            NumberComparator::NotEq => value != target,
            NumberComparator::Gt => value > target,
            NumberComparator::Gte => value >= target,
            NumberComparator::Lt => value < target,
            NumberComparator::Lte => value <= target,
        }
    }
}

/// Comparators available to header and body assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringComparator {
    Contains,
    NotContains,
    Eq,
    NotEq,
    Empty,
    NotEmpty,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl StringComparator {
    /// Ordering comparators are lexicographic
    pub fn compare(&self, value: &str, target: &str) -> bool {
        match self {
            StringComparator::Contains => value.contains(target),
            StringComparator::NotContains => !value.contains(target),
            StringComparator::Eq => value == target,
            StringComparator::NotEq => value != target,
            StringComparator::Empty => value.is_empty(),
            StringComparator::NotEmpty => !value.is_empty(),
            StringComparator::Gt => value > target,
            StringComparator::Gte => value >= target,
            StringComparator::Lt => value < target,
            StringComparator::Lte => value <= target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusAssertion {
    pub compare: NumberComparator,
    pub target: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderAssertion {
    pub compare: StringComparator,
    pub key: String,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextBodyAssertion {
    pub compare: StringComparator,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    Status(StatusAssertion),
    Header(HeaderAssertion),
    TextBody(TextBodyAssertion),
}

/// The parts of a response assertions look at
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub status: i64,

    /// Header map serialized as a JSON object
    pub headers: &'a str,

    pub body: &'a str,
}

impl Assertion {
    pub fn parse(raw: &Value) -> Result<Self, AssertionError> {
        let kind = raw.get("type").and_then(Value::as_str).ok_or(AssertionError::MissingKind)?;

        let parsed = match kind {
            "status" => serde_json::from_value(raw.clone()).map(Assertion::Status),
            "header" => serde_json::from_value(raw.clone()).map(Assertion::Header),
            "textBody" => serde_json::from_value(raw.clone()).map(Assertion::TextBody),
            other => return Err(AssertionError::UnknownKind(other.to_string())),
        };

        parsed.map_err(|source| AssertionError::Malformed { kind: kind.to_string(), source })
    }

    pub fn evaluate(&self, input: &Evaluation<'_>) -> Result<bool, AssertionError> {
        match self {
            Assertion::Status(assertion) => {
                Ok(assertion.compare.compare(input.status, assertion.target))
            }
            Assertion::Header(assertion) => {
                let headers: Map<String, Value> =
                    serde_json::from_str(input.headers).map_err(AssertionError::Headers)?;

                let Some(value) = headers.get(&assertion.key) else {
                    return Ok(false);
                };
                let value = match value {
                    Value::String(value) => value.clone(),
                    other => other.to_string(),
                };
                Ok(assertion.compare.compare(&value, &assertion.target))
            }
            Assertion::TextBody(assertion) => {
                Ok(assertion.compare.compare(input.body, &assertion.target))
            }
        }
    }
}

/// Parse every raw assertion, failing on the first that cannot be understood
pub fn parse_assertions(raw: &[Value]) -> Result<Vec<Assertion>, AssertionError> {
    raw.iter().map(Assertion::parse).collect()
}

/// AND over all assertions; with none, the status code must be 2xx
pub fn evaluate_all(assertions: &[Assertion], input: &Evaluation<'_>) -> Result<bool, AssertionError> {
    if assertions.is_empty() {
        return Ok((200..300).contains(&input.status));
    }

    for assertion in assertions {
        if !assertion.evaluate(input)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HEADERS: &str = r#"{"Content-Type":"application/json","X-Count":"12"}"#;

    fn input(status: i64) -> Evaluation<'static> {
        Evaluation { status, headers: HEADERS, body: "{\"ok\":true}" }
    }

    fn parse(raw: Value) -> Assertion {
        Assertion::parse(&raw).unwrap()
    }

    #[test]
    fn test_empty_list_requires_2xx() {
        assert!(evaluate_all(&[], &input(200)).unwrap());
        assert!(evaluate_all(&[], &input(299)).unwrap());
        assert!(!evaluate_all(&[], &input(301)).unwrap());
        assert!(!evaluate_all(&[], &input(500)).unwrap());
    }

    #[test]
    fn test_and_law() {
        let passing = parse(json!({"type": "status", "compare": "eq", "target": 200}));
        let failing = parse(json!({"type": "textBody", "compare": "contains", "target": "error"}));

        assert!(evaluate_all(&[passing.clone(), passing.clone()], &input(200)).unwrap());
        assert!(!evaluate_all(&[passing.clone(), failing.clone()], &input(200)).unwrap());
        assert!(!evaluate_all(&[failing], &input(200)).unwrap());
    }

    #[test]
    fn test_assertions_replace_the_2xx_rule() {
        let expects_404 = parse(json!({"type": "status", "compare": "eq", "target": 404}));
        assert!(evaluate_all(&[expects_404], &input(404)).unwrap());
    }

    #[test]
    fn test_status_comparators() {
        let cases = [
            ("eq", 200, true),
            ("not_eq", 200, false),
            ("gt", 199, true),
            ("gte", 200, true),
            ("lt", 200, false),
            ("lte", 200, true),
        ];
        for (compare, target, expected) in cases {
            let assertion = parse(json!({"type": "status", "compare": compare, "target": target}));
            assert_eq!(assertion.evaluate(&input(200)).unwrap(), expected, "{compare} {target}");
        }
    }

    #[test]
    fn test_string_comparators() {
        use StringComparator::*;
        assert!(Contains.compare("hello world", "world"));
        assert!(NotContains.compare("hello", "world"));
        assert!(Eq.compare("a", "a"));
        assert!(NotEq.compare("a", "b"));
        assert!(Empty.compare("", "ignored"));
        assert!(NotEmpty.compare("x", ""));
        assert!(Gt.compare("b", "a"));
        assert!(Gte.compare("a", "a"));
        assert!(Lt.compare("10", "9"));
        assert!(Lte.compare("a", "b"));
    }

    #[test]
    fn test_header_assertion() {
        let matching = parse(json!({
            "type": "header", "compare": "contains", "key": "Content-Type", "target": "json"
        }));
        assert!(matching.evaluate(&input(200)).unwrap());

        let other_case = parse(json!({
            "type": "header", "compare": "eq", "key": "content-type", "target": "application/json"
        }));
        assert!(!other_case.evaluate(&input(200)).unwrap());
    }

    #[test]
    fn test_missing_header_is_false() {
        let assertion = parse(json!({
            "type": "header", "compare": "empty", "key": "X-Missing"
        }));
        assert!(!assertion.evaluate(&input(200)).unwrap());
    }

    #[test]
    fn test_non_string_header_values_are_stringified() {
        let assertion = parse(json!({"type": "header", "compare": "eq", "key": "n", "target": "5"}));
        let evaluation = Evaluation { status: 200, headers: r#"{"n":5}"#, body: "" };
        assert!(assertion.evaluate(&evaluation).unwrap());
    }

    #[test]
    fn test_unparseable_headers_are_an_error() {
        let assertion = parse(json!({"type": "header", "compare": "eq", "key": "a", "target": "b"}));
        let evaluation = Evaluation { status: 200, headers: "not json", body: "" };
        assert!(matches!(assertion.evaluate(&evaluation), Err(AssertionError::Headers(_))));
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let raw = [
            json!({"type": "status", "compare": "eq", "target": 200}),
            json!({"type": "jsonBody", "compare": "eq", "target": "x"}),
        ];
        let error = parse_assertions(&raw).unwrap_err();
        assert!(matches!(error, AssertionError::UnknownKind(kind) if kind == "jsonBody"));
    }

    #[test]
    fn test_malformed_assertions() {
        let missing_type = Assertion::parse(&json!({"compare": "eq"})).unwrap_err();
        assert!(matches!(missing_type, AssertionError::MissingKind));

        // string comparators are not valid for status codes
        let wrong_comparator =
            Assertion::parse(&json!({"type": "status", "compare": "contains", "target": 200}))
                .unwrap_err();
        assert!(matches!(wrong_comparator, AssertionError::Malformed { kind, .. } if kind == "status"));
    }
}
