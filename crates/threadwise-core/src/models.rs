use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Literal substring a moderation response must contain to count as a rejection
pub const REJECTION_MARKER: &str = "Comment Rejected";

/// Maximum number of highlighted comments in an analysis
pub const MAX_HIGHLIGHTED_COMMENTS: usize = 3;

/// Maximum length of the debate summary, in characters
pub const MAX_DEBATE_SUMMARY_CHARS: usize = 350;

/// Comment creation time as supplied by the caller.
///
/// Callers hand over either a date value or a string; both render to the same
/// ISO-8601 form (`2024-05-01T12:00:00.000Z`) so prompts stay stable.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatedAt {
    Date(DateTime<Utc>),
    /// Milliseconds since the Unix epoch
    Millis(i64),
    Text(String),
}

impl CreatedAt {
    /// Read a timestamp from JSON: epoch milliseconds or a string. Anything else yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(CreatedAt::Millis),
            Value::String(s) => Some(CreatedAt::Text(s.clone())),
            _ => None,
        }
    }

    /// Normalized ISO-8601 rendering. Strings that are not RFC 3339 pass through verbatim.
    pub fn to_iso(&self) -> String {
        match self {
            CreatedAt::Date(dt) => format_iso(dt),
            CreatedAt::Millis(ms) => match Utc.timestamp_millis_opt(*ms).single() {
                Some(dt) => format_iso(&dt),
                None => ms.to_string(),
            },
            CreatedAt::Text(s) => match DateTime::parse_from_rfc3339(s.trim()) {
                Ok(dt) => format_iso(&dt.with_timezone(&Utc)),
                Err(_) => s.clone(),
            },
        }
    }
}

fn format_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<DateTime<Utc>> for CreatedAt {
    fn from(dt: DateTime<Utc>) -> Self {
        CreatedAt::Date(dt)
    }
}

impl From<&str> for CreatedAt {
    fn from(s: &str) -> Self {
        CreatedAt::Text(s.to_string())
    }
}

impl From<String> for CreatedAt {
    fn from(s: String) -> Self {
        CreatedAt::Text(s)
    }
}

impl Serialize for CreatedAt {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_iso())
    }
}

impl<'de> Deserialize<'de> for CreatedAt {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        CreatedAt::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("expected epoch milliseconds or a date string"))
    }
}

/// A user comment supplied by the caller for analysis.
///
/// Deserialization is lenient: counts may arrive as strings, missing or
/// mistyped fields fall back to defaults and unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Opaque identifier (string or number, whatever the caller stores)
    #[serde(rename = "_id", default)]
    pub id: Value,
    #[serde(alias = "comment", default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub replies_count: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub likes_count: u64,
    #[serde(
        rename = "created_at",
        default,
        deserialize_with = "lenient::created_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<CreatedAt>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Comment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Value::String(id.into()),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_counts(mut self, replies: u64, likes: u64) -> Self {
        self.replies_count = replies;
        self.likes_count = likes;
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<CreatedAt>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    /// Identifier as it appears in prompts: strings unquoted, anything else as JSON
    pub fn display_id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn created_at_iso(&self) -> Option<String> {
        self.created_at.as_ref().map(CreatedAt::to_iso)
    }
}

/// A comment picked by the backend as notable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedComment {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(rename = "reasonHighlighted", default, deserialize_with = "lenient::string")]
    pub reason_highlighted: String,
}

/// Sentiment split, each value a percentage string such as `"40%"`.
/// Bare numbers are accepted and kept without the sign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(default, deserialize_with = "lenient::string")]
    pub positive: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub neutral: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub negative: String,
}

impl Sentiment {
    /// Sum of the three percentages, or `None` if any value is not numeric
    pub fn total(&self) -> Option<f64> {
        let positive = parse_percentage(&self.positive)?;
        let neutral = parse_percentage(&self.neutral)?;
        let negative = parse_percentage(&self.negative)?;
        Some(positive + neutral + negative)
    }
}

fn parse_percentage(value: &str) -> Option<f64> {
    value.trim().trim_end_matches('%').trim().parse().ok()
}

/// Structured discussion analysis returned by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub debate_summary: String,
    #[serde(default, deserialize_with = "lenient::highlights")]
    pub highlighted_comments: Vec<HighlightedComment>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub sentiment: Sentiment,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub last_analyzed_comment_timestamp: Option<String>,
    /// Keys outside the documented shape, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    /// Parse a raw backend response. Markdown code fences around the JSON are tolerated.
    ///
    /// Only invalid JSON and non-object documents are errors; field types are read leniently.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(strip_code_fences(raw)).map_err(|e| Error::ResponseParse(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::ResponseParse("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| Error::ResponseParse(e.to_string()))
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Prior analysis carried over by the caller for incremental runs.
///
/// Kept as the caller's JSON document so it reaches the prompt exactly as supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviousAnalysis(Value);

impl PreviousAnalysis {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn last_analyzed_comment_timestamp(&self) -> Option<&str> {
        self.0.get("lastAnalyzedCommentTimestamp").and_then(Value::as_str)
    }

    pub fn highlighted_count(&self) -> usize {
        self.0
            .get("highlightedComments")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// True when the document carries no data at all
    pub fn is_empty(&self) -> bool {
        is_blank(&self.0)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_blank),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

impl From<AnalysisResult> for PreviousAnalysis {
    fn from(result: AnalysisResult) -> Self {
        Self(serde_json::to_value(result).unwrap_or_default())
    }
}

impl From<Value> for PreviousAnalysis {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Field readers that never reject a document over a field's type
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{CreatedAt, HighlightedComment};

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    pub fn created_at<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<CreatedAt>, D::Error> {
        Ok(CreatedAt::from_json(&Value::deserialize(deserializer)?))
    }

    pub fn highlights<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<HighlightedComment>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
    }
}

/// Outcome of a moderation call. `is_rejected` is `None` when no verdict could be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationVerdict {
    pub is_rejected: Option<bool>,
    pub reason: String,
}

impl ModerationVerdict {
    /// Classify a raw provider response; the response itself becomes the reason
    pub fn from_response(raw: String) -> Self {
        Self {
            is_rejected: Some(raw.contains(REJECTION_MARKER)),
            reason: raw,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            is_rejected: None,
            reason: reason.into(),
        }
    }
}

/// Outcome of an analysis call. `analysis` is `None` on failure, `reason` is set only then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub analysis: Option<AnalysisResult>,
    pub reason: Option<String>,
}

impl AnalysisOutcome {
    pub fn success(analysis: AnalysisResult) -> Self {
        Self {
            analysis: Some(analysis),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            analysis: None,
            reason: Some(reason.into()),
        }
    }
}
