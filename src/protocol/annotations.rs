//! Annotations attached to streamed assistant messages.
//!
//! The annotation list is free-form JSON supplied by the upstream streaming
//! API (a pre-existing external contract). Entries that are not objects, lack
//! a `type` field, or fail to deserialize are silently excluded — malformed
//! metadata never raises an error, it just doesn't render.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured annotation, tagged by its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Annotation {
    #[serde(rename = "progress")]
    Progress(ProgressAnnotation),
    #[serde(rename = "usage")]
    Usage(UsageAnnotation),
    #[serde(other)]
    Other,
}

/// Progress update streamed alongside a message. Higher `value` supersedes
/// lower; the list is unordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressAnnotation {
    pub value: f64,
    pub message: String,
}

/// Token-usage annotation. The counts live under `value` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageAnnotation {
    pub value: TokenUsage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub completion_tokens: u64,
    pub prompt_tokens: u64,
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cache_hit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cache_miss: Option<bool>,
}

/// Message document handed to the renderer by the streaming API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

/// Keep only annotations that are JSON objects carrying a `type` field and
/// deserialize cleanly. Everything else is dropped without complaint.
pub fn filter_annotations(values: &[Value]) -> Vec<Annotation> {
    values
        .iter()
        .filter(|v| v.as_object().is_some_and(|o| o.contains_key("type")))
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

/// The progress annotation with the maximum `value`. The earliest entry wins
/// ties, matching the stable descending sort this replaces.
pub fn latest_progress(annotations: &[Annotation]) -> Option<&ProgressAnnotation> {
    let mut best: Option<&ProgressAnnotation> = None;
    for annotation in annotations {
        if let Annotation::Progress(p) = annotation
            && best.is_none_or(|b| p.value > b.value)
        {
            best = Some(p);
        }
    }
    best
}

/// The first usage annotation's payload. At most one is expected.
pub fn usage(annotations: &[Annotation]) -> Option<&TokenUsage> {
    annotations.iter().find_map(|a| match a {
        Annotation::Usage(u) => Some(&u.value),
        _ => None,
    })
}
