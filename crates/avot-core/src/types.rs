use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one graph execution.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single hit returned by the retrieval capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub source: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#ref: Option<String>,
}

impl MemoryHit {
    pub fn new(source: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            snippet: snippet.into(),
            r#ref: None,
        }
    }
}

/// Result of a coherence evaluation. `score` is in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coherence {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Per-call options for the generation capability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f64>,
    pub model: Option<String>,
}

/// Render a payload as prompt/query text: strings verbatim, anything else as JSON.
pub fn payload_text(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_text() {
        assert_eq!(payload_text(&serde_json::json!("plain")), "plain");
        assert_eq!(
            payload_text(&serde_json::json!({"query": "flood"})),
            r#"{"query":"flood"}"#
        );
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from_str("s-1").to_string(), "s-1");
    }

    #[test]
    fn test_memory_hit_omits_empty_ref() {
        let hit = MemoryHit::new("codex", "snippet");
        let json = serde_json::to_value(&hit).unwrap();
        assert!(json.get("ref").is_none());
    }
}
