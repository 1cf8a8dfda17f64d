//! Stub capability providers.
//!
//! Deterministic stand-ins used by the CLI and scenario harness where no
//! real generation, retrieval, or coherence backend is wired in.

use std::sync::Arc;

use futures::future::BoxFuture;

use avot_core::config::StubConfig;
use avot_core::error::Result;
use avot_core::traits::{Capabilities, CoherenceEvaluator, Generation, Retrieval};
use avot_core::types::{Coherence, GenerationOptions, MemoryHit};

pub struct StubGeneration;

impl Generation for StubGeneration {
    fn complete(&self, prompt: &str, _options: GenerationOptions) -> BoxFuture<'_, Result<String>> {
        let text = format!("[[STUB LLM OUTPUT]]\nPrompt:\n{}", prompt);
        Box::pin(async move { Ok(text) })
    }
}

pub struct StubRetrieval;

impl Retrieval for StubRetrieval {
    fn search(&self, query: &str, sources: &[String]) -> BoxFuture<'_, Result<Vec<MemoryHit>>> {
        let hits = sources
            .iter()
            .map(|s| MemoryHit::new(s.clone(), format!("[[STUB MEMORY HIT for '{}']]", query)))
            .collect();
        Box::pin(async move { Ok(hits) })
    }
}

pub struct StubCoherence {
    score: f64,
}

impl StubCoherence {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

impl CoherenceEvaluator for StubCoherence {
    fn evaluate(&self, expected_signature: Option<&str>) -> BoxFuture<'_, Result<Coherence>> {
        let coherence = Coherence {
            score: self.score,
            signature: Some(expected_signature.unwrap_or("coherence.neutral").to_string()),
        };
        Box::pin(async move { Ok(coherence) })
    }
}

/// The full stub provider set.
pub fn stub_capabilities(config: &StubConfig) -> Capabilities {
    Capabilities::new(
        Arc::new(StubGeneration),
        Arc::new(StubRetrieval),
        Arc::new(StubCoherence::new(config.coherence_score)),
    )
}
