use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{Coherence, GenerationOptions, MemoryHit};

/// Text generation capability (a language model behind some boundary).
pub trait Generation: Send + Sync + 'static {
    fn complete(&self, prompt: &str, options: GenerationOptions) -> BoxFuture<'_, Result<String>>;
}

/// Retrieval capability: ordered hits for a query over the given sources.
pub trait Retrieval: Send + Sync + 'static {
    fn search(&self, query: &str, sources: &[String]) -> BoxFuture<'_, Result<Vec<MemoryHit>>>;
}

/// Coherence evaluation capability.
pub trait CoherenceEvaluator: Send + Sync + 'static {
    fn evaluate(&self, expected_signature: Option<&str>) -> BoxFuture<'_, Result<Coherence>>;
}

/// The provider set a graph execution runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub generation: Arc<dyn Generation>,
    pub retrieval: Arc<dyn Retrieval>,
    pub coherence: Arc<dyn CoherenceEvaluator>,
}

impl Capabilities {
    pub fn new(
        generation: Arc<dyn Generation>,
        retrieval: Arc<dyn Retrieval>,
        coherence: Arc<dyn CoherenceEvaluator>,
    ) -> Self {
        Self {
            generation,
            retrieval,
            coherence,
        }
    }
}
