use async_trait::async_trait;

use crate::advisor::model::AdvisorBackend;

pub struct AlwaysFail;

#[async_trait]
impl AdvisorBackend for AlwaysFail {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("service unavailable"))
    }
}

/// Answers every prompt with the same text.
pub struct Canned(pub String);

#[async_trait]
impl AdvisorBackend for Canned {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}
