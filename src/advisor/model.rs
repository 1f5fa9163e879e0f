use async_trait::async_trait;

/// Text completion service answering questions about the generated firmware.
#[async_trait]
pub trait AdvisorBackend {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
