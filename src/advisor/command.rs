use async_trait::async_trait;
use std::collections::HashMap;

use crate::advisor::model::AdvisorBackend;

pub struct Config {
    pub envs: HashMap<String, String>,
    pub command: String,
    pub args: Vec<String>,
}

/// Runs an external program with the prompt as last argument and returns its stdout.
pub struct CommandBackend {
    config: Config,
}

impl CommandBackend {
    pub fn new(config: Config) -> CommandBackend {
        CommandBackend { config }
    }
}

#[async_trait]
impl AdvisorBackend for CommandBackend {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let output = async_process::Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(prompt)
            .envs(&self.config.envs)
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.config.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
