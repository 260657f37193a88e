use std::collections::VecDeque;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use tracing::debug;

/// One prompt in, one reply out. No retries; the transport's timeouts are
/// the only timeout contract.
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama `/api/generate` backend, non-streaming.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, temperature: f64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
        })
    }
}

impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature }
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("generation request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("generation backend returned {}: {}", status.as_u16(), body);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("generation response was not valid JSON")?;

        let text = body
            .get("response")
            .and_then(|value| value.as_str())
            .context("generation response missing the response field")?;

        debug!(model = %self.model, chars = text.len(), "generation completed");
        Ok(text.to_string())
    }
}

/// Deterministic stand-in when no model endpoint is configured:
/// classification prompts get `GENERAL`, everything else a fixed reply.
#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator;

impl TextGenerator for OfflineGenerator {
    fn model_name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.starts_with("Classify the following student query") {
            return Ok("GENERAL".to_string());
        }

        Ok("I don't have a language model configured right now, but I can still help: \
            ask me a mathematics question with concrete numbers, or ask about a physical \
            constant, and I'll work out what I can deterministically."
            .to_string())
    }
}

/// Test backend: replays a fixed queue of replies; an exhausted queue models
/// a generation failure.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<String>>>,
}

impl ScriptedGenerator {
    pub fn with_replies(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(Into::into).collect(),
            )),
        }
    }
}

impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        match self.replies.lock().pop_front() {
            Some(reply) => Ok(reply),
            None => bail!("scripted generator has no replies left"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Generator {
    Ollama(OllamaGenerator),
    Offline(OfflineGenerator),
    Scripted(ScriptedGenerator),
}

impl Generator {
    /// Ollama when `SAGE_OLLAMA_BASE_URL` is set, offline otherwise.
    pub fn from_env() -> Result<Self> {
        match env::var("SAGE_OLLAMA_BASE_URL") {
            Ok(base_url) => {
                let model =
                    env::var("SAGE_MODEL").unwrap_or_else(|_| "qwen3:0.6b".to_string());
                let temperature = env::var("SAGE_TEMPERATURE")
                    .ok()
                    .and_then(|value| value.parse::<f64>().ok())
                    .unwrap_or(0.3);
                Ok(Self::Ollama(OllamaGenerator::new(base_url, model, temperature)?))
            }
            Err(_) => Ok(Self::Offline(OfflineGenerator)),
        }
    }
}

impl TextGenerator for Generator {
    fn model_name(&self) -> &str {
        match self {
            Generator::Ollama(backend) => backend.model_name(),
            Generator::Offline(backend) => backend.model_name(),
            Generator::Scripted(backend) => backend.model_name(),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            Generator::Ollama(backend) => backend.generate(prompt).await,
            Generator::Offline(backend) => backend.generate(prompt).await,
            Generator::Scripted(backend) => backend.generate(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replays_in_order_then_fails() {
        let backend = ScriptedGenerator::with_replies(["first", "second"]);
        assert_eq!(backend.generate("x").await.unwrap(), "first");
        assert_eq!(backend.generate("x").await.unwrap(), "second");
        assert!(backend.generate("x").await.is_err());
    }

    #[tokio::test]
    async fn offline_answers_classification_with_general() {
        let backend = OfflineGenerator;
        let reply = backend
            .generate("Classify the following student query into one of these categories: ...")
            .await
            .unwrap();
        assert_eq!(reply, "GENERAL");
    }
}
