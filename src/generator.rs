//! Natural-language to SQL, through a remote chat-completion endpoint. The
//! output is treated like any statement the user typed.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::schema::Generator as GeneratorConfig;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Request to the generator failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generator returned no statement")]
    Empty,
}

#[async_trait]
pub trait QueryGenerator: Send + Sync {
    /// Turn a prompt into a single statement, given a description of the
    /// tables it may use
    async fn generate(&self, prompt: &str, schema: &str) -> Result<String, GeneratorError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn system_prompt(schema: &str) -> String {
    let schema = if schema.is_empty() {
        "(no tables yet)"
    } else {
        schema
    };

    format!(
        "You translate requests into SQLite SQL. \
        Answer with exactly one SQLite statement and nothing else.\n\n\
        The database has these tables:\n{schema}"
    )
}

/// Pull the statement out of a reply that may be wrapped in a Markdown code
/// fence
pub fn extract_statement(reply: &str) -> String {
    let reply = reply.trim();
    let Some(start) = reply.find("```") else {
        return reply.to_string();
    };

    let fenced = &reply[start + 3..];
    let body = match fenced.split_once('\n') {
        // The first line is the (possibly empty) language tag
        Some((tag, rest)) if !tag.contains("```") => rest,
        _ => fenced,
    };

    body.split("```").next().unwrap_or_default().trim().to_string()
}

pub struct HttpQueryGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HttpQueryGenerator {
    pub fn try_new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl QueryGenerator for HttpQueryGenerator {
    async fn generate(&self, prompt: &str, schema: &str) -> Result<String, GeneratorError> {
        let system = system_prompt(schema);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let statement = extract_statement(&content);
        debug!("Generated statement: {statement}");

        if statement.is_empty() {
            Err(GeneratorError::Empty)
        } else {
            Ok(statement)
        }
    }
}
