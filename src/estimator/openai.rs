//! OpenAI互換 chat-completions クライアント

use super::{parse_estimate_response, PriceEstimator};
use crate::config::EstimatorSettings;
use crate::error::{PriceSyncError, Result};
use price_sync_common::{build_price_prompt, PriceQuote, PRICE_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 200;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiEstimator {
    client: reqwest::Client,
    settings: EstimatorSettings,
}

impl OpenAiEstimator {
    pub fn new(settings: EstimatorSettings) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, settings))
    }

    /// 既存のクライアントを使って生成
    pub fn with_client(client: reqwest::Client, settings: EstimatorSettings) -> Self {
        Self { client, settings }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: PRICE_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    /// 1回のcompletionを実行して本文を返す
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| PriceSyncError::Unavailable(format!("見積りAPI接続エラー: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PriceSyncError::from_status(
                status.as_u16(),
                format!("見積りAPI: {}", body.trim()),
            ));
        }

        let body = response.text().await?;
        extract_content(&body)
    }
}

/// レスポンスJSONから choices[0].message.content を取り出す
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| PriceSyncError::Malformed(format!("見積りAPIレスポンス: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| PriceSyncError::Malformed("見積りAPIの応答が空です".into()))
}

impl PriceEstimator for OpenAiEstimator {
    async fn estimate(&self, description: &str) -> Result<PriceQuote> {
        let prompt = build_price_prompt(description);
        tracing::debug!(model = %self.settings.model, description, "価格見積りを要求");

        let content = self.complete(&prompt).await?;
        let quote = parse_estimate_response(&content)?;

        tracing::debug!(
            average = quote.average_price,
            sources = quote.source_count,
            confidence = quote.confidence,
            "見積り取得"
        );
        Ok(quote)
    }
}
