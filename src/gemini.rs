//! Gemini API連携
//!
//! 画像（inline_data）→ 評審指示テキストの順で1リクエストにまとめ、
//! システム指示と生成パラメータを付けて generateContent を呼ぶ。

use async_trait::async_trait;
use focuslens_common::types::{extract_base64_from_data_url, extract_mime_type_from_data_url};
use focuslens_common::{
    Error as CommonError, EvaluationRequest, Evaluator, GENERATION_PARAMS, SYSTEM_PROMPT,
    USER_PROMPT,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Gemini APIリクエスト
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request(images: &[String]) -> GeminiRequest {
    let mut parts: Vec<Part> = images
        .iter()
        .map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: extract_mime_type_from_data_url(image).to_string(),
                data: extract_base64_from_data_url(image).to_string(),
            },
        })
        .collect();
    parts.push(Part::Text {
        text: USER_PROMPT.to_string(),
    });

    GeminiRequest {
        contents: vec![Content { parts }],
        system_instruction: Content {
            parts: vec![Part::Text {
                text: SYSTEM_PROMPT.to_string(),
            }],
        },
        generation_config: GenerationConfig {
            temperature: GENERATION_PARAMS.temperature,
            top_p: GENERATION_PARAMS.top_p,
            top_k: GENERATION_PARAMS.top_k,
        },
    }
}

/// 最初の候補のテキストパートを連結（空なら None）
fn extract_text(response: GeminiResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

pub struct GeminiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl GeminiClient {
    /// リクエスト全体（接続〜本文受信）のタイムアウトを指定して作成
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_seconds);
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(&self, request: &EvaluationRequest) -> focuslens_common::Result<String> {
        let url = request.endpoint.generate_content_url();
        let body = build_request(&request.images);

        tracing::info!(
            model = %request.endpoint.model,
            base_url = %request.endpoint.base_url,
            images = request.images.len(),
            "calling generateContent"
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", request.endpoint.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| CommonError::external(&e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "generateContent failed");
            return Err(CommonError::external(&format!("{} {}", status, text)));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| CommonError::external(&e.without_url().to_string()))?;

        extract_text(payload).ok_or_else(CommonError::empty_response)
    }
}

#[async_trait]
impl Evaluator for GeminiClient {
    async fn evaluate(&self, request: &EvaluationRequest) -> focuslens_common::Result<String> {
        self.call(request).await
    }
}
