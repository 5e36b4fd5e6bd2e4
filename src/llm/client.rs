//! 論文情報抽出クライアント

use std::time::Duration;
use tracing::{debug, info};

use super::adapter::{AdapterFactory, ChatMessage, CompletionRequest, HttpAdapterFactory};
use super::auth::ApiKey;
use super::registry::{self, ModelPreset, Provider};
use crate::error::ExtractError;
use crate::parser::{parse_response, PaperInfo};

/// 論文情報を抽出させるシステムプロンプト
pub const EXTRACTION_PROMPT: &str = r#"You are a research paper assistant. You will receive the first lines of a paper. Identify the paper's title, its authors, and its publication year. Reply with JSON only, in exactly this format:
{
  "title": "Paper title",
  "authors": ["Author 1", "Author 2", ...],
  "year": "Publication year (if available)"
}"#;

/// 抽出リクエストの送信先
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub provider: &'static Provider,
    pub model: &'static ModelPreset,
}

impl Target {
    /// プロバイダーとモデルを検証（不明なIDはエラー）
    pub fn resolve(provider_id: &str, model_id: &str) -> Result<Self, ExtractError> {
        let provider = registry::find(provider_id)
            .ok_or_else(|| ExtractError::UnsupportedProvider(provider_id.to_string()))?;
        let model = provider
            .model(model_id)
            .ok_or_else(|| ExtractError::UnsupportedModel {
                provider: provider.display_name.to_string(),
                model: model_id.to_string(),
            })?;
        Ok(Self { provider, model })
    }

    /// APIキーが無ければ `MissingCredential`
    pub fn require_key<'k>(&self, api_key: Option<&'k ApiKey>) -> Result<&'k ApiKey, ExtractError> {
        api_key.ok_or_else(|| ExtractError::MissingCredential {
            provider: self.provider.display_name.to_string(),
        })
    }
}

/// 抽出プロンプトとモデル設定からリクエストを組み立てる
pub fn build_request(model: &ModelPreset, text: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.name.to_string(),
        messages: vec![ChatMessage::system(EXTRACTION_PROMPT), ChatMessage::user(text)],
        max_tokens: model.max_tokens,
        temperature: model.temperature,
    }
}

/// 論文情報抽出クライアント
///
/// APIキーは呼び出しごとに受け取り、保存済みの状態は変更しない。
/// 失敗時の再試行は呼び出し側が判断する。
pub struct ExtractionClient<F = HttpAdapterFactory> {
    factory: F,
}

impl ExtractionClient<HttpAdapterFactory> {
    /// HTTP経由のクライアントを作成
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self::with_factory(HttpAdapterFactory::new(timeout)?))
    }
}

impl<F: AdapterFactory> ExtractionClient<F> {
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }

    /// テキストから論文情報を抽出
    pub async fn extract(
        &self,
        provider_id: &str,
        model_id: &str,
        api_key: Option<&ApiKey>,
        text: &str,
    ) -> Result<PaperInfo, ExtractError> {
        let target = Target::resolve(provider_id, model_id)?;
        let api_key = target.require_key(api_key)?;

        let request = build_request(target.model, text);
        let adapter = self.factory.adapter(target.provider, api_key.clone());

        info!(
            provider = target.provider.id,
            model = target.model.name,
            chars = text.chars().count(),
            "論文情報の抽出を開始"
        );
        let content = adapter.complete(&request).await?;
        debug!(response = %content, "モデルの応答");

        let info = parse_response(&content)?;
        info!(
            title = %info.title,
            authors = info.authors.len(),
            year = ?info.year,
            "論文情報を抽出"
        );
        Ok(info)
    }
}
