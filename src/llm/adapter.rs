//! LLM API アダプター
//!
//! どのプロバイダーも OpenAI 互換の `chat/completions` を持つが、
//! Zhipu だけは深い推論を無効化する `thinking` フラグを受け付ける。
//! 差分は [`ChatCompletion`] の実装ごとに閉じ込め、
//! [`HttpAdapterFactory`] がプロバイダーの [`Protocol`] で振り分ける。

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::auth::ApiKey;
use super::registry::{Protocol, Provider};
use crate::error::ExtractError;

/// エラーメッセージに含めるレスポンス本文の最大文字数
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 1回の補完リクエスト
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// モデル・メッセージ・パラメータを受け取り、補完テキストを返す
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError>;
}

/// プロバイダーに対応するアダプターを作る
pub trait AdapterFactory: Send + Sync {
    fn adapter(&self, provider: &'static Provider, api_key: ApiKey) -> Box<dyn ChatCompletion>;
}

/// HTTP経由の本番用ファクトリ
pub struct HttpAdapterFactory {
    http: reqwest::Client,
}

impl HttpAdapterFactory {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("HTTPクライアントの作成に失敗")?;
        Ok(Self { http })
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn adapter(&self, provider: &'static Provider, api_key: ApiKey) -> Box<dyn ChatCompletion> {
        let endpoint = ChatEndpoint::new(self.http.clone(), provider.completions_url(), api_key);
        match provider.protocol {
            Protocol::OpenAiCompatible => Box::new(OpenAiAdapter::new(endpoint)),
            Protocol::Zhipu => Box::new(ZhipuAdapter::new(endpoint)),
        }
    }
}

/// OpenAI / Aliyun / Moonshot 用
pub struct OpenAiAdapter {
    endpoint: ChatEndpoint,
}

impl OpenAiAdapter {
    pub fn new(endpoint: ChatEndpoint) -> Self {
        Self { endpoint }
    }

    fn body<'a>(&self, request: &'a CompletionRequest) -> ChatCompletionBody<'a> {
        ChatCompletionBody::new(request)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiAdapter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError> {
        self.endpoint.post(&self.body(request)).await
    }
}

/// Zhipu 用（深い推論を無効化）
pub struct ZhipuAdapter {
    endpoint: ChatEndpoint,
}

impl ZhipuAdapter {
    pub fn new(endpoint: ChatEndpoint) -> Self {
        Self { endpoint }
    }

    fn body<'a>(&self, request: &'a CompletionRequest) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            thinking: Some(Thinking { kind: "disabled" }),
            ..ChatCompletionBody::new(request)
        }
    }
}

#[async_trait]
impl ChatCompletion for ZhipuAdapter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError> {
        self.endpoint.post(&self.body(request)).await
    }
}

/// chat/completions エンドポイント
pub struct ChatEndpoint {
    http: reqwest::Client,
    url: String,
    api_key: ApiKey,
}

impl ChatEndpoint {
    pub fn new(http: reqwest::Client, url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            http,
            url: url.into(),
            api_key,
        }
    }

    async fn post(&self, body: &ChatCompletionBody<'_>) -> Result<String, ExtractError> {
        debug!(url = %self.url, model = body.model, "補完リクエスト送信");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error_text: String = error_text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(ExtractError::Transport(format!("{}: {}", status, error_text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;
        completion_content(&text)
    }
}

// chat/completions リクエスト/レスポンス構造体

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Thinking>,
}

impl<'a> ChatCompletionBody<'a> {
    fn new(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            thinking: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Thinking {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// レスポンス本文から最初の候補のテキストを取り出す
fn completion_content(body: &str) -> Result<String, ExtractError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ExtractError::Transport(format!("レスポンス形式が不正: {}", e)))?;

    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "glm-4.5-flash".to_string(),
            messages: vec![ChatMessage::system("extract"), ChatMessage::user("paper text")],
            max_tokens: 2048,
            temperature: 0.4,
        }
    }

    fn endpoint(url: &str) -> ChatEndpoint {
        ChatEndpoint::new(reqwest::Client::new(), url, ApiKey::new("sk-test"))
    }

    #[test]
    fn openai_body_has_no_thinking_flag() {
        let request = request();
        let adapter = OpenAiAdapter::new(endpoint("http://unused"));

        let body = serde_json::to_value(adapter.body(&request)).unwrap();

        assert_eq!(body["model"], "glm-4.5-flash");
        assert_eq!(body["max_tokens"], 2048);
        assert!(body.get("thinking").is_none());
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "extract"},
                {"role": "user", "content": "paper text"}
            ])
        );
    }

    #[test]
    fn zhipu_body_disables_thinking() {
        let request = request();
        let adapter = ZhipuAdapter::new(endpoint("http://unused"));

        let body = serde_json::to_value(adapter.body(&request)).unwrap();

        assert_eq!(body["thinking"], json!({"type": "disabled"}));
        assert_eq!(body["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(4.0));
    }

    #[test]
    fn completion_content_takes_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "first"}}, {"message": {"content": "second"}}]}"#;
        assert_eq!(completion_content(body).unwrap(), "first");
    }

    #[test]
    fn completion_without_content_is_empty() {
        assert_eq!(completion_content(r#"{"choices": []}"#).unwrap(), "");
        assert_eq!(completion_content(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap(), "");
    }

    #[test]
    fn malformed_envelope_is_a_transport_failure() {
        let err = completion_content("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, ExtractError::Transport(_)));
    }

    /// 1回だけ応答するHTTPサーバー（受信したリクエストを返す）
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}/chat/completions", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn zhipu_adapter_posts_and_reads_completion() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices": [{"message": {"content": "{\"title\": \"T\", \"authors\": [\"A\"]}"}}]}"#,
        )
        .await;
        let adapter = ZhipuAdapter::new(endpoint(&url));

        let content = adapter.complete(&request()).await.unwrap();
        let raw_request = server.await.unwrap();

        assert_eq!(content, r#"{"title": "T", "authors": ["A"]}"#);
        assert!(raw_request.starts_with("POST /chat/completions"));
        assert!(raw_request.to_lowercase().contains("authorization: bearer sk-test"));

        let body_start = raw_request.find("\r\n\r\n").unwrap() + 4;
        let body: Value = serde_json::from_str(&raw_request[body_start..]).unwrap();
        assert_eq!(body["thinking"]["type"], "disabled");
    }

    #[tokio::test]
    async fn error_status_is_a_transport_failure() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"error": "invalid api key"}"#).await;
        let adapter = OpenAiAdapter::new(endpoint(&url));

        let err = adapter.complete(&request()).await.unwrap_err();
        server.await.unwrap();

        match err {
            ExtractError::Transport(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        // 使われていないポートを確保してすぐ閉じる
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let adapter = OpenAiAdapter::new(endpoint(&format!("http://{}/chat/completions", addr)));
        let err = adapter.complete(&request()).await.unwrap_err();

        assert!(matches!(err, ExtractError::Transport(_)));
    }
}
