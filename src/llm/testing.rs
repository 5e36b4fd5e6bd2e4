//! テスト用のアダプター

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::adapter::{AdapterFactory, ChatCompletion, CompletionRequest};
use super::auth::ApiKey;
use super::registry::Provider;
use crate::error::ExtractError;

pub type Calls = Arc<Mutex<Vec<(String, CompletionRequest)>>>;
type Responder = Arc<dyn Fn(&CompletionRequest) -> Result<String, ExtractError> + Send + Sync>;

/// 送信されたリクエストを記録し、決まった応答を返すファクトリ
pub struct FakeFactory {
    calls: Calls,
    responder: Responder,
}

impl FakeFactory {
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, ExtractError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Arc::default(),
            responder: Arc::new(responder),
        }
    }

    pub fn replying(content: &str) -> Self {
        let content = content.to_string();
        Self::new(move |_| Ok(content.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(ExtractError::Transport(message.clone())))
    }

    pub fn calls(&self) -> Calls {
        Arc::clone(&self.calls)
    }
}

impl AdapterFactory for FakeFactory {
    fn adapter(&self, provider: &'static Provider, _api_key: ApiKey) -> Box<dyn ChatCompletion> {
        Box::new(FakeAdapter {
            provider_id: provider.id,
            calls: Arc::clone(&self.calls),
            responder: Arc::clone(&self.responder),
        })
    }
}

struct FakeAdapter {
    provider_id: &'static str,
    calls: Calls,
    responder: Responder,
}

#[async_trait]
impl ChatCompletion for FakeAdapter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractError> {
        self.calls
            .lock()
            .unwrap()
            .push((self.provider_id.to_string(), request.clone()));
        (self.responder)(request)
    }
}
