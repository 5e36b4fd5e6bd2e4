//! プロバイダー定義 - 対応するLLMサービスとモデル設定

use tracing::warn;

/// デフォルトのプロバイダー
pub const DEFAULT_PROVIDER: &str = "zhipu";
/// デフォルトのモデル
pub const DEFAULT_MODEL: &str = "glm-4.5-flash";

/// リクエスト形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// OpenAI互換の chat/completions
    OpenAiCompatible,
    /// OpenAI互換 + 深い推論を無効化する `thinking` フラグ
    Zhipu,
}

/// モデルごとの生成パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPreset {
    pub name: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// LLMプロバイダー
#[derive(Debug, PartialEq)]
pub struct Provider {
    pub id: &'static str,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub protocol: Protocol,
    pub models: &'static [ModelPreset],
}

impl Provider {
    /// モデル名からパラメータを取得
    pub fn model(&self, name: &str) -> Option<&'static ModelPreset> {
        self.models.iter().find(|m| m.name == name)
    }

    /// chat/completions のURL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

const fn preset(name: &'static str, max_tokens: u32) -> ModelPreset {
    ModelPreset {
        name,
        max_tokens,
        temperature: 0.4,
    }
}

/// 対応プロバイダー一覧（表示順）
pub static PROVIDERS: &[Provider] = &[
    Provider {
        id: "zhipu",
        display_name: "Zhipu AI",
        base_url: "https://open.bigmodel.cn/api/paas/v4",
        protocol: Protocol::Zhipu,
        models: &[
            preset("glm-4.5-flash", 2048),
            preset("glm-4", 2048),
            preset("glm-3-turbo", 1024),
        ],
    },
    Provider {
        id: "openai",
        display_name: "OpenAI",
        base_url: "https://api.openai.com/v1",
        protocol: Protocol::OpenAiCompatible,
        models: &[
            preset("gpt-4o-mini", 2048),
            preset("gpt-4o", 2048),
            preset("gpt-3.5-turbo", 1024),
        ],
    },
    Provider {
        id: "aliyun",
        display_name: "Alibaba Cloud (Qwen)",
        base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
        protocol: Protocol::OpenAiCompatible,
        models: &[preset("qwen-plus", 2048), preset("qwen-turbo", 2048)],
    },
    Provider {
        id: "moonshot",
        display_name: "Moonshot AI",
        base_url: "https://api.moonshot.cn/v1",
        protocol: Protocol::OpenAiCompatible,
        models: &[
            preset("moonshot-v1-8k", 2048),
            preset("moonshot-v1-32k", 2048),
            preset("moonshot-v1-128k", 2048),
        ],
    },
];

/// (ID, 表示名) の一覧
pub fn list_providers() -> Vec<(&'static str, &'static str)> {
    PROVIDERS.iter().map(|p| (p.id, p.display_name)).collect()
}

/// プロバイダーのモデル一覧（不明なIDはデフォルトのプロバイダー）
pub fn list_models(provider_id: &str) -> &'static [ModelPreset] {
    resolve(provider_id).models
}

/// IDでプロバイダーを検索
pub fn find(provider_id: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.id == provider_id)
}

/// IDでプロバイダーを取得（不明なIDはデフォルトにフォールバック）
///
/// 画面側の古い選択値で落ちないための措置。設定の不整合を隠すので、
/// 抽出処理では [`find`] を使う。
pub fn resolve(provider_id: &str) -> &'static Provider {
    find(provider_id).unwrap_or_else(|| {
        warn!(provider = provider_id, "不明なプロバイダー、デフォルトを使用");
        default_provider()
    })
}

pub fn default_provider() -> &'static Provider {
    &PROVIDERS[0]
}
