//! APIキー管理 - プロバイダーごとのAPIキーをローカルのJSONファイルに保存

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// APIキー（Debug出力では伏せ字）
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// 生のキーを取得（APIリクエスト時のみ使用）
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// キー入力ダイアログの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEdit {
    /// 既存のキーをそのまま使う
    Unchanged,
    /// 新しいキーで置き換える
    Replace(String),
}

impl KeyEdit {
    /// 入力欄の値から判定（既存キーがあり空欄なら変更なし）
    pub fn from_input(input: &str, has_existing: bool) -> Option<Self> {
        match (input.trim().is_empty(), has_existing) {
            (true, true) => Some(Self::Unchanged),
            (true, false) => None,
            (false, _) => Some(Self::Replace(input.to_string())),
        }
    }
}

/// 表示用にキーを伏せ字化
///
/// 8文字を超える場合は先頭4文字と末尾4文字のみ表示。
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    if len <= 8 {
        return "*".repeat(len);
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[len - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(len - 8), tail)
}

/// プロバイダーID → APIキー の保存先
///
/// ファイルが無い、または壊れている場合は空として扱う。
/// 更新のたびにファイル全体を書き直す。
pub struct CredentialStore {
    path: PathBuf,
    keys: BTreeMap<String, String>,
}

impl CredentialStore {
    /// ファイルから読み込み
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys = read_keys(&path);
        debug!(path = %path.display(), count = keys.len(), "APIキーファイルを読み込み");
        Self { path, keys }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, provider: &str) -> Option<ApiKey> {
        self.keys.get(provider).map(|key| ApiKey::new(key.as_str()))
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.keys.contains_key(provider)
    }

    /// キーを保存（即座にファイルへ書き込み）
    ///
    /// 書き込みに失敗した場合、メモリ上の内容も変更しない。
    pub fn set(&mut self, provider: &str, api_key: &str) -> Result<()> {
        let mut keys = self.keys.clone();
        keys.insert(provider.to_string(), api_key.to_string());
        self.commit(keys)?;
        info!(provider, "APIキーを保存");
        Ok(())
    }

    /// ダイアログの結果を反映
    pub fn apply(&mut self, provider: &str, edit: KeyEdit) -> Result<()> {
        match edit {
            KeyEdit::Unchanged => Ok(()),
            KeyEdit::Replace(key) => self.set(provider, &key),
        }
    }

    pub fn remove(&mut self, provider: &str) -> Result<()> {
        if !self.keys.contains_key(provider) {
            return Ok(());
        }

        let mut keys = self.keys.clone();
        keys.remove(provider);
        self.commit(keys)?;
        info!(provider, "APIキーを削除");
        Ok(())
    }

    /// キーが保存されているプロバイダー一覧
    pub fn list_providers(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// ファイルへの書き込みが成功してから入れ替える
    fn commit(&mut self, keys: BTreeMap<String, String>) -> Result<()> {
        write_keys(&self.path, &keys)?;
        self.keys = keys;
        Ok(())
    }
}

fn write_keys(path: &Path, keys: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("設定フォルダの作成に失敗: {:?}", parent))?;
        }
    }

    let json = serde_json::to_string_pretty(keys).context("APIキーのシリアライズに失敗")?;
    std::fs::write(path, json)
        .with_context(|| format!("APIキーファイルの保存に失敗: {:?}", path))
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("providers", &self.list_providers())
            .finish()
    }
}

fn read_keys(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "APIキーファイルを読めないため空として扱う");
            return BTreeMap::new();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "APIキーファイルが壊れているため空として扱う");
        BTreeMap::new()
    })
}
