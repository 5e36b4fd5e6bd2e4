//! アプリケーション設定（環境変数 / .env から読み込み）

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// APIキーファイルのパス
pub const KEY_FILE_VAR: &str = "PAPER_RENAMER_KEY_FILE";
/// モデルに送るPDF先頭テキストの文字数
pub const EXCERPT_CHARS_VAR: &str = "PAPER_RENAMER_EXCERPT_CHARS";
/// HTTPタイムアウト（秒）
pub const TIMEOUT_SECS_VAR: &str = "PAPER_RENAMER_TIMEOUT_SECS";

const DEFAULT_EXCERPT_CHARS: usize = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const KEY_FILE_NAME: &str = "api_keys.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub key_file: PathBuf,
    pub excerpt_chars: usize,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から設定を作成（不正な値はデフォルト）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let key_file = lookup(KEY_FILE_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.key_file);

        let excerpt_chars = parse_var(&lookup, EXCERPT_CHARS_VAR)
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.excerpt_chars);

        let request_timeout = parse_var(&lookup, TIMEOUT_SECS_VAR)
            .filter(|&secs: &u64| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            key_file,
            excerpt_chars,
            request_timeout,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "設定値が不正なためデフォルトを使用");
            None
        }
    }
}

/// `<設定フォルダ>/paper_renamer/api_keys.json`、取得できなければカレント
fn default_key_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("paper_renamer").join(KEY_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(KEY_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(|_| None);

        assert_eq!(config.excerpt_chars, 500);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.key_file.ends_with(KEY_FILE_NAME));
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (KEY_FILE_VAR, "/tmp/keys.json"),
            (EXCERPT_CHARS_VAR, "1200"),
            (TIMEOUT_SECS_VAR, " 15 "),
        ]));

        assert_eq!(config.key_file, PathBuf::from("/tmp/keys.json"));
        assert_eq!(config.excerpt_chars, 1200);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (KEY_FILE_VAR, "  "),
            (EXCERPT_CHARS_VAR, "lots"),
            (TIMEOUT_SECS_VAR, "0"),
        ]));

        assert_eq!(config, AppConfig::default());
    }
}
