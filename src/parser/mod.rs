//! 応答解析モジュール - LLMの応答から論文情報を抽出
//!
//! LLMは必ずしも正しいJSONを返さないため、2段階で解析する。
//! 1. [`parse_json`] による厳密なJSONオブジェクト解析
//! 2. [`parse_fallback`] による文字列マーカー検索
//!
//! どちらでもタイトルと著者リストが見つからなければ [`ParseError::Unparseable`]。

mod fallback;
mod json;

pub use fallback::parse_fallback;
pub use json::parse_json;

use thiserror::Error;
use tracing::debug;

/// LLMの応答から抽出された論文情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperInfo {
    /// 論文タイトル
    pub title: String,
    /// 著者（記載順、空の場合あり）
    pub authors: Vec<String>,
    /// 発行年
    pub year: Option<String>,
}

/// 応答解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// JSONとしてもマーカー検索でも解析できない
    #[error("モデルの応答を解析できません")]
    Unparseable,
    /// 解析はできたが著者が一人も含まれていない
    #[error("著者情報を抽出できませんでした")]
    MissingAuthors,
}

/// モデルの応答テキストを解析
pub fn parse_response(content: &str) -> Result<PaperInfo, ParseError> {
    if let Some(info) = parse_json(content) {
        return Ok(info);
    }

    debug!("JSON解析に失敗、マーカー検索で再試行");
    parse_fallback(content).ok_or(ParseError::Unparseable)
}
