//! エラー型

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::ParseError;

/// 論文情報の抽出エラー
#[derive(Debug, Error)]
pub enum ExtractError {
    /// APIキー未設定（ユーザーに入力を求めて再試行できる）
    #[error("{provider} のAPIキーが設定されていません")]
    MissingCredential { provider: String },

    #[error("未対応のプロバイダー: {0}")]
    UnsupportedProvider(String),

    #[error("{provider} に未対応のモデル: {model}")]
    UnsupportedModel { provider: String, model: String },

    /// 通信失敗（自動リトライはしない）
    #[error("通信エラー: {0}")]
    Transport(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// ファイル単位の処理エラー
///
/// どのエラーもそのファイルだけの失敗として扱い、残りの処理は続ける。
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("PDFテキスト抽出エラー: {0:#}")]
    PdfText(anyhow::Error),

    #[error("テキストを抽出できませんでした")]
    EmptyText,

    #[error("リネームエラー ({}): {source}", .destination.display())]
    Rename {
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
