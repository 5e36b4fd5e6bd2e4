//! PDF処理モジュール - PDFからテキストを抽出

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// ファイルの先頭テキストを取得する
pub trait TextSource: Send + Sync {
    fn leading_text(&self, path: &Path, max_chars: usize) -> Result<String>;
}

/// pdf-extract によるテキスト抽出
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextSource;

impl TextSource for PdfTextSource {
    fn leading_text(&self, path: &Path, max_chars: usize) -> Result<String> {
        let text = extract_text(path)?;
        Ok(leading_chars(&text, max_chars))
    }
}

/// PDF全体のテキストを抽出
pub fn extract_text(pdf_path: impl AsRef<Path>) -> Result<String> {
    let pdf_path = pdf_path.as_ref();

    let bytes = std::fs::read(pdf_path)
        .with_context(|| format!("PDFファイルの読み込みに失敗: {:?}", pdf_path))?;
    debug!(path = %pdf_path.display(), bytes = bytes.len(), "PDFを読み込み");

    // フォントによっては pdf-extract がパニックするため捕捉する
    let text = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&bytes)
    }))
    .map_err(|_| anyhow::anyhow!("PDF解析中に異常終了しました（フォント破損の可能性）"))?
    .map_err(|e| anyhow::anyhow!("PDFテキストの抽出に失敗: {:?}: {}", pdf_path, e))?;

    Ok(text)
}

/// 先頭から最大 `max_chars` 文字
pub fn leading_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
