//! 論文リネーマー - LLMで論文PDFのメタデータを抽出して自動リネームするツール
//!
//! # 機能
//! - PDF先頭テキストの抽出
//! - 複数のLLMプロバイダー（OpenAI互換API）によるタイトル・著者・年の抽出
//! - テンプレートに基づくファイル名生成とリネーム
//! - プロバイダーごとのAPIキー保存
//! - ドラッグ＆ドロップ対応GUI

pub mod batch;
pub mod config;
pub mod error;
pub mod gui;
pub mod llm;
pub mod naming;
pub mod parser;
pub mod pdf;

pub use parser::PaperInfo;
