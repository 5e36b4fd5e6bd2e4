//! 論文リネーマー - メインエントリポイント

use anyhow::Result;
use paper_renamer::config::AppConfig;

fn main() -> Result<()> {
    // ロギング初期化
    tracing_subscriber::fmt::init();

    // 環境変数の読み込み
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();
    tracing::info!(key_file = %config.key_file.display(), "設定読み込み完了");

    // GUIアプリケーション起動
    paper_renamer::gui::run(config)
}
