//! メインアプリケーションウィンドウ

use crate::batch::{run_batch, BatchEvent, BatchSettings, ProcessResult};
use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::llm::registry::{self, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::llm::{mask_secret, CredentialStore, ExtractionClient, KeyEdit};
use crate::naming::{self, DEFAULT_TEMPLATE, TEMPLATES};
use crate::pdf::PdfTextSource;
use anyhow::{Context, Result};
use eframe::egui;
use egui::{CentralPanel, RichText, Vec2};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{error, info};

use super::theme::{dark_theme, Colors};

/// バックグラウンド処理からの通知
enum AppEvent {
    Batch(BatchEvent),
    /// APIキー未設定で開始できなかった
    NeedsKey { provider_id: String, message: String },
    /// 開始前に失敗した
    Aborted(String),
}

/// APIキー入力ダイアログ
struct KeyDialog {
    provider_id: String,
    input: String,
    show_key: bool,
    /// 保存済みキーの伏せ字表示
    existing_mask: Option<String>,
    error: Option<String>,
}

enum DialogAction {
    Save,
    Remove,
    Cancel,
}

/// アプリケーション状態
pub struct PaperRenamerApp {
    config: AppConfig,
    /// 抽出クライアント
    client: Option<Arc<ExtractionClient>>,
    credentials: CredentialStore,
    /// Tokioランタイム
    runtime: Runtime,
    provider_id: String,
    model_id: String,
    template_id: String,
    /// 選択中のファイル
    selected_files: Vec<PathBuf>,
    /// 処理結果
    results: Vec<ProcessResult>,
    /// 処理中かどうか
    is_processing: bool,
    cancel: Arc<AtomicBool>,
    /// 進捗
    progress: f32,
    /// ステータスメッセージ
    status: String,
    /// エラーメッセージ
    error: Option<String>,
    /// 最後に処理したフォルダ
    last_folder: Option<PathBuf>,
    key_dialog: Option<KeyDialog>,
    event_rx: Receiver<AppEvent>,
    event_tx: Sender<AppEvent>,
}

impl PaperRenamerApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let (event_tx, event_rx) = channel();

        let client = match ExtractionClient::new(config.request_timeout) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                error!(error = %e, "抽出クライアントの初期化に失敗");
                None
            }
        };
        let credentials = CredentialStore::load(config.key_file.clone());

        Ok(Self {
            config,
            client,
            credentials,
            runtime: Runtime::new().context("Tokioランタイムの作成に失敗")?,
            provider_id: DEFAULT_PROVIDER.to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            template_id: DEFAULT_TEMPLATE.to_string(),
            selected_files: Vec::new(),
            results: Vec::new(),
            is_processing: false,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: 0.0,
            status: "PDFファイルを選択して開始".to_string(),
            error: None,
            last_folder: None,
            key_dialog: None,
            event_rx,
            event_tx,
        })
    }

    /// ファイルをリストに追加（PDFのみ、重複は除外）
    fn add_files(&mut self, files: Vec<PathBuf>) {
        let before = self.selected_files.len();
        for path in files {
            let is_pdf = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if is_pdf && !self.selected_files.contains(&path) {
                self.selected_files.push(path);
            }
        }

        if self.selected_files.len() == before {
            self.status = "追加できるPDFファイルがありません".to_string();
            return;
        }

        if let Some(first) = self.selected_files.first() {
            self.last_folder = first.parent().map(|p| p.to_path_buf());
        }
        self.status = format!("{} 個のファイルを選択中", self.selected_files.len());
    }

    fn clear_files(&mut self) {
        self.selected_files.clear();
        self.results.clear();
        self.status = "ファイルリストを消去しました".to_string();
    }

    /// ファイルを処理
    fn process_files(&mut self, ctx: &egui::Context) {
        if self.selected_files.is_empty() {
            self.status = "先にPDFファイルを選択してください".to_string();
            return;
        }

        let Some(client) = self.client.clone() else {
            self.error = Some("抽出クライアントが初期化されていません".to_string());
            return;
        };

        let settings = BatchSettings {
            provider_id: self.provider_id.clone(),
            model_id: self.model_id.clone(),
            template_id: self.template_id.clone(),
            excerpt_chars: self.config.excerpt_chars,
        };
        let api_key = self.credentials.get(&self.provider_id);
        let files = self.selected_files.clone();

        self.results.clear();
        self.error = None;
        self.is_processing = true;
        self.progress = 0.0;
        self.status = format!("{} 個のファイルを処理中...", files.len());
        self.cancel.store(false, Ordering::SeqCst);

        let event_tx = self.event_tx.clone();
        let cancel = Arc::clone(&self.cancel);
        let ctx = ctx.clone();

        // バックグラウンドで1件ずつ処理
        self.runtime.spawn(async move {
            let outcome = run_batch(
                &*client,
                &PdfTextSource,
                &settings,
                api_key.as_ref(),
                &files,
                &cancel,
                |event| {
                    let _ = event_tx.send(AppEvent::Batch(event));
                    ctx.request_repaint();
                },
            )
            .await;

            if let Err(e) = outcome {
                let event = match &e {
                    ExtractError::MissingCredential { .. } => AppEvent::NeedsKey {
                        provider_id: settings.provider_id.clone(),
                        message: e.to_string(),
                    },
                    _ => AppEvent::Aborted(e.to_string()),
                };
                let _ = event_tx.send(event);
                ctx.request_repaint();
            }
        });
    }

    /// 結果を受信
    fn receive_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::Batch(BatchEvent::Started { index, total, file }) => {
                    self.progress = index as f32 / total.max(1) as f32;
                    self.status = format!("処理中 ({}/{}): {}", index + 1, total, file);
                }
                AppEvent::Batch(BatchEvent::FileDone(result)) => {
                    // リネーム済みのファイルはリストから外す（失敗分は再実行できるよう残す）
                    if result.success {
                        self.selected_files.retain(|p| p != &result.source);
                    }
                    self.results.push(result);
                }
                AppEvent::Batch(BatchEvent::Finished(summary)) => {
                    self.is_processing = false;
                    self.progress = 1.0;
                    self.status = summary.message();
                }
                AppEvent::NeedsKey {
                    provider_id,
                    message,
                } => {
                    self.is_processing = false;
                    self.status = message.clone();
                    self.error = Some(message);
                    self.open_key_dialog(provider_id);
                }
                AppEvent::Aborted(message) => {
                    self.is_processing = false;
                    self.status = "処理を開始できませんでした".to_string();
                    self.error = Some(message);
                }
            }
        }
    }

    fn open_key_dialog(&mut self, provider_id: String) {
        let existing_mask = self
            .credentials
            .get(&provider_id)
            .map(|key| mask_secret(key.expose_secret()));
        self.key_dialog = Some(KeyDialog {
            provider_id,
            input: String::new(),
            show_key: false,
            existing_mask,
            error: None,
        });
    }

    fn save_key(&mut self) {
        let Some(dialog) = self.key_dialog.as_mut() else {
            return;
        };
        let Some(edit) = KeyEdit::from_input(&dialog.input, dialog.existing_mask.is_some()) else {
            dialog.error = Some("APIキーを入力してください".to_string());
            return;
        };
        let provider_id = dialog.provider_id.clone();

        match self.credentials.apply(&provider_id, edit) {
            Ok(()) => {
                let name = registry::resolve(&provider_id).display_name;
                self.status = format!("{} のAPIキーを保存しました", name);
                self.error = None;
                self.key_dialog = None;
            }
            Err(e) => {
                if let Some(dialog) = self.key_dialog.as_mut() {
                    dialog.error = Some(format!("{:#}", e));
                }
            }
        }
    }

    fn remove_key(&mut self) {
        let Some(provider_id) = self.key_dialog.as_ref().map(|d| d.provider_id.clone()) else {
            return;
        };

        match self.credentials.remove(&provider_id) {
            Ok(()) => {
                info!(provider = %provider_id, "APIキー削除（画面操作）");
                self.status = "APIキーを削除しました".to_string();
                self.key_dialog = None;
            }
            Err(e) => {
                if let Some(dialog) = self.key_dialog.as_mut() {
                    dialog.error = Some(format!("{:#}", e));
                }
            }
        }
    }

    /// プロバイダー・モデル・命名形式の選択
    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.is_processing;

        ui.add_enabled_ui(enabled, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("プロバイダー:").color(Colors::TEXT_SECONDARY));
                let previous = self.provider_id.clone();
                egui::ComboBox::from_id_salt("provider")
                    .selected_text(registry::resolve(&self.provider_id).display_name)
                    .show_ui(ui, |ui| {
                        for (id, name) in registry::list_providers() {
                            ui.selectable_value(&mut self.provider_id, id.to_string(), name);
                        }
                    });
                // プロバイダーが変わったら先頭のモデルを選ぶ
                if self.provider_id != previous {
                    self.model_id = registry::list_models(&self.provider_id)
                        .first()
                        .map(|m| m.name.to_string())
                        .unwrap_or_default();
                }

                ui.label(RichText::new("モデル:").color(Colors::TEXT_SECONDARY));
                egui::ComboBox::from_id_salt("model")
                    .selected_text(self.model_id.as_str())
                    .show_ui(ui, |ui| {
                        for model in registry::list_models(&self.provider_id) {
                            ui.selectable_value(&mut self.model_id, model.name.to_string(), model.name);
                        }
                    });

                let (badge, color) = if self.credentials.contains(&self.provider_id) {
                    ("設定済み", Colors::SUCCESS)
                } else {
                    ("未設定", Colors::WARNING)
                };
                if ui.button("🔑 APIキー").clicked() {
                    self.open_key_dialog(self.provider_id.clone());
                }
                ui.label(RichText::new(badge).size(12.0).color(color));
            });

            ui.horizontal(|ui| {
                ui.label(RichText::new("命名形式:").color(Colors::TEXT_SECONDARY));
                let current = naming::template(&self.template_id);
                egui::ComboBox::from_id_salt("template")
                    .selected_text(current.name)
                    .show_ui(ui, |ui| {
                        for template in TEMPLATES {
                            ui.selectable_value(&mut self.template_id, template.id.to_string(), template.name);
                        }
                    });
                ui.label(
                    RichText::new(naming::template(&self.template_id).description)
                        .size(12.0)
                        .color(Colors::TEXT_SECONDARY),
                );
            });
        });
    }

    fn show_key_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.key_dialog.as_mut() else {
            return;
        };
        let provider_name = registry::resolve(&dialog.provider_id).display_name;
        let mut action = None;

        egui::Window::new(format!("{} のAPIキー設定", provider_name))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                if let Some(ref mask) = dialog.existing_mask {
                    ui.label(
                        RichText::new(format!("保存済み: {}（空欄のまま保存すると変更しません）", mask))
                            .size(12.0)
                            .color(Colors::TEXT_SECONDARY),
                    );
                }

                ui.add(
                    egui::TextEdit::singleline(&mut dialog.input)
                        .password(!dialog.show_key)
                        .hint_text("APIキーを入力")
                        .desired_width(380.0),
                );
                ui.checkbox(&mut dialog.show_key, "キーを表示");

                if let Some(ref error) = dialog.error {
                    ui.label(RichText::new(error).color(Colors::ERROR));
                }

                ui.horizontal(|ui| {
                    if ui.button("保存").clicked() {
                        action = Some(DialogAction::Save);
                    }
                    if ui.button("キャンセル").clicked() {
                        action = Some(DialogAction::Cancel);
                    }
                    if dialog.existing_mask.is_some() && ui.button("削除").clicked() {
                        action = Some(DialogAction::Remove);
                    }
                });

                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    action = Some(DialogAction::Save);
                }
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    action = Some(DialogAction::Cancel);
                }
            });

        match action {
            Some(DialogAction::Save) => self.save_key(),
            Some(DialogAction::Remove) => self.remove_key(),
            Some(DialogAction::Cancel) => self.key_dialog = None,
            None => {}
        }
    }
}

impl eframe::App for PaperRenamerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 結果を受信
        self.receive_events();

        // ドロップされたファイルを追加
        if !ctx.input(|i| i.raw.dropped_files.is_empty()) {
            let files: Vec<PathBuf> = ctx.input(|i| {
                i.raw.dropped_files
                    .iter()
                    .filter_map(|f| f.path.clone())
                    .collect()
            });

            if !files.is_empty() && !self.is_processing {
                self.add_files(files);
            }
        }

        self.show_key_dialog(ctx);

        CentralPanel::default().show(ctx, |ui| {
            ui.spacing_mut().item_spacing = Vec2::new(8.0, 10.0);

            // ヘッダー
            ui.horizontal(|ui| {
                ui.heading(RichText::new("論文リネーマー")
                    .size(28.0)
                    .color(Colors::TEXT_PRIMARY));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.add_enabled(
                        self.last_folder.is_some(),
                        egui::Button::new("📁 フォルダを開く")
                    ).clicked() {
                        if let Some(ref folder) = self.last_folder {
                            let _ = open::that(folder);
                        }
                    }
                });
            });

            ui.label(RichText::new("PDFを選択 → LLMでタイトル・著者を抽出 → 元のファイルをリネーム")
                .size(14.0)
                .color(Colors::TEXT_SECONDARY));

            // 警告メッセージ
            if self.client.is_none() {
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("⚠").size(24.0).color(Colors::ERROR));
                        ui.label(RichText::new("HTTPクライアントの初期化に失敗しました")
                            .color(Colors::ERROR));
                    });
                });
            }

            egui::Frame::new()
                .fill(Colors::BG_CARD)
                .corner_radius(12.0)
                .inner_margin(12.0)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    self.settings_panel(ui);
                });

            // ドロップゾーン
            let is_hovering = !ui.ctx().input(|i| i.raw.hovered_files.is_empty());
            let frame_color = if is_hovering { Colors::ACCENT } else { Colors::BORDER };
            let bg_color = if is_hovering { Colors::BG_HOVER } else { Colors::BG_CARD };

            let drop_zone_response = egui::Frame::new()
                .fill(bg_color)
                .stroke(egui::Stroke::new(2.0, frame_color))
                .corner_radius(16.0)
                .inner_margin(24.0)
                .show(ui, |ui| {
                    ui.set_min_size(Vec2::new(ui.available_width(), 110.0));
                    ui.vertical_centered(|ui| {
                        let icon = if is_hovering { "📥" } else { "📄" };
                        ui.label(RichText::new(icon).size(40.0));
                        ui.label(RichText::new("PDFファイルをここにドロップ")
                            .size(18.0)
                            .color(Colors::TEXT_PRIMARY));
                        ui.label(RichText::new("または、クリックしてファイルを選択")
                            .size(13.0)
                            .color(Colors::TEXT_SECONDARY));
                    });
                })
                .response
                .interact(egui::Sense::click());

            // クリックでファイル選択
            if drop_zone_response.clicked() && !self.is_processing {
                if let Some(files) = rfd::FileDialog::new()
                    .set_title("PDFファイルを選択")
                    .add_filter("PDF files", &["pdf"])
                    .pick_files()
                {
                    self.add_files(files);
                }
            }

            // 操作ボタン
            ui.horizontal(|ui| {
                ui.label(RichText::new(format!("選択中: {} 件", self.selected_files.len()))
                    .color(Colors::TEXT_SECONDARY));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.is_processing {
                        if ui.button("⏹ 中断").clicked() {
                            self.cancel.store(true, Ordering::SeqCst);
                            self.status = "現在のファイルの処理後に中断します".to_string();
                        }
                    } else {
                        let can_process = !self.selected_files.is_empty();
                        if ui.add_enabled(can_process, egui::Button::new("⚙ 処理開始")).clicked() {
                            self.process_files(ctx);
                        }
                        if ui.add_enabled(can_process, egui::Button::new("🗑 リストを消去")).clicked() {
                            self.clear_files();
                        }
                    }
                });
            });

            // 処理中表示
            if self.is_processing {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new(&self.status).color(Colors::ACCENT));
                });
                ui.add(egui::ProgressBar::new(self.progress).fill(Colors::ACCENT));
            }

            if let Some(ref error) = self.error {
                ui.label(RichText::new(format!("エラー: {}", error)).color(Colors::ERROR));
            }

            // 結果セクション
            ui.horizontal(|ui| {
                ui.label(RichText::new("処理結果")
                    .size(16.0)
                    .color(Colors::TEXT_PRIMARY));

                if !self.results.is_empty() {
                    let success_count = self.results.iter().filter(|r| r.success).count();
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(RichText::new(format!("{}/{} 件成功", success_count, self.results.len()))
                            .size(13.0)
                            .color(Colors::TEXT_SECONDARY));
                    });
                }
            });

            // 未処理のファイル一覧と結果
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .max_height(ui.available_height() - 50.0)
                .show(ui, |ui| {
                    if self.results.is_empty() {
                        for path in &self.selected_files {
                            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                            ui.label(RichText::new(name).monospace().color(Colors::TEXT_SECONDARY));
                        }
                    }

                    for result in &self.results {
                        ui.add_space(4.0);
                        result_card(ui, result);
                    }
                });

            // ステータスバー
            ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                egui::Frame::new()
                    .fill(Colors::BG_CARD)
                    .inner_margin(egui::Margin::symmetric(20, 10))
                    .show(ui, |ui| {
                        ui.label(RichText::new(&self.status)
                            .size(13.0)
                            .color(Colors::TEXT_SECONDARY));
                    });
            });
        });
    }
}

/// 1件分の結果表示
fn result_card(ui: &mut egui::Ui, result: &ProcessResult) {
    egui::Frame::new()
        .fill(Colors::BG_CARD)
        .corner_radius(12.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                let (icon, color) = Colors::status(result.success);
                ui.label(RichText::new(icon).size(16.0).color(color));

                ui.vertical(|ui| {
                    ui.label(RichText::new(&result.original)
                        .size(13.0)
                        .color(Colors::TEXT_SECONDARY));

                    if let Some(ref new_name) = result.new_name {
                        ui.label(RichText::new(format!("→ {}", new_name))
                            .size(14.0)
                            .color(Colors::TEXT_PRIMARY));
                    }
                    if let Some(ref error) = result.error {
                        ui.label(RichText::new(format!("エラー: {}", error))
                            .size(13.0)
                            .color(Colors::ERROR));
                    }
                });
            });
        });
}

/// アプリケーションを起動
pub fn run(config: AppConfig) -> Result<()> {
    let app = PaperRenamerApp::new(config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([760.0, 720.0])
            .with_min_inner_size([640.0, 560.0])
            .with_title("論文リネーマー")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "論文リネーマー",
        options,
        Box::new(move |cc| {
            // ダークテーマを設定
            cc.egui_ctx.set_style(dark_theme());

            // 日本語フォントを設定
            let mut fonts = egui::FontDefinitions::default();

            // システムの日本語フォントを追加
            #[cfg(windows)]
            {
                if let Ok(font_data) = std::fs::read("C:\\Windows\\Fonts\\YuGothM.ttc") {
                    fonts.font_data.insert(
                        "yu_gothic".to_owned(),
                        egui::FontData::from_owned(font_data).into(),
                    );

                    fonts.families
                        .entry(egui::FontFamily::Proportional)
                        .or_default()
                        .insert(0, "yu_gothic".to_owned());

                    fonts.families
                        .entry(egui::FontFamily::Monospace)
                        .or_default()
                        .push("yu_gothic".to_owned());
                }
            }

            cc.egui_ctx.set_fonts(fonts);

            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("アプリケーションエラー: {}", e))
}
