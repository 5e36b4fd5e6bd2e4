//! 一括処理 - 選択されたファイルを1件ずつ抽出・リネーム

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::error::{ExtractError, JobError};
use crate::llm::{AdapterFactory, ApiKey, ExtractionClient, Target};
use crate::naming::{generate_filename, get_unique_filename};
use crate::parser::{PaperInfo, ParseError};
use crate::pdf::TextSource;

/// 処理設定（画面で選択された値）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub provider_id: String,
    pub model_id: String,
    pub template_id: String,
    /// モデルに送る先頭テキストの文字数
    pub excerpt_chars: usize,
}

/// 1ファイル分の処理状態
#[derive(Debug, Clone)]
pub struct FileJob {
    pub source: PathBuf,
    pub info: Option<PaperInfo>,
    pub destination: Option<PathBuf>,
}

impl FileJob {
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            info: None,
            destination: None,
        }
    }
}

/// 処理結果
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// 処理前のパス
    pub source: PathBuf,
    pub success: bool,
    pub original: String,
    pub new_name: Option<String>,
    pub error: Option<String>,
    pub parsed: Option<PaperInfo>,
}

impl ProcessResult {
    fn from_job(job: FileJob, outcome: Result<(), JobError>) -> Self {
        let original = display_name(&job.source);
        match outcome {
            Ok(()) => Self {
                source: job.source,
                success: true,
                original,
                new_name: job.destination.as_deref().map(display_name),
                error: None,
                parsed: job.info,
            },
            Err(e) => Self {
                source: job.source,
                success: false,
                original,
                new_name: None,
                error: Some(e.to_string()),
                parsed: job.info,
            },
        }
    }
}

/// 一括処理の集計
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// 処理を試みた件数
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 途中で中断されたか
    pub cancelled: bool,
    pub finished_at: DateTime<Local>,
}

impl BatchSummary {
    pub fn message(&self) -> String {
        let head = if self.cancelled { "中断" } else { "完了" };
        format!(
            "{}: {}/{} 件成功 ({})",
            head,
            self.succeeded,
            self.total,
            self.finished_at.format("%H:%M:%S")
        )
    }
}

/// 進捗通知
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        file: String,
    },
    FileDone(ProcessResult),
    Finished(BatchSummary),
}

/// ファイルをリスト順に1件ずつ処理
///
/// プロバイダー・モデル・APIキーは最初に検証し、問題があればどのファイルにも
/// 触れずにエラーを返す（`MissingCredential` ならキー入力を促して再実行する）。
/// ファイル単位の失敗は結果に記録し、残りのファイルの処理を続ける。
/// `cancel` はファイルの合間で確認する。
pub async fn run_batch<F, T>(
    client: &ExtractionClient<F>,
    text_source: &T,
    settings: &BatchSettings,
    api_key: Option<&ApiKey>,
    files: &[PathBuf],
    cancel: &AtomicBool,
    mut on_event: impl FnMut(BatchEvent) + Send,
) -> Result<BatchSummary, ExtractError>
where
    F: AdapterFactory,
    T: TextSource,
{
    let target = Target::resolve(&settings.provider_id, &settings.model_id)?;
    target.require_key(api_key)?;

    let total = files.len();
    let mut attempted = 0;
    let mut succeeded = 0;
    let mut cancelled = false;

    for (index, path) in files.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            info!(remaining = total - index, "処理を中断");
            cancelled = true;
            break;
        }

        let file = display_name(path);
        info!(file = %file, "処理開始 ({}/{})", index + 1, total);
        on_event(BatchEvent::Started {
            index,
            total,
            file: file.clone(),
        });

        let mut job = FileJob::new(path.clone());
        let outcome = process_job(client, text_source, settings, api_key, &mut job).await;
        attempted += 1;

        match &outcome {
            Ok(()) => succeeded += 1,
            Err(e) => warn!(file = %file, error = %e, "処理失敗"),
        }
        on_event(BatchEvent::FileDone(ProcessResult::from_job(job, outcome)));
    }

    let summary = BatchSummary {
        total: attempted,
        succeeded,
        failed: attempted - succeeded,
        cancelled,
        finished_at: Local::now(),
    };
    info!(succeeded, total = attempted, cancelled, "一括処理終了");
    on_event(BatchEvent::Finished(summary.clone()));

    Ok(summary)
}

/// 単一のファイルを処理
async fn process_job<F, T>(
    client: &ExtractionClient<F>,
    text_source: &T,
    settings: &BatchSettings,
    api_key: Option<&ApiKey>,
    job: &mut FileJob,
) -> Result<(), JobError>
where
    F: AdapterFactory,
    T: TextSource,
{
    let text = text_source
        .leading_text(&job.source, settings.excerpt_chars)
        .map_err(JobError::PdfText)?;
    if text.trim().is_empty() {
        return Err(JobError::EmptyText);
    }

    let info = client
        .extract(&settings.provider_id, &settings.model_id, api_key, &text)
        .await?;
    if info.authors.is_empty() {
        job.info = Some(info);
        return Err(ExtractError::from(ParseError::MissingAuthors).into());
    }

    let new_name = generate_filename(
        &job.source,
        &info.title,
        &info.authors,
        info.year.as_deref(),
        &settings.template_id,
    );
    job.info = Some(info);

    let destination = choose_destination(&job.source, &new_name);
    if destination != job.source {
        std::fs::rename(&job.source, &destination).map_err(|source| JobError::Rename {
            destination: destination.clone(),
            source,
        })?;
    }
    info!(to = %destination.display(), "リネーム完了");

    job.destination = Some(destination);
    Ok(())
}

/// 元のファイルと同じフォルダで重複しない保存先を選ぶ
fn choose_destination(source: &Path, new_name: &str) -> PathBuf {
    let directory = source.parent().unwrap_or_else(|| Path::new("."));
    let candidate = directory.join(new_name);
    if candidate == source {
        return candidate;
    }
    directory.join(get_unique_filename(directory, new_name))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
