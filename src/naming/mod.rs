//! 命名モジュール - 論文情報からファイル名を生成

mod sanitize;

pub use sanitize::{sanitize_filename, MAX_BASE_CHARS};

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

/// 第一著者が不明な場合のプレースホルダー
pub const UNKNOWN_AUTHOR: &str = "Unknown_Author";
/// 発行年が不明な場合のプレースホルダー
pub const UNKNOWN_YEAR: &str = "Unknown_Year";
/// 元のファイル名も使えない場合のファイル名
pub const UNTITLED: &str = "Untitled";

/// デフォルトの命名形式
pub const DEFAULT_TEMPLATE: &str = "title_author";

/// 命名形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingTemplate {
    pub id: &'static str,
    /// 表示名
    pub name: &'static str,
    /// `{title}` `{first_author}` `{all_authors}` `{year}` を含むパターン
    pub pattern: &'static str,
    pub description: &'static str,
}

/// 命名形式一覧
pub static TEMPLATES: &[NamingTemplate] = &[
    NamingTemplate {
        id: "title_author",
        name: "タイトル_著者",
        pattern: "{title}_{first_author}",
        description: "例: Machine_Learning_John_Smith.pdf",
    },
    NamingTemplate {
        id: "author_title",
        name: "著者_タイトル",
        pattern: "{first_author}_{title}",
        description: "例: John_Smith_Machine_Learning.pdf",
    },
    NamingTemplate {
        id: "title_authors",
        name: "タイトル_全著者",
        pattern: "{title}_{all_authors}",
        description: "例: Machine_Learning_John_Smith_et_al.pdf",
    },
    NamingTemplate {
        id: "year_title_author",
        name: "年_タイトル_著者",
        pattern: "{year}_{title}_{first_author}",
        description: "例: 2024_Machine_Learning_John_Smith.pdf",
    },
    NamingTemplate {
        id: "author_year_title",
        name: "著者_年_タイトル",
        pattern: "{first_author}_{year}_{title}",
        description: "例: John_Smith_2024_Machine_Learning.pdf",
    },
];

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(title|first_author|all_authors|year)\}").expect("固定の正規表現")
});

/// 命名形式を取得（不明なIDはデフォルト形式）
pub fn template(id: &str) -> &'static NamingTemplate {
    TEMPLATES.iter().find(|t| t.id == id).unwrap_or_else(|| {
        warn!(template = id, "不明な命名形式、デフォルトを使用");
        default_template()
    })
}

fn default_template() -> &'static NamingTemplate {
    &TEMPLATES[0]
}

/// プレースホルダーに埋め込む値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFields {
    pub title: String,
    pub first_author: String,
    pub all_authors: String,
    pub year: String,
}

impl NameFields {
    pub fn resolve(title: &str, authors: &[String], year: Option<&str>) -> Self {
        let first_author = authors
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        // 二人以上なら第一著者のみ + et_al
        let all_authors = if authors.len() > 1 {
            format!("{}_et_al", first_author)
        } else {
            first_author.clone()
        };

        let year = year
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .unwrap_or(UNKNOWN_YEAR)
            .to_string();

        Self {
            title: title.to_string(),
            first_author,
            all_authors,
            year,
        }
    }

    /// パターンに値を埋め込む（埋め込んだ値は再展開しない）
    pub fn render(&self, pattern: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(pattern, |caps: &Captures| match &caps[1] {
                "title" => self.title.clone(),
                "first_author" => self.first_author.clone(),
                "all_authors" => self.all_authors.clone(),
                _ => self.year.clone(),
            })
            .into_owned()
    }
}

/// 新しいファイル名を生成
///
/// 形式はテンプレートに従い、サニタイズ後に元ファイルの拡張子（小文字）を付ける。
/// サニタイズで空になった場合は元のファイル名（拡張子なし）、それも空なら [`UNTITLED`]。
/// 既存ファイルとの重複チェックは行わない（[`get_unique_filename`] を参照）。
pub fn generate_filename(
    source_path: &Path,
    title: &str,
    authors: &[String],
    year: Option<&str>,
    template_id: &str,
) -> String {
    let fields = NameFields::resolve(title, authors, year);
    let mut base = sanitize_filename(&fields.render(template(template_id).pattern));
    if base.is_empty() {
        base = source_path
            .file_stem()
            .map(|stem| sanitize_filename(&stem.to_string_lossy()))
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        warn!(name = %base, "ファイル名が空になるため元の名前を使用");
    }

    match source_path.extension() {
        Some(ext) => format!("{}.{}", base, ext.to_string_lossy().to_lowercase()),
        None => base,
    }
}

/// ユニークなファイル名を取得（同名ファイルがある場合は連番を付与）
pub fn get_unique_filename(directory: &Path, filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str());

    let mut final_name = filename.to_string();
    let mut counter = 1;

    while directory.join(&final_name).exists() {
        final_name = match ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        counter += 1;
    }

    final_name
}
