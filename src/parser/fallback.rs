//! マーカー検索による応答解析（JSONとして壊れた応答用）

use super::PaperInfo;

const TITLE_MARKER: &str = "\"title\": \"";
const AUTHORS_MARKER: &str = "\"authors\": [";
const YEAR_MARKER: &str = "\"year\": \"";

/// `"title": "` と `"authors": [` のマーカーから情報を切り出す
///
/// タイトルは次の `",` まで、著者は次の `]` までをカンマ区切りで取る。
/// 終端が見つからない場合は残り全体を使う。
pub fn parse_fallback(content: &str) -> Option<PaperInfo> {
    let title = segment_after(content, TITLE_MARKER, "\",")?;
    let authors = segment_after(content, AUTHORS_MARKER, "]")?
        .split(',')
        .map(|author| author.trim().trim_matches('"').trim())
        .filter(|author| !author.is_empty())
        .map(str::to_string)
        .collect();
    let year = segment_after(content, YEAR_MARKER, "\"").map(str::to_string);

    Some(PaperInfo {
        title: title.to_string(),
        authors,
        year,
    })
}

fn segment_after<'a>(content: &'a str, marker: &str, terminator: &str) -> Option<&'a str> {
    let start = content.find(marker)? + marker.len();
    let rest = &content[start..];
    Some(rest.find(terminator).map_or(rest, |end| &rest[..end]))
}
