//! JSON形式の応答解析

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::PaperInfo;

/// モデルが返すJSONオブジェクトの形
#[derive(Deserialize)]
struct RawPaperInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    authors: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_year")]
    year: Option<String>,
}

/// null は未指定と同じ扱い
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 年は文字列・数値・null のいずれも受け付ける
fn deserialize_year<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(year)) => Ok(Some(year)),
        Some(Value::Number(year)) => Ok(Some(year.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "year の型が不正: {}",
            other
        ))),
    }
}

/// JSONオブジェクトとして解析
///
/// 応答全体、```json フェンス内、最初の `{` から最後の `}` までの順に試す。
/// オブジェクト以外の値や型の合わない値は `None`。
pub fn parse_json(content: &str) -> Option<PaperInfo> {
    let trimmed = content.trim();

    [Some(trimmed), fenced_block(trimmed), braced_span(trimmed)]
        .into_iter()
        .flatten()
        .find_map(decode)
}

fn decode(candidate: &str) -> Option<PaperInfo> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    if !value.is_object() {
        return None;
    }

    let raw: RawPaperInfo = serde_json::from_value(value).ok()?;
    Some(PaperInfo {
        title: raw.title,
        authors: raw.authors,
        year: raw.year,
    })
}

/// ```json ... ``` ブロックの中身
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    // 言語タグの行を飛ばす
    let body = &rest[rest.find('\n')? + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let info = parse_json("{}").unwrap();
        assert_eq!(info, PaperInfo::default());
    }

    #[test]
    fn numeric_year_is_accepted() {
        let info = parse_json(r#"{"title": "T", "authors": [], "year": 2021}"#).unwrap();
        assert_eq!(info.year.as_deref(), Some("2021"));
    }

    #[test]
    fn null_year_is_absent() {
        let info = parse_json(r#"{"title": "T", "authors": ["A"], "year": null}"#).unwrap();
        assert_eq!(info.year, None);
    }

    #[test]
    fn null_title_and_authors_take_defaults() {
        let info = parse_json(r#"{"title": null, "authors": ["Alice"], "year": "2020"}"#).unwrap();
        assert_eq!(info.title, "");
        assert_eq!(info.authors, vec!["Alice"]);
        assert_eq!(info.year.as_deref(), Some("2020"));

        let info = parse_json(r#"{"title": "T", "authors": null}"#).unwrap();
        assert!(info.authors.is_empty());
    }

    #[test]
    fn fenced_json_block_is_decoded() {
        let content = "```json\n{\"title\": \"Deep Learning\", \"authors\": [\"Yann LeCun\"]}\n```";

        let info = parse_json(content).unwrap();

        assert_eq!(info.title, "Deep Learning");
        assert_eq!(info.authors, vec!["Yann LeCun"]);
    }

    #[test]
    fn object_surrounded_by_prose_is_decoded() {
        let content = r#"Sure! {"title": "GANs", "authors": ["Ian Goodfellow"], "year": "2014"} Let me know."#;

        let info = parse_json(content).unwrap();

        assert_eq!(info.title, "GANs");
        assert_eq!(info.year.as_deref(), Some("2014"));
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(parse_json(r#"["T", ["A"], "2020"]"#).is_none());
        assert!(parse_json("\"just a string\"").is_none());
    }

    #[test]
    fn mistyped_authors_are_rejected() {
        assert!(parse_json(r#"{"title": "T", "authors": "A, B"}"#).is_none());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(parse_json(r#"{"title": "X", "authors": [A, B]}"#).is_none());
    }
}
