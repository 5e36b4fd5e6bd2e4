//! ファイル名のサニタイズ

use regex::Regex;
use std::sync::LazyLock;

/// 拡張子を除いたファイル名の最大文字数
pub const MAX_BASE_CHARS: usize = 200;

/// Windows と主要なファイルシステムで使えない文字
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("固定の正規表現"));

/// ファイル名に使用できない文字を置換
///
/// 1. 禁止文字と制御文字を `_` に置換
/// 2. 連続する空白を `_` 一つに置換
/// 3. 先頭と末尾の `_` を削除
/// 4. [`MAX_BASE_CHARS`] 文字で切り詰め（末尾の `_` は再度削除）
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let collapsed = WHITESPACE_RE.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.chars().count() <= MAX_BASE_CHARS {
        return trimmed.to_string();
    }

    let truncated: String = trimmed.chars().take(MAX_BASE_CHARS).collect();
    truncated.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_characters_are_replaced() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn control_characters_are_replaced() {
        let sanitized = sanitize_filename("line\u{0}one\u{1f}two\u{7f}three");
        assert!(!sanitized.chars().any(|c| c.is_control()));
        assert_eq!(sanitized, "line_one_two_three");
    }

    #[test]
    fn whitespace_runs_collapse_to_one_underscore() {
        assert_eq!(sanitize_filename("Deep   Learning \u{3000} Review"), "Deep_Learning_Review");
    }

    #[test]
    fn leading_and_trailing_underscores_are_stripped() {
        assert_eq!(sanitize_filename("  ?Title?  "), "Title");
    }

    #[test]
    fn long_names_are_truncated_by_characters() {
        let name = "論".repeat(300);
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized.chars().count(), MAX_BASE_CHARS);
    }

    #[test]
    fn truncation_does_not_leave_a_trailing_underscore() {
        let name = format!("{}?rest", "a".repeat(MAX_BASE_CHARS - 1));
        let sanitized = sanitize_filename(&name);
        assert_eq!(sanitized, "a".repeat(MAX_BASE_CHARS - 1));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = vec![
            String::new(),
            "___".to_string(),
            "Deep Learning: A Review".to_string(),
            " \t spaced \n out ".to_string(),
            "a/b\\c".to_string(),
            "x_ _y".to_string(),
            "\u{0}\u{1}".to_string(),
            format!("{} {}", "w".repeat(199), "tail"),
            format!("{}:::{}", "v".repeat(198), "z".repeat(50)),
            "長いタイトル ".repeat(60),
        ];

        for input in &inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input: {:?}", input);
        }
    }

    /// 固定シードの xorshift（再現可能な入力生成用）
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: usize) -> usize {
            (self.next() % n as u64) as usize
        }
    }

    fn random_name(rng: &mut XorShift) -> String {
        const POOLS: [&[char]; 6] = [
            &['\u{0}', '\u{7}', '\u{1b}', '\u{7f}', '\u{85}', '\n'],
            &[' ', '\t', '\r', '\u{a0}', '\u{3000}', '\u{2028}'],
            &ILLEGAL_CHARS,
            &['論', '文', '深', '層', '学', '習', 'é', 'ß'],
            &['a', 'Z', '0', '9', '-', '.', '(', ')'],
            &['_'],
        ];

        let len = rng.below(260);
        (0..len)
            .map(|_| {
                let pool = POOLS[rng.below(POOLS.len())];
                pool[rng.below(pool.len())]
            })
            .collect()
    }

    #[test]
    fn sanitize_is_idempotent_for_generated_names() {
        let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);

        for _ in 0..2000 {
            let input = random_name(&mut rng);
            let once = sanitize_filename(&input);

            assert_eq!(sanitize_filename(&once), once, "input: {:?}", input);
            assert!(once.chars().count() <= MAX_BASE_CHARS);
            assert!(!once.chars().any(|c| ILLEGAL_CHARS.contains(&c) || c.is_control()));
            assert!(!once.starts_with('_') && !once.ends_with('_'));
        }
    }
}
