//! Extraction of the model answer and error category from a grading reply.
//!
//! The grading prompt asks for exactly two labelled lines:
//!
//! ```text
//! 正解例: <model answer>
//! ミスの種類: <category>
//! ```
//!
//! Replies are free text, so parsing never fails: anything missing falls back
//! to an empty sample and the "other" category.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::models::{Verdict, NONE_CATEGORY, OTHER_CATEGORY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub correct_sample: String,
    pub verdict: Verdict,
}

impl Feedback {
    pub fn is_correct(&self) -> bool {
        self.verdict.is_correct()
    }

    pub fn category(&self) -> Option<&str> {
        self.verdict.category()
    }
}

// A label's value never continues onto the next line; an empty value stays empty.
fn sample_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"正解例[:：][^\S\n]*(.*)").expect("sample pattern is valid"))
}

fn category_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ミスの種類[:：][^\S\n]*(.*)").expect("category pattern is valid"))
}

// Pipe, full-width slash, comma, ideographic comma, whitespace.
fn delimiter_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[|／,、\s]+").expect("delimiter pattern is valid"))
}

fn first_capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Parses a grading reply. Defined for every input.
pub fn parse_feedback(reply: &str) -> Feedback {
    let correct_sample = first_capture(sample_pattern(), reply)
        .unwrap_or_default()
        .to_string();

    let raw = first_capture(category_pattern(), reply).unwrap_or_default();
    let token = delimiter_pattern()
        .split(raw)
        .find(|part| !part.is_empty())
        .map(|part| part.strip_suffix([':', '：']).unwrap_or(part))
        .filter(|part| !part.is_empty())
        .unwrap_or(OTHER_CATEGORY);

    let verdict = if token.to_lowercase() == NONE_CATEGORY.to_lowercase() {
        Verdict::Correct
    } else {
        Verdict::Incorrect {
            category: token.to_string(),
        }
    };

    Feedback {
        correct_sample,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_of(reply: &str) -> Option<String> {
        parse_feedback(reply).category().map(str::to_string)
    }

    mod sample_tests {
        use super::*;

        #[test]
        fn extracts_sample_line() {
            let fb = parse_feedback("正解例: I went to the store.\nミスの種類: 時制");
            assert_eq!(fb.correct_sample, "I went to the store.");
        }

        #[test]
        fn missing_sample_is_empty() {
            let fb = parse_feedback("ミスの種類: 冠詞");
            assert_eq!(fb.correct_sample, "");
        }

        #[test]
        fn first_sample_wins() {
            let fb = parse_feedback("正解例: First one.\n正解例: Second one.\nミスの種類: なし");
            assert_eq!(fb.correct_sample, "First one.");
        }

        #[test]
        fn sample_tolerates_surrounding_text() {
            let reply = "よく頑張ったわね。\n正解例:   She has lived here for ten years.  \r\nミスの種類: 時制\n次も期待してるわよ。";
            let fb = parse_feedback(reply);
            assert_eq!(fb.correct_sample, "She has lived here for ten years.");
        }

        #[test]
        fn empty_sample_line_does_not_take_next_line() {
            let fb = parse_feedback("正解例: \nミスの種類: 時制");
            assert_eq!(fb.correct_sample, "");
            assert_eq!(fb.category(), Some("時制"));
        }

        #[test]
        fn full_width_colon_label() {
            let fb = parse_feedback("正解例：It is raining.\nミスの種類：冠詞");
            assert_eq!(fb.correct_sample, "It is raining.");
            assert_eq!(fb.category(), Some("冠詞"));
        }
    }

    mod category_tests {
        use super::*;

        #[test]
        fn plain_category() {
            assert_eq!(
                category_of("正解例: I went to the store.\nミスの種類: 時制"),
                Some("時制".to_string())
            );
        }

        #[test]
        fn takes_first_segment_for_each_delimiter() {
            for reply in [
                "正解例: x\nミスの種類: 冠詞|前置詞",
                "正解例: x\nミスの種類: 冠詞／前置詞",
                "正解例: x\nミスの種類: 冠詞,前置詞",
                "正解例: x\nミスの種類: 冠詞、前置詞",
                "正解例: x\nミスの種類: 冠詞 前置詞の使い方も注意",
                "正解例: x\nミスの種類: 冠詞\t(a と the)",
                "正解例: x\nミスの種類: 冠詞 | 前置詞",
            ] {
                assert_eq!(category_of(reply), Some("冠詞".to_string()), "{reply}");
            }
        }

        #[test]
        fn strips_trailing_colon() {
            assert_eq!(
                category_of("ミスの種類: 語順: 主語と動詞"),
                Some("語順".to_string())
            );
        }

        #[test]
        fn missing_line_defaults_to_other() {
            let fb = parse_feedback("正解例: I like it.");
            assert!(!fb.is_correct());
            assert_eq!(fb.category(), Some("その他"));
        }

        #[test]
        fn empty_line_defaults_to_other() {
            let fb = parse_feedback("正解例: I like it.\nミスの種類: ");
            assert!(!fb.is_correct());
            assert_eq!(fb.category(), Some("その他"));
        }

        #[test]
        fn empty_line_followed_by_commentary_defaults_to_other() {
            let fb = parse_feedback("正解例: I went home.\nミスの種類: \n次はもっと頑張ってね。");
            assert_eq!(fb.category(), Some("その他"));
            assert_eq!(fb.correct_sample, "I went home.");
        }

        #[test]
        fn bare_label_before_sample_line_defaults_to_other() {
            let fb = parse_feedback("ミスの種類:\n正解例: I went home.");
            assert_eq!(fb.category(), Some("その他"));
            assert_eq!(fb.correct_sample, "I went home.");
        }

        #[test]
        fn delimiter_only_defaults_to_other() {
            let fb = parse_feedback("ミスの種類: ||、");
            assert_eq!(fb.category(), Some("その他"));
        }

        #[test]
        fn lone_colon_token_defaults_to_other() {
            let fb = parse_feedback("ミスの種類: :");
            assert_eq!(fb.category(), Some("その他"));
        }

        #[test]
        fn first_category_line_wins() {
            assert_eq!(
                category_of("ミスの種類: 単数複数\nミスの種類: 冠詞"),
                Some("単数複数".to_string())
            );
        }
    }

    mod verdict_tests {
        use super::*;

        #[test]
        fn none_sentinel_is_correct() {
            let fb = parse_feedback("正解例: Good.\nミスの種類: なし");
            assert!(fb.is_correct());
            assert!(fb.category().is_none());
            assert_eq!(fb.correct_sample, "Good.");
        }

        #[test]
        fn none_sentinel_with_trailing_commentary() {
            let fb = parse_feedback("正解例: Good.\nミスの種類: なし、完璧よ");
            assert!(fb.is_correct());
            assert!(fb.category().is_none());
        }

        #[test]
        fn none_sentinel_with_trailing_colon() {
            let fb = parse_feedback("ミスの種類: なし:");
            assert!(fb.is_correct());
        }

        #[test]
        fn word_containing_sentinel_is_not_correct() {
            let fb = parse_feedback("ミスの種類: なしでも可");
            assert!(!fb.is_correct());
            assert_eq!(fb.category(), Some("なしでも可"));
        }

        #[test]
        fn empty_reply_is_total() {
            let fb = parse_feedback("");
            assert_eq!(fb.correct_sample, "");
            assert!(!fb.is_correct());
            assert_eq!(fb.category(), Some("その他"));
        }

        #[test]
        fn arbitrary_text_is_total() {
            let fb = parse_feedback("The model refused to follow the format.");
            assert!(!fb.is_correct());
            assert_eq!(fb.category(), Some("その他"));
        }

        #[test]
        fn correct_implies_no_category_and_vice_versa() {
            for reply in [
                "ミスの種類: なし",
                "ミスの種類: 時制",
                "",
                "ミスの種類:",
                "正解例: a\nミスの種類: スペリング／語法",
            ] {
                let fb = parse_feedback(reply);
                assert_eq!(fb.is_correct(), fb.category().is_none(), "{reply}");
            }
        }
    }
}
