use serde::{Deserialize, Serialize};

/// Error-type label meaning "the answer had no mistake".
pub const NONE_CATEGORY: &str = "なし";

/// Error-type label used when the grading reply names no usable category.
pub const OTHER_CATEGORY: &str = "その他";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub created_at: String,
}

// Outcome of one graded answer. A correct answer has no error category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect { category: String },
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Verdict::Correct => None,
            Verdict::Incorrect { category } => Some(category),
        }
    }

    // Rebuilds a verdict from the (is_correct, error_type) column pair.
    pub fn from_columns(is_correct: bool, error_type: Option<String>) -> Self {
        match (is_correct, error_type) {
            (true, _) => Verdict::Correct,
            (false, Some(category)) => Verdict::Incorrect { category },
            (false, None) => Verdict::Incorrect {
                category: OTHER_CATEGORY.to_string(),
            },
        }
    }

    pub fn label(&self) -> &str {
        self.category().unwrap_or(NONE_CATEGORY)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub session_id: i64,
    pub question_text: String,
    pub expected_ans: String,
    pub user_answer: String,
    pub verdict: Verdict,
    pub created_at: String,
}

impl Question {
    pub fn is_correct(&self) -> bool {
        self.verdict.is_correct()
    }

    pub fn error_type(&self) -> Option<&str> {
        self.verdict.category()
    }

    // Calendar day of created_at, e.g. "2024-05-01".
    pub fn created_day(&self) -> &str {
        self.created_at.get(..10).unwrap_or(&self.created_at)
    }
}

// A graded turn that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewQuestion<'a> {
    pub session_id: i64,
    pub question_text: &'a str,
    pub expected_ans: &'a str,
    pub user_answer: &'a str,
    pub verdict: &'a Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weakness {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub description: Option<String>,
    pub frequency: i64,
    pub last_occurred: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_sessions: i64,
    pub total_questions: i64,
    pub correct: i64,
    pub weakness_categories: i64,
}

impl Stats {
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            (self.correct as f64 / self.total_questions as f64) * 100.0
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod verdict_tests {
        use super::*;

        #[test]
        fn correct_has_no_category() {
            let v = Verdict::Correct;
            assert!(v.is_correct());
            assert!(v.category().is_none());
            assert_eq!(v.label(), "なし");
        }

        #[test]
        fn incorrect_carries_category() {
            let v = Verdict::Incorrect {
                category: "時制".to_string(),
            };
            assert!(!v.is_correct());
            assert_eq!(v.category(), Some("時制"));
            assert_eq!(v.label(), "時制");
        }

        #[test]
        fn from_columns_correct_ignores_error_type() {
            let v = Verdict::from_columns(true, Some("冠詞".to_string()));
            assert_eq!(v, Verdict::Correct);
        }

        #[test]
        fn from_columns_incorrect_without_type_is_other() {
            let v = Verdict::from_columns(false, None);
            assert_eq!(v.category(), Some("その他"));
        }

        #[test]
        fn serializes_with_result_tag() {
            let v = Verdict::Incorrect {
                category: "語順".to_string(),
            };
            let json = serde_json::to_value(&v).unwrap();
            assert_eq!(json["result"], "incorrect");
            assert_eq!(json["category"], "語順");

            let json = serde_json::to_value(Verdict::Correct).unwrap();
            assert_eq!(json["result"], "correct");
        }
    }

    mod question_tests {
        use super::*;

        fn make_question(created_at: &str) -> Question {
            Question {
                id: 1,
                session_id: 1,
                question_text: "昨日、店に行った。".to_string(),
                expected_ans: "I went to the store yesterday.".to_string(),
                user_answer: "I go to the store yesterday.".to_string(),
                verdict: Verdict::Incorrect {
                    category: "時制".to_string(),
                },
                created_at: created_at.to_string(),
            }
        }

        #[test]
        fn created_day_takes_date_prefix() {
            let q = make_question("2024-05-01T10:20:30.000000Z");
            assert_eq!(q.created_day(), "2024-05-01");
        }

        #[test]
        fn created_day_short_value_is_returned_whole() {
            let q = make_question("2024");
            assert_eq!(q.created_day(), "2024");
        }

        #[test]
        fn error_type_follows_verdict() {
            let q = make_question("2024-05-01T10:20:30Z");
            assert!(!q.is_correct());
            assert_eq!(q.error_type(), Some("時制"));
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn accuracy_zero_questions() {
            assert_eq!(Stats::default().accuracy(), 0.0);
        }

        #[test]
        fn accuracy_partial() {
            let stats = Stats {
                total_sessions: 2,
                total_questions: 4,
                correct: 1,
                weakness_categories: 2,
            };
            assert!((stats.accuracy() - 25.0).abs() < 0.001);
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn json_output_ok() {
            let output = JsonOutput::ok("test data");
            assert!(output.success);
            assert_eq!(output.data, Some("test data"));
            assert!(output.error.is_none());
        }

        #[test]
        fn json_output_err() {
            let output: JsonOutput<()> = JsonOutput::err("something went wrong");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("something went wrong".to_string()));
        }

        #[test]
        fn json_output_serializes() {
            let output = JsonOutput::ok(vec![1, 2, 3]);
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":true"));
            assert!(json.contains("\"data\":[1,2,3]"));
        }
    }
}
