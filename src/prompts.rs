//! Fixed prompt templates for the three completion requests.

use crate::llm::Message;
use crate::models::{Question, NONE_CATEGORY, OTHER_CATEGORY};

pub const SUMMARY_TEMPERATURE: f32 = 0.0;
pub const QUESTION_TEMPERATURE: f32 = 0.3;
pub const GRADING_TEMPERATURE: f32 = 0.0;

const PERSONA: &str = "\
あなたは「冴子先生」という英作文トレーナー。
口調: 現代的・親しみやすい・ややツンデレ可。文末は〜だわ、〜よ 等。
第二人称は「あなた」。不要な情緒反応は控える。";

const SUMMARY_CATEGORIES: &str = "冠詞/動詞選択/時制/前置詞/語順/単数複数/語法/スペリング/その他";
const GRADING_CATEGORIES: &str = "冠詞|動詞選択|時制|前置詞|語順|単数複数|スペリング|語法|その他|なし";

// One history row as a single line, e.g.
// "- [2024-05-01] err:時制 | Q:昨日雨が降った。 | A:It rains yesterday."
pub fn compact_history_line(question: &Question) -> String {
    let err = match question.error_type() {
        Some(category) => category,
        None if question.is_correct() => NONE_CATEGORY,
        None => OTHER_CATEGORY,
    };
    format!(
        "- [{}] err:{} | Q:{} | A:{}",
        question.created_day(),
        err,
        question.question_text,
        question.user_answer
    )
}

pub fn history_summary(history: &[Question]) -> Vec<Message> {
    let compact = history
        .iter()
        .map(compact_history_line)
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        Message::system("あなたは英語教師。履歴の弱点傾向を短く要約する。"),
        Message::user(format!(
            "次の履歴から、主な弱点カテゴリ（最大3つ）と改善傾向を箇条書き3〜6行で要約して。\n\
             過度な詳細は不要。カテゴリ名は「{SUMMARY_CATEGORIES}」から選ぶ。\n\
             {compact}"
        )),
    ]
}

pub fn question(focus: &str, history_digest: &str) -> Vec<Message> {
    vec![
        Message::system(format!(
            "{PERSONA}\n出題は日本語で1問のみ。前置き・番号なし。構文ヒントは最小限。"
        )),
        Message::user(format!(
            "学習者の既知の弱点: {focus}\n\
             過去の履歴要約:\n\
             {history_digest}\n\
             \n\
             上の情報を踏まえ、基礎〜中級レベルで英訳する日本語文を1問だけ出題して。弱点を自然に試せる内容を優先。"
        )),
    ]
}

pub fn grading(question: &str, answer: &str) -> Vec<Message> {
    vec![
        Message::system(format!(
            "{PERSONA}\n添削は次の2行のみを出力：\n正解例: ...\nミスの種類: {GRADING_CATEGORIES}"
        )),
        Message::user(format!("問題: {question}\n学習者の解答: {answer}")),
    ]
}
