//! One practice turn: focus, question, answer, grading, persistence.
//!
//! The database handle and the completion client are passed in, so the whole
//! turn runs against an in-memory database and a scripted client in tests.

use serde::Serialize;
use std::io::{BufRead, Write};

use crate::db::Database;
use crate::error::{Result, TutorError};
use crate::feedback::{parse_feedback, Feedback};
use crate::llm::CompletionService;
use crate::models::{NewQuestion, Weakness, NONE_CATEGORY};
use crate::prompts;
use crate::weakness::{WeaknessFocus, WeaknessTracker};

pub const DEFAULT_USER: &str = "default";
pub const HISTORY_LIMIT: usize = 50;
const ANSWER_PROMPT: &str = "あなたの英語 > ";

#[derive(Debug, Clone)]
pub struct TutorOptions {
    pub user_name: String,
    pub summarize_history: bool,
    pub history_limit: usize,
}

impl Default for TutorOptions {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER.to_string(),
            summarize_history: true,
            history_limit: HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub user_id: i64,
    pub session_id: i64,
    pub question_id: i64,
    pub weakness_focus: WeaknessFocus,
    pub history_digest: String,
    pub question: String,
    pub answer: String,
    pub grading_reply: String,
    pub feedback: Feedback,
    pub weakness: Option<Weakness>,
}

pub struct Tutor<'a, C: ?Sized> {
    db: &'a Database,
    llm: &'a C,
    options: TutorOptions,
}

impl<'a, C> Tutor<'a, C>
where
    C: CompletionService + ?Sized,
{
    pub fn new(db: &'a Database, llm: &'a C, options: TutorOptions) -> Self {
        Self { db, llm, options }
    }

    /// Summarizes the user's recent questions. Returns "なし" without calling
    /// the completion service when there is no history.
    pub fn history_digest(&self, user_id: i64) -> Result<String> {
        let history = self
            .db
            .recent_questions(user_id, self.options.history_limit)?;
        if history.is_empty() {
            return Ok(NONE_CATEGORY.to_string());
        }

        tracing::info!(user_id, rows = history.len(), "summarizing history");
        let summary = self.llm.complete(
            &prompts::history_summary(&history),
            prompts::SUMMARY_TEMPERATURE,
        )?;
        if summary.is_empty() {
            Ok(NONE_CATEGORY.to_string())
        } else {
            Ok(summary)
        }
    }

    /// Runs one turn. Any error aborts the turn without a question row or a
    /// weakness update.
    pub fn run_turn<R, W>(&self, input: &mut R, out: &mut W) -> Result<TurnReport>
    where
        R: BufRead,
        W: Write,
    {
        let user = self.db.get_or_create_user(&self.options.user_name)?;
        tracing::info!(user_id = user.id, name = %user.name, "user resolved");

        let tracker = WeaknessTracker::new(self.db);
        let weakness_focus = tracker.focus(user.id)?;
        let history_digest = if self.options.summarize_history {
            self.history_digest(user.id)?
        } else {
            NONE_CATEGORY.to_string()
        };
        writeln!(out, "🔎 弱点フォーカス: {weakness_focus}")?;
        writeln!(out, "🗂 履歴要約:\n{history_digest}\n")?;

        let session_id = self.db.start_session(user.id)?;
        tracing::info!(session_id, "session started");

        let question = self.llm.complete(
            &prompts::question(&weakness_focus.to_string(), &history_digest),
            prompts::QUESTION_TEMPERATURE,
        )?;
        writeln!(out, "📌 出題（冴子先生）: {question}")?;

        write!(out, "{ANSWER_PROMPT}")?;
        out.flush()?;
        let answer = read_answer(input)?;
        tracing::debug!(chars = answer.chars().count(), "answer collected");

        let grading_reply = self.llm.complete(
            &prompts::grading(&question, &answer),
            prompts::GRADING_TEMPERATURE,
        )?;
        writeln!(out, "\n📝 添削結果\n{grading_reply}")?;

        let feedback = parse_feedback(&grading_reply);
        // The question row and its weakness bump land together or not at all.
        let tx = self.db.transaction()?;
        let question_id = self.db.insert_question(&NewQuestion {
            session_id,
            question_text: &question,
            expected_ans: &feedback.correct_sample,
            user_answer: &answer,
            verdict: &feedback.verdict,
        })?;
        tracing::info!(
            question_id,
            correct = feedback.is_correct(),
            category = feedback.category().unwrap_or(NONE_CATEGORY),
            "question saved"
        );

        let weakness = match feedback.category() {
            Some(category) => Some(tracker.record(user.id, category)?),
            None => None,
        };
        tx.commit()?;

        writeln!(
            out,
            "\n💾 保存OK: question#{} / isCorrect={} / category={}",
            question_id,
            feedback.is_correct(),
            feedback.verdict.label()
        )?;

        Ok(TurnReport {
            user_id: user.id,
            session_id,
            question_id,
            weakness_focus,
            history_digest,
            question,
            answer,
            grading_reply,
            feedback,
            weakness,
        })
    }
}

// Blocks until one line arrives. EOF before any input is an error.
pub fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(TutorError::NoAnswer);
    }
    Ok(line.trim().to_string())
}
