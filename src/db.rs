use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row, Transaction};
use std::path::Path;

use crate::models::{NewQuestion, Question, Stats, User, Verdict, Weakness};
#[cfg(test)]
use crate::models::Session;

const SCHEMA: &str = include_str!("schema.sql");

const QUESTION_COLUMNS: &str = "q.id, q.session_id, q.question_text, q.expected_ans, \
     q.user_answer, q.is_correct, q.error_type, q.created_at";

pub struct Database {
    conn: Connection,
}

// Stored timestamps share one fixed-width format so they sort lexically.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    // Idempotent; runs before first use on every start.
    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)
    }

    // Statements issued through this handle join the transaction until it is
    // committed. Dropping it uncommitted rolls everything back.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        self.conn.unchecked_transaction()
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // User operations
    pub fn get_user(&self, name: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, name FROM users WHERE name = ?1",
                params![name],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
    }

    pub fn get_or_create_user(&self, name: &str) -> Result<User> {
        if let Some(user) = self.get_user(name)? {
            return Ok(user);
        }

        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", params![name])?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    // Session operations
    pub fn start_session(&self, user_id: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (user_id, created_at) VALUES (?1, ?2)",
            params![user_id, timestamp(Utc::now())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[cfg(test)]
    pub fn get_session(&self, session_id: i64) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT id, user_id, created_at FROM sessions WHERE id = ?1",
                params![session_id],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    // Question operations
    pub fn insert_question(&self, question: &NewQuestion<'_>) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO questions
                (session_id, question_text, expected_ans, user_answer, is_correct, error_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                question.session_id,
                question.question_text,
                question.expected_ans,
                question.user_answer,
                question.verdict.is_correct(),
                question.verdict.category(),
                timestamp(Utc::now()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[cfg(test)]
    pub fn get_question(&self, question_id: i64) -> Result<Option<Question>> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.id = ?1");
        self.conn
            .query_row(&sql, params![question_id], question_from_row)
            .optional()
    }

    // Newest first, across every session of the user.
    pub fn recent_questions(&self, user_id: i64, limit: usize) -> Result<Vec<Question>> {
        let sql = format!(
            r#"
            SELECT {QUESTION_COLUMNS}
            FROM questions q
            WHERE q.session_id IN (SELECT id FROM sessions WHERE user_id = ?1)
            ORDER BY q.created_at DESC, q.id DESC
            LIMIT ?2
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, limit as i64], question_from_row)?;
        rows.collect()
    }

    // Weakness operations
    pub fn get_weakness(&self, user_id: i64, category: &str) -> Result<Option<Weakness>> {
        self.conn
            .query_row(
                r#"
                SELECT id, user_id, category, description, frequency, last_occurred
                FROM weaknesses
                WHERE user_id = ?1 AND category = ?2
                "#,
                params![user_id, category],
                weakness_from_row,
            )
            .optional()
    }

    // Ranked by frequency, then by how recently the mistake was made.
    pub fn list_weaknesses(&self, user_id: i64, limit: Option<usize>) -> Result<Vec<Weakness>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, category, description, frequency, last_occurred
            FROM weaknesses
            WHERE user_id = ?1
            ORDER BY frequency DESC, last_occurred DESC, id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, limit], weakness_from_row)?;
        rows.collect()
    }

    // Bumps the existing row or inserts a fresh one at frequency 1, in one
    // statement. last_occurred never moves backwards.
    pub fn record_weakness(
        &self,
        user_id: i64,
        category: &str,
        description: &str,
        at: DateTime<Utc>,
    ) -> Result<Weakness> {
        self.conn.execute(
            r#"
            INSERT INTO weaknesses (user_id, category, description, frequency, last_occurred)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT (user_id, category) DO UPDATE SET
                frequency = frequency + 1,
                last_occurred = max(last_occurred, excluded.last_occurred)
            "#,
            params![user_id, category, description, timestamp(at)],
        )?;

        self.get_weakness(user_id, category)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_stats(&self, user_id: i64) -> Result<Stats> {
        let total_sessions: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let (total_questions, correct): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(is_correct), 0)
            FROM questions
            WHERE session_id IN (SELECT id FROM sessions WHERE user_id = ?1)
            "#,
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let weakness_categories: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM weaknesses WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(Stats {
            total_sessions,
            total_questions,
            correct,
            weakness_categories,
        })
    }
}

fn question_from_row(row: &Row<'_>) -> Result<Question> {
    let is_correct: bool = row.get(5)?;
    let error_type: Option<String> = row.get(6)?;
    Ok(Question {
        id: row.get(0)?,
        session_id: row.get(1)?,
        question_text: row.get(2)?,
        expected_ans: row.get(3)?,
        user_answer: row.get(4)?,
        verdict: Verdict::from_columns(is_correct, error_type),
        created_at: row.get(7)?,
    })
}

fn weakness_from_row(row: &Row<'_>) -> Result<Weakness> {
    Ok(Weakness {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        frequency: row.get(4)?,
        last_occurred: row.get(5)?,
    })
}
