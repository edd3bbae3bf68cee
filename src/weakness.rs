//! Per-user error-frequency counters that steer question generation.

use chrono::{DateTime, Utc};
use rusqlite::Result;
use serde::Serialize;
use std::fmt;

use crate::db::Database;
use crate::models::{Weakness, NONE_CATEGORY};

pub const FOCUS_LIMIT: usize = 3;

/// The user's most frequent, most recent error categories. Empty means the
/// user has no recorded weaknesses yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeaknessFocus(Vec<String>);

impl WeaknessFocus {
    #[cfg(test)]
    pub fn categories(&self) -> &[String] {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WeaknessFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str(NONE_CATEGORY)
        } else {
            f.write_str(&self.0.join(", "))
        }
    }
}

pub struct WeaknessTracker<'a> {
    db: &'a Database,
}

impl<'a> WeaknessTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn focus(&self, user_id: i64) -> Result<WeaknessFocus> {
        let rows = self.db.list_weaknesses(user_id, Some(FOCUS_LIMIT))?;
        Ok(WeaknessFocus(rows.into_iter().map(|w| w.category).collect()))
    }

    pub fn record(&self, user_id: i64, category: &str) -> Result<Weakness> {
        self.record_at(user_id, category, Utc::now())
    }

    // Every call counts, including retries of the same turn.
    pub fn record_at(&self, user_id: i64, category: &str, at: DateTime<Utc>) -> Result<Weakness> {
        let weakness =
            self.db
                .record_weakness(user_id, category, &describe(category), at)?;
        tracing::debug!(
            user_id,
            category,
            frequency = weakness.frequency,
            "weakness recorded"
        );
        Ok(weakness)
    }
}

fn describe(category: &str) -> String {
    format!("{category}に関するミス")
}
