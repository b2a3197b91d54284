use super::sqlite::Database;
use crate::activity::{Activity, ActivitySink, NewActivity};
use crate::error::Error;
use async_trait::async_trait;
use rusqlite::params;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

impl Database {
    pub fn insert_activity(&self, activity: &NewActivity) -> rusqlite::Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "INSERT INTO activity (user_id, project_id, kind, message, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                activity.user_id,
                activity.project_id,
                activity.kind.as_str(),
                activity.message,
                now
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Most recent activities for `user_id`, newest first.
    pub fn recent_activities(&self, user_id: &str, limit: i64) -> rusqlite::Result<Vec<Activity>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, message, recorded_at, kind, project_id FROM activity \
             WHERE user_id = ?1 ORDER BY recorded_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(Activity {
                id: row.get::<_, i64>(0)?.to_string(),
                message: row.get(1)?,
                timestamp: row.get(2)?,
                kind: row.get(3)?,
                project_id: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    /// Delete one of `user_id`'s activities. Returns `false` if no such entry belongs to them.
    pub fn delete_activity(&self, user_id: &str, id: i64) -> rusqlite::Result<bool> {
        let deleted = self.connection().execute(
            "DELETE FROM activity WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    /// Delete every activity of `user_id`, returning how many went.
    pub fn clear_activities(&self, user_id: &str) -> rusqlite::Result<usize> {
        let deleted = self
            .connection()
            .execute("DELETE FROM activity WHERE user_id = ?1", params![user_id])?;
        debug!("Cleared {} journaled activities for {}", deleted, user_id);
        Ok(deleted)
    }

    pub fn activity_count(&self) -> rusqlite::Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM activity", [], |row| row.get(0))
    }
}

/// Activity sink that appends to the local SQLite journal.
pub struct JournalSink {
    db: Mutex<Database>,
}

impl JournalSink {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open(path: &str) -> Result<Self, Error> {
        Ok(Self::new(Database::open(path)?))
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn recent(&self, user_id: &str, limit: i64) -> Result<Vec<Activity>, Error> {
        Ok(self.db().recent_activities(user_id, limit)?)
    }

    pub fn delete(&self, user_id: &str, id: i64) -> Result<bool, Error> {
        Ok(self.db().delete_activity(user_id, id)?)
    }

    pub fn clear(&self, user_id: &str) -> Result<usize, Error> {
        Ok(self.db().clear_activities(user_id)?)
    }
}

#[async_trait]
impl ActivitySink for JournalSink {
    async fn record(&self, activity: &NewActivity) -> Result<(), Error> {
        let id = self.db().insert_activity(activity)?;
        trace!("Journaled activity {}: {}", id, activity.message);
        Ok(())
    }
}
