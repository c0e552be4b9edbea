use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_i64, to_u32, to_u64},
    models::{FinishedWorkout, WorkoutSessionRecord},
};

use super::exercises::insert_exercise_row;

const SESSION_COLUMNS: &str =
    "id, date, workout_day, duration_secs, is_completed, total_exercises, completed_exercises";

fn row_to_session(row: &Row) -> Result<WorkoutSessionRecord> {
    let date: String = row.get("date")?;
    let duration_secs: i64 = row.get("duration_secs")?;
    let total_exercises: i64 = row.get("total_exercises")?;
    let completed_exercises: i64 = row.get("completed_exercises")?;

    Ok(WorkoutSessionRecord {
        id: row.get("id")?,
        date: parse_datetime(&date, "date")?,
        workout_day: row.get("workout_day")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        is_completed: row.get("is_completed")?,
        total_exercises: to_u32(total_exercises, "total_exercises")?,
        completed_exercises: to_u32(completed_exercises, "completed_exercises")?,
    })
}

pub(super) fn insert_session_row(conn: &Connection, record: &WorkoutSessionRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO workout_sessions (id, date, workout_day, duration_secs, is_completed, total_exercises, completed_exercises)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            format_datetime(&record.date),
            record.workout_day,
            to_i64(record.duration_secs)?,
            record.is_completed,
            record.total_exercises,
            record.completed_exercises,
        ],
    )
    .with_context(|| format!("failed to insert session {}", record.id))?;
    Ok(())
}

fn collect_sessions(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<WorkoutSessionRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(args)?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }
    Ok(sessions)
}

impl Database {
    pub async fn insert_session_record(&self, record: &WorkoutSessionRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| insert_session_row(conn, &record)).await
    }

    /// Writes the session row and every exercise row atomically.
    pub async fn record_finished_workout(&self, finished: &FinishedWorkout) -> Result<()> {
        let finished = finished.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            insert_session_row(&tx, &finished.session)?;
            for exercise in &finished.exercises {
                insert_exercise_row(&tx, exercise)?;
            }
            tx.commit().context("failed to commit finished workout")?;
            Ok(())
        })
        .await
    }

    /// All sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<WorkoutSessionRecord>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM workout_sessions ORDER BY date DESC"
            );
            collect_sessions(conn, &sql, &[])
        })
        .await
    }

    pub async fn list_sessions_since(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<WorkoutSessionRecord>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM workout_sessions
                 WHERE date >= ?1
                 ORDER BY date DESC"
            );
            collect_sessions(conn, &sql, &[&format_datetime(&start)])
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<WorkoutSessionRecord>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE id = ?1");
            let session = conn
                .query_row(&sql, params![session_id], |row| Ok(row_to_session(row)))
                .optional()?
                .transpose()?;
            Ok(session)
        })
        .await
    }

    pub async fn last_session_for_day(
        &self,
        workout_day: &str,
    ) -> Result<Option<WorkoutSessionRecord>> {
        let workout_day = workout_day.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM workout_sessions
                 WHERE workout_day = ?1
                 ORDER BY date DESC
                 LIMIT 1"
            );
            Ok(collect_sessions(conn, &sql, &[&workout_day])?.into_iter().next())
        })
        .await
    }

    pub async fn count_sessions(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM workout_sessions", [], |row| row.get(0))?;
            to_u64(count, "session count")
        })
        .await
    }

    /// Removes exactly one session row. Exercise rows are independent
    /// records and stay. Returns whether a row was removed.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM workout_sessions WHERE id = ?1",
                params![session_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
