use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_effort, to_u32},
    models::CompletedExerciseRecord,
};

const EXERCISE_COLUMNS: &str = "id, session_id, exercise_name, sets, reps, weight, completed_sets, date, workout_day, effort_level";

fn row_to_exercise(row: &Row) -> Result<CompletedExerciseRecord> {
    let date: String = row.get("date")?;
    let sets: i64 = row.get("sets")?;
    let reps: i64 = row.get("reps")?;
    let completed_sets: i64 = row.get("completed_sets")?;
    let effort_level: Option<i64> = row.get("effort_level")?;

    Ok(CompletedExerciseRecord {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        exercise_name: row.get("exercise_name")?,
        sets: to_u32(sets, "sets")?,
        reps: to_u32(reps, "reps")?,
        weight: row.get("weight")?,
        completed_sets: to_u32(completed_sets, "completed_sets")?,
        date: parse_datetime(&date, "date")?,
        workout_day: row.get("workout_day")?,
        effort: parse_effort(effort_level)?,
    })
}

pub(super) fn insert_exercise_row(
    conn: &Connection,
    record: &CompletedExerciseRecord,
) -> Result<()> {
    conn.execute(
        "INSERT INTO completed_exercises (id, session_id, exercise_name, sets, reps, weight, completed_sets, date, workout_day, effort_level)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.id,
            record.session_id,
            record.exercise_name,
            record.sets,
            record.reps,
            record.weight,
            record.completed_sets,
            format_datetime(&record.date),
            record.workout_day,
            record.effort.map(|level| level.raw()),
        ],
    )
    .with_context(|| format!("failed to insert exercise record for {}", record.exercise_name))?;
    Ok(())
}

fn collect_exercises(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<CompletedExerciseRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(args)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(row_to_exercise(row)?);
    }
    Ok(records)
}

impl Database {
    pub async fn insert_exercise_record(&self, record: &CompletedExerciseRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| insert_exercise_row(conn, &record)).await
    }

    /// All exercise records, newest first.
    pub async fn list_exercise_records(&self) -> Result<Vec<CompletedExerciseRecord>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {EXERCISE_COLUMNS} FROM completed_exercises ORDER BY date DESC, exercise_name ASC"
            );
            collect_exercises(conn, &sql, &[])
        })
        .await
    }

    pub async fn exercises_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<CompletedExerciseRecord>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {EXERCISE_COLUMNS} FROM completed_exercises
                 WHERE session_id = ?1
                 ORDER BY rowid ASC"
            );
            collect_exercises(conn, &sql, &[&session_id])
        })
        .await
    }

    /// Most recent non-zero weight per exercise for one plan day.
    pub async fn latest_weights_for_day(&self, workout_day: &str) -> Result<HashMap<String, f64>> {
        let workout_day = workout_day.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT exercise_name, weight FROM completed_exercises
                 WHERE workout_day = ?1 AND weight > 0
                 ORDER BY date DESC",
            )?;
            let mut rows = stmt.query(params![workout_day])?;
            let mut weights = HashMap::new();
            while let Some(row) = rows.next()? {
                let name: String = row.get(0)?;
                let weight: f64 = row.get(1)?;
                weights.entry(name).or_insert(weight);
            }
            Ok(weights)
        })
        .await
    }

    /// Removes exactly one exercise record. Returns whether a row was removed.
    pub async fn delete_exercise_record(&self, record_id: &str) -> Result<bool> {
        let record_id = record_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM completed_exercises WHERE id = ?1",
                params![record_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::EffortLevel;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn record(id: &str, name: &str, weight: f64, date: DateTime<Utc>) -> CompletedExerciseRecord {
        CompletedExerciseRecord {
            id: id.into(),
            session_id: format!("session-{id}"),
            exercise_name: name.into(),
            sets: 3,
            reps: 12,
            weight,
            completed_sets: 3,
            date,
            workout_day: "day1".into(),
            effort: Some(EffortLevel::Easy),
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn records_keep_effort_and_weight() {
        let db = Database::open_in_memory().unwrap();
        let original = record("1", "Pec deck fly", 27.5, base());
        db.insert_exercise_record(&original).await.unwrap();

        let stored = db.list_exercise_records().await.unwrap();
        assert_eq!(stored, vec![original]);
    }

    #[tokio::test]
    async fn latest_weight_wins_and_zero_weights_are_skipped() {
        let db = Database::open_in_memory().unwrap();
        db.insert_exercise_record(&record("1", "Leg press", 20.0, base())).await.unwrap();
        db.insert_exercise_record(&record("2", "Leg press", 25.0, base() + Duration::days(7)))
            .await
            .unwrap();
        db.insert_exercise_record(&record("3", "Leg press", 0.0, base() + Duration::days(14)))
            .await
            .unwrap();
        db.insert_exercise_record(&record("4", "Plank", 0.0, base())).await.unwrap();

        let weights = db.latest_weights_for_day("day1").await.unwrap();
        assert_eq!(weights.get("Leg press"), Some(&25.0));
        assert!(!weights.contains_key("Plank"));
        assert!(db.latest_weights_for_day("day2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_exercise_record_is_targeted() {
        let db = Database::open_in_memory().unwrap();
        db.insert_exercise_record(&record("1", "Plank", 0.0, base())).await.unwrap();
        db.insert_exercise_record(&record("2", "Dead bug", 0.0, base())).await.unwrap();

        assert!(db.delete_exercise_record("1").await.unwrap());
        let remaining = db.list_exercise_records().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "2");
    }
}
