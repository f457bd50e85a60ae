use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::{ChangeKind, Database},
    helpers::parse_datetime,
    models::UserMeasurement,
};

fn row_to_measurement(row: &Row) -> Result<UserMeasurement> {
    let recorded_at: String = row.get("recorded_at")?;

    Ok(UserMeasurement {
        id: Some(row.get("id")?),
        x: row.get("x")?,
        y: row.get("y")?,
        sensor: row.get("sensor")?,
        strength: row.get("strength")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
    })
}

impl Database {
    /// Append a measurement to the audit log. Returns the assigned row id.
    pub async fn insert_measurement(&self, measurement: &UserMeasurement) -> Result<i64> {
        let record = measurement.clone();
        let id = self
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO user_measurements (x, y, sensor, strength, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.x,
                        record.y,
                        record.sensor,
                        record.strength,
                        record.recorded_at.to_rfc3339(),
                    ],
                )
                .context("failed to insert measurement")?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        self.notify(ChangeKind::Measurements);
        Ok(id)
    }

    /// All measurements, newest first.
    pub async fn measurements(&self) -> Result<Vec<UserMeasurement>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, x, y, sensor, strength, recorded_at
                 FROM user_measurements
                 ORDER BY recorded_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut measurements = Vec::new();
            while let Some(row) = rows.next()? {
                measurements.push(row_to_measurement(row)?);
            }
            Ok(measurements)
        })
        .await
    }

    /// Measurements recorded at one coordinate, newest first.
    pub async fn measurements_for_cell(&self, x: i32, y: i32) -> Result<Vec<UserMeasurement>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, x, y, sensor, strength, recorded_at
                 FROM user_measurements
                 WHERE x = ?1 AND y = ?2
                 ORDER BY recorded_at DESC",
            )?;

            let mut rows = stmt.query(params![x, y])?;
            let mut measurements = Vec::new();
            while let Some(row) = rows.next()? {
                measurements.push(row_to_measurement(row)?);
            }
            Ok(measurements)
        })
        .await
    }

    pub async fn clear_measurements(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM user_measurements", [])
                .context("failed to clear measurements")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Measurements);
        Ok(())
    }
}
