use anyhow::{Context, Result};
use rusqlite::{params, Row, Transaction};

use crate::db::{
    connection::{ChangeKind, Database},
    helpers::parse_datetime,
    models::MapMetadata,
};

fn row_to_metadata(row: &Row) -> Result<MapMetadata> {
    let last_synced: String = row.get("last_synced")?;

    Ok(MapMetadata {
        width: row.get("width")?,
        height: row.get("height")?,
        min_x: row.get("min_x")?,
        max_x: row.get("max_x")?,
        min_y: row.get("min_y")?,
        max_y: row.get("max_y")?,
        last_synced: parse_datetime(&last_synced, "last_synced")?,
    })
}

pub(crate) fn upsert_metadata_tx(tx: &Transaction<'_>, metadata: &MapMetadata) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO map_metadata
             (id, width, height, min_x, max_x, min_y, max_y, last_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            MapMetadata::SINGLETON_ID,
            metadata.width,
            metadata.height,
            metadata.min_x,
            metadata.max_x,
            metadata.min_y,
            metadata.max_y,
            metadata.last_synced.to_rfc3339(),
        ],
    )
    .context("failed to upsert map metadata")?;
    Ok(())
}

impl Database {
    /// Replace the singleton metadata row.
    pub async fn upsert_metadata(&self, metadata: MapMetadata) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            upsert_metadata_tx(&tx, &metadata)?;
            tx.commit().context("failed to commit metadata upsert")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Metadata);
        Ok(())
    }

    /// Current metadata, or None if no full sync has ever completed.
    pub async fn metadata(&self) -> Result<Option<MapMetadata>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT width, height, min_x, max_x, min_y, max_y, last_synced
                 FROM map_metadata
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![MapMetadata::SINGLETON_ID])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_metadata(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn clear_metadata(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM map_metadata", [])
                .context("failed to clear map metadata")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Metadata);
        Ok(())
    }
}
