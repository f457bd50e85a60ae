use anyhow::{Context, Result};
use rusqlite::{params, Row, Transaction};

use crate::db::{
    connection::{ChangeKind, Database},
    helpers::parse_datetime,
    models::{MapCell, MapMetadata},
    repositories::map_metadata::upsert_metadata_tx,
};

fn row_to_cell(row: &Row) -> Result<MapCell> {
    let last_updated: String = row.get("last_updated")?;

    Ok(MapCell {
        x: row.get("x")?,
        y: row.get("y")?,
        strength1: row.get("strength1")?,
        strength2: row.get("strength2")?,
        strength3: row.get("strength3")?,
        is_custom: row.get("is_custom")?,
        last_updated: parse_datetime(&last_updated, "last_updated")?,
    })
}

pub(crate) fn insert_cells_tx(tx: &Transaction<'_>, cells: &[MapCell]) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "INSERT OR REPLACE INTO map_cells
                 (x, y, strength1, strength2, strength3, is_custom, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .context("failed to prepare cell upsert")?;

    for cell in cells {
        stmt.execute(params![
            cell.x,
            cell.y,
            cell.strength1,
            cell.strength2,
            cell.strength3,
            cell.is_custom,
            cell.last_updated.to_rfc3339(),
        ])
        .with_context(|| format!("failed to upsert cell ({}, {})", cell.x, cell.y))?;
    }

    Ok(())
}

impl Database {
    /// Insert or replace cells by (x, y). Replacement is whole-row; there is
    /// no partial-field merge.
    pub async fn upsert_cells(&self, cells: Vec<MapCell>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            insert_cells_tx(&tx, &cells)?;
            tx.commit().context("failed to commit cell upsert")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        Ok(())
    }

    /// All cached cells, column-major: x ascending, y descending within a
    /// column. Rendering and nearest-match iteration both rely on this order.
    pub async fn all_cells(&self) -> Result<Vec<MapCell>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT x, y, strength1, strength2, strength3, is_custom, last_updated
                 FROM map_cells
                 ORDER BY x ASC, y DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut cells = Vec::new();
            while let Some(row) = rows.next()? {
                cells.push(row_to_cell(row)?);
            }
            Ok(cells)
        })
        .await
    }

    /// Cells of one column, y descending.
    pub async fn column_cells(&self, x: i32) -> Result<Vec<MapCell>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT x, y, strength1, strength2, strength3, is_custom, last_updated
                 FROM map_cells
                 WHERE x = ?1
                 ORDER BY y DESC",
            )?;

            let mut rows = stmt.query(params![x])?;
            let mut cells = Vec::new();
            while let Some(row) = rows.next()? {
                cells.push(row_to_cell(row)?);
            }
            Ok(cells)
        })
        .await
    }

    pub async fn cell_at(&self, x: i32, y: i32) -> Result<Option<MapCell>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT x, y, strength1, strength2, strength3, is_custom, last_updated
                 FROM map_cells
                 WHERE x = ?1 AND y = ?2",
            )?;

            let mut rows = stmt.query(params![x, y])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_cell(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn clear_cells(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM map_cells", [])
                .context("failed to clear map cells")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        Ok(())
    }

    pub async fn delete_column(&self, x: i32) -> Result<()> {
        self.execute(move |conn| {
            conn.execute("DELETE FROM map_cells WHERE x = ?1", params![x])
                .with_context(|| format!("failed to delete column x={x}"))?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        Ok(())
    }

    pub async fn delete_cell(&self, x: i32, y: i32) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM map_cells WHERE x = ?1 AND y = ?2",
                params![x, y],
            )
            .with_context(|| format!("failed to delete cell ({x}, {y})"))?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        Ok(())
    }

    /// Full-sync write path: clear every cell, insert the reconciled set and
    /// the new metadata in one transaction. Readers see either the previous
    /// rectangle or the new one, never a mix, and metadata never points at a
    /// partially written rectangle.
    pub(crate) async fn replace_map(
        &self,
        cells: Vec<MapCell>,
        metadata: MapMetadata,
    ) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM map_cells", [])
                .context("failed to clear map cells")?;
            insert_cells_tx(&tx, &cells)?;
            upsert_metadata_tx(&tx, &metadata)?;
            tx.commit().context("failed to commit full map write")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        self.notify(ChangeKind::Metadata);
        Ok(())
    }

    /// Column-refresh write path: delete-then-write so stale y values the
    /// remote no longer reports cannot survive.
    pub(crate) async fn replace_column(&self, x: i32, cells: Vec<MapCell>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM map_cells WHERE x = ?1", params![x])
                .with_context(|| format!("failed to delete column x={x}"))?;
            insert_cells_tx(&tx, &cells)?;
            tx.commit()
                .with_context(|| format!("failed to commit column x={x} write"))?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        Ok(())
    }

    /// Cache-clear write path: drop cells and metadata together.
    pub(crate) async fn clear_map(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM map_cells", [])
                .context("failed to clear map cells")?;
            tx.execute("DELETE FROM map_metadata", [])
                .context("failed to clear map metadata")?;
            tx.commit().context("failed to commit cache clear")?;
            Ok(())
        })
        .await?;

        self.notify(ChangeKind::Cells);
        self.notify(ChangeKind::Metadata);
        Ok(())
    }
}
