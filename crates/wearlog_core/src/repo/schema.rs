//! Connection readiness checks shared by SQLite repositories.

use rusqlite::Connection;

/// Returns the first table from `tables` that is missing on `conn`.
pub(crate) fn first_missing_table(
    conn: &Connection,
    tables: &[&'static str],
) -> rusqlite::Result<Option<&'static str>> {
    for &table in tables {
        if !table_exists(conn, table)? {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

pub(crate) fn garment_exists(conn: &Connection, garment_id: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM garments WHERE id = ?1);",
        [garment_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
