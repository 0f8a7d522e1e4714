//! SQLite schema introspection rows
//!
//! Mirrors the columns of `PRAGMA table_info(..)` and `sqlite_master`.

use rusqlite::{Connection, Row};
use serde::Serialize;

use super::result::Result;

/// One row of `PRAGMA table_info(<table>)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    pub notnull: bool,
    pub dflt_value: Option<String>,
    pub pk: i64,
}

impl ColumnInfo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            cid: row.get("cid")?,
            name: row.get("name")?,
            col_type: row.get("type")?,
            notnull: row.get::<_, i64>("notnull")? != 0,
            dflt_value: row.get("dflt_value")?,
            pk: row.get("pk")?,
        })
    }
}

/// One row of `sqlite_master`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub tbl_name: String,
    pub rootpage: i64,
    pub sql: Option<String>,
}

impl TableInfo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            kind: row.get("type")?,
            name: row.get("name")?,
            tbl_name: row.get("tbl_name")?,
            rootpage: row.get::<_, Option<i64>>("rootpage")?.unwrap_or(0),
            sql: row.get("sql")?,
        })
    }
}

/// Quote an identifier for interpolation into a pragma
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Columns of `table` in declaration order. Empty if the table doesn't exist.
pub fn table_info(db: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = db.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], ColumnInfo::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// All user tables listed in `sqlite_master`. SQLite's own bookkeeping
/// tables (`sqlite_sequence`, `sqlite_stat1`, ..) are left out.
pub fn tables(db: &Connection) -> Result<Vec<TableInfo>> {
    let mut stmt = db.prepare(
        "SELECT type, name, tbl_name, rootpage, sql FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], TableInfo::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tables)
}

/// Whether `table` has a column called `column`
pub fn column_exists(db: &Connection, table: &str, column: &str) -> Result<bool> {
    Ok(table_info(db, table)?.iter().any(|c| c.name == column))
}

/// Whether a table called `table` exists
pub fn table_exists(db: &Connection, table: &str) -> Result<bool> {
    let count: i64 = db.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
