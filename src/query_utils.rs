//! Database query utility functions
//!
//! Small helpers for single-value queries against the metadata store,
//! used by the open-time validation and the source summary accessors.

use anyhow_ext::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// Query a single optional i64 value
pub fn query_single_i64(db: &Connection, sql: &str) -> Result<Option<i64>> {
    db.prepare(sql)
        .dot()?
        .query_row([], |row| row.get(0))
        .optional()
        .dot()
}

/// Check if a table exists in the database
pub fn table_exists(db: &Connection, table_name: &str) -> Result<bool> {
    let count: i64 = db
        .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1")
        .dot()?
        .query_row([table_name], |row| row.get(0))
        .dot()?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_exists_and_single_value() {
        let db = Connection::open_in_memory().unwrap();
        db.execute_batch("CREATE TABLE Spectra (Id INTEGER PRIMARY KEY);")
            .unwrap();
        db.execute("INSERT INTO Spectra (Id) VALUES (1), (2), (3)", [])
            .unwrap();

        assert!(table_exists(&db, "Spectra").unwrap());
        assert!(!table_exists(&db, "AcquisitionKeys").unwrap());

        let count = query_single_i64(&db, "SELECT count(Id) FROM Spectra").unwrap();
        assert_eq!(count, Some(3));
    }
}
