//! Import source operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::Source;

impl Database {
    /// Get a source id by name, creating the source if needed
    pub fn upsert_source(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM sources WHERE name = ?", params![name], |row| {
                row.get(0)
            })
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute("INSERT INTO sources (name) VALUES (?)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a single source by id
    pub fn get_source(&self, id: i64) -> Result<Option<Source>> {
        let conn = self.conn()?;
        let source = conn
            .query_row(
                "SELECT id, name, created_at FROM sources WHERE id = ?",
                params![id],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    Ok(Source {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;
        Ok(source)
    }

    /// List all sources
    pub fn list_sources(&self) -> Result<Vec<Source>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM sources ORDER BY name")?;

        let sources = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(2)?;
                Ok(Source {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let a = db.upsert_source("Checking").unwrap();
        let b = db.upsert_source("Checking").unwrap();
        assert_eq!(a, b);
        assert_eq!(db.list_sources().unwrap().len(), 1);
    }
}
