//! Unit (organizational label) operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Unit;

impl Database {
    /// Create a new unit
    pub fn create_unit(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO units (name, color) VALUES (?, ?)",
            params![name, color],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a unit by id
    pub fn get_unit(&self, id: i64) -> Result<Option<Unit>> {
        let conn = self.conn()?;
        let unit = conn
            .query_row(
                "SELECT id, name, color, active, created_at FROM units WHERE id = ?",
                params![id],
                Self::row_to_unit,
            )
            .optional()?;
        Ok(unit)
    }

    /// List units, optionally including inactive ones
    pub fn list_units(&self, include_inactive: bool) -> Result<Vec<Unit>> {
        let conn = self.conn()?;
        let sql = if include_inactive {
            "SELECT id, name, color, active, created_at FROM units ORDER BY name"
        } else {
            "SELECT id, name, color, active, created_at FROM units WHERE active = 1 ORDER BY name"
        };
        let mut stmt = conn.prepare(sql)?;

        let units = stmt
            .query_map([], Self::row_to_unit)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(units)
    }

    /// Update a unit's name, color, or active flag
    pub fn update_unit(
        &self,
        id: i64,
        name: Option<&str>,
        color: Option<Option<&str>>,
        active: Option<bool>,
    ) -> Result<Unit> {
        let conn = self.conn()?;

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(n) = name {
            updates.push("name = ?");
            values.push(Box::new(n.to_string()));
        }
        if let Some(c) = color {
            updates.push("color = ?");
            values.push(Box::new(c.map(|s| s.to_string())));
        }
        if let Some(a) = active {
            updates.push("active = ?");
            values.push(Box::new(a));
        }

        if !updates.is_empty() {
            values.push(Box::new(id));
            let sql = format!("UPDATE units SET {} WHERE id = ?", updates.join(", "));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|p| p.as_ref()).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;
            if changed == 0 {
                return Err(Error::NotFound(format!("Unit {} not found", id)));
            }
        }

        drop(conn);
        self.get_unit(id)?
            .ok_or_else(|| Error::NotFound(format!("Unit {} not found", id)))
    }

    fn row_to_unit(row: &rusqlite::Row) -> rusqlite::Result<Unit> {
        let active_int: i64 = row.get(3)?;
        let created_at_str: String = row.get(4)?;
        Ok(Unit {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            active: active_int != 0,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
