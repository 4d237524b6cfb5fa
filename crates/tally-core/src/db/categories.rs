//! Category operations with cycle-guarded mutations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::hierarchy::would_create_cycle;
use crate::models::Category;

/// Partial update for a category. Outer `None` leaves the field alone;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub parent_id: Option<Option<i64>>,
    pub monthly_budget: Option<Option<f64>>,
}

impl Database {
    /// Create a new category
    pub fn create_category(
        &self,
        name: &str,
        color: Option<&str>,
        icon: Option<&str>,
        parent_id: Option<i64>,
        monthly_budget: Option<f64>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        if let Some(pid) = parent_id {
            let exists: bool = conn
                .query_row("SELECT 1 FROM categories WHERE id = ?", params![pid], |_| {
                    Ok(true)
                })
                .unwrap_or(false);
            if !exists {
                return Err(Error::NotFound(format!(
                    "Parent category {} does not exist",
                    pid
                )));
            }
        }

        conn.execute(
            r#"
            INSERT INTO categories (name, color, icon, parent_id, monthly_budget)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![name, color, icon, parent_id, monthly_budget],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a category by id
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                r#"
                SELECT id, name, color, icon, parent_id, monthly_budget, created_at
                FROM categories WHERE id = ?
                "#,
                params![id],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// All categories as a flat list (the hierarchy module groups them)
    pub fn get_categories_flat(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, color, icon, parent_id, monthly_budget, created_at
            FROM categories ORDER BY name
            "#,
        )?;

        let categories = stmt
            .query_map([], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Apply a partial update to a category.
    ///
    /// Changing the parent is validated first: a category can never be its
    /// own parent, and the new parent must not be one of the category's
    /// descendants. The update is all-or-nothing.
    pub fn update_category(&self, id: i64, patch: &CategoryPatch) -> Result<Category> {
        self.get_category(id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))?;

        if let Some(Some(new_parent)) = patch.parent_id {
            if new_parent == id {
                return Err(Error::SelfParent);
            }
            let all = self.get_categories_flat()?;
            if !all.iter().any(|c| c.id == new_parent) {
                return Err(Error::NotFound(format!(
                    "Parent category {} does not exist",
                    new_parent
                )));
            }
            if would_create_cycle(&all, id, new_parent) {
                return Err(Error::CircularDependency);
            }
        }

        let conn = self.conn()?;

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = patch.name {
            updates.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(ref color) = patch.color {
            updates.push("color = ?");
            values.push(Box::new(color.clone()));
        }
        if let Some(ref icon) = patch.icon {
            updates.push("icon = ?");
            values.push(Box::new(icon.clone()));
        }
        if let Some(parent_id) = patch.parent_id {
            updates.push("parent_id = ?");
            values.push(Box::new(parent_id));
        }
        if let Some(budget) = patch.monthly_budget {
            updates.push("monthly_budget = ?");
            values.push(Box::new(budget));
        }

        if !updates.is_empty() {
            values.push(Box::new(id));
            let sql = format!("UPDATE categories SET {} WHERE id = ?", updates.join(", "));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|p| p.as_ref()).collect();
            conn.execute(&sql, params_refs.as_slice())?;
        }

        drop(conn);
        Ok(self.get_category(id)?.expect("category just updated"))
    }

    /// Delete a category. Refused while children exist; transactions keep
    /// their category_id cleared.
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let exists: bool = conn
            .query_row("SELECT 1 FROM categories WHERE id = ?", params![id], |_| {
                Ok(true)
            })
            .unwrap_or(false);
        if !exists {
            return Err(Error::NotFound(format!("Category {} not found", id)));
        }

        let children: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE parent_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(Error::HasChildren);
        }

        conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| {
            conn.execute(
                "UPDATE transactions SET category_id = NULL WHERE category_id = ?",
                params![id],
            )?;
            conn.execute("DELETE FROM rules WHERE kind = 'category' AND target_id = ?", params![id])?;
            conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        let created_at_str: String = row.get(6)?;
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            icon: row.get(3)?,
            parent_id: row.get(4)?,
            monthly_budget: row.get(5)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
