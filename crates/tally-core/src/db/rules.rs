//! Classification rule operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ClassificationRule, MatchMode, NewRule, RuleField, RuleKind};

impl Database {
    /// Create a rule. Without an explicit priority it lands on top of its
    /// kind (highest priority so far plus one).
    pub fn create_rule(&self, rule: &NewRule) -> Result<i64> {
        let conn = self.conn()?;

        let priority = match rule.priority {
            Some(p) => p,
            None => {
                let max: i64 = conn.query_row(
                    "SELECT COALESCE(MAX(priority), 0) FROM rules WHERE kind = ?",
                    params![rule.kind.as_str()],
                    |row| row.get(0),
                )?;
                max + 1
            }
        };

        conn.execute(
            r#"
            INSERT INTO rules (kind, field, mode, pattern, target_id, priority, active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                rule.kind.as_str(),
                rule.field.as_str(),
                rule.mode.as_str(),
                rule.pattern,
                rule.target_id,
                priority,
                rule.active,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a rule by id
    pub fn get_rule(&self, id: i64) -> Result<Option<ClassificationRule>> {
        let conn = self.conn()?;
        let rule = conn
            .query_row(
                &format!("SELECT {} FROM rules WHERE id = ?", Self::RULE_COLUMNS),
                params![id],
                Self::row_to_rule,
            )
            .optional()?;
        Ok(rule)
    }

    /// Active rules of one kind, highest priority first (ties keep
    /// insertion order). This is the evaluation order contract the
    /// classification engine relies on.
    pub fn get_active_rules(&self, kind: RuleKind) -> Result<Vec<ClassificationRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rules WHERE kind = ? AND active = 1 ORDER BY priority DESC, id ASC",
            Self::RULE_COLUMNS
        ))?;

        let rules = stmt
            .query_map(params![kind.as_str()], Self::row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// All rules of one kind, including inactive, in evaluation order
    pub fn list_rules(&self, kind: RuleKind) -> Result<Vec<ClassificationRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rules WHERE kind = ? ORDER BY priority DESC, id ASC",
            Self::RULE_COLUMNS
        ))?;

        let rules = stmt
            .query_map(params![kind.as_str()], Self::row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Update a rule's pattern, mode, field, target, or active flag
    pub fn update_rule(
        &self,
        id: i64,
        field: Option<RuleField>,
        mode: Option<MatchMode>,
        pattern: Option<&str>,
        target_id: Option<i64>,
        active: Option<bool>,
    ) -> Result<ClassificationRule> {
        let conn = self.conn()?;

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(f) = field {
            updates.push("field = ?");
            values.push(Box::new(f.as_str()));
        }
        if let Some(m) = mode {
            updates.push("mode = ?");
            values.push(Box::new(m.as_str()));
        }
        if let Some(p) = pattern {
            updates.push("pattern = ?");
            values.push(Box::new(p.to_string()));
        }
        if let Some(t) = target_id {
            updates.push("target_id = ?");
            values.push(Box::new(t));
        }
        if let Some(a) = active {
            updates.push("active = ?");
            values.push(Box::new(a));
        }

        if !updates.is_empty() {
            values.push(Box::new(id));
            let sql = format!("UPDATE rules SET {} WHERE id = ?", updates.join(", "));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|p| p.as_ref()).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;
            if changed == 0 {
                return Err(Error::NotFound(format!("Rule {} not found", id)));
            }
        }

        drop(conn);
        self.get_rule(id)?
            .ok_or_else(|| Error::NotFound(format!("Rule {} not found", id)))
    }

    /// Delete a rule
    pub fn delete_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM rules WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Rule {} not found", id)));
        }
        Ok(())
    }

    /// Reassign priorities for one kind from an explicit ordering.
    ///
    /// `ordered_ids` lists the kind's rules from highest to lowest; they
    /// receive a contiguous descending sequence (len .. 1). Priorities are
    /// stored explicitly rather than implied by row order, so a reorder
    /// rewrites every listed rule in one transaction.
    pub fn reorder_rules(&self, kind: RuleKind, ordered_ids: &[i64]) -> Result<()> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| {
            let total = ordered_ids.len() as i64;
            for (position, rule_id) in ordered_ids.iter().enumerate() {
                let changed = conn.execute(
                    "UPDATE rules SET priority = ? WHERE id = ? AND kind = ?",
                    params![total - position as i64, rule_id, kind.as_str()],
                )?;
                if changed == 0 {
                    return Err(Error::NotFound(format!(
                        "Rule {} not found for kind {}",
                        rule_id, kind
                    )));
                }
            }
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

    const RULE_COLUMNS: &'static str =
        "id, kind, field, mode, pattern, target_id, priority, active, created_at";

    fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<ClassificationRule> {
        let kind_str: String = row.get(1)?;
        let field_str: String = row.get(2)?;
        let mode_str: String = row.get(3)?;
        let active_int: i64 = row.get(7)?;
        let created_at_str: String = row.get(8)?;
        Ok(ClassificationRule {
            id: row.get(0)?,
            kind: kind_str.parse().unwrap_or(RuleKind::Category),
            field: field_str.parse().unwrap_or(RuleField::Description),
            mode: mode_str.parse().unwrap_or(MatchMode::Contains),
            pattern: row.get(4)?,
            target_id: row.get(5)?,
            priority: row.get(6)?,
            active: active_int != 0,
            created_at: parse_datetime(&created_at_str),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: RuleKind, pattern: &str, target_id: i64, priority: Option<i64>) -> NewRule {
        NewRule {
            kind,
            field: RuleField::Description,
            mode: MatchMode::Contains,
            pattern: pattern.to_string(),
            target_id,
            priority,
            active: true,
        }
    }

    #[test]
    fn test_active_rules_ordered_by_priority_then_insertion() {
        let db = Database::in_memory().unwrap();
        let low = db.create_rule(&rule(RuleKind::Unit, "A", 1, Some(5))).unwrap();
        let high = db.create_rule(&rule(RuleKind::Unit, "B", 2, Some(50))).unwrap();
        let tied = db.create_rule(&rule(RuleKind::Unit, "C", 3, Some(5))).unwrap();
        // A different kind never leaks into the listing
        db.create_rule(&rule(RuleKind::Category, "D", 4, Some(99)))
            .unwrap();

        let rules = db.get_active_rules(RuleKind::Unit).unwrap();
        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![high, low, tied]);
    }

    #[test]
    fn test_inactive_rules_excluded_from_active_listing() {
        let db = Database::in_memory().unwrap();
        let id = db.create_rule(&rule(RuleKind::Unit, "A", 1, None)).unwrap();
        db.update_rule(id, None, None, None, None, Some(false))
            .unwrap();

        assert!(db.get_active_rules(RuleKind::Unit).unwrap().is_empty());
        assert_eq!(db.list_rules(RuleKind::Unit).unwrap().len(), 1);
    }

    #[test]
    fn test_create_without_priority_lands_on_top() {
        let db = Database::in_memory().unwrap();
        db.create_rule(&rule(RuleKind::Unit, "A", 1, Some(3))).unwrap();
        let top = db.create_rule(&rule(RuleKind::Unit, "B", 2, None)).unwrap();

        let rules = db.get_active_rules(RuleKind::Unit).unwrap();
        assert_eq!(rules[0].id, top);
        assert_eq!(rules[0].priority, 4);
    }

    #[test]
    fn test_reorder_assigns_contiguous_descending_priorities() {
        let db = Database::in_memory().unwrap();
        let a = db.create_rule(&rule(RuleKind::Category, "A", 1, Some(10))).unwrap();
        let b = db.create_rule(&rule(RuleKind::Category, "B", 2, Some(20))).unwrap();
        let c = db.create_rule(&rule(RuleKind::Category, "C", 3, Some(30))).unwrap();

        db.reorder_rules(RuleKind::Category, &[a, c, b]).unwrap();

        let rules = db.list_rules(RuleKind::Category).unwrap();
        let order: Vec<(i64, i64)> = rules.iter().map(|r| (r.id, r.priority)).collect();
        assert_eq!(order, vec![(a, 3), (c, 2), (b, 1)]);
    }

    #[test]
    fn test_reorder_with_unknown_id_rolls_back() {
        let db = Database::in_memory().unwrap();
        let a = db.create_rule(&rule(RuleKind::Category, "A", 1, Some(10))).unwrap();

        assert!(db.reorder_rules(RuleKind::Category, &[999, a]).is_err());
        // Original priority untouched
        assert_eq!(db.get_rule(a).unwrap().unwrap().priority, 10);
    }
}
