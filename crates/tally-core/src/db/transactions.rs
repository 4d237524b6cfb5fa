//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction};

/// Filters, pagination, and sort for transaction listings
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub source_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub category_id: Option<i64>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Case-insensitive substring match on the description
    pub search: Option<String>,
    /// "date" (default) or "amount"
    pub sort_field: Option<String>,
    /// "asc" or "desc" (default)
    pub sort_order: Option<String>,
    pub include_ignored: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            source_id: None,
            unit_id: None,
            category_id: None,
            date_range: None,
            search: None,
            sort_field: None,
            sort_order: None,
            include_ignored: false,
            limit: 50,
            offset: 0,
        }
    }
}

/// One page of a transaction listing plus the unpaginated total
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransactionPage {
    pub rows: Vec<Transaction>,
    pub total: i64,
}

impl Database {
    /// Insert a transaction. The fingerprint column is UNIQUE, so inserting
    /// a duplicate surfaces a constraint error; callers go through the
    /// dedup gate first.
    pub fn create_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        let tags_json = tx
            .tags
            .as_ref()
            .map(|t| serde_json::to_string(t))
            .transpose()?;

        conn.execute(
            r#"
            INSERT INTO transactions
                (source_id, unit_id, category_id, date, description, amount,
                 source_category, fingerprint, notes, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.source_id,
                tx.unit_id,
                tx.category_id,
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.source_category,
                tx.fingerprint,
                tx.notes,
                tags_json,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Look up a prior transaction by fingerprint digest
    pub fn get_by_fingerprint(&self, digest: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE fingerprint = ?",
            Self::TRANSACTION_COLUMNS
        ))?;

        let transaction = stmt
            .query_row(params![digest], Self::row_to_transaction)
            .optional()?;

        Ok(transaction)
    }

    /// Get a single transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            Self::TRANSACTION_COLUMNS
        ))?;

        let transaction = stmt
            .query_row(params![id], Self::row_to_transaction)
            .optional()?;

        Ok(transaction)
    }

    /// List transactions with filters, pagination, and sort
    pub fn list_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        let conn = self.conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(source_id) = query.source_id {
            conditions.push("source_id = ?".to_string());
            values.push(Box::new(source_id));
        }
        if let Some(unit_id) = query.unit_id {
            conditions.push("unit_id = ?".to_string());
            values.push(Box::new(unit_id));
        }
        if let Some(category_id) = query.category_id {
            conditions.push("category_id = ?".to_string());
            values.push(Box::new(category_id));
        }
        if let Some((from, to)) = query.date_range {
            conditions.push("date BETWEEN ? AND ?".to_string());
            values.push(Box::new(from.to_string()));
            values.push(Box::new(to.to_string()));
        }
        if let Some(ref search) = query.search {
            if !search.trim().is_empty() {
                conditions.push("description LIKE ? COLLATE NOCASE".to_string());
                values.push(Box::new(format!("%{}%", search.trim())));
            }
        }
        if !query.include_ignored {
            conditions.push("ignored = 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sort_field = match query.sort_field.as_deref() {
            Some("amount") => "amount",
            _ => "date",
        };
        let sort_order = match query.sort_order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };

        let count_sql = format!("SELECT COUNT(*) FROM transactions {}", where_clause);
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, params_refs.as_slice(), |row| row.get(0))?;

        let sql = format!(
            "SELECT {} FROM transactions {} ORDER BY {} {}, id DESC LIMIT ? OFFSET ?",
            Self::TRANSACTION_COLUMNS,
            where_clause,
            sort_field,
            sort_order
        );

        let mut values = values;
        values.push(Box::new(query.limit));
        values.push(Box::new(query.offset));
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TransactionPage { rows, total })
    }

    /// All transactions inside a date range (report input; no pagination)
    pub fn transactions_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE date BETWEEN ? AND ? ORDER BY date",
            Self::TRANSACTION_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![from.to_string(), to.to_string()],
                Self::row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Transactions still missing a unit or a category assignment
    pub fn unclassified_transactions(&self, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE (unit_id IS NULL OR category_id IS NULL) AND ignored = 0
            ORDER BY date DESC, id DESC
            LIMIT ?
            "#,
            Self::TRANSACTION_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Apply a classification result to a stored transaction
    pub fn update_classification(
        &self,
        id: i64,
        unit_id: Option<i64>,
        category_id: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions SET unit_id = ?, category_id = ? WHERE id = ?",
            params![unit_id, category_id, id],
        )?;
        if changed == 0 {
            return Err(crate::error::Error::NotFound(format!(
                "Transaction {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Toggle the ignore flag (hidden from reports)
    pub fn set_ignored(&self, id: i64, ignored: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE transactions SET ignored = ? WHERE id = ?",
            params![ignored, id],
        )?;
        if changed == 0 {
            return Err(crate::error::Error::NotFound(format!(
                "Transaction {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Count all transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    const TRANSACTION_COLUMNS: &'static str =
        "id, source_id, unit_id, category_id, date, description, amount, \
         source_category, fingerprint, ignored, notes, tags, created_at";

    /// Helper to convert a row to Transaction. Column order must match
    /// TRANSACTION_COLUMNS.
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(4)?;
        let ignored_int: i64 = row.get(9)?;
        let tags_json: Option<String> = row.get(11)?;
        let created_at_str: String = row.get(12)?;
        Ok(Transaction {
            id: row.get(0)?,
            source_id: row.get(1)?,
            unit_id: row.get(2)?,
            category_id: row.get(3)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            description: row.get(5)?,
            amount: row.get(6)?,
            source_category: row.get(7)?,
            fingerprint: row.get(8)?,
            ignored: ignored_int != 0,
            notes: row.get(10)?,
            tags: tags_json.and_then(|t| serde_json::from_str(&t).ok()),
            created_at: parse_datetime(&created_at_str),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tx(source_id: i64, date: &str, description: &str, amount: f64) -> NewTransaction {
        NewTransaction {
            source_id,
            unit_id: None,
            category_id: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            amount,
            source_category: None,
            fingerprint: Some(crate::fingerprint::fingerprint(
                source_id,
                date,
                description,
                amount,
            )),
            notes: None,
            tags: None,
        }
    }

    #[test]
    fn test_insert_and_fingerprint_lookup() {
        let db = Database::in_memory().unwrap();
        let source = db.upsert_source("Checking").unwrap();

        let tx = new_tx(source, "2024-01-15", "NETFLIX.COM", -15.99);
        let id = db.create_transaction(&tx).unwrap();

        let found = db
            .get_by_fingerprint(tx.fingerprint.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.description, "NETFLIX.COM");
        assert_eq!(found.amount, -15.99);

        assert!(db.get_by_fingerprint("0000000000000000").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_fingerprint_violates_constraint() {
        let db = Database::in_memory().unwrap();
        let source = db.upsert_source("Checking").unwrap();

        let tx = new_tx(source, "2024-01-15", "STARBUCKS", -5.50);
        db.create_transaction(&tx).unwrap();
        assert!(db.create_transaction(&tx).is_err());
    }

    #[test]
    fn test_list_with_filters_and_sort() {
        let db = Database::in_memory().unwrap();
        let source = db.upsert_source("Checking").unwrap();

        db.create_transaction(&new_tx(source, "2024-01-10", "A", -10.0))
            .unwrap();
        db.create_transaction(&new_tx(source, "2024-01-20", "B", -30.0))
            .unwrap();
        db.create_transaction(&new_tx(source, "2024-02-05", "C", -20.0))
            .unwrap();

        let page = db
            .list_transactions(&TransactionQuery {
                date_range: Some((
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                )),
                sort_field: Some("amount".to_string()),
                sort_order: Some("asc".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.rows[0].description, "B");
        assert_eq!(page.rows[1].description, "A");

        let page = db
            .list_transactions(&TransactionQuery {
                search: Some("c".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].description, "C");
    }

    #[test]
    fn test_unclassified_and_update_classification() {
        let db = Database::in_memory().unwrap();
        let source = db.upsert_source("Checking").unwrap();
        let unit = db.create_unit("Personal", None).unwrap();

        let id = db
            .create_transaction(&new_tx(source, "2024-01-10", "UBER", -25.0))
            .unwrap();
        assert_eq!(db.unclassified_transactions(10).unwrap().len(), 1);

        db.update_classification(id, Some(unit), None).unwrap();
        let tx = db.get_transaction(id).unwrap().unwrap();
        assert_eq!(tx.unit_id, Some(unit));

        assert!(db.update_classification(999, None, None).is_err());
    }

    #[test]
    fn test_tags_round_trip() {
        let db = Database::in_memory().unwrap();
        let source = db.upsert_source("Checking").unwrap();

        let mut tx = new_tx(source, "2024-01-10", "FLIGHT", -300.0);
        tx.tags = Some(vec!["travel".to_string(), "work".to_string()]);
        let id = db.create_transaction(&tx).unwrap();

        let stored = db.get_transaction(id).unwrap().unwrap();
        assert_eq!(
            stored.tags,
            Some(vec!["travel".to_string(), "work".to_string()])
        );
    }
}
