//! Header-driven column detection for heterogeneous bank exports
//!
//! Export formats disagree on header names ("Transaction Date" vs "Posted
//! Date", "Merchant" vs "Description"), so detection works from per-field
//! synonym lists in two passes: exact equality first, then substring
//! containment. The result is a best-effort default the user may override;
//! callers should only re-run detection while nothing has been mapped yet.

use serde::{Deserialize, Serialize};

/// Logical transaction fields a raw column can map to, in the fixed order
/// they claim columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalField {
    Date,
    Description,
    Amount,
    SourceCategory,
}

impl LogicalField {
    pub const ALL: [LogicalField; 4] = [
        LogicalField::Date,
        LogicalField::Description,
        LogicalField::Amount,
        LogicalField::SourceCategory,
    ];

    /// Known header synonyms, most specific first
    fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &[
                "date",
                "transaction date",
                "posted date",
                "post date",
                "trans date",
                "booking date",
            ],
            Self::Description => &[
                "description",
                "merchant",
                "payee",
                "details",
                "narrative",
                "memo",
                "name",
            ],
            Self::Amount => &["amount", "debit", "credit", "value", "transaction amount"],
            Self::SourceCategory => &["category", "transaction category", "classification", "type"],
        }
    }
}

/// Result of header detection: logical field -> column index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub amount: Option<usize>,
    pub source_category: Option<usize>,
}

impl ColumnMap {
    pub fn get(&self, field: LogicalField) -> Option<usize> {
        match field {
            LogicalField::Date => self.date,
            LogicalField::Description => self.description,
            LogicalField::Amount => self.amount,
            LogicalField::SourceCategory => self.source_category,
        }
    }

    fn set(&mut self, field: LogicalField, index: usize) {
        match field {
            LogicalField::Date => self.date = Some(index),
            LogicalField::Description => self.description = Some(index),
            LogicalField::Amount => self.amount = Some(index),
            LogicalField::SourceCategory => self.source_category = Some(index),
        }
    }

    /// True when no field has been mapped yet (the only state in which
    /// callers should re-run detection)
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.source_category.is_none()
    }

    fn claimed(&self, index: usize) -> bool {
        LogicalField::ALL.iter().any(|f| self.get(*f) == Some(index))
    }
}

/// Infer which columns hold the date, description, amount, and bank category.
///
/// Pass 1 tests trimmed lower-cased equality against each unmapped field's
/// synonyms; pass 2 tests substring containment for columns and fields still
/// open. Earlier columns win ties, fields are tried in declared order, and a
/// mapping is never reassigned.
pub fn map_columns(headers: &[&str]) -> ColumnMap {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut map = ColumnMap::default();

    // Exact pass
    for (idx, header) in normalized.iter().enumerate() {
        if map.claimed(idx) {
            continue;
        }
        for field in LogicalField::ALL {
            if map.get(field).is_some() {
                continue;
            }
            if field.synonyms().iter().any(|s| header == s) {
                map.set(field, idx);
                break;
            }
        }
    }

    // Partial pass over what is left
    for (idx, header) in normalized.iter().enumerate() {
        if map.claimed(idx) {
            continue;
        }
        for field in LogicalField::ALL {
            if map.get(field).is_some() {
                continue;
            }
            if field.synonyms().iter().any(|s| header.contains(s)) {
                map.set(field, idx);
                break;
            }
        }
    }

    map
}

/// Display-width class for a column, derived from sampled cell lengths.
/// Purely a presentation hint for preview tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnWidth {
    Narrow,
    Medium,
    Wide,
}

/// Bucket each column by the longest sampled value it contains.
/// `samples` is row-major: each inner slice is one sampled row.
pub fn classify_widths(samples: &[Vec<String>]) -> Vec<ColumnWidth> {
    let columns = samples.iter().map(|row| row.len()).max().unwrap_or(0);
    (0..columns)
        .map(|col| {
            let longest = samples
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.trim().len())
                .max()
                .unwrap_or(0);
            match longest {
                0..=12 => ColumnWidth::Narrow,
                13..=28 => ColumnWidth::Medium,
                _ => ColumnWidth::Wide,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_typical_card_export() {
        let map = map_columns(&["Transaction Date", "Merchant", "Debit"]);
        assert_eq!(map.date, Some(0));
        assert_eq!(map.description, Some(1));
        assert_eq!(map.amount, Some(2));
        assert_eq!(map.source_category, None);
    }

    #[test]
    fn test_map_exact_before_partial() {
        // "Date" is exact for date; "Post Date" must not steal it in the
        // partial pass even though it also contains "date"
        let map = map_columns(&["Post Date", "Date", "Description", "Amount"]);
        assert_eq!(map.date, Some(1));
        assert_eq!(map.description, Some(2));
        assert_eq!(map.amount, Some(3));
    }

    #[test]
    fn test_map_partial_containment() {
        let map = map_columns(&["Booking Date (UTC)", "Payee Name", "Amount (USD)"]);
        assert_eq!(map.date, Some(0));
        assert_eq!(map.description, Some(1));
        assert_eq!(map.amount, Some(2));
    }

    #[test]
    fn test_earlier_column_wins() {
        let map = map_columns(&["Amount", "Transaction Amount"]);
        assert_eq!(map.amount, Some(0));
    }

    #[test]
    fn test_unrecognized_headers_stay_unmapped() {
        let map = map_columns(&["Foo", "Bar", "Baz"]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_category_and_type() {
        let map = map_columns(&["Date", "Description", "Category", "Type", "Amount"]);
        assert_eq!(map.source_category, Some(2));
        // "Type" stays unclaimed once category is mapped
        assert_eq!(map.amount, Some(4));
    }

    #[test]
    fn test_classify_widths() {
        let samples = vec![
            vec!["01/15/2024".to_string(), "NETFLIX.COM STREAMING SERVICE BILL".to_string(), "-15.99".to_string()],
            vec!["01/16/2024".to_string(), "STARBUCKS".to_string(), "-5.50".to_string()],
        ];
        let widths = classify_widths(&samples);
        assert_eq!(
            widths,
            vec![ColumnWidth::Narrow, ColumnWidth::Wide, ColumnWidth::Narrow]
        );
    }
}
