//! Rule-based transaction classification
//!
//! Two independent, priority-ordered rule sets assign a unit and a category
//! to a transaction. Rules are user-authored patterns over the description,
//! the source identity, or the bank-provided category label. Rule sets are
//! fetched fresh for every classification pass; the engine itself never
//! caches them across calls.

use regex::RegexBuilder;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::{ClassificationRule, MatchMode, RuleField, RuleKind, Transaction};

/// Check a single (value, pattern, mode) triple.
///
/// All modes are case-insensitive. A regex pattern that fails to compile
/// matches nothing; one malformed rule must never abort a classification
/// pass.
pub fn pattern_matches(value: &str, pattern: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Exact => value.to_uppercase() == pattern.to_uppercase(),
        MatchMode::Contains => value.to_uppercase().contains(&pattern.to_uppercase()),
        MatchMode::StartsWith => value.to_uppercase().starts_with(&pattern.to_uppercase()),
        MatchMode::Regex => RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(value))
            .unwrap_or(false),
    }
}

/// The transaction fields visible to the rule engine
#[derive(Debug, Clone)]
pub struct ClassifyView<'a> {
    pub source_id: i64,
    pub description: &'a str,
    pub source_category: Option<&'a str>,
}

impl<'a> ClassifyView<'a> {
    pub fn of(tx: &'a Transaction) -> Self {
        Self {
            source_id: tx.source_id,
            description: &tx.description,
            source_category: tx.source_category.as_deref(),
        }
    }
}

/// Unit/category ids assigned by a classification pass.
/// Either dimension may be unassigned; that is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Assignment {
    pub unit_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// Snapshot of the active rules, ordered for evaluation
pub struct ClassificationEngine {
    unit_rules: Vec<ClassificationRule>,
    category_rules: Vec<ClassificationRule>,
}

impl ClassificationEngine {
    /// Build an engine over rule snapshots. Inactive rules are dropped and
    /// each set is stably sorted by priority descending, so rules with equal
    /// priority keep their given order.
    pub fn new(
        unit_rules: Vec<ClassificationRule>,
        category_rules: Vec<ClassificationRule>,
    ) -> Self {
        let prepare = |mut rules: Vec<ClassificationRule>| {
            rules.retain(|r| r.active);
            rules.sort_by(|a, b| b.priority.cmp(&a.priority));
            rules
        };
        Self {
            unit_rules: prepare(unit_rules),
            category_rules: prepare(category_rules),
        }
    }

    /// Assign a unit and a category by first-match over each rule set.
    ///
    /// The two passes are independent: a transaction may receive a unit, a
    /// category, both, or neither. Read-only; nothing is persisted here.
    pub fn classify(&self, view: &ClassifyView) -> Assignment {
        Assignment {
            unit_id: self.first_match(&self.unit_rules, view),
            category_id: self.first_match(&self.category_rules, view),
        }
    }

    fn first_match(&self, rules: &[ClassificationRule], view: &ClassifyView) -> Option<i64> {
        let source_str = view.source_id.to_string();
        for rule in rules {
            let value: &str = match rule.field {
                RuleField::Description => view.description,
                RuleField::Source => &source_str,
                RuleField::SourceCategory => match view.source_category {
                    Some(c) => c,
                    None => continue,
                },
            };
            if pattern_matches(value, &rule.pattern, rule.mode) {
                debug!(
                    rule_id = rule.id,
                    pattern = %rule.pattern,
                    target = rule.target_id,
                    "Rule matched"
                );
                return Some(rule.target_id);
            }
        }
        None
    }
}

impl Database {
    /// Build a classification engine from the currently active rules.
    ///
    /// Fetched per classification pass rather than held between calls, since
    /// rules may change at any time. A fetch failure propagates; the caller
    /// must treat both dimensions as unassigned rather than guessing.
    pub fn classifier(&self) -> Result<ClassificationEngine> {
        let unit_rules = self.get_active_rules(RuleKind::Unit)?;
        let category_rules = self.get_active_rules(RuleKind::Category)?;
        Ok(ClassificationEngine::new(unit_rules, category_rules))
    }
}

/// Result of a classification backfill over unclassified transactions
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BackfillOutcome {
    pub processed: i64,
    pub classified: i64,
    pub unit_assigned: i64,
    pub category_assigned: i64,
}

/// Run the rule engine over stored transactions that are missing a unit or
/// category, persisting whatever each pass assigns. Existing assignments
/// are kept; the engine only fills the empty dimension.
pub fn apply_rules(db: &Database, limit: i64) -> Result<BackfillOutcome> {
    let engine = db.classifier()?;
    let pending = db.unclassified_transactions(limit)?;

    let mut outcome = BackfillOutcome {
        processed: pending.len() as i64,
        ..Default::default()
    };

    for tx in &pending {
        let assignment = engine.classify(&ClassifyView::of(tx));
        let unit_id = tx.unit_id.or(assignment.unit_id);
        let category_id = tx.category_id.or(assignment.category_id);
        if unit_id == tx.unit_id && category_id == tx.category_id {
            continue;
        }
        db.update_classification(tx.id, unit_id, category_id)?;
        outcome.classified += 1;
        if unit_id != tx.unit_id {
            outcome.unit_assigned += 1;
        }
        if category_id != tx.category_id {
            outcome.category_assigned += 1;
        }
    }

    debug!(
        processed = outcome.processed,
        classified = outcome.classified,
        "Classification backfill complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rule(
        id: i64,
        kind: RuleKind,
        field: RuleField,
        mode: MatchMode,
        pattern: &str,
        target_id: i64,
        priority: i64,
    ) -> ClassificationRule {
        ClassificationRule {
            id,
            kind,
            field,
            mode,
            pattern: pattern.to_string(),
            target_id,
            priority,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn view(description: &str) -> ClassifyView<'_> {
        ClassifyView {
            source_id: 1,
            description,
            source_category: None,
        }
    }

    #[test]
    fn test_pattern_matching_modes() {
        assert!(pattern_matches("NETFLIX", "Netflix", MatchMode::Exact));
        assert!(!pattern_matches("NETFLIX.COM", "NETFLIX", MatchMode::Exact));

        assert!(pattern_matches("shell oil 123", "SHELL", MatchMode::Contains));
        assert!(!pattern_matches("GROCERY", "SHELL", MatchMode::Contains));

        assert!(pattern_matches("UBER EATS", "uber", MatchMode::StartsWith));
        assert!(!pattern_matches("EATS UBER", "uber", MatchMode::StartsWith));

        assert!(pattern_matches("NETFLIX.COM/BILL", r"^netflix", MatchMode::Regex));
        assert!(!pattern_matches("HULU", r"^NETFLIX", MatchMode::Regex));
    }

    #[test]
    fn test_malformed_regex_never_matches() {
        assert!(!pattern_matches("ANYTHING", r"[unclosed", MatchMode::Regex));
    }

    #[test]
    fn test_priority_order_first_match_wins() {
        let engine = ClassificationEngine::new(
            vec![
                rule(1, RuleKind::Unit, RuleField::Description, MatchMode::Contains, "UBER EATS", 10, 50),
                rule(2, RuleKind::Unit, RuleField::Description, MatchMode::Contains, "UBER", 20, 100),
            ],
            vec![],
        );

        // Both rules match; the higher priority one wins even though it was
        // inserted second
        let result = engine.classify(&view("UBER EATS DELIVERY"));
        assert_eq!(result.unit_id, Some(20));
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let engine = ClassificationEngine::new(
            vec![
                rule(1, RuleKind::Unit, RuleField::Description, MatchMode::Contains, "COFFEE", 1, 5),
                rule(2, RuleKind::Unit, RuleField::Description, MatchMode::Contains, "COFFEE", 2, 5),
            ],
            vec![],
        );
        assert_eq!(engine.classify(&view("COFFEE SHOP")).unit_id, Some(1));
    }

    #[test]
    fn test_empty_rule_sets_assign_nothing() {
        let engine = ClassificationEngine::new(vec![], vec![]);
        assert_eq!(engine.classify(&view("ANYTHING")), Assignment::default());
    }

    #[test]
    fn test_inactive_rules_are_skipped() {
        let mut r = rule(1, RuleKind::Unit, RuleField::Description, MatchMode::Contains, "UBER", 7, 10);
        r.active = false;
        let engine = ClassificationEngine::new(vec![r], vec![]);
        assert_eq!(engine.classify(&view("UBER TRIP")).unit_id, None);
    }

    #[test]
    fn test_source_field_matches_source_id_string() {
        let engine = ClassificationEngine::new(
            vec![rule(1, RuleKind::Unit, RuleField::Source, MatchMode::Exact, "42", 3, 10)],
            vec![],
        );
        let v = ClassifyView {
            source_id: 42,
            description: "ANYTHING",
            source_category: None,
        };
        assert_eq!(engine.classify(&v).unit_id, Some(3));
    }

    #[test]
    fn test_source_category_rule_skipped_without_label() {
        let engine = ClassificationEngine::new(
            vec![],
            vec![
                rule(1, RuleKind::Category, RuleField::SourceCategory, MatchMode::Contains, "Groceries", 5, 20),
                rule(2, RuleKind::Category, RuleField::Description, MatchMode::Contains, "MARKET", 6, 10),
            ],
        );

        // No bank label: the source_category rule cannot match, the
        // description rule still can
        let result = engine.classify(&view("FARMERS MARKET"));
        assert_eq!(result.category_id, Some(6));

        let with_label = ClassifyView {
            source_id: 1,
            description: "H-E-B #123",
            source_category: Some("Merchandise-Groceries"),
        };
        assert_eq!(engine.classify(&with_label).category_id, Some(5));
    }

    #[test]
    fn test_passes_are_independent() {
        let engine = ClassificationEngine::new(
            vec![rule(1, RuleKind::Unit, RuleField::Description, MatchMode::Contains, "AWS", 1, 10)],
            vec![rule(2, RuleKind::Category, RuleField::Description, MatchMode::Contains, "NOMATCH", 9, 10)],
        );
        let result = engine.classify(&view("AWS CLOUD BILL"));
        assert_eq!(result.unit_id, Some(1));
        assert_eq!(result.category_id, None);
    }
}
