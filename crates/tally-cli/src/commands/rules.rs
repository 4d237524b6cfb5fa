//! Classification rule management commands

use std::path::Path;

use anyhow::{anyhow, Result};

use tally_core::models::{MatchMode, NewRule, RuleField, RuleKind};

use crate::cli::RulesAction;

use super::{open_db, truncate};

pub fn cmd_rules(db_path: &Path, action: RulesAction) -> Result<()> {
    let db = open_db(db_path)?;

    match action {
        RulesAction::List { kind } => {
            let kind: RuleKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let rules = db.list_rules(kind)?;
            if rules.is_empty() {
                println!("No {} rules yet.", kind);
                return Ok(());
            }
            println!(
                "   {:>4} {:>8} {:<16} {:<12} {:<28} {:>6}",
                "id", "priority", "field", "mode", "pattern", "target"
            );
            for rule in rules {
                let marker = if rule.active { " " } else { "✗" };
                println!(
                    "   {:>4} {:>8} {:<16} {:<12} {:<28} {:>6} {}",
                    rule.id,
                    rule.priority,
                    rule.field.as_str(),
                    rule.mode.as_str(),
                    truncate(&rule.pattern, 28),
                    rule.target_id,
                    marker
                );
            }
        }
        RulesAction::Add {
            kind,
            pattern,
            target,
            field,
            mode,
        } => {
            let rule = NewRule {
                kind: kind.parse().map_err(|e: String| anyhow!(e))?,
                field: field.parse::<RuleField>().map_err(|e| anyhow!(e))?,
                mode: mode.parse::<MatchMode>().map_err(|e| anyhow!(e))?,
                pattern,
                target_id: target,
                priority: None,
                active: true,
            };
            let id = db.create_rule(&rule)?;
            println!("✅ Created rule {} (evaluated first among {} rules)", id, rule.kind);
        }
        RulesAction::Reorder { kind, ids } => {
            let kind: RuleKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            db.reorder_rules(kind, &ids)?;
            println!("✅ Reordered {} {} rules", ids.len(), kind);
        }
    }

    Ok(())
}
