//! Category management commands

use std::path::Path;

use anyhow::Result;

use tally_core::db::CategoryPatch;
use tally_core::hierarchy::{build_hierarchy, CategoryNode};

use crate::cli::CategoriesAction;

use super::open_db;

pub fn cmd_categories(db_path: &Path, action: CategoriesAction) -> Result<()> {
    let db = open_db(db_path)?;

    match action {
        CategoriesAction::List => {
            let categories = db.get_categories_flat()?;
            if categories.is_empty() {
                println!("No categories yet. Add one with: tally categories add <name>");
                return Ok(());
            }
            for node in build_hierarchy(&categories) {
                print_node(&node);
            }
        }
        CategoriesAction::Add {
            name,
            parent,
            budget,
            color,
        } => {
            let id = db.create_category(&name, color.as_deref(), None, parent, budget)?;
            println!("✅ Created category {} ({})", name, id);
        }
        CategoriesAction::Move { id, parent } => {
            let category = db.update_category(
                id,
                &CategoryPatch {
                    parent_id: Some(parent),
                    ..Default::default()
                },
            )?;
            match category.parent_id {
                Some(pid) => println!("✅ Moved {} under {}", category.name, pid),
                None => println!("✅ {} is now a root category", category.name),
            }
        }
        CategoriesAction::Budget { id, amount } => {
            let category = db.update_category(
                id,
                &CategoryPatch {
                    monthly_budget: Some(amount),
                    ..Default::default()
                },
            )?;
            match category.monthly_budget {
                Some(budget) => println!("✅ Budget for {} set to {:.2}", category.name, budget),
                None => println!("✅ Budget for {} cleared", category.name),
            }
        }
    }

    Ok(())
}

fn print_node(node: &CategoryNode) {
    let indent = "  ".repeat(node.depth as usize);
    let budget = node
        .category
        .monthly_budget
        .map(|b| format!("  (budget {:.2})", b))
        .unwrap_or_default();
    println!(
        "   {}{} [{}]{}",
        indent, node.category.name, node.category.id, budget
    );
    for child in &node.children {
        print_node(child);
    }
}
