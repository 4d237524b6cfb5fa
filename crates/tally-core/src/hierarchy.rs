//! Category forest construction and cycle checks
//!
//! Categories are stored flat with plain parent ids. The tree is assembled
//! by one grouping pass over an id-keyed arena; cycle prevention happens at
//! mutation time with a bounded ancestor walk, never by unbounded recursion
//! through embedded structures.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::Category;

/// A category with its resolved children
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub depth: i32,
    pub children: Vec<CategoryNode>,
}

/// Group flat category rows into a forest.
///
/// A category whose declared parent id is absent from the given set is
/// treated as a root; stale parent references are a display concern, not an
/// error.
pub fn build_hierarchy(categories: &[Category]) -> Vec<CategoryNode> {
    let ids: HashSet<i64> = categories.iter().map(|c| c.id).collect();

    let mut children_of: HashMap<i64, Vec<&Category>> = HashMap::new();
    let mut roots: Vec<&Category> = Vec::new();
    for category in categories {
        match category.parent_id {
            Some(pid) if ids.contains(&pid) && pid != category.id => {
                children_of.entry(pid).or_default().push(category);
            }
            _ => roots.push(category),
        }
    }

    fn assemble(
        category: &Category,
        depth: i32,
        children_of: &HashMap<i64, Vec<&Category>>,
        visited: &mut HashSet<i64>,
    ) -> CategoryNode {
        // visited guards against malformed data with a parent loop
        visited.insert(category.id);
        let children = children_of
            .get(&category.id)
            .map(|kids| {
                let mut out = Vec::new();
                for k in kids.iter() {
                    if !visited.contains(&k.id) {
                        out.push(assemble(k, depth + 1, children_of, visited));
                    }
                }
                out
            })
            .unwrap_or_default();
        CategoryNode {
            category: category.clone(),
            depth,
            children,
        }
    }

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .map(|root| assemble(root, 0, &children_of, &mut visited))
        .collect()
}

/// Would re-parenting `category_id` under `proposed_parent_id` create a
/// cycle?
///
/// Walks the ancestor chain starting at the proposed parent. Returns true
/// if the walk reaches `category_id` or revisits any node before hitting a
/// null parent.
pub fn would_create_cycle(
    categories: &[Category],
    category_id: i64,
    proposed_parent_id: i64,
) -> bool {
    let parent_of: HashMap<i64, Option<i64>> =
        categories.iter().map(|c| (c.id, c.parent_id)).collect();

    let mut visited = HashSet::new();
    let mut current = Some(proposed_parent_id);
    while let Some(id) = current {
        if id == category_id {
            return true;
        }
        if !visited.insert(id) {
            // Pre-existing loop in the stored data; refuse to attach to it
            return true;
        }
        current = parent_of.get(&id).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: i64, name: &str, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: name.to_string(),
            color: None,
            icon: None,
            parent_id,
            monthly_budget: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_forest() {
        let cats = vec![
            category(1, "Living", None),
            category(2, "Groceries", Some(1)),
            category(3, "Dining", Some(1)),
            category(4, "Transport", None),
        ];

        let forest = build_hierarchy(&cats);
        assert_eq!(forest.len(), 2);
        let living = forest.iter().find(|n| n.category.id == 1).unwrap();
        assert_eq!(living.children.len(), 2);
        assert_eq!(living.children[0].depth, 1);
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let cats = vec![category(1, "Orphan", Some(99))];
        let forest = build_hierarchy(&cats);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_cycle_detected_through_descendant() {
        // 1 -> 2 -> 3; attaching 1 under 3 would loop
        let cats = vec![
            category(1, "A", None),
            category(2, "B", Some(1)),
            category(3, "C", Some(2)),
        ];
        assert!(would_create_cycle(&cats, 1, 3));
        assert!(would_create_cycle(&cats, 1, 2));
        assert!(!would_create_cycle(&cats, 3, 1));
    }

    #[test]
    fn test_reparent_to_sibling_is_fine() {
        let cats = vec![
            category(1, "A", None),
            category(2, "B", None),
            category(3, "C", Some(1)),
        ];
        assert!(!would_create_cycle(&cats, 3, 2));
    }

    #[test]
    fn test_walk_terminates_on_preexisting_loop() {
        // Corrupt data: 2 and 3 already point at each other
        let cats = vec![
            category(1, "A", None),
            category(2, "B", Some(3)),
            category(3, "C", Some(2)),
        ];
        assert!(would_create_cycle(&cats, 1, 2));
    }
}
