//! # Category Hierarchy
//!
//! Categories are stored as flat rows with an optional `parent_id`. The
//! store only ever uses two levels (e.g. "Drinks" → "Sodas"), so the tree is
//! modelled as an explicit bounded-depth type instead of a free parent
//! pointer graph.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  rows                              CategoryTree                  │
//! │  ─────────────────────────         ───────────────────────────   │
//! │  (drinks, None)           ──►      Root(drinks)                  │
//! │  (sodas,  Some(drinks))   ──►      Child(sodas → drinks)         │
//! │  (cola,   Some(sodas))    ──►      ✗ CategoryError::Grandchild   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because a child's parent must be a root, cycles cannot be expressed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CategoryError;
use crate::types::Category;

/// A top-level category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCategory {
    pub id: String,
    pub name: String,
}

/// A second-level category. Its parent is always a [`RootCategory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildCategory {
    pub id: String,
    pub name: String,
    pub root_id: String,
}

/// One validated node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum CategoryNode {
    Root(RootCategory),
    Child(ChildCategory),
}

impl CategoryNode {
    pub fn id(&self) -> &str {
        match self {
            CategoryNode::Root(root) => &root.id,
            CategoryNode::Child(child) => &child.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CategoryNode::Root(root) => &root.name,
            CategoryNode::Child(child) => &child.name,
        }
    }

    /// Parent id for children, `None` for roots.
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            CategoryNode::Root(_) => None,
            CategoryNode::Child(child) => Some(&child.root_id),
        }
    }
}

/// The validated two-level category hierarchy.
///
/// Nodes keep the order of the input rows (the repository loads them sorted
/// by name).
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: Vec<CategoryNode>,
    index: HashMap<String, usize>,
}

impl CategoryTree {
    /// Builds the tree, rejecting duplicates, unknown parents, self-parents
    /// and grandchildren.
    ///
    /// ## Example
    /// ```rust
    /// use counter_core::category::CategoryTree;
    /// use counter_core::Category;
    ///
    /// let tree = CategoryTree::build(vec![
    ///     Category::root("drinks", "Drinks"),
    ///     Category::child("sodas", "Sodas", "drinks"),
    /// ])
    /// .unwrap();
    /// assert_eq!(tree.children_of("drinks").len(), 1);
    ///
    /// let err = CategoryTree::build(vec![
    ///     Category::root("drinks", "Drinks"),
    ///     Category::child("sodas", "Sodas", "drinks"),
    ///     Category::child("cola", "Cola", "sodas"),
    /// ]);
    /// assert!(err.is_err());
    /// ```
    pub fn build(rows: Vec<Category>) -> Result<Self, CategoryError> {
        let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(rows.len());
        for row in &rows {
            if parents
                .insert(row.id.as_str(), row.parent_id.as_deref())
                .is_some()
            {
                return Err(CategoryError::Duplicate(row.id.clone()));
            }
        }

        let mut nodes = Vec::with_capacity(rows.len());
        for row in &rows {
            let node = match row.parent_id.as_deref() {
                None => CategoryNode::Root(RootCategory {
                    id: row.id.clone(),
                    name: row.name.clone(),
                }),
                Some(parent_id) if parent_id == row.id => {
                    return Err(CategoryError::SelfParent(row.id.clone()));
                }
                Some(parent_id) => match parents.get(parent_id) {
                    None => {
                        return Err(CategoryError::UnknownParent {
                            id: row.id.clone(),
                            parent_id: parent_id.to_string(),
                        })
                    }
                    Some(Some(_)) => {
                        return Err(CategoryError::Grandchild {
                            id: row.id.clone(),
                            parent_id: parent_id.to_string(),
                        })
                    }
                    Some(None) => CategoryNode::Child(ChildCategory {
                        id: row.id.clone(),
                        name: row.name.clone(),
                        root_id: parent_id.to_string(),
                    }),
                },
            };
            nodes.push(node);
        }

        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id().to_string(), i))
            .collect();

        Ok(CategoryTree { nodes, index })
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &str) -> Option<&CategoryNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// All nodes in load order.
    pub fn nodes(&self) -> &[CategoryNode] {
        &self.nodes
    }

    /// Categories with no parent.
    pub fn roots(&self) -> Vec<&RootCategory> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                CategoryNode::Root(root) => Some(root),
                CategoryNode::Child(_) => None,
            })
            .collect()
    }

    /// Categories whose parent is `root_id`. Empty for unknown ids and for
    /// children (which cannot have children).
    pub fn children_of(&self, root_id: &str) -> Vec<&ChildCategory> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                CategoryNode::Child(child) if child.root_id == root_id => Some(child),
                _ => None,
            })
            .collect()
    }

    /// Resolves the root a category belongs to (itself for roots).
    pub fn root_of(&self, id: &str) -> Option<&RootCategory> {
        match self.get(id)? {
            CategoryNode::Root(root) => Some(root),
            CategoryNode::Child(child) => match self.get(&child.root_id)? {
                CategoryNode::Root(root) => Some(root),
                CategoryNode::Child(_) => None,
            },
        }
    }

    /// Checks that a new category may be created under `parent_id`.
    ///
    /// Used by catalog management before inserting a subcategory.
    pub fn check_new_parent(&self, id: &str, parent_id: &str) -> Result<(), CategoryError> {
        if id == parent_id {
            return Err(CategoryError::SelfParent(id.to_string()));
        }
        if self.index.contains_key(id) {
            return Err(CategoryError::Duplicate(id.to_string()));
        }
        match self.get(parent_id) {
            None => Err(CategoryError::UnknownParent {
                id: id.to_string(),
                parent_id: parent_id.to_string(),
            }),
            Some(CategoryNode::Child(_)) => Err(CategoryError::Grandchild {
                id: id.to_string(),
                parent_id: parent_id.to_string(),
            }),
            Some(CategoryNode::Root(_)) => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Category> {
        vec![
            Category::root("almacen", "Almacen"),
            Category::root("bebidas", "Bebidas"),
            Category::child("gaseosas", "Gaseosas", "bebidas"),
            Category::child("aguas", "Aguas", "bebidas"),
            Category::child("yerbas", "Yerbas", "almacen"),
        ]
    }

    #[test]
    fn test_build_valid_tree() {
        let tree = CategoryTree::build(sample()).unwrap();

        assert_eq!(tree.len(), 5);
        let roots: Vec<&str> = tree.roots().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(roots, vec!["almacen", "bebidas"]);

        let children: Vec<&str> = tree
            .children_of("bebidas")
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(children, vec!["gaseosas", "aguas"]);
    }

    #[test]
    fn test_children_of_child_is_empty() {
        let tree = CategoryTree::build(sample()).unwrap();
        assert!(tree.children_of("gaseosas").is_empty());
        assert!(tree.children_of("missing").is_empty());
    }

    #[test]
    fn test_child_listed_before_parent_is_accepted() {
        let tree = CategoryTree::build(vec![
            Category::child("sodas", "Sodas", "drinks"),
            Category::root("drinks", "Drinks"),
        ])
        .unwrap();
        assert_eq!(tree.get("sodas").and_then(|n| n.parent_id()), Some("drinks"));
    }

    #[test]
    fn test_rejects_grandchild() {
        let mut rows = sample();
        rows.push(Category::child("colas", "Colas", "gaseosas"));

        let err = CategoryTree::build(rows).unwrap_err();
        assert_eq!(
            err,
            CategoryError::Grandchild {
                id: "colas".to_string(),
                parent_id: "gaseosas".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_cycle() {
        let rows = vec![
            Category::child("a", "A", "b"),
            Category::child("b", "B", "a"),
        ];
        assert!(matches!(
            CategoryTree::build(rows),
            Err(CategoryError::Grandchild { .. })
        ));
    }

    #[test]
    fn test_rejects_self_parent_unknown_parent_and_duplicates() {
        assert_eq!(
            CategoryTree::build(vec![Category::child("a", "A", "a")]).unwrap_err(),
            CategoryError::SelfParent("a".to_string())
        );
        assert!(matches!(
            CategoryTree::build(vec![Category::child("a", "A", "ghost")]),
            Err(CategoryError::UnknownParent { .. })
        ));
        assert_eq!(
            CategoryTree::build(vec![Category::root("a", "A"), Category::root("a", "A2")])
                .unwrap_err(),
            CategoryError::Duplicate("a".to_string())
        );
    }

    #[test]
    fn test_root_of() {
        let tree = CategoryTree::build(sample()).unwrap();
        assert_eq!(tree.root_of("aguas").map(|r| r.id.as_str()), Some("bebidas"));
        assert_eq!(tree.root_of("bebidas").map(|r| r.id.as_str()), Some("bebidas"));
        assert!(tree.root_of("missing").is_none());
    }

    #[test]
    fn test_check_new_parent() {
        let tree = CategoryTree::build(sample()).unwrap();
        assert!(tree.check_new_parent("jugos", "bebidas").is_ok());
        assert!(matches!(
            tree.check_new_parent("colas", "gaseosas"),
            Err(CategoryError::Grandchild { .. })
        ));
        assert!(matches!(
            tree.check_new_parent("aguas", "bebidas"),
            Err(CategoryError::Duplicate(_))
        ));
    }
}
