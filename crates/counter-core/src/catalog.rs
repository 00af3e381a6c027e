//! # Catalog Filter
//!
//! Pure, hierarchy-aware search over one catalog snapshot.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products + categories (one load)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Catalog::build ── resolves every product once ──► CatalogEntry        │
//! │                                                    ├─ product          │
//! │                                                    └─ placement        │
//! │                                                       Uncategorized    │
//! │                                                       Root(r)          │
//! │                                                       Child(c, r)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Catalog::search(query)                                                │
//! │    1. text stage:     name ~ term (case-insensitive) OR barcode ~ term │
//! │    2. category stage: child selected → exact match                     │
//! │                       root selected  → root itself or any of its kids  │
//! │    3. intersection, snapshot order                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::category::{CategoryNode, CategoryTree, ChildCategory, RootCategory};
use crate::error::CoreResult;
use crate::types::{Category, Product};

// =============================================================================
// Join View
// =============================================================================

/// Where a product sits in the category hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// No category, or a category id that is not in the snapshot.
    Uncategorized,
    /// Directly in a root category.
    Root { root: RootCategory },
    /// In a child category, with its root resolved.
    Child {
        category: ChildCategory,
        root: RootCategory,
    },
}

impl Placement {
    /// Id of the category the product is directly assigned to.
    pub fn category_id(&self) -> Option<&str> {
        match self {
            Placement::Uncategorized => None,
            Placement::Root { root } => Some(&root.id),
            Placement::Child { category, .. } => Some(&category.id),
        }
    }

    /// Id of the parent of the product's category, if it has one.
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Placement::Child { root, .. } => Some(&root.id),
            _ => None,
        }
    }
}

/// A product with its category and that category's root resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product: Product,
    pub placement: Placement,
}

// =============================================================================
// Query
// =============================================================================

/// Search input from the product grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Free text matched against name and barcode.
    pub term: String,
    /// Selected root category.
    pub root_id: Option<String>,
    /// Selected child category. Takes precedence over `root_id`.
    pub child_id: Option<String>,
}

impl CatalogQuery {
    pub fn text(term: impl Into<String>) -> Self {
        CatalogQuery {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_root(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = Some(root_id.into());
        self
    }

    pub fn with_child(mut self, child_id: impl Into<String>) -> Self {
        self.child_id = Some(child_id.into());
        self
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// One catalog snapshot, built once per load.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tree: CategoryTree,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Resolves every product against the category hierarchy.
    ///
    /// Product order is preserved (the repository loads them alphabetically).
    /// Fails only if the category rows themselves are malformed.
    pub fn build(products: Vec<Product>, categories: Vec<Category>) -> CoreResult<Self> {
        let tree = CategoryTree::build(categories)?;
        let entries = products
            .into_iter()
            .map(|product| {
                let placement = resolve_placement(&tree, product.category_id.as_deref());
                CatalogEntry { product, placement }
            })
            .collect();

        Ok(Catalog { tree, entries })
    }

    /// Runs the text and category stages and returns matches in snapshot order.
    ///
    /// ## Example
    /// ```rust
    /// use counter_core::catalog::{Catalog, CatalogQuery};
    /// use counter_core::{Category, Money, Product};
    ///
    /// let product = Product {
    ///     id: "p1".into(),
    ///     name: "Coca-Cola 500ml".into(),
    ///     barcode: Some("7790895000997".into()),
    ///     cost_price: Money::from_cents(80),
    ///     price_sell: Money::from_cents(150),
    ///     stock_current: 10,
    ///     category_id: Some("sodas".into()),
    /// };
    /// let catalog = Catalog::build(
    ///     vec![product],
    ///     vec![Category::root("drinks", "Drinks"), Category::child("sodas", "Sodas", "drinks")],
    /// )
    /// .unwrap();
    ///
    /// let hits = catalog.search(&CatalogQuery::text("COCA").with_root("drinks"));
    /// assert_eq!(hits.len(), 1);
    /// ```
    pub fn search(&self, query: &CatalogQuery) -> Vec<&CatalogEntry> {
        let term = query.term.trim();
        let term_lower = term.to_lowercase();

        self.entries
            .iter()
            .filter(|entry| matches_text(&entry.product, term, &term_lower))
            .filter(|entry| {
                matches_category(
                    &entry.placement,
                    query.root_id.as_deref(),
                    query.child_id.as_deref(),
                )
            })
            .collect()
    }

    /// Looks up a product by id in this snapshot.
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.entries
            .iter()
            .map(|entry| &entry.product)
            .find(|product| product.id == id)
    }

    /// Looks up a product by exact barcode (scanner input).
    pub fn by_barcode(&self, barcode: &str) -> Option<&Product> {
        self.entries
            .iter()
            .map(|entry| &entry.product)
            .find(|product| product.barcode.as_deref() == Some(barcode))
    }

    /// Root categories, for the first row of filter buttons.
    pub fn roots(&self) -> Vec<&RootCategory> {
        self.tree.roots()
    }

    /// Children of the selected root, for the second row of filter buttons.
    pub fn children_of(&self, root_id: &str) -> Vec<&ChildCategory> {
        self.tree.children_of(root_id)
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.tree
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn resolve_placement(tree: &CategoryTree, category_id: Option<&str>) -> Placement {
    let Some(node) = category_id.and_then(|id| tree.get(id)) else {
        return Placement::Uncategorized;
    };

    match node {
        CategoryNode::Root(root) => Placement::Root { root: root.clone() },
        CategoryNode::Child(child) => match tree.root_of(&child.id) {
            Some(root) => Placement::Child {
                category: child.clone(),
                root: root.clone(),
            },
            None => Placement::Uncategorized,
        },
    }
}

/// Text stage. Name match ignores case; barcode match is literal.
fn matches_text(product: &Product, term: &str, term_lower: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    product.name.to_lowercase().contains(term_lower)
        || product
            .barcode
            .as_deref()
            .is_some_and(|barcode| barcode.contains(term))
}

/// Category stage. A selected child wins over a selected root.
fn matches_category(placement: &Placement, root_id: Option<&str>, child_id: Option<&str>) -> bool {
    if let Some(child_id) = child_id {
        return placement.category_id() == Some(child_id);
    }

    if let Some(root_id) = root_id {
        return placement.category_id() == Some(root_id) || placement.parent_id() == Some(root_id);
    }

    true
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn product(id: &str, name: &str, barcode: Option<&str>, category_id: Option<&str>) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            barcode: barcode.map(str::to_string),
            cost_price: Money::from_cents(100),
            price_sell: Money::from_cents(200),
            stock_current: 5,
            category_id: category_id.map(str::to_string),
        }
    }

    /// P1 in root A, P2 in child B of A, P3 in root C.
    fn catalog() -> Catalog {
        Catalog::build(
            vec![
                product("p1", "Alfajor", Some("7790001"), Some("a")),
                product("p2", "Bizcochitos", Some("7790002"), Some("b")),
                product("p3", "Cerveza", None, Some("c")),
            ],
            vec![
                Category::root("a", "A"),
                Category::child("b", "B", "a"),
                Category::root("c", "C"),
            ],
        )
        .unwrap()
    }

    fn ids(hits: &[&CatalogEntry]) -> Vec<String> {
        hits.iter().map(|e| e.product.id.clone()).collect()
    }

    #[test]
    fn test_root_selection_includes_children() {
        let catalog = catalog();
        let hits = catalog.search(&CatalogQuery::default().with_root("a"));
        assert_eq!(ids(&hits), vec!["p1", "p2"]);
    }

    #[test]
    fn test_child_selection_is_exact() {
        let catalog = catalog();
        let hits = catalog.search(&CatalogQuery::default().with_child("b"));
        assert_eq!(ids(&hits), vec!["p2"]);
    }

    #[test]
    fn test_child_selection_ignores_root() {
        let catalog = catalog();
        let query = CatalogQuery::default().with_root("c").with_child("b");
        assert_eq!(ids(&catalog.search(&query)), vec!["p2"]);
    }

    #[test]
    fn test_no_selection_returns_everything_in_order() {
        let catalog = catalog();
        let hits = catalog.search(&CatalogQuery::default());
        assert_eq!(ids(&hits), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_text_stage_name_is_case_insensitive() {
        let catalog = catalog();
        let hits = catalog.search(&CatalogQuery::text("CERV"));
        assert_eq!(ids(&hits), vec!["p3"]);
    }

    #[test]
    fn test_text_stage_matches_barcode_substring() {
        let catalog = catalog();
        let hits = catalog.search(&CatalogQuery::text("0002"));
        assert_eq!(ids(&hits), vec!["p2"]);
    }

    #[test]
    fn test_text_and_category_intersect() {
        let catalog = catalog();
        let hits = catalog
            .search(&CatalogQuery::text("alfajor").with_root("c"));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_whitespace_term_matches_all() {
        let catalog = catalog();
        assert_eq!(catalog.search(&CatalogQuery::text("   ")).len(), 3);
    }

    #[test]
    fn test_long_term_is_just_another_filter() {
        let catalog = catalog();
        assert!(catalog.search(&CatalogQuery::text("x".repeat(150))).is_empty());

        let long_name = format!("Gift basket {}", "deluxe ".repeat(20));
        let catalog = Catalog::build(vec![product("g", &long_name, None, None)], vec![]).unwrap();
        let hits = catalog.search(&CatalogQuery::text(&long_name[..120]));
        assert_eq!(ids(&hits), vec!["g"]);
    }

    #[test]
    fn test_placement_resolution() {
        let catalog = catalog();
        let p2 = &catalog.entries()[1];
        assert_eq!(p2.placement.category_id(), Some("b"));
        assert_eq!(p2.placement.parent_id(), Some("a"));

        let orphan = Catalog::build(vec![product("x", "X", None, Some("gone"))], vec![]).unwrap();
        assert_eq!(orphan.entries()[0].placement, Placement::Uncategorized);
    }

    #[test]
    fn test_malformed_categories_fail_build() {
        let result = Catalog::build(
            vec![],
            vec![
                Category::root("a", "A"),
                Category::child("b", "B", "a"),
                Category::child("c", "C", "b"),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_helpers_and_derived_views() {
        let catalog = catalog();
        assert_eq!(catalog.by_barcode("7790001").map(|p| p.id.as_str()), Some("p1"));
        assert!(catalog.product("p3").is_some());
        assert_eq!(catalog.roots().len(), 2);
        assert_eq!(catalog.children_of("a").len(), 1);
        assert!(catalog.children_of("c").is_empty());
    }
}
