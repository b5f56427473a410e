//! Static product catalog used to answer price and availability questions.

use std::collections::HashMap;

/// One catalog entry. Price is in whole dollars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub price: u64,
    pub available: bool,
}

/// Read-only name → product table, built once at startup.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: HashMap<String, Product>,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProductCatalog {
    /// Catalog from an explicit product list. Later entries win on duplicate names.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// The shop's stock table.
    pub fn builtin() -> Self {
        Self::new([
            Product {
                name: "Product A".to_string(),
                price: 100,
                available: true,
            },
            Product {
                name: "Product B".to_string(),
                price: 50,
                available: false,
            },
        ])
    }

    /// Exact, case-sensitive lookup by product name.
    pub fn lookup(&self, name: &str) -> Option<&Product> {
        self.products.get(name)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
