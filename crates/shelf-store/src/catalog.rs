//! # Catalog Client
//!
//! Read-only product lookup by (code, lot).
//!
//! ## Lookup Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  find_by_code_lot("SKU1", 100)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT ... FROM <catalog> WHERE code = ?1 AND lot = ?2 ORDER BY rowid  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  [CatalogRow, ...]  ──map──►  [Product (unbound), ...]                 │
//! │                                                                         │
//! │  Zero rows  → unknown tag (caller decides)                             │
//! │  Many rows  → caller takes the first                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are mapped explicitly: a NULL `in_promo` becomes `false`, a NULL
//! `promo_price` becomes `None`.

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use shelf_core::Product;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Read-only access to the product catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns every catalog product with exactly this code and lot, in
    /// catalog order. Returned products carry no tag binding.
    async fn find_by_code_lot(&self, code: &str, lot: i64) -> StoreResult<Vec<Product>>;
}

// =============================================================================
// SQLite Catalog
// =============================================================================

/// Raw catalog row.
#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    product_id: String,
    code: String,
    lot: i64,
    name: String,
    price: f64,
    expiration_date: String,
    in_promo: Option<bool>,
    promo_price: Option<f64>,
}

impl From<CatalogRow> for Product {
    fn from(row: CatalogRow) -> Self {
        Product {
            product_id: row.product_id,
            tag_id: None,
            code: row.code,
            lot: row.lot,
            name: row.name,
            price: row.price,
            expiration_date: row.expiration_date,
            in_promo: row.in_promo.unwrap_or(false),
            promo_price: row.promo_price,
        }
    }
}

/// Catalog backed by a SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    table: String,
}

impl SqliteCatalog {
    /// Creates a catalog over `table`. The name must already be validated.
    pub(crate) fn new(pool: SqlitePool, table: String) -> Self {
        SqliteCatalog { pool, table }
    }

    /// Inserts or replaces a catalog product.
    ///
    /// Used to seed local catalogs; the engine itself never writes here.
    pub async fn upsert(&self, product: &Product) -> StoreResult<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} \
             (product_id, code, lot, name, price, expiration_date, in_promo, promo_price) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            self.table
        );

        sqlx::query(&sql)
            .bind(&product.product_id)
            .bind(&product.code)
            .bind(product.lot)
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.expiration_date)
            .bind(product.in_promo)
            .bind(product.promo_price)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CatalogClient for SqliteCatalog {
    async fn find_by_code_lot(&self, code: &str, lot: i64) -> StoreResult<Vec<Product>> {
        debug!(%code, lot, table = %self.table, "Catalog lookup");

        let sql = format!(
            "SELECT product_id, code, lot, name, price, expiration_date, in_promo, promo_price \
             FROM {} WHERE code = ?1 AND lot = ?2 ORDER BY rowid",
            self.table
        );

        let rows: Vec<CatalogRow> = sqlx::query_as(&sql)
            .bind(code)
            .bind(lot)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// Catalog held in memory, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding `products`, in order. Tag bindings are dropped.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|mut p| {
                p.tag_id = None;
                p
            })
            .collect();

        MemoryCatalog {
            products: RwLock::new(products),
        }
    }

    /// Loads a catalog from a JSON array of products.
    ///
    /// ## Format
    /// ```json
    /// [{"productId": "p-1", "code": "SKU1", "lot": 100, "name": "Widget",
    ///   "price": 9.99, "expirationDate": "2030-01-01"}]
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let products: Vec<Product> = serde_json::from_str(&raw)?;

        debug!(path = %path.display(), count = products.len(), "Catalog seed loaded");
        Ok(Self::from_products(products))
    }

    /// Appends a product to the catalog.
    pub fn insert(&self, mut product: Product) -> StoreResult<()> {
        product.tag_id = None;
        self.products
            .write()
            .map_err(|_| StoreError::Internal("catalog lock poisoned".to_string()))?
            .push(product);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.products.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CatalogClient for MemoryCatalog {
    async fn find_by_code_lot(&self, code: &str, lot: i64) -> StoreResult<Vec<Product>> {
        let products = self
            .products
            .read()
            .map_err(|_| StoreError::Internal("catalog lock poisoned".to_string()))?;

        Ok(products
            .iter()
            .filter(|p| p.matches_batch(code, lot))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn widget() -> Product {
        Product::new("p-1", "SKU1", 100, "Widget", 9.99, "2030-01-01")
    }

    #[tokio::test]
    async fn test_sqlite_lookup_filters_on_code_and_lot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        catalog.upsert(&widget()).await.unwrap();
        catalog
            .upsert(&Product::new("p-2", "SKU1", 101, "Widget B", 9.99, "2030-01-01"))
            .await
            .unwrap();

        let found = catalog.find_by_code_lot("SKU1", 100).await.unwrap();
        assert_eq!(found, vec![widget()]);

        assert!(catalog.find_by_code_lot("SKU1", 999).await.unwrap().is_empty());
        assert!(catalog.find_by_code_lot("NOPE", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_null_promo_fields_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query(
            "INSERT INTO products (product_id, code, lot, name, price, expiration_date) \
             VALUES ('p-3', 'SKU3', 7, 'Milk', 1.2, '2022-03-01')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let found = db.catalog().find_by_code_lot("SKU3", 7).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(!found[0].in_promo);
        assert_eq!(found[0].promo_price, None);
    }

    #[tokio::test]
    async fn test_sqlite_promo_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let promo = widget().with_promo(7.5);

        catalog.upsert(&promo).await.unwrap();

        let found = catalog.find_by_code_lot("SKU1", 100).await.unwrap();
        assert_eq!(found, vec![promo]);
    }

    #[tokio::test]
    async fn test_memory_catalog_preserves_order_and_strips_tags() {
        let first = widget().with_tag("stale");
        let second = Product::new("p-9", "SKU1", 100, "Widget dup", 1.0, "2030-01-01");
        let catalog = MemoryCatalog::from_products(vec![first, second]);

        let found = catalog.find_by_code_lot("SKU1", 100).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].product_id, "p-1");
        assert_eq!(found[0].tag_id, None);
    }

    #[tokio::test]
    async fn test_memory_catalog_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"productId":"p-1","code":"SKU1","lot":100,"name":"Widget",
                "price":9.99,"expirationDate":"2030-01-01"}]"#,
        )
        .unwrap();

        let catalog = MemoryCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.find_by_code_lot("SKU1", 100).await.unwrap(),
            vec![widget()]
        );
    }
}
