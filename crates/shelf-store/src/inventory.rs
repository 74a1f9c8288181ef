//! # Inventory Aggregate Client
//!
//! Per-shelf, per-product quantity counters kept in the remote store.
//!
//! The four primitives are deliberately dumb. The read-modify-write that
//! turns them into "increment or create" and "decrement or delete" lives in
//! `shelf_sync::aggregate` and is not atomic across the read and the write.

use std::sync::Mutex;

use async_trait::async_trait;
use shelf_core::InventoryRecord;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Access to the remote inventory aggregate.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Finds the counter for (shelf, product), if one exists.
    async fn find_record(
        &self,
        shelf_id: i64,
        product_id: &str,
    ) -> StoreResult<Option<InventoryRecord>>;

    /// Creates a counter. `quantity` must be at least 1.
    async fn create_record(
        &self,
        shelf_id: i64,
        product_id: &str,
        quantity: u32,
    ) -> StoreResult<InventoryRecord>;

    /// Overwrites a counter's quantity. `quantity` must be at least 1.
    async fn set_quantity(&self, record_id: &str, quantity: u32) -> StoreResult<()>;

    /// Deletes a counter.
    async fn delete_record(&self, record_id: &str) -> StoreResult<()>;
}

fn check_quantity(quantity: u32) -> StoreResult<()> {
    if quantity == 0 {
        return Err(StoreError::InvalidQuantity { quantity });
    }
    Ok(())
}

// =============================================================================
// SQLite Inventory
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    record_id: String,
    shelf_id: i64,
    product_id: String,
    quantity: i64,
}

impl TryFrom<InventoryRow> for InventoryRecord {
    type Error = StoreError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::MalformedRecord(format!(
                "record {} has quantity {}",
                row.record_id, row.quantity
            ))
        })?;

        Ok(InventoryRecord {
            record_id: row.record_id,
            shelf_id: row.shelf_id,
            product_id: row.product_id,
            quantity,
        })
    }
}

/// Inventory aggregate backed by a SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteInventory {
    pool: SqlitePool,
    table: String,
}

impl SqliteInventory {
    /// Creates an inventory client over `table`. The name must already be validated.
    pub(crate) fn new(pool: SqlitePool, table: String) -> Self {
        SqliteInventory { pool, table }
    }
}

#[async_trait]
impl InventoryStore for SqliteInventory {
    async fn find_record(
        &self,
        shelf_id: i64,
        product_id: &str,
    ) -> StoreResult<Option<InventoryRecord>> {
        let sql = format!(
            "SELECT record_id, shelf_id, product_id, quantity FROM {} \
             WHERE shelf_id = ?1 AND product_id = ?2 ORDER BY rowid LIMIT 1",
            self.table
        );

        let row: Option<InventoryRow> = sqlx::query_as(&sql)
            .bind(shelf_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(InventoryRecord::try_from).transpose()
    }

    async fn create_record(
        &self,
        shelf_id: i64,
        product_id: &str,
        quantity: u32,
    ) -> StoreResult<InventoryRecord> {
        check_quantity(quantity)?;

        let record = InventoryRecord {
            record_id: Uuid::new_v4().to_string(),
            shelf_id,
            product_id: product_id.to_string(),
            quantity,
        };

        let sql = format!(
            "INSERT INTO {} (record_id, shelf_id, product_id, quantity) VALUES (?1, ?2, ?3, ?4)",
            self.table
        );

        sqlx::query(&sql)
            .bind(&record.record_id)
            .bind(record.shelf_id)
            .bind(&record.product_id)
            .bind(i64::from(record.quantity))
            .execute(&self.pool)
            .await?;

        debug!(record_id = %record.record_id, shelf_id, %product_id, quantity, "Inventory record created");
        Ok(record)
    }

    async fn set_quantity(&self, record_id: &str, quantity: u32) -> StoreResult<()> {
        check_quantity(quantity)?;

        let sql = format!(
            "UPDATE {} SET quantity = ?1 WHERE record_id = ?2",
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(i64::from(quantity))
            .bind(record_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("InventoryRecord", record_id));
        }
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE record_id = ?1", self.table);

        let result = sqlx::query(&sql)
            .bind(record_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("InventoryRecord", record_id));
        }
        Ok(())
    }
}

// =============================================================================
// In-Memory Inventory
// =============================================================================

/// Inventory aggregate held in memory, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    records: Mutex<Vec<InventoryRecord>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record, in creation order.
    pub fn records(&self) -> Vec<InventoryRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Vec<InventoryRecord>>> {
        self.records
            .lock()
            .map_err(|_| StoreError::Internal("inventory lock poisoned".to_string()))
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn find_record(
        &self,
        shelf_id: i64,
        product_id: &str,
    ) -> StoreResult<Option<InventoryRecord>> {
        Ok(self
            .lock()?
            .iter()
            .find(|r| r.shelf_id == shelf_id && r.product_id == product_id)
            .cloned())
    }

    async fn create_record(
        &self,
        shelf_id: i64,
        product_id: &str,
        quantity: u32,
    ) -> StoreResult<InventoryRecord> {
        check_quantity(quantity)?;

        let record = InventoryRecord {
            record_id: Uuid::new_v4().to_string(),
            shelf_id,
            product_id: product_id.to_string(),
            quantity,
        };
        self.lock()?.push(record.clone());
        Ok(record)
    }

    async fn set_quantity(&self, record_id: &str, quantity: u32) -> StoreResult<()> {
        check_quantity(quantity)?;

        let mut records = self.lock()?;
        let record = records
            .iter_mut()
            .find(|r| r.record_id == record_id)
            .ok_or_else(|| StoreError::not_found("InventoryRecord", record_id))?;
        record.quantity = quantity;
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> StoreResult<()> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.record_id != record_id);

        if records.len() == before {
            return Err(StoreError::not_found("InventoryRecord", record_id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn exercise_primitives(store: &dyn InventoryStore) {
        assert!(store.find_record(1, "p-1").await.unwrap().is_none());

        let created = store.create_record(1, "p-1", 1).await.unwrap();
        assert_eq!(created.quantity, 1);

        let found = store.find_record(1, "p-1").await.unwrap().unwrap();
        assert_eq!(found, created);

        // Other shelf, same product: separate counter
        assert!(store.find_record(2, "p-1").await.unwrap().is_none());

        store.set_quantity(&created.record_id, 3).await.unwrap();
        let found = store.find_record(1, "p-1").await.unwrap().unwrap();
        assert_eq!(found.quantity, 3);

        store.delete_record(&created.record_id).await.unwrap();
        assert!(store.find_record(1, "p-1").await.unwrap().is_none());

        assert!(matches!(
            store.delete_record(&created.record_id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.set_quantity("missing", 2).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_sqlite_primitives() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        exercise_primitives(&db.inventory()).await;
    }

    #[tokio::test]
    async fn test_memory_primitives() {
        exercise_primitives(&MemoryInventory::new()).await;
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let store = MemoryInventory::new();
        assert!(matches!(
            store.create_record(1, "p-1", 0).await,
            Err(StoreError::InvalidQuantity { quantity: 0 })
        ));

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = db.inventory();
        let record = inventory.create_record(1, "p-1", 1).await.unwrap();
        assert!(inventory.set_quantity(&record.record_id, 0).await.is_err());
    }
}
