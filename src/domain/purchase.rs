//! Seam to the external purchase store.
//!
//! Prices, receipts and subscription renewals are the store's business;
//! callers only learn whether a product is owned.

use async_trait::async_trait;

use super::error::Result;

/// Platform store consumed for purchases and restores.
#[async_trait]
pub trait PurchaseBackend: Send + Sync {
    /// Buy `product_id`. `Ok(false)` means the user cancelled or the store
    /// declined.
    async fn purchase(&self, product_id: &str) -> Result<bool>;

    /// Product ids the store reports as owned.
    async fn restore(&self) -> Result<Vec<String>>;
}
