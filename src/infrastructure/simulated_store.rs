//! File-backed stand-in for the platform purchase store.
//!
//! Owned products are kept in a JSON receipt ledger so `restore` works
//! across runs and after the local database is wiped.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    template_for_product, AppError, PurchaseBackend, Result, PREMIUM_PRODUCT_ID,
};

/// How the simulated store answers purchase requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBehavior {
    /// Approve every known product.
    #[default]
    Approve,
    /// Behave as if the user dismissed the payment sheet.
    Cancel,
}

/// One purchase receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub product_id: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    receipts: Vec<Receipt>,
}

impl Ledger {
    fn owned(&self) -> BTreeSet<String> {
        self.receipts.iter().map(|r| r.product_id.clone()).collect()
    }
}

/// Simulated store persisting receipts to a JSON file.
pub struct SimulatedStore {
    ledger_path: PathBuf,
    behavior: StoreBehavior,
}

impl SimulatedStore {
    #[must_use]
    pub fn new(ledger_path: impl Into<PathBuf>, behavior: StoreBehavior) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            behavior,
        }
    }

    fn is_known_product(product_id: &str) -> bool {
        product_id == PREMIUM_PRODUCT_ID
            || template_for_product(product_id).is_some_and(|t| t.is_premium)
    }

    fn load(path: &Path) -> Result<Ledger> {
        if !path.exists() {
            return Ok(Ledger::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(AppError::json_parse)
    }

    fn save(path: &Path, ledger: &Ledger) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create store directory", e))?;
        }
        let content = serde_json::to_string_pretty(ledger).map_err(AppError::json_parse)?;
        fs::write(path, content)
            .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))
    }
}

#[async_trait]
impl PurchaseBackend for SimulatedStore {
    async fn purchase(&self, product_id: &str) -> Result<bool> {
        if !Self::is_known_product(product_id) {
            return Err(AppError::Purchase {
                message: format!("Unknown product: {product_id}"),
            });
        }
        if self.behavior == StoreBehavior::Cancel {
            tracing::info!(product_id, "Simulated store: purchase cancelled");
            return Ok(false);
        }

        let mut ledger = Self::load(&self.ledger_path)?;
        if !ledger.owned().contains(product_id) {
            ledger.receipts.push(Receipt {
                product_id: product_id.to_string(),
                purchased_at: Utc::now(),
            });
            Self::save(&self.ledger_path, &ledger)?;
        }

        tracing::info!(product_id, "Simulated store: purchase approved");
        Ok(true)
    }

    async fn restore(&self) -> Result<Vec<String>> {
        let ledger = Self::load(&self.ledger_path)?;
        Ok(ledger.owned().into_iter().collect())
    }
}
