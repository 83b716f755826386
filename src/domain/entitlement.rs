//! Entitlement state: premium status, template purchases and export quota.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::template::Template;

/// Store product id of the premium subscription.
pub const PREMIUM_PRODUCT_ID: &str = "premium.monthly";

/// Monthly free exports when nothing is configured.
pub const DEFAULT_FREE_EXPORT_LIMIT: u32 = 3;

/// Quota period key (`YYYY-MM`) for a timestamp.
#[must_use]
pub fn period_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

/// What the user has paid for and how many exports remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementState {
    pub is_premium: bool,
    #[serde(default)]
    pub purchased_template_ids: BTreeSet<String>,
    /// Exports used in `period`.
    #[serde(default)]
    pub exports_used: u32,
    /// Calendar month the counter belongs to.
    pub period: String,
    pub free_export_limit: u32,
}

impl Default for EntitlementState {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_EXPORT_LIMIT, Utc::now())
    }
}

impl EntitlementState {
    /// Fresh state for a non-premium user.
    #[must_use]
    pub fn new(free_export_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            is_premium: false,
            purchased_template_ids: BTreeSet::new(),
            exports_used: 0,
            period: period_key(now),
            free_export_limit,
        }
    }

    /// Reset the counter if `now` falls in a later period.
    ///
    /// Returns true when the counter was reset.
    pub fn roll_period(&mut self, now: DateTime<Utc>) -> bool {
        let current = period_key(now);
        if self.period == current {
            return false;
        }
        self.period = current;
        self.exports_used = 0;
        true
    }

    #[must_use]
    pub const fn can_export(&self) -> bool {
        self.is_premium || self.exports_used < self.free_export_limit
    }

    #[must_use]
    pub const fn should_watermark(&self) -> bool {
        !self.is_premium
    }

    /// Free exports left this period; `None` means unlimited.
    #[must_use]
    pub const fn exports_remaining(&self) -> Option<u32> {
        if self.is_premium {
            None
        } else {
            Some(self.free_export_limit.saturating_sub(self.exports_used))
        }
    }

    /// Count one successful export. Premium exports are not counted.
    pub fn record_export(&mut self) {
        if !self.is_premium {
            self.exports_used = self.exports_used.saturating_add(1);
        }
    }

    /// Whether the user may use `template` without buying anything.
    #[must_use]
    pub fn is_unlocked(&self, template: &Template) -> bool {
        !template.is_premium || self.is_premium || self.purchased_template_ids.contains(template.id)
    }
}
