//! Entitlement state and the purchase flows that change it.
//!
//! State is only written after the purchase backend reports success, so a
//! failed or cancelled purchase leaves the stored state untouched.

use chrono::Utc;

use crate::domain::{
    template_for_product, AppError, AppEvent, EntitlementState, PurchaseBackend, Result, Template,
    PREMIUM_PRODUCT_ID,
};
use crate::infrastructure::LocalStorage;

use super::events::EventBus;

/// Service owning the persisted entitlement state.
pub struct EntitlementService<'a> {
    storage: &'a LocalStorage,
    events: &'a EventBus,
    backend: &'a dyn PurchaseBackend,
    free_export_limit: u32,
}

impl<'a> EntitlementService<'a> {
    #[must_use]
    pub fn new(
        storage: &'a LocalStorage,
        events: &'a EventBus,
        backend: &'a dyn PurchaseBackend,
        free_export_limit: u32,
    ) -> Self {
        Self {
            storage,
            events,
            backend,
            free_export_limit,
        }
    }

    /// Current state, rolled into the current month.
    ///
    /// A configured limit replaces the stored one.
    pub fn state(&self) -> Result<EntitlementState> {
        let now = Utc::now();
        let (mut state, mut dirty) = match self.storage.load_entitlement()? {
            Some(state) => (state, false),
            None => (EntitlementState::new(self.free_export_limit, now), true),
        };

        if state.roll_period(now) {
            tracing::info!(period = %state.period, "Export quota reset for new period");
            dirty = true;
        }
        if state.free_export_limit != self.free_export_limit {
            state.free_export_limit = self.free_export_limit;
            dirty = true;
        }
        if dirty {
            self.storage.save_entitlement(&state)?;
        }

        Ok(state)
    }

    /// Count one successful export.
    pub fn record_export(&self) -> Result<EntitlementState> {
        let mut state = self.state()?;
        if state.is_premium {
            return Ok(state);
        }

        state.record_export();
        self.storage.save_entitlement(&state)?;
        tracing::debug!(
            used = state.exports_used,
            limit = state.free_export_limit,
            "Export recorded"
        );
        self.events.publish(AppEvent::EntitlementChanged);
        Ok(state)
    }

    /// Put back a state read earlier, undoing a count that did not stick.
    pub fn revert_to(&self, state: &EntitlementState) -> Result<()> {
        self.storage.save_entitlement(state)?;
        tracing::debug!(used = state.exports_used, "Export counter restored");
        self.events.publish(AppEvent::EntitlementChanged);
        Ok(())
    }

    /// Buy the premium subscription.
    ///
    /// Returns false if the user cancelled.
    ///
    /// # Errors
    /// Returns `AppError::Purchase` if the backend fails.
    pub async fn purchase_premium(&self) -> Result<bool> {
        if self.state()?.is_premium {
            return Ok(true);
        }

        if !self.backend.purchase(PREMIUM_PRODUCT_ID).await? {
            tracing::info!(product_id = PREMIUM_PRODUCT_ID, "Purchase cancelled");
            return Ok(false);
        }

        self.update(|state| state.is_premium = true)?;
        tracing::info!(product_id = PREMIUM_PRODUCT_ID, "Premium unlocked");
        Ok(true)
    }

    /// Buy a single premium template.
    ///
    /// Returns false if the user cancelled.
    ///
    /// # Errors
    /// Returns `AppError::Purchase` for free templates or backend failures.
    pub async fn purchase_template(&self, template: &Template) -> Result<bool> {
        if !template.is_premium {
            return Err(AppError::Purchase {
                message: format!("Template '{}' is free", template.id),
            });
        }
        if self.state()?.is_unlocked(template) {
            return Ok(true);
        }

        let product_id = template.product_id();
        if !self.backend.purchase(&product_id).await? {
            tracing::info!(%product_id, "Purchase cancelled");
            return Ok(false);
        }

        self.update(|state| {
            state.purchased_template_ids.insert(template.id.to_string());
        })?;
        tracing::info!(%product_id, "Template unlocked");
        Ok(true)
    }

    /// Re-apply everything the store says the user owns.
    ///
    /// Returns whether anything new was unlocked. Restore never revokes.
    pub async fn restore(&self) -> Result<bool> {
        let owned = self.backend.restore().await?;
        let mut state = self.state()?;
        let before = state.clone();

        for product_id in &owned {
            if product_id == PREMIUM_PRODUCT_ID {
                state.is_premium = true;
            } else if let Some(template) = template_for_product(product_id) {
                state.purchased_template_ids.insert(template.id.to_string());
            } else {
                tracing::warn!(%product_id, "Ignoring unknown restored product");
            }
        }

        if state == before {
            tracing::info!(products = owned.len(), "Restore found nothing new");
            return Ok(false);
        }

        self.storage.save_entitlement(&state)?;
        self.events.publish(AppEvent::EntitlementChanged);
        tracing::info!(products = owned.len(), "Purchases restored");
        Ok(true)
    }

    fn update(&self, apply: impl FnOnce(&mut EntitlementState)) -> Result<EntitlementState> {
        let mut state = self.state()?;
        apply(&mut state);
        self.storage.save_entitlement(&state)?;
        self.events.publish(AppEvent::EntitlementChanged);
        Ok(state)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::events::drain;
    use crate::domain::find_template;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Scripted purchase backend.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub cancel: bool,
        pub fail: bool,
        pub owned: Vec<String>,
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PurchaseBackend for FakeBackend {
        async fn purchase(&self, product_id: &str) -> Result<bool> {
            self.calls.lock().unwrap().push(product_id.to_string());
            if self.fail {
                return Err(AppError::Purchase {
                    message: "store unavailable".into(),
                });
            }
            Ok(!self.cancel)
        }

        async fn restore(&self) -> Result<Vec<String>> {
            if self.fail {
                return Err(AppError::Purchase {
                    message: "store unavailable".into(),
                });
            }
            Ok(self.owned.clone())
        }
    }

    fn executive() -> &'static Template {
        find_template("executive").unwrap()
    }

    #[test]
    fn test_initial_state() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let svc = EntitlementService::new(&storage, &events, &backend, 3);

        let state = svc.state().unwrap();
        assert!(!state.is_premium);
        assert_eq!(state.exports_used, 0);
        assert_eq!(state.free_export_limit, 3);
        assert!(storage.load_entitlement().unwrap().is_some());
    }

    #[test]
    fn test_record_export_until_limit() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let svc = EntitlementService::new(&storage, &events, &backend, 2);

        assert!(svc.state().unwrap().can_export());
        svc.record_export().unwrap();
        assert!(svc.state().unwrap().can_export());
        let state = svc.record_export().unwrap();
        assert_eq!(state.exports_used, 2);
        assert!(!svc.state().unwrap().can_export());
    }

    #[test]
    fn test_stale_period_resets_counter() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let mut old = EntitlementState::new(3, Utc::now());
        old.period = "1999-01".into();
        old.exports_used = 3;
        storage.save_entitlement(&old).unwrap();

        let events = EventBus::default();
        let backend = FakeBackend::default();
        let svc = EntitlementService::new(&storage, &events, &backend, 3);
        assert_eq!(svc.state().unwrap().exports_used, 0);
    }

    #[tokio::test]
    async fn test_purchase_premium() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let backend = FakeBackend::default();
        let svc = EntitlementService::new(&storage, &events, &backend, 3);

        assert!(svc.purchase_premium().await.unwrap());
        let state = svc.state().unwrap();
        assert!(state.is_premium);
        assert!(!state.should_watermark());
        assert_eq!(drain(&mut rx), vec![AppEvent::EntitlementChanged]);

        // Already premium: no second charge.
        assert!(svc.purchase_premium().await.unwrap());
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_failure_leave_state() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let events = EventBus::default();

        let cancelling = FakeBackend {
            cancel: true,
            ..Default::default()
        };
        let svc = EntitlementService::new(&storage, &events, &cancelling, 3);
        assert!(!svc.purchase_template(executive()).await.unwrap());
        assert!(!svc.state().unwrap().is_unlocked(executive()));

        let failing = FakeBackend {
            fail: true,
            ..Default::default()
        };
        let svc = EntitlementService::new(&storage, &events, &failing, 3);
        let err = svc.purchase_premium().await.unwrap_err();
        assert!(matches!(err, AppError::Purchase { .. }));
        assert!(!svc.state().unwrap().is_premium);
    }

    #[tokio::test]
    async fn test_purchase_template_product_id() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let svc = EntitlementService::new(&storage, &events, &backend, 3);

        assert!(svc.purchase_template(executive()).await.unwrap());
        assert_eq!(*backend.calls.lock().unwrap(), vec!["template.executive"]);
        assert!(svc.state().unwrap().is_unlocked(executive()));

        let classic = find_template("classic").unwrap();
        assert!(svc.purchase_template(classic).await.is_err());
    }

    #[tokio::test]
    async fn test_restore() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let events = EventBus::default();
        let backend = FakeBackend {
            owned: vec!["template.academic".into(), "bogus.product".into()],
            ..Default::default()
        };
        let svc = EntitlementService::new(&storage, &events, &backend, 3);

        assert!(svc.restore().await.unwrap());
        let state = svc.state().unwrap();
        assert!(state.purchased_template_ids.contains("academic"));
        assert!(!state.is_premium);

        assert!(!svc.restore().await.unwrap());
    }
}
