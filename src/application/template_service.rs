//! Template selection gated by entitlement.

use chrono::Utc;

use crate::domain::{all_templates, find_template, AppError, AppEvent, Cv, Result, Template};
use crate::infrastructure::LocalStorage;

use super::entitlement_service::EntitlementService;
use super::events::EventBus;
use super::preferences::Preferences;

/// Outcome of a selection attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// The template is now selected.
    Applied(&'static Template),
    /// Premium template the user has not unlocked. Nothing was persisted.
    PurchaseRequired(&'static Template),
    /// The user cancelled the purchase. Nothing was persisted.
    Cancelled,
}

/// A catalog entry together with whether the user may use it.
#[derive(Debug, Clone, Copy)]
pub struct TemplateListing {
    pub template: &'static Template,
    pub unlocked: bool,
    pub selected: bool,
}

pub struct TemplateService<'a> {
    storage: &'a LocalStorage,
    events: &'a EventBus,
    prefs: Preferences<'a>,
    entitlements: &'a EntitlementService<'a>,
}

impl<'a> TemplateService<'a> {
    #[must_use]
    pub const fn new(
        storage: &'a LocalStorage,
        events: &'a EventBus,
        prefs: Preferences<'a>,
        entitlements: &'a EntitlementService<'a>,
    ) -> Self {
        Self {
            storage,
            events,
            prefs,
            entitlements,
        }
    }

    /// The catalog with unlock and selection flags.
    pub fn listings(&self) -> Result<Vec<TemplateListing>> {
        let state = self.entitlements.state()?;
        let selected = self.prefs.selected_template()?;
        Ok(all_templates()
            .iter()
            .map(|template| TemplateListing {
                template,
                unlocked: state.is_unlocked(template),
                selected: template.id == selected.id,
            })
            .collect())
    }

    /// Look up a catalog template.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for unknown ids.
    pub fn get(&self, template_id: &str) -> Result<&'static Template> {
        find_template(template_id).ok_or_else(|| AppError::not_found("Template", template_id))
    }

    /// Select a template as the default and, if given, for `cv`.
    ///
    /// Premium templates the user has not unlocked are not applied.
    pub fn select(&self, template_id: &str, cv: Option<&mut Cv>) -> Result<Selection> {
        let template = self.get(template_id)?;
        if !self.entitlements.state()?.is_unlocked(template) {
            tracing::info!(template = template.id, "Template requires purchase");
            return Ok(Selection::PurchaseRequired(template));
        }

        self.apply(template, cv)?;
        Ok(Selection::Applied(template))
    }

    /// Buy the template if needed, then select it.
    ///
    /// # Errors
    /// Returns `AppError::Purchase` if the purchase fails; the previous
    /// selection is kept.
    pub async fn purchase_and_select(
        &self,
        template_id: &str,
        cv: Option<&mut Cv>,
    ) -> Result<Selection> {
        let template = self.get(template_id)?;

        if !self.entitlements.state()?.is_unlocked(template)
            && !self.entitlements.purchase_template(template).await?
        {
            return Ok(Selection::Cancelled);
        }

        self.apply(template, cv)?;
        Ok(Selection::Applied(template))
    }

    /// Store the selection on the CV and as the default in one transaction.
    fn apply(&self, template: &'static Template, cv: Option<&mut Cv>) -> Result<()> {
        let cv_id = match cv {
            Some(cv) => {
                let previous = std::mem::replace(&mut cv.template_id, template.id.to_string());
                let stamp = cv.updated_at;
                cv.updated_at = Utc::now();
                let stored = self.storage.atomically(|storage| {
                    if !storage.update_cv(cv)? {
                        return Err(AppError::not_found("CV", cv.id.to_string()));
                    }
                    self.prefs.set_selected_template(template)
                });
                if let Err(e) = stored {
                    cv.template_id = previous;
                    cv.updated_at = stamp;
                    return Err(e);
                }
                Some(cv.id)
            }
            None => {
                self.prefs.set_selected_template(template)?;
                None
            }
        };

        tracing::info!(template = template.id, ?cv_id, "Template selected");
        self.events.publish(AppEvent::TemplateSelected {
            cv_id,
            template_id: template.id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::entitlement_service::tests::FakeBackend;
    use crate::domain::AppConfig;
    use tempfile::tempdir;

    #[test]
    fn test_free_template_persists_default() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let config = AppConfig::default();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let ents = EntitlementService::new(&storage, &events, &backend, 3);
        let prefs = Preferences::new(&storage, &config);
        let svc = TemplateService::new(&storage, &events, prefs, &ents);

        let mut cv = Cv::new("CV", "classic");
        storage.insert_cv(&cv).unwrap();

        let outcome = svc.select("modern", Some(&mut cv)).unwrap();
        assert!(matches!(outcome, Selection::Applied(t) if t.id == "modern"));
        assert_eq!(prefs.selected_template().unwrap().id, "modern");
        assert_eq!(storage.get_cv(cv.id).unwrap().unwrap().template_id, "modern");
    }

    #[test]
    fn test_locked_premium_changes_nothing() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let config = AppConfig::default();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let ents = EntitlementService::new(&storage, &events, &backend, 3);
        let prefs = Preferences::new(&storage, &config);
        let svc = TemplateService::new(&storage, &events, prefs, &ents);

        let mut cv = Cv::new("CV", "classic");
        storage.insert_cv(&cv).unwrap();

        let outcome = svc.select("executive", Some(&mut cv)).unwrap();
        assert!(matches!(outcome, Selection::PurchaseRequired(t) if t.id == "executive"));
        assert_eq!(cv.template_id, "classic");
        assert_eq!(prefs.selected_template().unwrap().id, "classic");
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purchase_and_select() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let config = AppConfig::default();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let ents = EntitlementService::new(&storage, &events, &backend, 3);
        let prefs = Preferences::new(&storage, &config);
        let svc = TemplateService::new(&storage, &events, prefs, &ents);

        let outcome = svc.purchase_and_select("creative", None).await.unwrap();
        assert!(matches!(outcome, Selection::Applied(t) if t.id == "creative"));
        assert_eq!(prefs.selected_template().unwrap().id, "creative");

        let listing = svc.listings().unwrap();
        let creative = listing.iter().find(|l| l.template.id == "creative").unwrap();
        assert!(creative.unlocked && creative.selected);
    }

    #[tokio::test]
    async fn test_cancelled_purchase_keeps_selection() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let config = AppConfig::default();
        let events = EventBus::default();
        let backend = FakeBackend {
            cancel: true,
            ..Default::default()
        };
        let ents = EntitlementService::new(&storage, &events, &backend, 3);
        let prefs = Preferences::new(&storage, &config);
        let svc = TemplateService::new(&storage, &events, prefs, &ents);

        let outcome = svc.purchase_and_select("academic", None).await.unwrap();
        assert_eq!(outcome, Selection::Cancelled);
        assert_eq!(prefs.selected_template().unwrap().id, "classic");
    }

    #[test]
    fn test_missing_cv_leaves_default_untouched() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let config = AppConfig::default();
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let backend = FakeBackend::default();
        let ents = EntitlementService::new(&storage, &events, &backend, 3);
        let prefs = Preferences::new(&storage, &config);
        let svc = TemplateService::new(&storage, &events, prefs, &ents);

        let mut cv = Cv::new("Never stored", "classic");
        let err = svc.select("modern", Some(&mut cv)).unwrap_err();

        assert!(matches!(err, AppError::NotFound { kind: "CV", .. }));
        assert_eq!(cv.template_id, "classic");
        assert_eq!(prefs.selected_template().unwrap().id, "classic");
        assert!(crate::application::events::drain(&mut rx).is_empty());
    }

    #[test]
    fn test_unknown_template() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::open(&dir.path().join("t.db")).unwrap();
        let config = AppConfig::default();
        let events = EventBus::default();
        let backend = FakeBackend::default();
        let ents = EntitlementService::new(&storage, &events, &backend, 3);
        let svc = TemplateService::new(&storage, &events, Preferences::new(&storage, &config), &ents);

        assert!(matches!(svc.select("nope", None), Err(AppError::NotFound { .. })));
    }
}
