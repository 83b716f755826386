//! Typed access to persisted key-value preferences.
//!
//! Every getter falls back to a default when the key is absent or holds
//! something unreadable.

use crate::domain::{
    find_template, AppConfig, AppError, PageSize, PersonalInfo, PreferenceKey, Result, Template,
    DEFAULT_TEMPLATE_ID,
};
use crate::infrastructure::LocalStorage;

/// Preferences backed by the local store.
#[derive(Clone, Copy)]
pub struct Preferences<'a> {
    storage: &'a LocalStorage,
    config: &'a AppConfig,
}

impl<'a> Preferences<'a> {
    #[must_use]
    pub const fn new(storage: &'a LocalStorage, config: &'a AppConfig) -> Self {
        Self { storage, config }
    }

    /// Default template for new CVs.
    pub fn selected_template(&self) -> Result<&'static Template> {
        let stored = self.storage.get_preference(PreferenceKey::SelectedTemplate)?;
        let template = stored
            .as_deref()
            .and_then(find_template)
            .or_else(|| find_template(DEFAULT_TEMPLATE_ID));

        template.ok_or_else(|| AppError::Config {
            message: format!("Default template '{DEFAULT_TEMPLATE_ID}' missing from catalog"),
        })
    }

    pub fn set_selected_template(&self, template: &Template) -> Result<()> {
        self.storage
            .set_preference(PreferenceKey::SelectedTemplate, template.id)
    }

    /// Export page size, falling back to the configured default.
    pub fn page_size(&self) -> Result<PageSize> {
        let stored = self.storage.get_preference(PreferenceKey::PageSize)?;
        Ok(stored
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.config.export.default_page_size))
    }

    pub fn set_page_size(&self, size: PageSize) -> Result<()> {
        self.storage
            .set_preference(PreferenceKey::PageSize, size.as_str())
    }

    /// Last saved personal info, used to pre-fill new CVs.
    pub fn cached_personal_info(&self) -> Result<Option<PersonalInfo>> {
        let Some(raw) = self
            .storage
            .get_preference(PreferenceKey::CachedPersonalInfo)?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached personal info");
                Ok(None)
            }
        }
    }

    pub fn cache_personal_info(&self, info: &PersonalInfo) -> Result<()> {
        let raw = serde_json::to_string(info).map_err(AppError::json_parse)?;
        self.storage
            .set_preference(PreferenceKey::CachedPersonalInfo, &raw)
    }

    fn counter(&self, key: PreferenceKey) -> Result<u64> {
        Ok(self
            .storage
            .get_preference(key)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0))
    }

    /// Count one launch and return the new total.
    pub fn record_open(&self) -> Result<u64> {
        let count = self.counter(PreferenceKey::OpenCount)?.saturating_add(1);
        self.storage
            .set_preference(PreferenceKey::OpenCount, &count.to_string())?;
        Ok(count)
    }

    /// Whether the one-time review hint is due. Marks it shown when it is.
    pub fn take_review_prompt(&self) -> Result<bool> {
        let threshold = self.config.app.review_prompt_after;
        if threshold == 0 || self.counter(PreferenceKey::ReviewPrompted)? > 0 {
            return Ok(false);
        }
        if self.counter(PreferenceKey::OpenCount)? < threshold {
            return Ok(false);
        }
        self.storage
            .set_preference(PreferenceKey::ReviewPrompted, "1")?;
        Ok(true)
    }
}
