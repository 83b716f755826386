//! Application configuration and persisted preference keys.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::entitlement::DEFAULT_FREE_EXPORT_LIMIT;
use super::template::PageSize;

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Free exports per calendar month for non-premium users.
    #[serde(default = "default_free_export_limit")]
    pub free_export_limit: u32,

    /// Page size used when no preference is stored.
    #[serde(default)]
    pub default_page_size: PageSize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            free_export_limit: default_free_export_limit(),
            default_page_size: PageSize::default(),
        }
    }
}

const fn default_free_export_limit() -> u32 {
    DEFAULT_FREE_EXPORT_LIMIT
}

/// Storage limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Largest accepted photo file in kilobytes.
    #[serde(default = "default_max_photo_kb")]
    pub max_photo_kb: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_photo_kb: default_max_photo_kb(),
        }
    }
}

const fn default_max_photo_kb() -> u64 {
    2048
}

/// General behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Number of launches after which the review hint is shown (0 = never).
    #[serde(default = "default_review_prompt_after")]
    pub review_prompt_after: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            review_prompt_after: default_review_prompt_after(),
        }
    }
}

const fn default_review_prompt_after() -> u64 {
    5
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cvforge")
    }

    /// SQLite database holding CVs, entitlement state and preferences.
    #[must_use]
    pub fn storage_db_path(&self) -> PathBuf {
        self.data_dir().join("cvforge.db")
    }

    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }

    /// Default output directory for exported documents.
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir().join("exports")
    }

    /// Receipt ledger of the simulated store.
    #[must_use]
    pub fn store_ledger_path(&self) -> PathBuf {
        self.data_dir().join("store_ledger.json")
    }

    /// Photo size cap in bytes, saturating for absurd configured values.
    #[must_use]
    pub const fn max_photo_bytes(&self) -> u64 {
        self.storage.max_photo_kb.saturating_mul(1024)
    }

    /// Set one value by its dotted key, e.g. `export.free_export_limit`.
    ///
    /// # Errors
    /// Returns a message for unknown keys or unparsable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .trim()
                .parse()
                .map_err(|_| format!("{key} expects a whole number, got '{value}'"))
        }

        match key {
            "export.free_export_limit" => self.export.free_export_limit = number(key, value)?,
            "export.default_page_size" => self.export.default_page_size = value.parse()?,
            "storage.max_photo_kb" => self.storage.max_photo_kb = number(key, value)?,
            "app.review_prompt_after" => self.app.review_prompt_after = number(key, value)?,
            _ => {
                return Err(format!(
                    "Unknown config key: {key}. Use: export.free_export_limit, \
                     export.default_page_size, storage.max_photo_kb, app.review_prompt_after"
                ))
            }
        }
        Ok(())
    }
}

/// Keys of the persisted key-value preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    SelectedTemplate,
    PageSize,
    CachedPersonalInfo,
    OpenCount,
    ReviewPrompted,
}

impl PreferenceKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectedTemplate => "selected_template",
            Self::PageSize => "page_size",
            Self::CachedPersonalInfo => "cached_personal_info",
            Self::OpenCount => "open_count",
            Self::ReviewPrompted => "review_prompted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.free_export_limit, 3);
        assert_eq!(config.export.default_page_size, PageSize::A4);
        assert_eq!(config.max_photo_bytes(), 2048 * 1024);
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let mut config = AppConfig::default();
        config.paths.data_dir = Some(PathBuf::from("/tmp/cvforge-test"));

        assert_eq!(
            config.storage_db_path(),
            PathBuf::from("/tmp/cvforge-test/cvforge.db")
        );
        assert_eq!(
            config.exports_dir(),
            PathBuf::from("/tmp/cvforge-test/exports")
        );
    }

    #[test]
    fn test_set_by_key() {
        let mut config = AppConfig::default();
        config.set("export.free_export_limit", "10").unwrap();
        config.set("export.default_page_size", "legal").unwrap();

        assert_eq!(config.export.free_export_limit, 10);
        assert_eq!(config.export.default_page_size, PageSize::Legal);
        assert!(config.set("export.free_export_limit", "many").is_err());
        assert!(config.set("export.colour", "red").is_err());
    }

    #[test]
    fn test_huge_photo_cap_saturates() {
        let mut config = AppConfig::default();
        config
            .set("storage.max_photo_kb", "18446744073709551615")
            .unwrap();
        assert_eq!(config.max_photo_bytes(), u64::MAX);
    }
}
