//! Configuration file management.
//!
//! Handles loading and saving the TOML configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# cvforge configuration
# Auto-generated - edit as needed

[export]
# Free exports per calendar month without premium
free_export_limit = 3

# Page size when none has been chosen: a4, letter or legal
default_page_size = "a4"

[storage]
# Largest accepted photo file in kilobytes
max_photo_kb = 2048

[app]
# Show a review hint after this many launches (0 = never)
review_prompt_after = 5

[paths]
# Custom data directory (optional, defaults to ~/.cvforge)
# data_dir = "/custom/path"
"#;

/// Load configuration for `data_dir`, or the default location.
///
/// A `data_dir` override is kept even if the file sets another one.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig> {
    let base = data_dir.map_or_else(AppConfig::default_data_dir, Path::to_path_buf);
    let config_path = base.join("config.toml");

    let mut config = if config_path.exists() {
        load_config_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = data_dir {
        config.paths.data_dir = Some(dir.to_path_buf());
    }

    Ok(config)
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Save configuration to its file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = config.config_file_path();

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(&config_path, content).map_err(|e| {
        AppError::io(
            format!("Failed to write config file: {}", config_path.display()),
            e,
        )
    })?;

    tracing::info!(path = %config_path.display(), "Configuration saved");

    Ok(())
}

/// Create the commented default configuration file if it doesn't exist.
///
/// Returns the path and whether it was created.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(config: &AppConfig) -> Result<(PathBuf, bool)> {
    let config_path = config.config_file_path();

    if config_path.exists() {
        return Ok((config_path, false));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %config_path.display(), "Created default configuration");

    Ok((config_path, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PageSize;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.export.free_export_limit, 3);
        assert_eq!(config.export.default_page_size, PageSize::A4);
        assert_eq!(config.app.review_prompt_after, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("[export]\nfree_export_limit = 10\n").unwrap();
        assert_eq!(config.export.free_export_limit, 10);
        assert_eq!(config.storage.max_photo_kb, 2048);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();

        let mut config = AppConfig::default();
        config.paths.data_dir = Some(dir.path().to_path_buf());
        config.export.default_page_size = PageSize::Legal;

        save_config(&config).unwrap();
        let loaded = load_config(Some(dir.path())).unwrap();

        assert_eq!(loaded.export.default_page_size, PageSize::Legal);
        assert_eq!(loaded.data_dir(), dir.path());
    }

    #[test]
    fn test_ensure_config_exists_once() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.data_dir = Some(dir.path().to_path_buf());

        let (path, created) = ensure_config_exists(&config).unwrap();
        assert!(created);
        assert!(path.exists());

        let (_, created_again) = ensure_config_exists(&config).unwrap();
        assert!(!created_again);
    }
}
