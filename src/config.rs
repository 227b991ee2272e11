//! Application configuration
//!
//! Built once at start-up and handed to whatever needs it.

use std::path::PathBuf;
use thiserror::Error;

use crate::imaging::thumbnail::THUMBNAIL_SIZE;

/// Folder under the user data directory
pub const APP_FOLDER: &str = "media-shelf";

/// Database file name inside `APP_FOLDER`
pub const DB_FILENAME: &str = "media_shelf.db";

/// Default `tracing` filter directive
pub const DEFAULT_LOG_FILTER: &str = "media_shelf=info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine user data directory")]
    NoDataDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Location of the catalog database
    pub database_path: PathBuf,
    /// Edge length of generated thumbnails
    pub thumbnail_size: u32,
    /// `tracing-subscriber` filter directive
    pub log_filter: String,
}

impl AppConfig {
    /// Configuration rooted in the per-user data directory:
    /// - Linux: ~/.local/share/media-shelf/media_shelf.db
    /// - macOS: ~/Library/Application Support/media-shelf/media_shelf.db
    /// - Windows: %APPDATA%\media-shelf\media_shelf.db
    pub fn from_user_dirs() -> Result<Self, ConfigError> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoDataDir)?;

        path.push(APP_FOLDER);
        path.push(DB_FILENAME);

        Ok(Self::with_database_path(path))
    }

    pub fn with_database_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            thumbnail_size: THUMBNAIL_SIZE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    pub fn thumbnail_size(mut self, size: u32) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::Invalid("thumbnail size must be positive".to_string()));
        }
        self.thumbnail_size = size;
        Ok(self)
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
