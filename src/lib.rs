//! # media-shelf
//!
//! Catalog core for a desktop media viewer.
//!
//! - `state`: libraries, containers and items persisted in SQLite
//! - `browser`: one-level directory listing with media classification
//! - `imaging`: thumbnail generation for image items
//! - `config`: explicit application configuration

pub mod browser;
pub mod config;
pub mod imaging;
pub mod state;

pub use config::AppConfig;
pub use state::{SqliteProvider, StorageError, StorageProvider};
