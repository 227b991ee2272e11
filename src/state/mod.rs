/// State management module
///
/// This module handles the persisted catalog, including:
/// - The storage contract and its errors (storage.rs)
/// - The SQLite implementation (library.rs)
/// - Shared data structures (data.rs)
/// - Bulk folder import (import.rs)

pub mod data;
pub mod import;
pub mod library;
pub mod storage;

pub use data::{ItemMedia, LibraryItem, MediaContainer, MediaLibrary, Rating, SortMode, SortOrder};
pub use library::SqliteProvider;
pub use storage::{StorageError, StorageProvider};
