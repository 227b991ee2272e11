/// Persistence contract for libraries, containers and items
///
/// Every operation is synchronous and runs as one transaction against the
/// backing store. Front ends talk to this trait, never to SQL.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::data::{LibraryItem, MediaContainer, MediaLibrary, Rating, SortMode, SortOrder};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: &'static str, message: String },

    #[error("Not a supported media file: {}", .0.display())]
    UnsupportedMedia(PathBuf),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub trait StorageProvider {
    /// Prepare the backing store, creating the schema if it is absent
    fn initialize(&self) -> Result<()>;

    // ========== Libraries ==========

    /// Create a library together with its root container
    fn create_media_library(&self, name: &str, owner: &str) -> Result<MediaLibrary>;

    /// Every library with its root container. Subcontainers are not loaded.
    fn read_media_libraries(&self) -> Result<Vec<MediaLibrary>>;

    fn update_media_library(&self, library_id: i64, name: &str, owner: &str) -> Result<()>;

    /// Delete a library and everything under its root container
    fn delete_media_library(&self, library_id: i64) -> Result<()>;

    // ========== Containers ==========

    /// Create a container under `parent_id`, or directly under the
    /// library's root when `parent_id` is `None`
    fn create_container(
        &self,
        name: &str,
        parent_id: Option<i64>,
        library: &MediaLibrary,
        expanded: bool,
    ) -> Result<MediaContainer>;

    fn read_container(&self, container_id: i64) -> Result<Option<MediaContainer>>;

    /// Immediate subcontainers in creation order
    fn read_child_containers(&self, parent_id: i64) -> Result<Vec<MediaContainer>>;

    /// Replace `container.children` with its full persisted subtree
    fn load_container_tree(&self, container: &mut MediaContainer) -> Result<()> {
        let mut children = self.read_child_containers(container.id)?;
        for child in &mut children {
            self.load_container_tree(child)?;
        }
        container.children = children;
        Ok(())
    }

    /// Rename, move or expand a container.
    ///
    /// A library root must keep `parent_id == None`; every other container
    /// needs a parent outside its own subtree.
    fn update_container(
        &self,
        container_id: i64,
        name: &str,
        parent_id: Option<i64>,
        expanded: bool,
    ) -> Result<()>;

    fn update_container_expansion(&self, container_id: i64, expanded: bool) -> Result<()>;

    /// Delete a container with its subcontainers and items
    fn delete_container(&self, container_id: i64) -> Result<()>;

    // ========== Items ==========

    /// Catalogue a file in `container`. The item variant follows the
    /// file's extension; non-media files are rejected.
    fn create_library_item(
        &self,
        name: &str,
        path: &Path,
        container: &MediaContainer,
        creation_time: DateTime<Utc>,
        thumbnail: Option<&[u8]>,
    ) -> Result<LibraryItem>;

    fn read_items_from_container(
        &self,
        container: &MediaContainer,
        load_thumbnails: bool,
        sort_mode: SortMode,
        sort_order: SortOrder,
    ) -> Result<Vec<LibraryItem>>;

    /// Single item with its thumbnail
    fn read_library_item(&self, item_id: i64) -> Result<Option<LibraryItem>>;

    fn update_library_item_name(&self, item_id: i64, name: &str) -> Result<()>;

    fn update_library_item_thumbnail(&self, item_id: i64, thumbnail: Option<&[u8]>) -> Result<()>;

    /// Set the rating of a music or video item
    fn update_library_item_rating(&self, item_id: i64, rating: Rating) -> Result<()>;

    /// Count one access and stamp the access time
    fn record_library_item_access(&self, item_id: i64) -> Result<()>;

    /// Remove the item record. The file on disk is left alone.
    fn delete_library_item(&self, item_id: i64) -> Result<()>;
}
