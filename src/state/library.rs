use chrono::{DateTime, Timelike, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::data::{
    ItemMedia, LibraryItem, MediaContainer, MediaLibrary, Rating, SortMode, SortOrder,
};
use super::storage::{Result, StorageError, StorageProvider};
use crate::browser::MediaKind;
use crate::config::AppConfig;

const CONTAINER_COLUMNS: &str = "id, name, expanded, parent";

/// The SqliteProvider manages the SQLite catalog database.
/// It stores libraries, their container hierarchy, and references to media files.
///
/// One connection is held for the provider's lifetime. It is not shared
/// across threads and there is no internal locking.
pub struct SqliteProvider {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteProvider {
    /// Open the catalog named by `config` and make sure its schema exists.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = Self::open(&config.database_path)?;
        provider.initialize()?;
        Ok(provider)
    }

    /// Open or create the database file without touching the schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        info!(path = %db_path.display(), "Opened catalog database");

        Self::with_connection(conn, db_path.to_path_buf())
    }

    /// A private database that disappears when the provider is dropped
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        // Cascading deletes depend on this, and SQLite defaults it to off
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteProvider { conn, db_path })
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Get a count of items across all libraries
    pub fn item_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Release the connection, reporting any error SQLite raises on close
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }

    /// IDs from `container_id` up to its library root, nearest first.
    /// Empty when the container does not exist.
    fn ancestor_chain(&self, container_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "WITH RECURSIVE chain(id, parent, depth) AS (
                 SELECT id, parent, 0 FROM containers WHERE id = ?1
                 UNION ALL
                 SELECT c.id, c.parent, chain.depth + 1
                 FROM containers c JOIN chain ON c.id = chain.parent
             )
             SELECT id FROM chain ORDER BY depth",
        )?;

        let chain = stmt
            .query_map([container_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(chain)
    }

    fn item_exists(&self, item_id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM items WHERE id = ?1", [item_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

impl StorageProvider for SqliteProvider {
    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn initialize(&self) -> Result<()> {
        // Containers form the hierarchy; a NULL parent marks a library root
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS containers (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                expanded        INTEGER NOT NULL DEFAULT 0,
                parent          INTEGER REFERENCES containers(id)
                                    ON UPDATE CASCADE ON DELETE CASCADE
            )",
            [],
        )?;

        // Each library owns exactly one root container
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS libraries (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                owner           TEXT NOT NULL,
                root_container  INTEGER NOT NULL REFERENCES containers(id)
                                    ON UPDATE CASCADE ON DELETE CASCADE
            )",
            [],
        )?;

        // Items reference media files; rating is NULL for images
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS items (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                name              TEXT NOT NULL,
                path              TEXT NOT NULL,
                container         INTEGER NOT NULL REFERENCES containers(id)
                                      ON UPDATE CASCADE ON DELETE CASCADE,
                kind              TEXT NOT NULL CHECK (kind IN ('image', 'music', 'video')),
                rating            INTEGER CHECK (rating BETWEEN 0 AND 5),
                access_count      INTEGER NOT NULL DEFAULT 0,
                creation_time     INTEGER NOT NULL,
                last_access_time  INTEGER NOT NULL,
                thumbnail         BLOB
            )",
            [],
        )?;

        // Create indexes for the tree walk and container listings
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_containers_parent ON containers(parent)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_items_container ON items(container)",
            [],
        )?;

        info!("Catalog schema initialized");

        Ok(())
    }

    fn create_media_library(&self, name: &str, owner: &str) -> Result<MediaLibrary> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO containers (name, expanded, parent) VALUES (?1, 0, NULL)",
            params![name],
        )?;
        let root_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO libraries (name, owner, root_container) VALUES (?1, ?2, ?3)",
            params![name, owner, root_id],
        )?;
        let library_id = tx.last_insert_rowid();

        tx.commit()?;

        debug!(library_id, root_id, name, "Created library");

        Ok(MediaLibrary {
            id: library_id,
            name: name.to_string(),
            owner: owner.to_string(),
            root_container: MediaContainer {
                id: root_id,
                name: name.to_string(),
                expanded: false,
                parent_id: None,
                children: Vec::new(),
            },
        })
    }

    fn read_media_libraries(&self) -> Result<Vec<MediaLibrary>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.name, l.owner, c.id, c.name, c.expanded, c.parent
             FROM libraries l
             JOIN containers c ON c.id = l.root_container
             ORDER BY l.id",
        )?;

        let libraries = stmt
            .query_map([], |row| {
                Ok(MediaLibrary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner: row.get(2)?,
                    root_container: MediaContainer {
                        id: row.get(3)?,
                        name: row.get(4)?,
                        expanded: row.get(5)?,
                        parent_id: row.get(6)?,
                        children: Vec::new(),
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(libraries)
    }

    fn update_media_library(&self, library_id: i64, name: &str, owner: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE libraries SET name = ?1, owner = ?2 WHERE id = ?3",
            params![name, owner, library_id],
        )?;
        expect_changed(changed, "library", library_id)
    }

    fn delete_media_library(&self, library_id: i64) -> Result<()> {
        // Removing the root cascades to the library row, subcontainers and items
        let changed = self.conn.execute(
            "DELETE FROM containers
             WHERE id = (SELECT root_container FROM libraries WHERE id = ?1)",
            [library_id],
        )?;
        expect_changed(changed, "library", library_id)?;

        debug!(library_id, "Deleted library");
        Ok(())
    }

    fn create_container(
        &self,
        name: &str,
        parent_id: Option<i64>,
        library: &MediaLibrary,
        expanded: bool,
    ) -> Result<MediaContainer> {
        let parent_id = parent_id.unwrap_or(library.root_container.id);

        let tx = self.conn.unchecked_transaction()?;

        match self.ancestor_chain(parent_id)?.last() {
            None => {
                return Err(StorageError::NotFound {
                    entity: "container",
                    id: parent_id,
                })
            }
            Some(&root) if root != library.root_container.id => {
                return Err(StorageError::InvalidInput {
                    field: "parent",
                    message: format!(
                        "container {} does not belong to library {}",
                        parent_id, library.id
                    ),
                })
            }
            Some(_) => {}
        }

        tx.execute(
            "INSERT INTO containers (name, expanded, parent) VALUES (?1, ?2, ?3)",
            params![name, expanded, parent_id],
        )?;
        let container_id = tx.last_insert_rowid();

        tx.commit()?;

        debug!(container_id, parent_id, name, "Created container");

        Ok(MediaContainer {
            id: container_id,
            name: name.to_string(),
            expanded,
            parent_id: Some(parent_id),
            children: Vec::new(),
        })
    }

    fn read_container(&self, container_id: i64) -> Result<Option<MediaContainer>> {
        let container = self
            .conn
            .query_row(
                &format!("SELECT {} FROM containers WHERE id = ?1", CONTAINER_COLUMNS),
                [container_id],
                container_from_row,
            )
            .optional()?;
        Ok(container)
    }

    fn read_child_containers(&self, parent_id: i64) -> Result<Vec<MediaContainer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM containers WHERE parent = ?1 ORDER BY id",
            CONTAINER_COLUMNS
        ))?;

        let children = stmt
            .query_map([parent_id], container_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(children)
    }

    fn update_container(
        &self,
        container_id: i64,
        name: &str,
        parent_id: Option<i64>,
        expanded: bool,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let current = self
            .read_container(container_id)?
            .ok_or(StorageError::NotFound {
                entity: "container",
                id: container_id,
            })?;

        match (current.parent_id, parent_id) {
            (None, Some(_)) => {
                return Err(StorageError::InvalidInput {
                    field: "parent",
                    message: "a library root cannot be moved".to_string(),
                })
            }
            (Some(_), None) => {
                return Err(StorageError::InvalidInput {
                    field: "parent",
                    message: "only library roots may have no parent".to_string(),
                })
            }
            (Some(_), Some(new_parent)) => {
                let chain = self.ancestor_chain(new_parent)?;
                if chain.is_empty() {
                    return Err(StorageError::NotFound {
                        entity: "container",
                        id: new_parent,
                    });
                }
                if chain.contains(&container_id) {
                    return Err(StorageError::InvalidInput {
                        field: "parent",
                        message: format!(
                            "container {} is inside container {}",
                            new_parent, container_id
                        ),
                    });
                }
            }
            (None, None) => {}
        }

        tx.execute(
            "UPDATE containers SET name = ?1, parent = ?2, expanded = ?3 WHERE id = ?4",
            params![name, parent_id, expanded, container_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn update_container_expansion(&self, container_id: i64, expanded: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE containers SET expanded = ?1 WHERE id = ?2",
            params![expanded, container_id],
        )?;
        expect_changed(changed, "container", container_id)
    }

    fn delete_container(&self, container_id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM containers WHERE id = ?1", [container_id])?;
        expect_changed(changed, "container", container_id)?;

        debug!(container_id, "Deleted container");
        Ok(())
    }

    fn create_library_item(
        &self,
        name: &str,
        path: &Path,
        container: &MediaContainer,
        creation_time: DateTime<Utc>,
        thumbnail: Option<&[u8]>,
    ) -> Result<LibraryItem> {
        let media = ItemMedia::for_kind(MediaKind::from_path(path))
            .ok_or_else(|| StorageError::UnsupportedMedia(path.to_path_buf()))?;

        let path_str = path.to_string_lossy().to_string();
        let creation_time = whole_seconds(creation_time);
        let now = whole_seconds(Utc::now());

        let tx = self.conn.unchecked_transaction()?;

        if self.read_container(container.id)?.is_none() {
            return Err(StorageError::NotFound {
                entity: "container",
                id: container.id,
            });
        }

        tx.execute(
            "INSERT INTO items (name, path, container, kind, rating, access_count,
                                creation_time, last_access_time, thumbnail)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)",
            params![
                name,
                &path_str,
                container.id,
                media.kind().as_str(),
                media.rating(),
                creation_time.timestamp(),
                now.timestamp(),
                thumbnail,
            ],
        )?;
        let item_id = tx.last_insert_rowid();

        tx.commit()?;

        debug!(item_id, container_id = container.id, path = %path_str, "Created item");

        Ok(LibraryItem {
            id: item_id,
            name: name.to_string(),
            path: path_str,
            container_id: container.id,
            access_count: 0,
            creation_time,
            last_access_time: now,
            thumbnail: thumbnail.map(<[u8]>::to_vec),
            media,
        })
    }

    fn read_items_from_container(
        &self,
        container: &MediaContainer,
        load_thumbnails: bool,
        sort_mode: SortMode,
        sort_order: SortOrder,
    ) -> Result<Vec<LibraryItem>> {
        let thumbnail_column = if load_thumbnails { "thumbnail" } else { "NULL" };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, path, container, kind, rating, access_count,
                    creation_time, last_access_time, {}
             FROM items
             WHERE container = ?1
             {}",
            thumbnail_column,
            order_clause(sort_mode, sort_order)
        ))?;

        let items = stmt
            .query_map([container.id], item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn read_library_item(&self, item_id: i64) -> Result<Option<LibraryItem>> {
        let item = self
            .conn
            .query_row(
                "SELECT id, name, path, container, kind, rating, access_count,
                        creation_time, last_access_time, thumbnail
                 FROM items
                 WHERE id = ?1",
                [item_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn update_library_item_name(&self, item_id: i64, name: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE items SET name = ?1 WHERE id = ?2",
            params![name, item_id],
        )?;
        expect_changed(changed, "item", item_id)
    }

    fn update_library_item_thumbnail(&self, item_id: i64, thumbnail: Option<&[u8]>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE items SET thumbnail = ?1 WHERE id = ?2",
            params![thumbnail, item_id],
        )?;
        expect_changed(changed, "item", item_id)
    }

    fn update_library_item_rating(&self, item_id: i64, rating: Rating) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE items SET rating = ?1 WHERE id = ?2 AND kind IN ('music', 'video')",
            params![rating, item_id],
        )?;

        if changed == 0 && self.item_exists(item_id)? {
            return Err(StorageError::InvalidInput {
                field: "rating",
                message: format!("item {} is an image and carries no rating", item_id),
            });
        }
        expect_changed(changed, "item", item_id)
    }

    fn record_library_item_access(&self, item_id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET access_count = access_count + 1, last_access_time = ?1
             WHERE id = ?2",
            params![Utc::now().timestamp(), item_id],
        )?;
        expect_changed(changed, "item", item_id)
    }

    fn delete_library_item(&self, item_id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", [item_id])?;
        expect_changed(changed, "item", item_id)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for SqliteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("db_path", &self.db_path)
            .finish()
    }
}

fn expect_changed(changed: usize, entity: &'static str, id: i64) -> Result<()> {
    if changed == 0 {
        Err(StorageError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

/// Timestamps are stored as whole Unix seconds
fn whole_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_nanosecond(0).unwrap_or(time)
}

fn order_clause(mode: SortMode, order: SortOrder) -> String {
    let column = match mode {
        SortMode::Chronological => "creation_time",
        SortMode::FrequencyOfUse => "access_count",
        SortMode::Rating => "COALESCE(rating, 0)",
        SortMode::Name => "name COLLATE NOCASE",
    };
    let direction = match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    format!("ORDER BY {} {}, id {}", column, direction, direction)
}

fn container_from_row(row: &Row<'_>) -> rusqlite::Result<MediaContainer> {
    Ok(MediaContainer {
        id: row.get(0)?,
        name: row.get(1)?,
        expanded: row.get(2)?,
        parent_id: row.get(3)?,
        children: Vec::new(),
    })
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(index)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(index, secs))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<LibraryItem> {
    let kind: String = row.get(4)?;
    let rating: Option<Rating> = row.get(5)?;
    let media = match MediaKind::parse(&kind) {
        Some(MediaKind::Image) => ItemMedia::Image,
        Some(MediaKind::Music) => ItemMedia::Music {
            rating: rating.unwrap_or_default(),
        },
        Some(MediaKind::Video) => ItemMedia::Video {
            rating: rating.unwrap_or_default(),
        },
        Some(MediaKind::File) | None => {
            return Err(rusqlite::Error::InvalidColumnType(4, "kind".to_string(), Type::Text))
        }
    };

    let access_count: i64 = row.get(6)?;

    Ok(LibraryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        container_id: row.get(3)?,
        access_count: u64::try_from(access_count)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(6, access_count))?,
        creation_time: timestamp_column(row, 7)?,
        last_access_time: timestamp_column(row, 8)?,
        thumbnail: row.get(9)?,
        media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SqliteProvider {
        let provider = SqliteProvider::open_in_memory().unwrap();
        provider.initialize().unwrap();
        provider
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn add_item(
        provider: &SqliteProvider,
        container: &MediaContainer,
        path: &str,
        secs: i64,
    ) -> LibraryItem {
        let name = Path::new(path).file_stem().unwrap().to_string_lossy().to_string();
        provider
            .create_library_item(&name, Path::new(path), container, at(secs), None)
            .unwrap()
    }

    fn names(items: &[LibraryItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let provider = provider();
        provider.initialize().unwrap();
        assert_eq!(provider.item_count().unwrap(), 0);
    }

    #[test]
    fn test_open_creates_file_and_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");
        let config = AppConfig::with_database_path(&path);

        let provider = SqliteProvider::new(&config).unwrap();
        provider.create_media_library("Photos", "alex").unwrap();
        assert_eq!(provider.path(), &path);
        provider.close().unwrap();

        assert!(path.exists());
        let reopened = SqliteProvider::new(&config).unwrap();
        assert_eq!(reopened.read_media_libraries().unwrap().len(), 1);
    }

    #[test]
    fn test_create_and_read_libraries() {
        let provider = provider();
        let photos = provider.create_media_library("Photos", "alex").unwrap();
        let music = provider.create_media_library("Music", "sam").unwrap();

        assert_ne!(photos.id, music.id);
        assert_ne!(photos.root_container.id, music.root_container.id);
        assert!(photos.root_container.is_root());

        let libraries = provider.read_media_libraries().unwrap();
        assert_eq!(libraries, vec![photos, music]);
    }

    #[test]
    fn test_update_library_keeps_id() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();

        provider
            .update_media_library(library.id, "Holidays", "sam")
            .unwrap();

        let libraries = provider.read_media_libraries().unwrap();
        assert_eq!(libraries[0].id, library.id);
        assert_eq!(libraries[0].name, "Holidays");
        assert_eq!(libraries[0].owner, "sam");
    }

    #[test]
    fn test_update_missing_library_is_not_found() {
        let provider = provider();
        let result = provider.update_media_library(42, "x", "y");
        assert!(matches!(
            result,
            Err(StorageError::NotFound { entity: "library", id: 42 })
        ));
    }

    #[test]
    fn test_delete_library_cascades() {
        let provider = provider();
        let doomed = provider.create_media_library("Old", "alex").unwrap();
        let kept = provider.create_media_library("New", "alex").unwrap();
        let sub = provider.create_container("Sub", None, &doomed, false).unwrap();
        add_item(&provider, &sub, "/media/a.jpg", 1);
        add_item(&provider, &kept.root_container, "/media/b.jpg", 1);

        provider.delete_media_library(doomed.id).unwrap();

        let libraries = provider.read_media_libraries().unwrap();
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0].id, kept.id);
        assert!(provider.read_container(sub.id).unwrap().is_none());
        assert!(provider.read_container(doomed.root_container.id).unwrap().is_none());
        assert_eq!(provider.item_count().unwrap(), 1);

        assert!(provider.delete_media_library(doomed.id).is_err());
    }

    #[test]
    fn test_delete_root_container_removes_library() {
        let provider = provider();
        let doomed = provider.create_media_library("Scratch", "alex").unwrap();
        let kept = provider.create_media_library("Keep", "alex").unwrap();
        let sub = provider.create_container("Sub", None, &doomed, false).unwrap();
        add_item(&provider, &sub, "/media/c.mp3", 1);

        provider.delete_container(doomed.root_container.id).unwrap();

        let ids: Vec<i64> = provider
            .read_media_libraries()
            .unwrap()
            .iter()
            .map(|library| library.id)
            .collect();
        assert_eq!(ids, vec![kept.id]);
        assert!(provider.read_container(sub.id).unwrap().is_none());
        assert_eq!(provider.item_count().unwrap(), 0);
    }

    #[test]
    fn test_every_created_container_is_reachable() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let a = provider.create_container("A", None, &library, false).unwrap();
        let b = provider.create_container("B", Some(a.id), &library, true).unwrap();
        let c = provider.create_container("C", Some(b.id), &library, false).unwrap();
        let d = provider.create_container("D", None, &library, false).unwrap();

        let mut root = provider.read_media_libraries().unwrap()[0].root_container.clone();
        assert!(root.children.is_empty());
        provider.load_container_tree(&mut root).unwrap();

        for container in [&a, &b, &c, &d] {
            let found = root.find(container.id).unwrap();
            assert_eq!(found.name, container.name);
            assert_eq!(found.parent_id, container.parent_id);
        }
        assert_eq!(root.children.len(), 2);
        assert!(root.find(b.id).unwrap().expanded);
    }

    #[test]
    fn test_child_containers_in_creation_order() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        for name in ["Zeta", "Alpha", "Mid"] {
            provider.create_container(name, None, &library, false).unwrap();
        }

        let children = provider
            .read_child_containers(library.root_container.id)
            .unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_create_container_rejects_foreign_parent() {
        let provider = provider();
        let mine = provider.create_media_library("Mine", "alex").unwrap();
        let theirs = provider.create_media_library("Theirs", "sam").unwrap();

        let result = provider.create_container("X", Some(theirs.root_container.id), &mine, false);
        assert!(matches!(result, Err(StorageError::InvalidInput { field: "parent", .. })));

        let result = provider.create_container("X", Some(999), &mine, false);
        assert!(matches!(result, Err(StorageError::NotFound { entity: "container", .. })));
    }

    #[test]
    fn test_delete_container_removes_subtree_only() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let doomed = provider.create_container("Doomed", None, &library, false).unwrap();
        let child = provider.create_container("Child", Some(doomed.id), &library, false).unwrap();
        let sibling = provider.create_container("Sibling", None, &library, false).unwrap();
        add_item(&provider, &doomed, "/media/a.png", 1);
        add_item(&provider, &child, "/media/b.mp3", 1);
        let survivor = add_item(&provider, &sibling, "/media/c.mkv", 1);

        provider.delete_container(doomed.id).unwrap();

        assert!(provider.read_container(doomed.id).unwrap().is_none());
        assert!(provider.read_container(child.id).unwrap().is_none());
        assert_eq!(provider.read_container(sibling.id).unwrap().unwrap().name, "Sibling");

        let items = provider
            .read_items_from_container(&sibling, false, SortMode::Name, SortOrder::Ascending)
            .unwrap();
        assert_eq!(items, vec![survivor]);
        assert_eq!(provider.item_count().unwrap(), 1);
    }

    #[test]
    fn test_update_container_moves_and_renames() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let a = provider.create_container("A", None, &library, false).unwrap();
        let b = provider.create_container("B", None, &library, false).unwrap();

        provider.update_container(b.id, "B2", Some(a.id), true).unwrap();

        let moved = provider.read_container(b.id).unwrap().unwrap();
        assert_eq!(moved.name, "B2");
        assert_eq!(moved.parent_id, Some(a.id));
        assert!(moved.expanded);
        assert_eq!(provider.read_child_containers(a.id).unwrap(), vec![moved]);
    }

    #[test]
    fn test_update_container_rejects_cycles() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let a = provider.create_container("A", None, &library, false).unwrap();
        let b = provider.create_container("B", Some(a.id), &library, false).unwrap();

        assert!(matches!(
            provider.update_container(a.id, "A", Some(b.id), false),
            Err(StorageError::InvalidInput { field: "parent", .. })
        ));
        assert!(matches!(
            provider.update_container(a.id, "A", Some(a.id), false),
            Err(StorageError::InvalidInput { field: "parent", .. })
        ));
        assert_eq!(
            provider.read_container(a.id).unwrap().unwrap().parent_id,
            Some(library.root_container.id)
        );
    }

    #[test]
    fn test_update_container_keeps_roots_and_parents() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let other = provider.create_media_library("Other", "alex").unwrap();
        let a = provider.create_container("A", None, &library, false).unwrap();
        let root = library.root_container.id;

        assert!(provider.update_container(root, "Root", Some(a.id), false).is_err());
        assert!(provider.update_container(a.id, "A", None, false).is_err());
        assert!(matches!(
            provider.update_container(a.id, "A", Some(999), false),
            Err(StorageError::NotFound { entity: "container", id: 999 })
        ));

        provider.update_container(root, "Renamed", None, true).unwrap();
        let renamed = provider.read_container(root).unwrap().unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert!(renamed.expanded);

        // Moving across libraries keeps the chain rooted
        provider
            .update_container(a.id, "A", Some(other.root_container.id), false)
            .unwrap();
        assert_eq!(provider.read_child_containers(other.root_container.id).unwrap().len(), 1);
    }

    #[test]
    fn test_update_container_expansion() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let a = provider.create_container("A", None, &library, false).unwrap();

        provider.update_container_expansion(a.id, true).unwrap();
        assert!(provider.read_container(a.id).unwrap().unwrap().expanded);

        provider.update_container_expansion(a.id, false).unwrap();
        assert!(!provider.read_container(a.id).unwrap().unwrap().expanded);

        assert!(provider.update_container_expansion(999, true).is_err());
    }

    #[test]
    fn test_item_variant_follows_extension() {
        let provider = provider();
        let library = provider.create_media_library("Mixed", "alex").unwrap();
        let root = &library.root_container;

        assert_eq!(add_item(&provider, root, "/m/a.JPG", 1).media, ItemMedia::Image);
        assert_eq!(
            add_item(&provider, root, "/m/b.m4a", 1).media,
            ItemMedia::Music { rating: Rating::Unrated }
        );
        assert_eq!(
            add_item(&provider, root, "/m/c.webm", 1).media,
            ItemMedia::Video { rating: Rating::Unrated }
        );

        let result =
            provider.create_library_item("notes", Path::new("/m/notes.txt"), root, at(1), None);
        assert!(matches!(result, Err(StorageError::UnsupportedMedia(_))));
    }

    #[test]
    fn test_create_item_in_missing_container() {
        let provider = provider();
        let ghost = MediaContainer {
            id: 77,
            name: "ghost".to_string(),
            expanded: false,
            parent_id: None,
            children: Vec::new(),
        };

        let result = provider.create_library_item("a", Path::new("/a.png"), &ghost, at(1), None);
        assert!(matches!(result, Err(StorageError::NotFound { entity: "container", id: 77 })));
    }

    #[test]
    fn test_created_item_round_trips() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let created = provider
            .create_library_item(
                "sunset",
                Path::new("/photos/sunset.png"),
                &library.root_container,
                at(1_600_000_000),
                Some(&[1, 2, 3]),
            )
            .unwrap();

        let loaded = provider
            .read_items_from_container(
                &library.root_container,
                true,
                SortMode::Name,
                SortOrder::Ascending,
            )
            .unwrap();
        assert_eq!(loaded, vec![created.clone()]);

        let without = provider
            .read_items_from_container(
                &library.root_container,
                false,
                SortMode::Name,
                SortOrder::Ascending,
            )
            .unwrap();
        assert_eq!(without[0].thumbnail, None);
        assert_eq!(without[0].id, created.id);
    }

    #[test]
    fn test_rename_item_keeps_identity() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let item = add_item(&provider, &library.root_container, "/photos/old.bmp", 1_500_000_000);

        provider.update_library_item_name(item.id, "new").unwrap();

        let reloaded = provider
            .read_items_from_container(
                &library.root_container,
                false,
                SortMode::Name,
                SortOrder::Ascending,
            )
            .unwrap()
            .remove(0);
        assert_eq!(reloaded.name, "new");
        assert_eq!(reloaded.id, item.id);
        assert_eq!(reloaded.path, item.path);
        assert_eq!(reloaded.creation_time, item.creation_time);
    }

    #[test]
    fn test_rating_round_trips() {
        let provider = provider();
        let library = provider.create_media_library("Media", "alex").unwrap();
        let song = add_item(&provider, &library.root_container, "/m/song.mp3", 1);
        let clip = add_item(&provider, &library.root_container, "/m/clip.avi", 2);

        provider.update_library_item_rating(song.id, Rating::Four).unwrap();
        provider.update_library_item_rating(clip.id, Rating::Five).unwrap();

        let items = provider
            .read_items_from_container(
                &library.root_container,
                false,
                SortMode::Chronological,
                SortOrder::Ascending,
            )
            .unwrap();
        assert_eq!(items[0].media, ItemMedia::Music { rating: Rating::Four });
        assert_eq!(items[1].media, ItemMedia::Video { rating: Rating::Five });
    }

    #[test]
    fn test_rating_rejected_for_images() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let photo = add_item(&provider, &library.root_container, "/p/a.png", 1);

        assert!(matches!(
            provider.update_library_item_rating(photo.id, Rating::Three),
            Err(StorageError::InvalidInput { field: "rating", .. })
        ));
        assert!(matches!(
            provider.update_library_item_rating(999, Rating::Three),
            Err(StorageError::NotFound { entity: "item", id: 999 })
        ));
    }

    #[test]
    fn test_record_access() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let item = add_item(&provider, &library.root_container, "/p/a.png", 1);

        provider.record_library_item_access(item.id).unwrap();
        provider.record_library_item_access(item.id).unwrap();

        let reloaded = provider
            .read_items_from_container(
                &library.root_container,
                false,
                SortMode::Name,
                SortOrder::Ascending,
            )
            .unwrap()
            .remove(0);
        assert_eq!(reloaded.access_count, 2);
        assert!(reloaded.last_access_time >= item.last_access_time);
    }

    #[test]
    fn test_update_and_clear_thumbnail() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let item = add_item(&provider, &library.root_container, "/p/a.png", 1);
        let load = || {
            provider
                .read_items_from_container(
                    &library.root_container,
                    true,
                    SortMode::Name,
                    SortOrder::Ascending,
                )
                .unwrap()
                .remove(0)
                .thumbnail
        };

        provider.update_library_item_thumbnail(item.id, Some(&[9, 8, 7])).unwrap();
        assert_eq!(load(), Some(vec![9, 8, 7]));

        provider.update_library_item_thumbnail(item.id, None).unwrap();
        assert_eq!(load(), None);
    }

    #[test]
    fn test_delete_item() {
        let provider = provider();
        let library = provider.create_media_library("Photos", "alex").unwrap();
        let item = add_item(&provider, &library.root_container, "/p/a.png", 1);

        assert_eq!(provider.read_library_item(item.id).unwrap(), Some(item.clone()));

        provider.delete_library_item(item.id).unwrap();
        assert_eq!(provider.item_count().unwrap(), 0);
        assert_eq!(provider.read_library_item(item.id).unwrap(), None);
        assert!(matches!(
            provider.delete_library_item(item.id),
            Err(StorageError::NotFound { entity: "item", .. })
        ));
    }

    #[test]
    fn test_sort_modes() {
        let provider = provider();
        let library = provider.create_media_library("Media", "alex").unwrap();
        let root = &library.root_container;
        let b = add_item(&provider, root, "/m/bravo.mp3", 300);
        let a = add_item(&provider, root, "/m/Alpha.mp3", 200);
        let c = add_item(&provider, root, "/m/charlie.mp3", 100);

        provider.update_library_item_rating(a.id, Rating::Five).unwrap();
        provider.update_library_item_rating(c.id, Rating::Two).unwrap();
        for _ in 0..3 {
            provider.record_library_item_access(c.id).unwrap();
        }
        provider.record_library_item_access(b.id).unwrap();

        let sorted = |mode, order| {
            provider
                .read_items_from_container(root, false, mode, order)
                .unwrap()
        };

        assert_eq!(
            names(&sorted(SortMode::Name, SortOrder::Ascending)),
            vec!["Alpha", "bravo", "charlie"]
        );
        assert_eq!(
            names(&sorted(SortMode::Name, SortOrder::Descending)),
            vec!["charlie", "bravo", "Alpha"]
        );
        assert_eq!(
            names(&sorted(SortMode::Chronological, SortOrder::Ascending)),
            vec!["charlie", "Alpha", "bravo"]
        );
        assert_eq!(
            names(&sorted(SortMode::Rating, SortOrder::Descending)),
            vec!["Alpha", "charlie", "bravo"]
        );
        assert_eq!(
            names(&sorted(SortMode::FrequencyOfUse, SortOrder::Descending)),
            vec!["charlie", "bravo", "Alpha"]
        );
    }
}
