/// Bulk import of media files from a folder into a container

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::data::{MediaContainer, SortMode, SortOrder};
use super::storage::{Result, StorageProvider};
use crate::browser::MediaKind;
use crate::imaging::thumbnail::item_thumbnail;

/// Result of a folder import operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub imported_count: usize,
    /// Files already catalogued in the container
    pub skipped_count: usize,
}

/// Import every media file under `folder` into `container`
///
/// Non-media files are ignored. Paths already present in the container are
/// counted as skipped. Image items get a thumbnail of `thumbnail_size`
/// when one can be generated; a failed thumbnail does not fail the import.
pub fn import_folder<S: StorageProvider + ?Sized>(
    storage: &S,
    container: &MediaContainer,
    folder: &Path,
    recursive: bool,
    thumbnail_size: u32,
) -> Result<ImportResult> {
    let mut result = ImportResult::default();

    let mut known: HashSet<String> = storage
        .read_items_from_container(container, false, SortMode::Chronological, SortOrder::Ascending)?
        .into_iter()
        .map(|item| item.path)
        .collect();

    info!(folder = %folder.display(), container_id = container.id, "Scanning folder");

    let max_depth = if recursive { usize::MAX } else { 1 };

    // Walk the directory tree
    for entry in WalkDir::new(folder)
        .follow_links(true)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable path");
                None
            }
        })
    {
        let path = entry.path();

        // Only process files (not directories)
        if !entry.file_type().is_file() {
            continue;
        }

        let kind = MediaKind::from_path(path);
        if !kind.is_media() {
            continue;
        }

        let path_str = path.to_string_lossy().to_string();
        if !known.insert(path_str) {
            result.skipped_count += 1;
            continue;
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let thumbnail = item_thumbnail(path, kind, thumbnail_size);

        storage.create_library_item(
            &name,
            path,
            container,
            file_creation_time(path),
            thumbnail.as_deref(),
        )?;

        result.imported_count += 1;
        if result.imported_count % 100 == 0 {
            debug!(imported = result.imported_count, "Import progress");
        }
    }

    info!(
        imported = result.imported_count,
        skipped = result.skipped_count,
        "Import complete"
    );

    Ok(result)
}

/// Creation time of a file, falling back to its modification time and
/// then to now on platforms or file systems that do not record it
pub fn file_creation_time(path: &Path) -> DateTime<Utc> {
    fs::metadata(path)
        .and_then(|meta| meta.created().or_else(|_| meta.modified()))
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::ItemMedia;
    use crate::state::library::SqliteProvider;
    use image::{Rgb, RgbImage};
    use std::fs::File;

    fn setup() -> (SqliteProvider, MediaContainer) {
        let provider = SqliteProvider::open_in_memory().unwrap();
        provider.initialize().unwrap();
        let library = provider.create_media_library("Imports", "alex").unwrap();
        (provider, library.root_container)
    }

    #[test]
    fn test_import_flat_folder() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(32, 32, Rgb([1, 2, 3]))
            .save(dir.path().join("photo.png"))
            .unwrap();
        File::create(dir.path().join("song.mp3")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("clip.mkv")).unwrap();

        let (provider, container) = setup();
        let result = import_folder(&provider, &container, dir.path(), false, 16).unwrap();

        assert_eq!(result, ImportResult { imported_count: 2, skipped_count: 0 });

        let items = provider
            .read_items_from_container(&container, true, SortMode::Name, SortOrder::Ascending)
            .unwrap();
        assert_eq!(items[0].name, "photo");
        assert_eq!(items[0].media, ItemMedia::Image);
        assert!(items[0].thumbnail.is_some());
        assert_eq!(items[1].name, "song");
        assert!(items[1].thumbnail.is_none());
    }

    #[test]
    fn test_recursive_import_skips_known_paths() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.wav")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("clip.mkv")).unwrap();

        let (provider, container) = setup();
        let first = import_folder(&provider, &container, dir.path(), true, 16).unwrap();
        assert_eq!(first.imported_count, 2);

        File::create(dir.path().join("b.flv")).unwrap();
        let second = import_folder(&provider, &container, dir.path(), true, 16).unwrap();
        assert_eq!(second, ImportResult { imported_count: 1, skipped_count: 2 });
        assert_eq!(provider.item_count().unwrap(), 3);
    }

    #[test]
    fn test_broken_image_still_imported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.jpg"), b"garbage").unwrap();

        let (provider, container) = setup();
        let result = import_folder(&provider, &container, dir.path(), false, 16).unwrap();
        assert_eq!(result.imported_count, 1);

        let items = provider
            .read_items_from_container(&container, true, SortMode::Name, SortOrder::Ascending)
            .unwrap();
        assert!(items[0].thumbnail.is_none());
    }
}
