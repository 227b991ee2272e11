/// File system browsing
///
/// Lists one directory level at a time and classifies each entry for display:
/// - Directories and drive roots
/// - Image, music and video files (by extension, see classify.rs)
/// - Everything else as a generic file
///
/// Browsing is best-effort. Entries that cannot be enumerated are left out
/// and reported as warnings next to the listing instead of failing it.

pub mod classify;

pub use classify::MediaKind;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Path separators accepted by `parent_path`
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Display category of a browser entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    Drive,
    Image,
    Music,
    Video,
    File,
}

impl From<MediaKind> for EntryKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::Image,
            MediaKind::Music => Self::Music,
            MediaKind::Video => Self::Video,
            MediaKind::File => Self::File,
        }
    }
}

/// A typed file system entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserEntry {
    pub kind: EntryKind,
    pub path: PathBuf,
    pub display_name: String,
}

impl BrowserEntry {
    /// Build an entry. Never fails: when no file name can be derived the
    /// raw path string becomes the display name.
    pub fn new(kind: EntryKind, path: PathBuf) -> Self {
        let display_name = match kind {
            EntryKind::Drive => path.to_string_lossy().to_string(),
            _ => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
        };

        Self {
            kind,
            path,
            display_name,
        }
    }

    /// Classify a file by its extension
    pub fn file(path: PathBuf) -> Self {
        let kind = MediaKind::from_path(&path).into();
        Self::new(kind, path)
    }

    pub fn directory(path: PathBuf) -> Self {
        Self::new(EntryKind::Directory, path)
    }
}

/// Something that could not be listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Result of browsing one directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    /// Entries sorted by display name, case-insensitive
    pub entries: Vec<BrowserEntry>,
    /// Enumeration failures that were skipped
    pub warnings: Vec<BrowseWarning>,
}

impl Listing {
    /// True when every entry was enumerated
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    fn skip(&mut self, path: &Path, err: &std::io::Error) {
        warn!(path = %path.display(), error = %err, "Skipping unreadable entry");
        self.warnings.push(BrowseWarning {
            path: path.to_path_buf(),
            message: err.to_string(),
        });
    }
}

/// List the immediate children of `path` (non-recursive)
pub fn browse(path: impl AsRef<Path>) -> Listing {
    let path = path.as_ref();
    let mut listing = Listing::default();

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            listing.skip(path, &err);
            return listing;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                listing.skip(path, &err);
                continue;
            }
        };

        let entry_path = entry.path();

        // Follow symlinks so a link to a directory browses like one
        match fs::metadata(&entry_path) {
            Ok(metadata) if metadata.is_dir() => {
                listing.entries.push(BrowserEntry::directory(entry_path));
            }
            Ok(_) => listing.entries.push(BrowserEntry::file(entry_path)),
            Err(err) => listing.skip(&entry_path, &err),
        }
    }

    listing
        .entries
        .sort_by_cached_key(|entry| entry.display_name.to_lowercase());

    debug!(
        path = %path.display(),
        entries = listing.entries.len(),
        skipped = listing.warnings.len(),
        "Browsed directory"
    );

    listing
}

/// Parent of `path`, computed on the string alone.
///
/// The result keeps its trailing separator. A root is returned unchanged,
/// and a drive given without a separator (`C:`) gets one appended. Any
/// other input without a separator has no known parent and comes back as is.
pub fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(SEPARATORS);

    match trimmed.rfind(SEPARATORS) {
        Some(index) => path[..=index].to_string(),
        None if is_bare_drive(path) => format!("{}{}", path, std::path::MAIN_SEPARATOR),
        None => path.to_string(),
    }
}

fn is_bare_drive(path: &str) -> bool {
    matches!(path.as_bytes(), [letter, b':'] if letter.is_ascii_alphabetic())
}

/// Drive roots available on this machine
pub fn drives() -> Vec<BrowserEntry> {
    drive_roots()
        .into_iter()
        .map(|root| BrowserEntry::new(EntryKind::Drive, root))
        .collect()
}

#[cfg(windows)]
fn drive_roots() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|root| root.exists())
        .collect()
}

#[cfg(not(windows))]
fn drive_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/")]
}
