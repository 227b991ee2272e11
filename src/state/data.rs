/// Shared data structures for the catalog
///
/// These structs represent the data model that flows between
/// the database layer and whatever front end sits on top of it.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::browser::MediaKind;

/// A named node in the library hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaContainer {
    /// Unique database ID
    pub id: i64,
    pub name: String,
    /// UI state: whether the node is shown expanded
    pub expanded: bool,
    /// ID of the parent container, `None` for a library root
    pub parent_id: Option<i64>,
    /// Subcontainers in creation order. Empty until loaded.
    pub children: Vec<MediaContainer>,
}

impl MediaContainer {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Depth-first search through the loaded subtree
    pub fn find(&self, id: i64) -> Option<&MediaContainer> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// IDs of this container and every loaded descendant, pre-order
    pub fn ids(&self) -> Vec<i64> {
        let mut ids = vec![self.id];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }
}

/// A top-level collection with one owner and one root container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaLibrary {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub root_container: MediaContainer,
}

/// User rating for music and video items (0 = unrated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(into = "u8")]
pub enum Rating {
    #[default]
    Unrated = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl Rating {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Unrated),
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl ToSql for Rating {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.value())))
    }
}

impl FromSql for Rating {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        Rating::from_value(raw).ok_or(FromSqlError::OutOfRange(raw))
    }
}

/// Per-kind payload of a library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemMedia {
    Image,
    Music { rating: Rating },
    Video { rating: Rating },
}

impl ItemMedia {
    /// Fresh payload for a newly imported file of the given kind.
    /// Returns `None` for kinds that cannot be catalogued.
    pub fn for_kind(kind: MediaKind) -> Option<Self> {
        match kind {
            MediaKind::Image => Some(Self::Image),
            MediaKind::Music => Some(Self::Music { rating: Rating::Unrated }),
            MediaKind::Video => Some(Self::Video { rating: Rating::Unrated }),
            MediaKind::File => None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image => MediaKind::Image,
            Self::Music { .. } => MediaKind::Music,
            Self::Video { .. } => MediaKind::Video,
        }
    }

    /// Rating, for the kinds that carry one
    pub fn rating(&self) -> Option<Rating> {
        match self {
            Self::Image => None,
            Self::Music { rating } | Self::Video { rating } => Some(*rating),
        }
    }
}

/// A persisted reference to a media file
///
/// The record is independent of the file: deleting the item never touches
/// the disk, and a missing file does not invalidate the item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryItem {
    pub id: i64,
    pub name: String,
    /// File system location, fixed at creation
    pub path: String,
    /// Key of the owning container
    pub container_id: i64,
    pub access_count: u64,
    pub creation_time: DateTime<Utc>,
    pub last_access_time: DateTime<Utc>,
    /// Encoded thumbnail, only present when requested on read
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
    #[serde(flatten)]
    pub media: ItemMedia,
}

/// How `read_items_from_container` orders its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortMode {
    /// By creation time
    #[default]
    Chronological,
    /// By access count
    FrequencyOfUse,
    Rating,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(id: i64, parent_id: Option<i64>, children: Vec<MediaContainer>) -> MediaContainer {
        MediaContainer {
            id,
            name: format!("c{}", id),
            expanded: false,
            parent_id,
            children,
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert_eq!(Rating::from_value(0), Some(Rating::Unrated));
        assert_eq!(Rating::from_value(5), Some(Rating::Five));
        assert_eq!(Rating::from_value(6), None);
        assert_eq!(Rating::from_value(-1), None);
        assert_eq!(Rating::Three.value(), 3);
    }

    #[test]
    fn test_media_for_kind() {
        assert_eq!(ItemMedia::for_kind(MediaKind::Image), Some(ItemMedia::Image));
        assert_eq!(
            ItemMedia::for_kind(MediaKind::Video),
            Some(ItemMedia::Video { rating: Rating::Unrated })
        );
        assert_eq!(ItemMedia::for_kind(MediaKind::File), None);
        assert_eq!(ItemMedia::Image.rating(), None);
        assert_eq!(
            ItemMedia::Music { rating: Rating::Four }.rating(),
            Some(Rating::Four)
        );
    }

    #[test]
    fn test_find_in_tree() {
        let tree = container(
            1,
            None,
            vec![
                container(2, Some(1), vec![container(4, Some(2), vec![])]),
                container(3, Some(1), vec![]),
            ],
        );

        assert_eq!(tree.find(4).map(|c| c.id), Some(4));
        assert!(tree.find(5).is_none());
        assert_eq!(tree.ids(), vec![1, 2, 4, 3]);
        assert!(tree.is_root());
        assert!(!tree.children[0].is_root());
    }

    #[test]
    fn test_item_json_shape() {
        let item = LibraryItem {
            id: 7,
            name: "song".to_string(),
            path: "/music/song.mp3".to_string(),
            container_id: 1,
            access_count: 2,
            creation_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            last_access_time: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            thumbnail: Some(vec![1, 2, 3]),
            media: ItemMedia::Music { rating: Rating::Two },
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "music");
        assert_eq!(json["rating"], 2);
        assert!(json.get("thumbnail").is_none());
    }
}
