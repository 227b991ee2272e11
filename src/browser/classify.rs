use serde::Serialize;
use std::path::Path;

/// Supported image extensions
const IMAGE_EXTENSIONS: [&str; 3] = ["bmp", "jpg", "png"];

/// Supported music extensions
const MUSIC_EXTENSIONS: [&str; 5] = ["mp3", "wav", "wma", "aac", "m4a"];

/// Supported video extensions
const VIDEO_EXTENSIONS: [&str; 6] = ["avi", "mp4", "wmv", "webm", "mkv", "flv"];

/// What kind of media a file holds, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Music,
    Video,
    /// Anything else
    File,
}

impl MediaKind {
    /// Classify a bare extension (without the dot). Case-insensitive.
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.to_lowercase();
        let ext = ext.as_str();

        if IMAGE_EXTENSIONS.contains(&ext) {
            Self::Image
        } else if MUSIC_EXTENSIONS.contains(&ext) {
            Self::Music
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Self::Video
        } else {
            Self::File
        }
    }

    /// Classify a path by its extension; no extension means `File`
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|ext| Self::from_extension(&ext.to_string_lossy()))
            .unwrap_or(Self::File)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Music => "music",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    /// Parse the persisted form written by `as_str`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "music" => Some(Self::Music),
            "video" => Some(Self::Video),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    pub fn is_media(&self) -> bool {
        !matches!(self, Self::File)
    }
}
