use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default pixel height used when an item carries no height hint (`h-48`).
pub const DEFAULT_DISPLAY_HEIGHT_PX: u32 = 192;

/// Pixels per height unit (`h-N` renders at `N * 4` logical pixels).
const PX_PER_HEIGHT_UNIT: u32 = 4;

/// Stable identifier of a catalog entry.
///
/// Manifests may use integers or strings; both normalise to the same textual form
/// so `7` and `"7"` name the same item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! media_id_from_int {
    ($($int:ty),*) => {
        $(
            impl From<$int> for MediaId {
                fn from(id: $int) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

media_id_from_int!(i32, i64, u32, u64, usize);

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for MediaId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif" => Some(Self::Image),
            "webm" | "mp4" | "mkv" | "avi" | "mov" => Some(Self::Video),
            _ => None,
        }
    }
}

/// One tag or an ordered, non-empty set of tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Tag(String),
    Tags(Vec<String>),
}

impl Category {
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        let tags: &[String] = match self {
            Self::Tag(tag) => std::slice::from_ref(tag),
            Self::Tags(tags) => tags,
        };
        tags.iter().map(String::as_str)
    }

    /// Case-insensitive match against a filter key: equality for a single tag,
    /// membership for a set.
    pub fn matches(&self, key: &str) -> bool {
        self.matches_lowered(&key.to_lowercase())
    }

    /// [`Category::matches`] with a key already lowercased by the caller.
    pub fn matches_lowered(&self, lowered_key: &str) -> bool {
        self.tags().any(|tag| tag.to_lowercase() == lowered_key)
    }
}

/// Relative display height token such as `h-64`.
///
/// The numeric part is the packing weight; a missing or unparsable number packs
/// with weight 1. `h-0` packs with weight 0. Both render at the default height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightHint {
    raw: String,
    units: Option<u32>,
}

impl HeightHint {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("h-").unwrap_or(trimmed);
        Self {
            raw: raw.to_string(),
            units: digits.parse::<u32>().ok(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn units(&self) -> Option<u32> {
        self.units
    }
}

impl<'de> Deserialize<'de> for HeightHint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Where the bytes of an item live. Local paths are decoded by the front end;
/// anything else is handed to GIO untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Path(PathBuf),
    Uri(String),
}

impl MediaSource {
    /// Parse a manifest `src`, resolving relative paths against `base_dir`.
    pub fn resolve(raw: &str, base_dir: Option<&Path>) -> Self {
        if let Some(path) = raw.strip_prefix("file://") {
            return Self::Path(PathBuf::from(path));
        }
        if raw.contains("://") {
            return Self::Uri(raw.to_string());
        }
        let path = PathBuf::from(raw);
        match base_dir {
            Some(base) if path.is_relative() => Self::Path(base.join(path)),
            _ => Self::Path(path),
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Uri(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaItem {
    pub id: MediaId,
    pub src: MediaSource,
    /// Still preview, videos only.
    pub poster: Option<MediaSource>,
    pub media_type: MediaType,
    pub category: Option<Category>,
    pub height: Option<HeightHint>,
}

impl MediaItem {
    pub fn new(id: impl Into<MediaId>, src: MediaSource, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            src,
            poster: None,
            media_type,
            category: None,
            height: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_height(mut self, hint: &str) -> Self {
        self.height = Some(HeightHint::parse(hint));
        self
    }

    pub fn with_poster(mut self, poster: MediaSource) -> Self {
        self.poster = Some(poster);
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// Weight added to a masonry column when this item is placed in it.
    pub fn height_weight(&self) -> u32 {
        self.height.as_ref().and_then(HeightHint::units).unwrap_or(1)
    }

    pub fn display_height_px(&self) -> u32 {
        self.height
            .as_ref()
            .and_then(HeightHint::units)
            .filter(|units| *units > 0)
            .map(|units| units.saturating_mul(PX_PER_HEIGHT_UNIT))
            .unwrap_or(DEFAULT_DISPLAY_HEIGHT_PX)
    }
}
