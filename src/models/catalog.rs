//! Read-only media catalog.
//!
//! The gallery never writes back to the catalog. Two sources are supported:
//! - a JSON manifest mirroring the static dataset (`id`, `src`, `poster`, `type`,
//!   `category`, `height`)
//! - a directory scan where first-level sub-directories become categories

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::task;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::error::CatalogError;
use crate::image_loader;
use crate::models::{Category, HeightHint, MediaId, MediaItem, MediaSource, MediaType};

/// Aspect ratio (height / width) above which a scanned image counts as portrait.
const PORTRAIT_RATIO: f32 = 1.2;
/// Aspect ratio below which a scanned image counts as landscape.
const LANDSCAPE_RATIO: f32 = 0.83;
const MANIFEST_FILE_NAME: &str = "catalog.json";

#[derive(Debug, Deserialize)]
struct ManifestRecord {
    id: MediaId,
    src: String,
    #[serde(default)]
    poster: Option<String>,
    #[serde(rename = "type", default = "default_media_type")]
    media_type: MediaType,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    height: Option<HeightHint>,
}

fn default_media_type() -> MediaType {
    MediaType::Image
}

/// Where a catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// JSON manifest file.
    Manifest(PathBuf),
    /// Directory tree to scan.
    Directory(PathBuf),
}

impl CatalogSource {
    /// Directories are scanned; anything else is read as a manifest.
    pub fn from_path(path: &Path) -> Self {
        if path.is_dir() {
            Self::Directory(path.to_path_buf())
        } else {
            Self::Manifest(path.to_path_buf())
        }
    }

    /// `$XDG_DATA_HOME/galleria/catalog.json` if present, else the user's
    /// pictures directory.
    pub fn default_location() -> Option<Self> {
        let manifest = directories::ProjectDirs::from("", "", "galleria")
            .map(|dirs| dirs.data_dir().join(MANIFEST_FILE_NAME))
            .filter(|path| path.is_file());
        if let Some(manifest) = manifest {
            return Some(Self::Manifest(manifest));
        }
        directories::UserDirs::new()
            .and_then(|dirs| dirs.picture_dir().map(Path::to_path_buf))
            .map(Self::Directory)
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Manifest(path) | Self::Directory(path) => path,
        }
    }
}

/// Ordered, immutable collection of media items with unique ids.
///
/// Cloning is cheap; all clones share the same item storage.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Arc<[MediaItem]>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
        }
    }
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate ids and empty category sets.
    pub fn new(items: Vec<MediaItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.id) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
            if matches!(&item.category, Some(Category::Tags(tags)) if tags.is_empty()) {
                return Err(CatalogError::EmptyCategorySet(item.id.clone()));
            }
        }
        Ok(Self {
            items: items.into(),
        })
    }

    /// Parses a JSON manifest. Relative sources resolve against `base_dir`.
    pub fn from_manifest_str(json: &str, base_dir: Option<&Path>) -> Result<Self, CatalogError> {
        let records: Vec<ManifestRecord> = serde_json::from_str(json)?;
        let items = records
            .into_iter()
            .map(|record| MediaItem {
                id: record.id,
                src: MediaSource::resolve(&record.src, base_dir),
                poster: record
                    .poster
                    .as_deref()
                    .map(|poster| MediaSource::resolve(poster, base_dir)),
                media_type: record.media_type,
                category: record.category,
                height: record.height,
            })
            .collect();
        Self::new(items)
    }

    /// Reads a JSON manifest from disk.
    pub fn load_manifest(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_manifest_str(&json, path.parent())?;
        info!("Loaded {} catalog items from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Loads from either source off the calling thread.
    pub async fn load(source: &CatalogSource) -> Result<Self, CatalogError> {
        match source {
            CatalogSource::Manifest(path) => {
                let path = path.clone();
                task::spawn_blocking(move || Self::load_manifest(&path)).await?
            }
            CatalogSource::Directory(path) => Self::scan_directory(path).await,
        }
    }

    /// Scans a directory tree on a blocking task.
    pub async fn scan_directory(root: &Path) -> Result<Self, CatalogError> {
        let root = root.to_path_buf();
        task::spawn_blocking(move || Self::scan_directory_sync(&root)).await?
    }

    fn scan_directory_sync(root: &Path) -> Result<Self, CatalogError> {
        if !root.is_dir() {
            return Err(CatalogError::NotADirectory(root.to_path_buf()));
        }
        info!("Scanning catalog directory {:?}", root);

        let walker = WalkDir::new(root).follow_links(false).into_iter();
        let mut discovered: Vec<(PathBuf, MediaType)> = Vec::new();
        for entry in walker.filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable catalog entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            if let Some(media_type) = MediaType::from_extension(ext) {
                discovered.push((entry.path().to_path_buf(), media_type));
            }
        }

        // Sort by path for consistent ordering
        discovered.sort_by(|a, b| a.0.cmp(&b.0));

        let items = discovered
            .into_iter()
            .map(|(path, media_type)| scanned_item(root, path, media_type))
            .collect();
        let catalog = Self::new(items)?;
        info!("Catalog scan found {} media files", catalog.len());
        Ok(catalog)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Distinct category tags in first-seen order, compared case-insensitively.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for tag in self
            .items
            .iter()
            .filter_map(|item| item.category.as_ref())
            .flat_map(|category| category.tags())
        {
            if seen.insert(tag.to_lowercase()) {
                out.push(tag.to_string());
            }
        }
        out
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}

fn scanned_item(root: &Path, path: PathBuf, media_type: MediaType) -> MediaItem {
    let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
    let components: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let category = if components.len() > 1 {
        Some(Category::Tag(components[0].clone()))
    } else {
        None
    };

    let height = match media_type {
        MediaType::Image => match image_loader::read_dimensions(&path) {
            Ok((width, height)) => Some(height_hint_for(width, height)),
            Err(err) => {
                // Left in the catalog; the grid drops it once decoding fails.
                debug!("No dimensions for {:?}: {:#}", path, err);
                None
            }
        },
        MediaType::Video => None,
    };
    trace!(?path, ?category, "Catalog entry");

    MediaItem {
        id: MediaId::new(components.join("/")),
        src: MediaSource::Path(path),
        poster: None,
        media_type,
        category,
        height,
    }
}

/// Buckets an image's shape into the height hint the packer understands.
pub(crate) fn height_hint_for(width: u32, height: u32) -> HeightHint {
    if width == 0 {
        return HeightHint::parse("h-64");
    }
    let ratio = height as f32 / width as f32;
    if ratio >= PORTRAIT_RATIO {
        HeightHint::parse("h-96")
    } else if ratio <= LANDSCAPE_RATIO {
        HeightHint::parse("h-48")
    } else {
        HeightHint::parse("h-64")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"[
        {"id": 1, "src": "img/one.jpg", "category": "team", "height": "h-64"},
        {"id": 2, "src": "img/two.jpg", "category": ["work", "bts"]},
        {"id": "clip", "src": "https://cdn.example/clip.mp4", "poster": "img/clip.jpg", "type": "video"},
        {"id": 4, "src": "/abs/four.png", "category": "Team"}
    ]"#;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn test_manifest_parsing() {
        let catalog = Catalog::from_manifest_str(MANIFEST, Some(Path::new("/data"))).unwrap();
        assert_eq!(catalog.len(), 4);

        let first = &catalog.items()[0];
        assert_eq!(first.id, MediaId::from(1));
        assert_eq!(
            first.src,
            MediaSource::Path(PathBuf::from("/data/img/one.jpg"))
        );
        assert_eq!(first.height_weight(), 64);

        let clip = catalog.get(&MediaId::from("clip")).unwrap();
        assert!(clip.is_video());
        assert!(clip.category.is_none());
        assert_eq!(
            clip.poster,
            Some(MediaSource::Path(PathBuf::from("/data/img/clip.jpg")))
        );
    }

    #[test]
    fn test_categories_first_seen_order() {
        let catalog = Catalog::from_manifest_str(MANIFEST, None).unwrap();
        assert_eq!(catalog.categories(), vec!["team", "work", "bts"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[{"id": 1, "src": "a.jpg"}, {"id": "1", "src": "b.jpg"}]"#;
        let err = Catalog::from_manifest_str(json, None).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id.as_str() == "1"));
    }

    #[test]
    fn test_empty_category_set_rejected() {
        let json = r#"[{"id": 1, "src": "a.jpg", "category": []}]"#;
        let err = Catalog::from_manifest_str(json, None).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyCategorySet(_)));
    }

    #[test]
    fn test_load_manifest_missing_file() {
        let dir = tempdir().unwrap();
        let err = Catalog::load_manifest(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_height_hint_buckets() {
        assert_eq!(height_hint_for(1000, 1500).units(), Some(96));
        assert_eq!(height_hint_for(1000, 1000).units(), Some(64));
        assert_eq!(height_hint_for(1920, 1080).units(), Some(48));
    }

    #[tokio::test]
    async fn test_scan_directory_assigns_categories() {
        let dir = tempdir().unwrap();
        let team = dir.path().join("team");
        fs::create_dir(&team).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();

        write_png(&dir.path().join("root.png"), 40, 20);
        write_png(&team.join("tall.png"), 20, 40);
        write_png(&dir.path().join(".hidden").join("skip.png"), 10, 10);
        fs::write(team.join("notes.txt"), b"not media").unwrap();

        let catalog = Catalog::scan_directory(dir.path()).await.unwrap();
        assert_eq!(catalog.len(), 2);

        let root = catalog.get(&MediaId::from("root.png")).unwrap();
        assert!(root.category.is_none());
        assert_eq!(root.height_weight(), 48);

        let tall = catalog.get(&MediaId::from("team/tall.png")).unwrap();
        assert_eq!(tall.category, Some(Category::Tag("team".to_string())));
        assert_eq!(tall.height_weight(), 96);
    }

    #[tokio::test]
    async fn test_load_dispatches_on_source() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("catalog.json");
        fs::write(&manifest, r#"[{"id": 1, "src": "one.jpg"}]"#).unwrap();
        write_png(&dir.path().join("a.png"), 4, 4);

        let source = CatalogSource::from_path(&manifest);
        assert_eq!(source, CatalogSource::Manifest(manifest.clone()));
        let catalog = Catalog::load(&source).await.unwrap();
        assert_eq!(
            catalog.items()[0].src,
            MediaSource::Path(dir.path().join("one.jpg"))
        );

        let source = CatalogSource::from_path(dir.path());
        assert!(matches!(source, CatalogSource::Directory(_)));
        let catalog = Catalog::load(&source).await.unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_rejects_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.png");
        write_png(&file, 2, 2);
        let err = Catalog::scan_directory(&file).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotADirectory(_)));
    }
}
