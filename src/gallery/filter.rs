use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::models::MediaItem;

/// Key that selects the whole catalog.
pub const ALL_KEY: &str = "all";

/// Display labels for the well-known category keys. Unknown keys show as-is.
static CATEGORY_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("all", "All"),
        ("team", "Team Vibes"),
        ("creative", "Creative Campaigns"),
        ("campaign", "Creative Campaigns"),
        ("work", "Work Hard, Play Hard"),
        ("fun", "Work Hard, Play Hard"),
        ("bts", "Behind-The-Scenes"),
    ])
});

/// The single active category selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FilterKey {
    #[default]
    All,
    Category(String),
}

impl FilterKey {
    /// Absent, empty and `"all"` (any case) keys all select the whole catalog.
    pub fn parse(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            None | Some("") => Self::All,
            Some(key) if key.to_lowercase() == ALL_KEY => Self::All,
            Some(key) => Self::Category(key.to_string()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_KEY,
            Self::Category(key) => key,
        }
    }

    /// Human-readable label for filter buttons and the lightbox caption.
    pub fn label(&self) -> String {
        category_label(self.as_str())
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FilterKey {
    fn from(key: &str) -> Self {
        Self::parse(Some(key))
    }
}

pub fn category_label(key: &str) -> String {
    CATEGORY_LABELS
        .get(key.to_lowercase().as_str())
        .map(|label| label.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Selects the items matching `key`, preserving catalog order.
///
/// Uncategorised items only appear under [`FilterKey::All`].
pub fn filter(items: &[MediaItem], key: &FilterKey) -> Vec<MediaItem> {
    match key {
        FilterKey::All => items.to_vec(),
        FilterKey::Category(key) => {
            let key = key.to_lowercase();
            items
                .iter()
                .filter(|item| {
                    item.category
                        .as_ref()
                        .is_some_and(|category| category.matches_lowered(&key))
                })
                .cloned()
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, MediaSource, MediaType};

    fn make_item(id: u32, category: Option<Category>) -> MediaItem {
        let item = MediaItem::new(
            id,
            MediaSource::Path(format!("{}.jpg", id).into()),
            MediaType::Image,
        );
        match category {
            Some(category) => item.with_category(category),
            None => item,
        }
    }

    fn tag(tag: &str) -> Option<Category> {
        Some(Category::Tag(tag.to_string()))
    }

    fn tags(tags: &[&str]) -> Option<Category> {
        Some(Category::Tags(tags.iter().map(|t| t.to_string()).collect()))
    }

    fn sample() -> Vec<MediaItem> {
        vec![
            make_item(1, tag("team")),
            make_item(2, tags(&["work", "fun"])),
            make_item(3, None),
            make_item(4, tag("BTS")),
            make_item(5, tags(&["bts", "team"])),
        ]
    }

    fn ids(items: &[MediaItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_all_returns_catalog_unchanged() {
        let items = sample();
        assert_eq!(ids(&filter(&items, &FilterKey::All)), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(FilterKey::parse(None), FilterKey::All);
        assert_eq!(FilterKey::parse(Some("ALL")), FilterKey::All);
        assert_eq!(FilterKey::parse(Some("")), FilterKey::All);
    }

    #[test]
    fn test_single_and_set_membership() {
        let items = sample();
        assert_eq!(ids(&filter(&items, &"team".into())), vec!["1", "5"]);
        assert_eq!(ids(&filter(&items, &"fun".into())), vec!["2"]);
        assert_eq!(ids(&filter(&items, &"bts".into())), vec!["4", "5"]);
        assert_eq!(ids(&filter(&items, &"Bts".into())), vec!["4", "5"]);
    }

    #[test]
    fn test_uncategorised_and_unknown() {
        let items = sample();
        assert!(filter(&items, &"missing".into()).is_empty());
        for key in ["team", "work", "fun", "bts"] {
            assert!(!ids(&filter(&items, &key.into())).contains(&"3"));
        }
    }

    #[test]
    fn test_non_ascii_categories_match_their_filter_button() {
        let items = vec![
            make_item(1, tag("ÉTÉ")),
            make_item(2, tag("été")),
            make_item(3, tags(&["hiver", "Été"])),
            make_item(4, tag("ete")),
        ];
        assert_eq!(ids(&filter(&items, &"été".into())), vec!["1", "2", "3"]);

        // One button per folded tag, and that button finds every spelling
        let catalog = crate::models::Catalog::new(items.clone()).unwrap();
        let buttons: Vec<FilterKey> = catalog
            .categories()
            .into_iter()
            .map(FilterKey::Category)
            .collect();
        assert_eq!(buttons.len(), 3);
        assert_eq!(ids(&filter(&items, &buttons[0])), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(FilterKey::All.label(), "All");
        assert_eq!(FilterKey::from("team").label(), "Team Vibes");
        assert_eq!(FilterKey::from("campaign").label(), "Creative Campaigns");
        assert_eq!(FilterKey::from("FUN").label(), "Work Hard, Play Hard");
        assert_eq!(FilterKey::from("bts").label(), "Behind-The-Scenes");
        assert_eq!(FilterKey::from("holiday").label(), "holiday");
    }
}
