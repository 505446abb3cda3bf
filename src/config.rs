use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::gallery::pagination::DEFAULT_PAGE_SIZE;
use crate::gallery::video::DEFAULT_ICON_DURATION;
use crate::gallery::visibility::{
    VisibilityOptions, DEFAULT_ENTRANCE_THRESHOLD, DEFAULT_SENTINEL_MARGIN_PX,
    DEFAULT_SENTINEL_THRESHOLD, DEFAULT_VIDEO_THRESHOLD,
};
use crate::layout::Breakpoints;

const DEFAULT_PREVIEW_CACHE_MB: usize = 128;

/// Tunables for the gallery core and front end.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    pub page_size: usize,
    pub entrance_threshold: f32,
    pub sentinel_threshold: f32,
    /// Pre-trigger margin around the viewport for the load-more sentinel.
    pub sentinel_margin_px: f32,
    pub video_threshold: f32,
    pub icon_duration: Duration,
    pub breakpoints: Breakpoints,
    /// Artificial delay before a staged page is revealed. Zero reveals at once.
    pub simulated_delay: Duration,
    /// Memory budget for decoded grid previews.
    pub preview_cache_bytes: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            entrance_threshold: DEFAULT_ENTRANCE_THRESHOLD,
            sentinel_threshold: DEFAULT_SENTINEL_THRESHOLD,
            sentinel_margin_px: DEFAULT_SENTINEL_MARGIN_PX,
            video_threshold: DEFAULT_VIDEO_THRESHOLD,
            icon_duration: DEFAULT_ICON_DURATION,
            breakpoints: Breakpoints::default(),
            simulated_delay: Duration::ZERO,
            preview_cache_bytes: DEFAULT_PREVIEW_CACHE_MB * 1024 * 1024,
        }
    }
}

impl GalleryConfig {
    /// Defaults overridden by `GALLERIA_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    /// Invalid values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var::<usize, _, _>(&lookup, "GALLERIA_PAGE_SIZE", |v| *v > 0) {
            config.page_size = v;
        }
        if let Some(v) = parse_var::<f32, _, _>(&lookup, "GALLERIA_ENTRANCE_THRESHOLD", is_ratio) {
            config.entrance_threshold = v;
        }
        if let Some(v) = parse_var::<f32, _, _>(&lookup, "GALLERIA_SENTINEL_THRESHOLD", is_ratio) {
            config.sentinel_threshold = v;
        }
        if let Some(v) = parse_var::<f32, _, _>(&lookup, "GALLERIA_SENTINEL_MARGIN", |v| {
            v.is_finite() && *v >= 0.0
        }) {
            config.sentinel_margin_px = v;
        }
        if let Some(v) = parse_var::<f32, _, _>(&lookup, "GALLERIA_VIDEO_THRESHOLD", is_ratio) {
            config.video_threshold = v;
        }
        if let Some(ms) = parse_var::<u64, _, _>(&lookup, "GALLERIA_ICON_MS", |_| true) {
            config.icon_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _, _>(&lookup, "GALLERIA_SIMULATED_DELAY_MS", |_| true) {
            config.simulated_delay = Duration::from_millis(ms);
        }
        if let Some(mb) = parse_var::<usize, _, _>(&lookup, "GALLERIA_PREVIEW_CACHE_MB", |v| *v > 0)
        {
            config.preview_cache_bytes = mb.saturating_mul(1024 * 1024);
        }

        config
    }

    pub fn visibility_options(&self) -> VisibilityOptions {
        VisibilityOptions {
            entrance_threshold: self.entrance_threshold,
            sentinel_threshold: self.sentinel_threshold,
            sentinel_margin: self.sentinel_margin_px,
            video_threshold: self.video_threshold,
        }
    }
}

fn is_ratio(v: &f32) -> bool {
    (0.0..=1.0).contains(v)
}

fn parse_var<T, F, V>(lookup: &F, key: &str, valid: V) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => Some(value),
        _ => {
            warn!("Ignoring invalid {}={:?}; keeping default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GalleryConfig::from_lookup(|_| None);
        assert_eq!(config, GalleryConfig::default());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.icon_duration, Duration::from_millis(600));
        assert_eq!(config.breakpoints, Breakpoints { medium: 768, wide: 1024 });
        assert_eq!(config.simulated_delay, Duration::ZERO);
    }

    #[test]
    fn test_overrides() {
        let config = GalleryConfig::from_lookup(lookup(&[
            ("GALLERIA_PAGE_SIZE", "12"),
            ("GALLERIA_VIDEO_THRESHOLD", "0.75"),
            ("GALLERIA_SENTINEL_MARGIN", " 250 "),
            ("GALLERIA_SIMULATED_DELAY_MS", "500"),
        ]));
        assert_eq!(config.page_size, 12);
        assert_eq!(config.video_threshold, 0.75);
        assert_eq!(config.sentinel_margin_px, 250.0);
        assert_eq!(config.simulated_delay, Duration::from_millis(500));
        assert_eq!(config.visibility_options().sentinel_margin, 250.0);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = GalleryConfig::from_lookup(lookup(&[
            ("GALLERIA_PAGE_SIZE", "0"),
            ("GALLERIA_ENTRANCE_THRESHOLD", "1.5"),
            ("GALLERIA_ICON_MS", "soon"),
            ("GALLERIA_SENTINEL_MARGIN", "-10"),
        ]));
        assert_eq!(config, GalleryConfig::default());
    }
}
