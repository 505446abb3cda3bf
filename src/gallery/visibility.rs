//! Viewport intersection tracking for grid cells and the load-more sentinel.
//!
//! The host reports geometry whenever it scrolls, resizes or lays out; the
//! trackers turn that into enter/exit transitions. Reporting the same geometry
//! twice never produces a second transition.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::{debug, trace, warn};

use crate::models::MediaId;

pub const DEFAULT_ENTRANCE_THRESHOLD: f32 = 0.2;
pub const DEFAULT_SENTINEL_THRESHOLD: f32 = 0.1;
pub const DEFAULT_SENTINEL_MARGIN_PX: f32 = 100.0;
pub const DEFAULT_VIDEO_THRESHOLD: f32 = 0.5;

/// Axis-aligned rectangle in the scrolled content's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grows the rectangle by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    /// Overlap of two rectangles. Touching edges count as an empty overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < x || bottom < y {
            return None;
        }
        Some(Rect::new(x, y, right - x, bottom - y))
    }
}

/// Fraction of `target` inside `root` grown by `root_margin`.
///
/// A zero-area target counts as fully visible while it lies within the root.
pub fn intersection_ratio(target: &Rect, root: &Rect, root_margin: f32) -> f32 {
    let root = root.expand(root_margin);
    let Some(overlap) = target.intersection(&root) else {
        return 0.0;
    };
    let area = target.area();
    if area <= 0.0 {
        return 1.0;
    }
    (overlap.area() / area).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    pub threshold: f32,
    pub root_margin: f32,
}

/// Edge-triggered intersection observer over keyed targets.
#[derive(Debug)]
pub struct IntersectionObserver<K> {
    options: ObserverOptions,
    inside: HashSet<K>,
    disposed: bool,
}

impl<K: Eq + Hash + Clone> IntersectionObserver<K> {
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            inside: HashSet::new(),
            disposed: false,
        }
    }

    pub fn options(&self) -> ObserverOptions {
        self.options
    }

    /// Feeds the current geometry of `key`.
    ///
    /// # Returns
    /// A transition only when the target crossed the threshold since the last
    /// report. Always `None` once disconnected.
    pub fn observe(&mut self, key: &K, target: &Rect, root: &Rect) -> Option<Transition> {
        if self.disposed {
            return None;
        }
        let ratio = intersection_ratio(target, root, self.options.root_margin);
        let intersecting = ratio > 0.0 && ratio >= self.options.threshold;
        let was_inside = self.inside.contains(key);

        match (intersecting, was_inside) {
            (true, false) => {
                self.inside.insert(key.clone());
                Some(Transition::Entered)
            }
            (false, true) => {
                self.inside.remove(key);
                Some(Transition::Exited)
            }
            _ => None,
        }
    }

    pub fn is_inside(&self, key: &K) -> bool {
        self.inside.contains(key)
    }

    pub fn unobserve(&mut self, key: &K) {
        self.inside.remove(key);
    }

    pub fn clear(&mut self) {
        self.inside.clear();
    }

    /// Stops observing everything.
    ///
    /// # Returns
    /// `true` the first time only.
    pub fn disconnect(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.inside.clear();
        true
    }

    pub fn is_disconnected(&self) -> bool {
        self.disposed
    }
}

/// Thresholds and margins for the three observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityOptions {
    pub entrance_threshold: f32,
    pub sentinel_threshold: f32,
    pub sentinel_margin: f32,
    pub video_threshold: f32,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            entrance_threshold: DEFAULT_ENTRANCE_THRESHOLD,
            sentinel_threshold: DEFAULT_SENTINEL_THRESHOLD,
            sentinel_margin: DEFAULT_SENTINEL_MARGIN_PX,
            video_threshold: DEFAULT_VIDEO_THRESHOLD,
        }
    }
}

/// Transitions produced by one cell geometry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellVisibility {
    pub entrance: Option<Transition>,
    pub autoplay: Option<Transition>,
}

/// The entrance, sentinel and video-eligibility observations together.
///
/// When the host cannot observe intersections the tracker runs in a degraded
/// mode: cells render as already visible, videos never autoplay and the
/// sentinel never fires, so the gallery stays on its first page.
#[derive(Debug)]
pub struct VisibilityTracker {
    entrance: IntersectionObserver<MediaId>,
    video: IntersectionObserver<MediaId>,
    sentinel: Option<IntersectionObserver<()>>,
    sentinel_inside: bool,
    supported: bool,
}

impl VisibilityTracker {
    pub fn new(options: VisibilityOptions) -> Self {
        Self {
            entrance: IntersectionObserver::new(ObserverOptions {
                threshold: options.entrance_threshold,
                root_margin: 0.0,
            }),
            video: IntersectionObserver::new(ObserverOptions {
                threshold: options.video_threshold,
                root_margin: 0.0,
            }),
            sentinel: Some(IntersectionObserver::new(ObserverOptions {
                threshold: options.sentinel_threshold,
                root_margin: options.sentinel_margin,
            })),
            sentinel_inside: false,
            supported: true,
        }
    }

    /// Degraded tracker for hosts without intersection observation.
    pub fn unsupported(options: VisibilityOptions) -> Self {
        warn!("Intersection observation unavailable; pagination stays on the first page");
        let mut tracker = Self::new(options);
        tracker.sentinel = None;
        tracker.supported = false;
        tracker
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Reports a mounted cell's geometry. Video eligibility is only tracked
    /// when `is_video` is set.
    pub fn observe_cell(
        &mut self,
        id: &MediaId,
        is_video: bool,
        target: &Rect,
        viewport: &Rect,
    ) -> CellVisibility {
        if !self.supported {
            return CellVisibility::default();
        }
        let entrance = self.entrance.observe(id, target, viewport);
        let autoplay = if is_video {
            self.video.observe(id, target, viewport)
        } else {
            None
        };
        if entrance.is_some() || autoplay.is_some() {
            trace!(%id, ?entrance, ?autoplay, "Cell visibility changed");
        }
        CellVisibility { entrance, autoplay }
    }

    /// Forgets an unmounted cell so a remount animates in again.
    pub fn forget_cell(&mut self, id: &MediaId) {
        self.entrance.unobserve(id);
        self.video.unobserve(id);
    }

    /// Whether the entrance animation has played for `id`.
    pub fn is_visible(&self, id: &MediaId) -> bool {
        !self.supported || self.entrance.is_inside(id)
    }

    /// Whether a video is majority-visible and may autoplay.
    pub fn is_autoplay_eligible(&self, id: &MediaId) -> bool {
        self.supported && self.video.is_inside(id)
    }

    /// Reports the sentinel's geometry.
    ///
    /// # Returns
    /// Whether the sentinel currently lies within the pre-trigger region.
    pub fn observe_sentinel(&mut self, target: &Rect, viewport: &Rect) -> bool {
        let Some(sentinel) = self.sentinel.as_mut() else {
            return false;
        };
        match sentinel.observe(&(), target, viewport) {
            Some(Transition::Entered) => {
                debug!("Load-more sentinel entered");
                self.sentinel_inside = true;
            }
            Some(Transition::Exited) => self.sentinel_inside = false,
            None => {}
        }
        self.sentinel_inside
    }

    pub fn sentinel_in_range(&self) -> bool {
        self.sentinel_inside
    }

    /// Drops all per-cell state; the next geometry reports start fresh.
    pub fn reset(&mut self) {
        self.entrance.clear();
        self.video.clear();
        if let Some(sentinel) = self.sentinel.as_mut() {
            sentinel.clear();
        }
        self.sentinel_inside = false;
    }

    /// Disconnects every observer.
    ///
    /// # Returns
    /// `true` the first time only.
    pub fn dispose(&mut self) -> bool {
        let entrance = self.entrance.disconnect();
        let video = self.video.disconnect();
        let sentinel = self
            .sentinel
            .as_mut()
            .map(IntersectionObserver::disconnect)
            .unwrap_or(false);
        self.sentinel_inside = false;
        entrance || video || sentinel
    }
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new(VisibilityOptions::default())
    }
}

/// Per-item handles (widgets, media controllers) for mounted cells.
#[derive(Debug)]
pub struct CellRegistry<H> {
    handles: HashMap<MediaId, H>,
}

impl<H> CellRegistry<H> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Registers a handle on mount, returning any handle it replaced.
    pub fn register(&mut self, id: MediaId, handle: H) -> Option<H> {
        self.handles.insert(id, handle)
    }

    pub fn unregister(&mut self, id: &MediaId) -> Option<H> {
        self.handles.remove(id)
    }

    pub fn get(&self, id: &MediaId) -> Option<&H> {
        self.handles.get(id)
    }

    pub fn get_mut(&mut self, id: &MediaId) -> Option<&mut H> {
        self.handles.get_mut(id)
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.handles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MediaId, &H)> {
        self.handles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&MediaId, &mut H)> {
        self.handles.iter_mut()
    }

    /// Unregisters every handle, returning them for teardown.
    pub fn drain(&mut self) -> Vec<(MediaId, H)> {
        self.handles.drain().collect()
    }
}

impl<H> Default for CellRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
    };

    fn cell_at(y: f32) -> Rect {
        Rect::new(0.0, y, 200.0, 100.0)
    }

    #[test]
    fn test_intersection_ratio() {
        assert_eq!(intersection_ratio(&cell_at(0.0), &VIEWPORT, 0.0), 1.0);
        assert_eq!(intersection_ratio(&cell_at(550.0), &VIEWPORT, 0.0), 0.5);
        assert_eq!(intersection_ratio(&cell_at(700.0), &VIEWPORT, 0.0), 0.0);
        // The margin pulls a target below the fold into range.
        assert_eq!(intersection_ratio(&cell_at(650.0), &VIEWPORT, 100.0), 0.5);
    }

    #[test]
    fn test_zero_area_target() {
        let marker = Rect::new(0.0, 590.0, 800.0, 0.0);
        assert_eq!(intersection_ratio(&marker, &VIEWPORT, 0.0), 1.0);
        let below = Rect::new(0.0, 650.0, 800.0, 0.0);
        assert_eq!(intersection_ratio(&below, &VIEWPORT, 0.0), 0.0);
        assert_eq!(intersection_ratio(&below, &VIEWPORT, 100.0), 1.0);
    }

    #[test]
    fn test_observer_is_idempotent() {
        let mut observer = IntersectionObserver::new(ObserverOptions {
            threshold: 0.2,
            root_margin: 0.0,
        });
        let id = MediaId::from(1);

        assert_eq!(
            observer.observe(&id, &cell_at(100.0), &VIEWPORT),
            Some(Transition::Entered)
        );
        assert_eq!(observer.observe(&id, &cell_at(100.0), &VIEWPORT), None);
        assert_eq!(observer.observe(&id, &cell_at(120.0), &VIEWPORT), None);
        assert_eq!(
            observer.observe(&id, &cell_at(590.0), &VIEWPORT),
            Some(Transition::Exited)
        );
        assert_eq!(observer.observe(&id, &cell_at(590.0), &VIEWPORT), None);
        // Re-entry replays
        assert_eq!(
            observer.observe(&id, &cell_at(0.0), &VIEWPORT),
            Some(Transition::Entered)
        );
    }

    #[test]
    fn test_disconnect_once() {
        let mut observer: IntersectionObserver<MediaId> = IntersectionObserver::new(ObserverOptions {
            threshold: 0.5,
            root_margin: 0.0,
        });
        assert!(observer.disconnect());
        assert!(!observer.disconnect());
        assert_eq!(observer.observe(&MediaId::from(1), &cell_at(0.0), &VIEWPORT), None);
    }

    #[test]
    fn test_video_needs_majority() {
        let mut tracker = VisibilityTracker::default();
        let id = MediaId::from(7);

        // 30% visible: entrance fires, autoplay does not
        let seen = tracker.observe_cell(&id, true, &cell_at(570.0), &VIEWPORT);
        assert_eq!(seen.entrance, Some(Transition::Entered));
        assert_eq!(seen.autoplay, None);
        assert!(!tracker.is_autoplay_eligible(&id));

        let seen = tracker.observe_cell(&id, true, &cell_at(400.0), &VIEWPORT);
        assert_eq!(seen.entrance, None);
        assert_eq!(seen.autoplay, Some(Transition::Entered));
        assert!(tracker.is_autoplay_eligible(&id));

        tracker.forget_cell(&id);
        assert!(!tracker.is_visible(&id));
        assert!(!tracker.is_autoplay_eligible(&id));
    }

    #[test]
    fn test_images_never_become_autoplay_eligible() {
        let mut tracker = VisibilityTracker::default();
        let id = MediaId::from(1);
        let seen = tracker.observe_cell(&id, false, &cell_at(0.0), &VIEWPORT);
        assert_eq!(seen.autoplay, None);
        assert!(tracker.is_visible(&id));
        assert!(!tracker.is_autoplay_eligible(&id));
    }

    #[test]
    fn test_sentinel_pre_triggers_within_margin() {
        let mut tracker = VisibilityTracker::default();
        let sentinel = Rect::new(0.0, 650.0, 800.0, 20.0);
        assert!(tracker.observe_sentinel(&sentinel, &VIEWPORT));
        assert!(tracker.observe_sentinel(&sentinel, &VIEWPORT));

        let far = Rect::new(0.0, 2000.0, 800.0, 20.0);
        assert!(!tracker.observe_sentinel(&far, &VIEWPORT));
    }

    #[test]
    fn test_unsupported_degrades() {
        let mut tracker = VisibilityTracker::unsupported(VisibilityOptions::default());
        let id = MediaId::from(3);
        assert!(!tracker.observe_sentinel(&cell_at(0.0), &VIEWPORT));
        assert_eq!(
            tracker.observe_cell(&id, true, &cell_at(0.0), &VIEWPORT),
            CellVisibility::default()
        );
        assert!(tracker.is_visible(&id));
        assert!(!tracker.is_autoplay_eligible(&id));
    }

    #[test]
    fn test_dispose_exactly_once() {
        let mut tracker = VisibilityTracker::default();
        assert!(tracker.dispose());
        assert!(!tracker.dispose());
        assert!(!tracker.observe_sentinel(&cell_at(0.0), &VIEWPORT));
    }

    #[test]
    fn test_registry_lifecycle() {
        let mut registry = CellRegistry::new();
        let id = MediaId::from(4);
        assert!(registry.register(id.clone(), "first").is_none());
        assert_eq!(registry.register(id.clone(), "second"), Some("first"));
        assert_eq!(registry.get(&id), Some(&"second"));
        assert_eq!(registry.unregister(&id), Some("second"));
        assert!(registry.is_empty());
    }
}
