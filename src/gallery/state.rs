//! The gallery view state: catalog → filter → shuffle → visible prefix →
//! masonry columns, plus the lightbox and per-video activation state.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::config::GalleryConfig;
use crate::gallery::filter::{filter, FilterKey};
use crate::gallery::lightbox::{caption, Lightbox, LightboxHost, LightboxKey};
use crate::gallery::pagination::{Footer, Pagination};
use crate::gallery::shuffle::ShuffleCache;
use crate::gallery::video::{
    autoplay_wanted, ActivationMap, ActivationStore, IconTicket, MediaElement, Placement,
    VideoActivationState, VideoCell,
};
use crate::gallery::visibility::{CellVisibility, Rect, VisibilityTracker};
use crate::layout::{CachedMasonry, MasonryLayout};
use crate::models::{Catalog, ColumnModel, MediaId, MediaItem};

/// Permission to reveal the next page, handed out by
/// [`Gallery::request_more`]. Tickets from before a filter change are void.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

pub struct Gallery {
    config: GalleryConfig,
    catalog: Catalog,
    filter: FilterKey,
    filtered: Vec<MediaItem>,
    shuffle: ShuffleCache,
    pagination: Pagination,
    broken: HashSet<MediaId>,
    prefix: Vec<MediaItem>,
    masonry: CachedMasonry,
    visibility: VisibilityTracker,
    lightbox: Lightbox,
    activations: ActivationMap,
    loading: bool,
    generation: u64,
}

impl Gallery {
    pub fn new(catalog: Catalog, config: GalleryConfig) -> Self {
        Self::with_shuffle(catalog, config, ShuffleCache::new())
    }

    pub fn with_shuffle(catalog: Catalog, config: GalleryConfig, shuffle: ShuffleCache) -> Self {
        let visibility = VisibilityTracker::new(config.visibility_options());
        let mut gallery = Self {
            pagination: Pagination::new(config.page_size),
            masonry: CachedMasonry::with_layout(MasonryLayout::new(config.breakpoints)),
            config,
            catalog,
            filter: FilterKey::All,
            filtered: Vec::new(),
            shuffle,
            broken: HashSet::new(),
            prefix: Vec::new(),
            visibility,
            lightbox: Lightbox::new(),
            activations: ActivationMap::new(),
            loading: false,
            generation: 0,
        };
        gallery.apply_filter();
        info!(
            items = gallery.catalog.len(),
            page_size = gallery.pagination.page_size(),
            "Gallery ready"
        );
        gallery
    }

    /// Switches to a host without intersection observation. The gallery stays
    /// on its first page.
    pub fn disable_observation(&mut self) {
        self.visibility = VisibilityTracker::unsupported(self.config.visibility_options());
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn filter_key(&self) -> &FilterKey {
        &self.filter
    }

    /// Changes the active category. Resets paging, visibility and the lightbox,
    /// and voids any outstanding [`LoadTicket`].
    ///
    /// # Returns
    /// `false` if `key` is already active.
    pub fn set_filter(&mut self, key: FilterKey) -> bool {
        if key == self.filter {
            return false;
        }
        debug!(from = %self.filter, to = %key, "Filter changed");
        self.filter = key;
        self.lightbox.close();
        self.visibility.reset();
        self.pagination.reset();
        self.loading = false;
        self.generation = self.generation.wrapping_add(1);
        self.apply_filter();
        true
    }

    fn apply_filter(&mut self) {
        self.filtered = filter(self.catalog.items(), &self.filter);

        let filtered_ids: HashSet<&MediaId> = self.filtered.iter().map(|item| &item.id).collect();
        self.activations.retain(|id| filtered_ids.contains(id));

        self.refresh_prefix();
    }

    fn refresh_prefix(&mut self) {
        let order = self.shuffle.order(&self.filter, &self.filtered);
        let shown = self.pagination.visible_len(order.len());
        self.prefix = materialise(order, shown, &self.broken);
    }

    /// The shuffled, filtered order in full.
    pub fn order(&self) -> &[MediaItem] {
        self.shuffle.current()
    }

    pub fn total(&self) -> usize {
        self.order().len()
    }

    /// Items currently on screen, in display order.
    pub fn visible_prefix(&self) -> &[MediaItem] {
        &self.prefix
    }

    pub fn item(&self, id: &MediaId) -> Option<&MediaItem> {
        self.prefix.iter().find(|item| &item.id == id)
    }

    pub fn index_of(&self, id: &MediaId) -> Option<usize> {
        self.prefix.iter().position(|item| &item.id == id)
    }

    pub fn column_count(&self, viewport_width: f32) -> u32 {
        self.masonry.layout.column_count(viewport_width)
    }

    /// Masonry columns for the visible prefix at `viewport_width`.
    pub fn columns(&self, viewport_width: f32) -> Vec<ColumnModel> {
        self.masonry
            .compute(&self.prefix, self.column_count(viewport_width))
    }

    pub fn has_more(&self) -> bool {
        !self.pagination.is_exhausted(self.total())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn footer(&self) -> Footer {
        if self.loading {
            Footer::Loading
        } else if self.has_more() {
            Footer::ScrollForMore
        } else {
            Footer::AllLoaded {
                shown: self.prefix.len(),
                total: self.total(),
            }
        }
    }

    /// Reports the sentinel's geometry; starts a load when it is in range.
    pub fn observe_sentinel(&mut self, sentinel: &Rect, viewport: &Rect) -> Option<LoadTicket> {
        if self.visibility.observe_sentinel(sentinel, viewport) {
            self.request_more()
        } else {
            None
        }
    }

    /// Starts revealing the next page unless one is already loading or the
    /// order is exhausted.
    pub fn request_more(&mut self) -> Option<LoadTicket> {
        if self.loading || !self.has_more() {
            return None;
        }
        self.loading = true;
        Some(LoadTicket {
            generation: self.generation,
        })
    }

    /// Reveals the page a ticket was issued for.
    ///
    /// # Returns
    /// `true` if the prefix grew. Stale tickets change nothing.
    pub fn complete_load(&mut self, ticket: LoadTicket) -> bool {
        if ticket.generation != self.generation {
            debug!("Dropping load ticket from a previous filter");
            return false;
        }
        self.loading = false;
        let total = self.total();
        if !self.pagination.advance(total) {
            return false;
        }
        self.refresh_prefix();
        debug!(shown = self.pagination.shown(), total, "Page advanced");
        true
    }

    /// Request and complete in one step.
    pub fn load_more(&mut self) -> bool {
        match self.request_more() {
            Some(ticket) => self.complete_load(ticket),
            None => false,
        }
    }

    /// Hides media that failed to load. It stays in the catalog.
    ///
    /// # Returns
    /// `false` if it was already hidden.
    pub fn mark_broken(&mut self, id: &MediaId) -> bool {
        if !self.broken.insert(id.clone()) {
            return false;
        }
        debug!(%id, "Media marked broken");
        self.visibility.forget_cell(id);
        self.refresh_prefix();
        self.lightbox.fit(self.prefix.len());
        true
    }

    pub fn is_broken(&self, id: &MediaId) -> bool {
        self.broken.contains(id)
    }

    /// Reports a mounted cell's geometry.
    pub fn observe_cell(&mut self, id: &MediaId, target: &Rect, viewport: &Rect) -> CellVisibility {
        let is_video = self.item(id).is_some_and(MediaItem::is_video);
        self.visibility.observe_cell(id, is_video, target, viewport)
    }

    pub fn forget_cell(&mut self, id: &MediaId) {
        self.visibility.forget_cell(id);
    }

    pub fn is_cell_visible(&self, id: &MediaId) -> bool {
        self.visibility.is_visible(id)
    }

    pub fn set_lightbox_host(&mut self, host: Box<dyn LightboxHost>) {
        self.lightbox.set_host(host);
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    pub fn open_lightbox(&mut self, index: usize) -> bool {
        self.lightbox.open(index, self.prefix.len())
    }

    /// Grid click on an image cell.
    pub fn open_lightbox_at(&mut self, id: &MediaId) -> bool {
        match self.index_of(id) {
            Some(index) => self.open_lightbox(index),
            None => false,
        }
    }

    pub fn close_lightbox(&mut self) -> bool {
        self.lightbox.close()
    }

    pub fn lightbox_next(&mut self) -> Option<usize> {
        self.lightbox.next(self.prefix.len())
    }

    pub fn lightbox_prev(&mut self) -> Option<usize> {
        self.lightbox.prev(self.prefix.len())
    }

    pub fn handle_key(&mut self, key: LightboxKey) -> bool {
        self.lightbox.handle_key(key, self.prefix.len())
    }

    /// Item the lightbox shows. An index stranded by a shrunken prefix folds
    /// back into range.
    pub fn lightbox_item(&self) -> Option<&MediaItem> {
        let index = self.lightbox.index()?;
        if self.prefix.is_empty() {
            return None;
        }
        self.prefix.get(index % self.prefix.len())
    }

    pub fn caption(&self) -> Option<String> {
        if self.lightbox.is_open() {
            caption(&self.filter)
        } else {
            None
        }
    }

    pub fn activation(&self, id: &MediaId) -> VideoActivationState {
        self.activations.state(id)
    }

    pub fn video_cell(&self, id: &MediaId, placement: Placement) -> VideoCell {
        VideoCell::new(id.clone(), placement).with_icon_duration(self.config.icon_duration)
    }

    pub fn video_playback_wanted(&self, id: &MediaId, placement: Placement) -> bool {
        autoplay_wanted(
            placement,
            self.visibility.is_autoplay_eligible(id),
            self.lightbox.is_open(),
        )
    }

    /// Single click on a video.
    pub fn video_clicked<E>(&mut self, id: &MediaId, placement: Placement, element: &mut E) -> IconTicket
    where
        E: MediaElement + ?Sized,
    {
        self.video_cell(id, placement)
            .toggle_play(&mut self.activations, element)
    }

    /// The centre icon's delay elapsed.
    pub fn video_icon_elapsed(&mut self, ticket: &IconTicket) -> bool {
        self.video_cell(&ticket.id, Placement::Grid)
            .hide_icon(&mut self.activations, ticket)
    }

    pub fn video_mute_clicked<E>(&mut self, id: &MediaId, element: &mut E) -> bool
    where
        E: MediaElement + ?Sized,
    {
        self.video_cell(id, Placement::Grid)
            .toggle_mute(&mut self.activations, element)
    }

    /// Double click on a grid video opens it in the lightbox.
    pub fn video_double_clicked(&mut self, id: &MediaId) -> bool {
        self.open_lightbox_at(id)
    }

    /// Brings one video element in line with eligibility and the lightbox.
    pub fn apply_video_activation<E>(&mut self, id: &MediaId, placement: Placement, element: &mut E) -> bool
    where
        E: MediaElement + ?Sized,
    {
        let eligible = self.visibility.is_autoplay_eligible(id);
        let lightbox_open = self.lightbox.is_open();
        self.video_cell(id, placement)
            .apply_activation(&mut self.activations, element, eligible, lightbox_open)
    }

    /// Play/pause notification from a video element.
    pub fn video_element_changed(&mut self, id: &MediaId, playing: bool) {
        self.video_cell(id, Placement::Grid)
            .sync_from_element(&mut self.activations, playing);
    }

    /// Tears down observers and the lightbox session.
    ///
    /// # Returns
    /// `true` the first time only.
    pub fn dispose(&mut self) -> bool {
        self.lightbox.close();
        self.visibility.dispose()
    }
}

/// Leading `shown` items of `order`, skipping broken media and ids already
/// taken.
fn materialise(order: &[MediaItem], shown: usize, broken: &HashSet<MediaId>) -> Vec<MediaItem> {
    let mut seen = HashSet::with_capacity(shown);
    order
        .iter()
        .take(shown)
        .filter(|item| !broken.contains(&item.id))
        .filter(|item| seen.insert(item.id.clone()))
        .cloned()
        .collect()
}
