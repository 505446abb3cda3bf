//! Play, mute and overlay-icon state for video cells.
//!
//! The gallery owns one [`ActivationMap`] shared by every grid cell and the
//! lightbox. A cell rendered on its own (no gallery around it) keeps a
//! [`LocalActivation`] instead; the cell logic is the same for both through
//! [`ActivationStore`].

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use crate::models::MediaId;

/// How long the centre play/pause glyph stays up after a click.
pub const DEFAULT_ICON_DURATION: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoActivationState {
    pub is_playing: bool,
    pub is_muted: bool,
    pub transient_icon_visible: bool,
    icon_generation: u64,
}

impl Default for VideoActivationState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_muted: true,
            transient_icon_visible: false,
            icon_generation: 0,
        }
    }
}

/// Fields to overwrite on one entry. `None` leaves the field alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationPatch {
    pub is_playing: Option<bool>,
    pub is_muted: Option<bool>,
    pub transient_icon_visible: Option<bool>,
}

impl ActivationPatch {
    pub fn playing(is_playing: bool) -> Self {
        Self {
            is_playing: Some(is_playing),
            ..Self::default()
        }
    }

    pub fn muted(is_muted: bool) -> Self {
        Self {
            is_muted: Some(is_muted),
            ..Self::default()
        }
    }

    fn apply(&self, state: &mut VideoActivationState) {
        if let Some(is_playing) = self.is_playing {
            state.is_playing = is_playing;
        }
        if let Some(is_muted) = self.is_muted {
            state.is_muted = is_muted;
        }
        if let Some(visible) = self.transient_icon_visible {
            state.transient_icon_visible = visible;
        }
    }
}

/// Where a video cell reads and writes its activation state.
pub trait ActivationStore {
    /// Current state of `id`, or the default for an unseen video.
    fn state(&self, id: &MediaId) -> VideoActivationState;

    /// Read-modify-write of a single entry.
    fn update<F>(&mut self, id: &MediaId, f: F) -> VideoActivationState
    where
        F: FnOnce(&mut VideoActivationState);

    fn patch(&mut self, id: &MediaId, patch: ActivationPatch) -> VideoActivationState {
        self.update(id, |state| patch.apply(state))
    }
}

/// Activation state of every video the gallery has shown, keyed by id.
#[derive(Debug, Default)]
pub struct ActivationMap {
    states: HashMap<MediaId, VideoActivationState>,
}

impl ActivationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.states.contains_key(id)
    }

    /// Drops entries whose id fails `keep`. Stale entries are harmless; this
    /// only bounds memory after filter changes.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&MediaId) -> bool,
    {
        self.states.retain(|id, _| keep(id));
    }
}

impl ActivationStore for ActivationMap {
    fn state(&self, id: &MediaId) -> VideoActivationState {
        self.states.get(id).copied().unwrap_or_default()
    }

    fn update<F>(&mut self, id: &MediaId, f: F) -> VideoActivationState
    where
        F: FnOnce(&mut VideoActivationState),
    {
        let state = self.states.entry(id.clone()).or_default();
        f(state);
        *state
    }
}

/// Fallback store for a cell used without a gallery.
#[derive(Debug, Default)]
pub struct LocalActivation {
    state: VideoActivationState,
}

impl LocalActivation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivationStore for LocalActivation {
    fn state(&self, _id: &MediaId) -> VideoActivationState {
        self.state
    }

    fn update<F>(&mut self, _id: &MediaId, f: F) -> VideoActivationState
    where
        F: FnOnce(&mut VideoActivationState),
    {
        f(&mut self.state);
        self.state
    }
}

/// Playback surface of a video cell.
pub trait MediaElement {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Grid,
    Lightbox,
}

/// Whether a video in `placement` should be playing right now.
///
/// Grid videos play while majority-visible and no lightbox is open. The
/// lightbox instance always plays.
pub fn autoplay_wanted(placement: Placement, eligible: bool, lightbox_open: bool) -> bool {
    match placement {
        Placement::Grid => eligible && !lightbox_open,
        Placement::Lightbox => true,
    }
}

/// Handed out when the centre icon is shown; redeem it once the icon
/// duration has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconTicket {
    pub id: MediaId,
    pub delay: Duration,
    generation: u64,
}

/// Per-cell video logic. Holds no activation state of its own.
#[derive(Debug, Clone)]
pub struct VideoCell {
    id: MediaId,
    placement: Placement,
    icon_duration: Duration,
}

impl VideoCell {
    pub fn new(id: MediaId, placement: Placement) -> Self {
        Self {
            id,
            placement,
            icon_duration: DEFAULT_ICON_DURATION,
        }
    }

    pub fn with_icon_duration(mut self, icon_duration: Duration) -> Self {
        self.icon_duration = icon_duration;
        self
    }

    pub fn id(&self) -> &MediaId {
        &self.id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Single click: flips play/pause and shows the centre icon.
    pub fn toggle_play<S, E>(&self, store: &mut S, element: &mut E) -> IconTicket
    where
        S: ActivationStore,
        E: MediaElement + ?Sized,
    {
        let playing = !store.state(&self.id).is_playing;
        if playing {
            element.play();
        } else {
            element.pause();
        }

        let state = store.update(&self.id, |state| {
            state.is_playing = playing;
            state.transient_icon_visible = true;
            state.icon_generation = state.icon_generation.wrapping_add(1);
        });
        trace!(id = %self.id, playing, "Toggled video playback");

        IconTicket {
            id: self.id.clone(),
            delay: self.icon_duration,
            generation: state.icon_generation,
        }
    }

    /// Hides the centre icon unless a later click re-armed it.
    ///
    /// # Returns
    /// `true` if the icon was hidden.
    pub fn hide_icon<S: ActivationStore>(&self, store: &mut S, ticket: &IconTicket) -> bool {
        if ticket.id != self.id {
            return false;
        }
        let mut hidden = false;
        store.update(&self.id, |state| {
            if state.icon_generation == ticket.generation && state.transient_icon_visible {
                state.transient_icon_visible = false;
                hidden = true;
            }
        });
        hidden
    }

    /// Flips mute on the element and records the element's resulting value.
    pub fn toggle_mute<S, E>(&self, store: &mut S, element: &mut E) -> bool
    where
        S: ActivationStore,
        E: MediaElement + ?Sized,
    {
        element.set_muted(!element.is_muted());
        let muted = element.is_muted();
        store.patch(&self.id, ActivationPatch::muted(muted));
        muted
    }

    /// Starts or stops the element to match viewport eligibility and the
    /// lightbox. Also pushes the stored mute flag onto the element.
    ///
    /// # Returns
    /// Whether the element is playing afterwards.
    pub fn apply_activation<S, E>(
        &self,
        store: &mut S,
        element: &mut E,
        eligible: bool,
        lightbox_open: bool,
    ) -> bool
    where
        S: ActivationStore,
        E: MediaElement + ?Sized,
    {
        let state = store.state(&self.id);
        if element.is_muted() != state.is_muted {
            element.set_muted(state.is_muted);
        }

        let wanted = autoplay_wanted(self.placement, eligible, lightbox_open);
        if wanted && element.is_paused() {
            element.play();
        } else if !wanted && !element.is_paused() {
            element.pause();
        }

        let playing = !element.is_paused();
        if playing != state.is_playing {
            store.patch(&self.id, ActivationPatch::playing(playing));
        }
        playing
    }

    /// Play/pause notifications from the element overwrite `is_playing`.
    pub fn sync_from_element<S: ActivationStore>(&self, store: &mut S, playing: bool) {
        store.patch(&self.id, ActivationPatch::playing(playing));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory element that records calls.
    #[derive(Debug)]
    pub(crate) struct FakeElement {
        pub paused: bool,
        pub muted: bool,
        pub plays: u32,
        pub pauses: u32,
    }

    impl Default for FakeElement {
        fn default() -> Self {
            Self {
                paused: true,
                muted: true,
                plays: 0,
                pauses: 0,
            }
        }
    }

    impl MediaElement for FakeElement {
        fn play(&mut self) {
            self.paused = false;
            self.plays += 1;
        }

        fn pause(&mut self) {
            self.paused = true;
            self.pauses += 1;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        fn is_muted(&self) -> bool {
            self.muted
        }
    }

    #[test]
    fn test_defaults_muted_and_paused() {
        let state = VideoActivationState::default();
        assert!(!state.is_playing);
        assert!(state.is_muted);
        assert!(!state.transient_icon_visible);
    }

    #[test]
    fn test_click_toggles_and_icon_expires() {
        let mut map = ActivationMap::new();
        let mut element = FakeElement::default();
        let cell = VideoCell::new(MediaId::from(7), Placement::Grid);

        let ticket = cell.toggle_play(&mut map, &mut element);
        let state = map.state(&MediaId::from(7));
        assert!(state.is_playing);
        assert!(state.transient_icon_visible);
        assert!(state.is_muted);
        assert_eq!(ticket.delay, Duration::from_millis(600));

        assert!(cell.hide_icon(&mut map, &ticket));
        let state = map.state(&MediaId::from(7));
        assert!(!state.transient_icon_visible);
        assert!(state.is_playing);
        assert!(state.is_muted);

        let ticket = cell.toggle_play(&mut map, &mut element);
        assert!(!map.state(&MediaId::from(7)).is_playing);
        assert!(element.paused);
        assert!(cell.hide_icon(&mut map, &ticket));
    }

    #[test]
    fn test_stale_icon_ticket_is_ignored() {
        let mut map = ActivationMap::new();
        let mut element = FakeElement::default();
        let cell = VideoCell::new(MediaId::from(1), Placement::Grid);

        let first = cell.toggle_play(&mut map, &mut element);
        let second = cell.toggle_play(&mut map, &mut element);
        assert!(!cell.hide_icon(&mut map, &first));
        assert!(map.state(cell.id()).transient_icon_visible);
        assert!(cell.hide_icon(&mut map, &second));
        assert!(!cell.hide_icon(&mut map, &second));
    }

    #[test]
    fn test_mute_independent_of_play() {
        let mut map = ActivationMap::new();
        let mut element = FakeElement::default();
        let cell = VideoCell::new(MediaId::from(2), Placement::Grid);

        assert!(!cell.toggle_mute(&mut map, &mut element));
        let state = map.state(cell.id());
        assert!(!state.is_muted);
        assert!(!state.is_playing);
        assert_eq!(element.plays, 0);
    }

    #[test]
    fn test_patch_preserves_other_entries() {
        let mut map = ActivationMap::new();
        map.patch(&MediaId::from(1), ActivationPatch::playing(true));
        map.patch(&MediaId::from(2), ActivationPatch::muted(false));
        map.patch(&MediaId::from(1), ActivationPatch::muted(false));

        let one = map.state(&MediaId::from(1));
        assert!(one.is_playing && !one.is_muted);
        let two = map.state(&MediaId::from(2));
        assert!(!two.is_playing && !two.is_muted);
        assert_eq!(map.len(), 2);

        map.retain(|id| id.as_str() == "2");
        assert!(!map.contains(&MediaId::from(1)));
    }

    #[test]
    fn test_grid_autoplay_follows_eligibility_and_lightbox() {
        let mut map = ActivationMap::new();
        let mut element = FakeElement::default();
        let cell = VideoCell::new(MediaId::from(3), Placement::Grid);

        assert!(cell.apply_activation(&mut map, &mut element, true, false));
        assert!(map.state(cell.id()).is_playing);

        // Lightbox opens: grid copy pauses even though still in view
        assert!(!cell.apply_activation(&mut map, &mut element, true, true));
        assert!(!map.state(cell.id()).is_playing);

        // Closed again: eligible once more
        assert!(cell.apply_activation(&mut map, &mut element, true, false));
        assert!(!cell.apply_activation(&mut map, &mut element, false, false));
        assert_eq!((element.plays, element.pauses), (2, 2));
    }

    #[test]
    fn test_lightbox_instance_always_plays() {
        assert!(autoplay_wanted(Placement::Lightbox, false, true));
        assert!(!autoplay_wanted(Placement::Grid, true, true));
    }

    #[test]
    fn test_activation_pushes_stored_mute() {
        let mut map = ActivationMap::new();
        map.patch(&MediaId::from(4), ActivationPatch::muted(false));
        let mut element = FakeElement::default();
        let cell = VideoCell::new(MediaId::from(4), Placement::Lightbox);
        cell.apply_activation(&mut map, &mut element, false, true);
        assert!(!element.muted);
        assert!(!element.paused);
    }

    #[test]
    fn test_local_fallback_and_element_sync() {
        let mut local = LocalActivation::new();
        let mut element = FakeElement::default();
        let cell = VideoCell::new(MediaId::from("standalone"), Placement::Grid);

        cell.toggle_play(&mut local, &mut element);
        assert!(local.state(cell.id()).is_playing);

        cell.sync_from_element(&mut local, false);
        assert!(!local.state(cell.id()).is_playing);
    }
}
