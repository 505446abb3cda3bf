//! One grid or lightbox tile: an image preview or a looping video with its
//! mute toggle and transient play/pause glyph.

use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    gio, glib, Align, Button, ContentFit, EventSequenceState, GestureClick, Label, MediaFile,
    Overflow, Overlay, Picture,
};

use crate::gallery::{MediaElement, Placement, VideoActivationState};
use crate::models::{MediaId, MediaItem, MediaSource};
use crate::ui::preview_loader::PreviewLoader;

const GLYPH_PLAY: &str = "▶";
const GLYPH_PAUSE: &str = "⏸";
const GLYPH_MUTED: &str = "🔇";
const GLYPH_UNMUTED: &str = "🔊";

/// What a cell reports back to its window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEvent {
    /// Click on an image in the grid.
    Activated(MediaId),
    /// The media failed to load.
    Broken(MediaId),
    VideoClicked(MediaId, Placement),
    VideoDoubleClicked(MediaId),
    MuteClicked(MediaId, Placement),
    /// The stream started or stopped on its own or through us.
    PlaybackChanged(MediaId, bool),
}

pub type CellEvents = Rc<dyn Fn(CellEvent)>;

/// [`MediaElement`] over a GTK media stream.
#[derive(Clone)]
pub struct StreamElement(MediaFile);

impl MediaElement for StreamElement {
    fn play(&mut self) {
        self.0.play();
    }

    fn pause(&mut self) {
        self.0.pause();
    }

    fn is_paused(&self) -> bool {
        !self.0.is_playing()
    }

    fn set_muted(&mut self, muted: bool) {
        self.0.set_muted(muted);
    }

    fn is_muted(&self) -> bool {
        self.0.is_muted()
    }
}

struct VideoParts {
    media: MediaFile,
    poster: Picture,
    center_icon: Label,
    mute_button: Button,
}

pub struct MediaCell {
    id: MediaId,
    placement: Placement,
    root: Overlay,
    video: Option<VideoParts>,
}

impl MediaCell {
    pub fn new(
        item: &MediaItem,
        placement: Placement,
        previews: &Rc<PreviewLoader>,
        events: CellEvents,
    ) -> Rc<Self> {
        let root = Overlay::new();
        root.add_css_class("media-cell");
        root.set_overflow(Overflow::Hidden);

        let picture = Picture::new();
        picture.set_can_shrink(true);
        root.set_child(Some(&picture));

        match placement {
            Placement::Grid => {
                picture.set_content_fit(ContentFit::Cover);
                root.set_size_request(-1, item.display_height_px() as i32);
            }
            Placement::Lightbox => {
                picture.set_content_fit(ContentFit::Contain);
                root.set_hexpand(true);
                root.set_vexpand(true);
                root.add_css_class("entered");
            }
        }

        let video = if item.is_video() {
            Some(build_video(item, placement, &root, &picture, previews, &events))
        } else {
            load_image(item, placement, &picture, previews, &events);
            None
        };

        attach_gestures(&root, item.id.clone(), item.is_video(), placement, &events);

        Rc::new(Self {
            id: item.id.clone(),
            placement,
            root,
            video,
        })
    }

    pub fn id(&self) -> &MediaId {
        &self.id
    }

    pub fn widget(&self) -> &Overlay {
        &self.root
    }

    pub fn is_video(&self) -> bool {
        self.video.is_some()
    }

    /// Playback handle for video cells.
    pub fn element(&self) -> Option<StreamElement> {
        self.video.as_ref().map(|v| StreamElement(v.media.clone()))
    }

    pub fn set_entered(&self, entered: bool) {
        if entered {
            self.root.add_css_class("entered");
        } else if self.placement == Placement::Grid {
            self.root.remove_css_class("entered");
        }
    }

    /// Redraws the mute toggle, centre glyph and poster from `state`.
    pub fn render_activation(&self, state: &VideoActivationState) {
        let Some(video) = &self.video else {
            return;
        };
        video
            .mute_button
            .set_label(if state.is_muted { GLYPH_MUTED } else { GLYPH_UNMUTED });
        video
            .center_icon
            .set_label(if state.is_playing { GLYPH_PAUSE } else { GLYPH_PLAY });
        video.center_icon.set_visible(state.transient_icon_visible);
        video
            .poster
            .set_visible(!state.is_playing && video.media.timestamp() == 0);
    }

    /// Stops playback before the cell is dropped.
    pub fn teardown(&self) {
        if let Some(video) = &self.video {
            video.media.pause();
        }
    }
}

fn load_image(
    item: &MediaItem,
    placement: Placement,
    picture: &Picture,
    previews: &Rc<PreviewLoader>,
    events: &CellEvents,
) {
    let id = item.id.clone();
    match (&item.src, placement) {
        (MediaSource::Path(path), Placement::Grid) => {
            let picture_weak = picture.downgrade();
            let events = events.clone();
            previews.request(path, move |texture| match texture {
                Some(texture) => {
                    if let Some(picture) = picture_weak.upgrade() {
                        picture.set_paintable(Some(texture));
                    }
                }
                None => events(CellEvent::Broken(id)),
            });
        }
        (MediaSource::Path(path), Placement::Lightbox) => {
            picture.set_filename(Some(path));
            report_if_empty(picture, id, events);
        }
        (MediaSource::Uri(uri), _) => {
            picture.set_file(Some(&gio::File::for_uri(uri)));
            report_if_empty(picture, id, events);
        }
    }
}

/// Picture loads synchronously; no paintable afterwards means it failed.
fn report_if_empty(picture: &Picture, id: MediaId, events: &CellEvents) {
    if picture.paintable().is_some() {
        return;
    }
    let events = events.clone();
    glib::idle_add_local_once(move || events(CellEvent::Broken(id)));
}

fn build_video(
    item: &MediaItem,
    placement: Placement,
    root: &Overlay,
    picture: &Picture,
    previews: &Rc<PreviewLoader>,
    events: &CellEvents,
) -> VideoParts {
    let media = match &item.src {
        MediaSource::Path(path) => MediaFile::for_filename(path),
        MediaSource::Uri(uri) => MediaFile::for_file(&gio::File::for_uri(uri)),
    };
    media.set_loop(true);
    media.set_muted(true);
    picture.set_paintable(Some(&media));

    let poster = Picture::new();
    poster.set_can_shrink(true);
    poster.set_can_target(false);
    poster.set_content_fit(match placement {
        Placement::Grid => ContentFit::Cover,
        Placement::Lightbox => ContentFit::Contain,
    });
    match &item.poster {
        Some(MediaSource::Path(path)) => {
            let poster_weak = poster.downgrade();
            previews.request(path, move |texture| {
                if let (Some(poster), Some(texture)) = (poster_weak.upgrade(), texture) {
                    poster.set_paintable(Some(texture));
                }
            });
        }
        Some(MediaSource::Uri(uri)) => poster.set_file(Some(&gio::File::for_uri(uri))),
        None => poster.set_visible(false),
    }
    root.add_overlay(&poster);

    let center_icon = Label::new(Some(GLYPH_PLAY));
    center_icon.add_css_class("video-icon");
    center_icon.set_halign(Align::Center);
    center_icon.set_valign(Align::Center);
    center_icon.set_can_target(false);
    center_icon.set_visible(false);
    root.add_overlay(&center_icon);

    let mute_button = Button::with_label(GLYPH_MUTED);
    mute_button.add_css_class("mute-button");
    mute_button.add_css_class("flat");
    mute_button.set_halign(Align::End);
    mute_button.set_valign(Align::Start);
    mute_button.set_focusable(false);
    {
        let id = item.id.clone();
        let events = events.clone();
        mute_button.connect_clicked(move |_| events(CellEvent::MuteClicked(id.clone(), placement)));
    }
    root.add_overlay(&mute_button);

    {
        let id = item.id.clone();
        let events = events.clone();
        media.connect_playing_notify(move |media| {
            events(CellEvent::PlaybackChanged(id.clone(), media.is_playing()));
        });
    }
    {
        let id = item.id.clone();
        let events = events.clone();
        media.connect_error_notify(move |media| {
            if media.error().is_some() {
                events(CellEvent::Broken(id.clone()));
            }
        });
    }

    VideoParts {
        media,
        poster,
        center_icon,
        mute_button,
    }
}

fn attach_gestures(
    root: &Overlay,
    id: MediaId,
    is_video: bool,
    placement: Placement,
    events: &CellEvents,
) {
    let click = GestureClick::new();
    click.set_button(1);
    {
        let events = events.clone();
        click.connect_pressed(move |_, n_press, _, _| {
            let event = match (is_video, placement, n_press) {
                (false, Placement::Grid, 1) => CellEvent::Activated(id.clone()),
                (true, _, 1) => CellEvent::VideoClicked(id.clone(), placement),
                (true, Placement::Grid, 2) => CellEvent::VideoDoubleClicked(id.clone()),
                _ => return,
            };
            events(event);
        });
    }
    root.add_controller(click);

    // No context menu on media
    let right_click = GestureClick::new();
    right_click.set_button(3);
    right_click.connect_pressed(|gesture, _, _, _| {
        gesture.set_state(EventSequenceState::Claimed);
    });
    root.add_controller(right_click);
}
