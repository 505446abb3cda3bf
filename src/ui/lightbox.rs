use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    Align, ApplicationWindow, Box as GtkBox, Button, EventControllerKey, Label, Orientation,
    Overlay, PropagationPhase, ScrolledWindow,
};

use crate::gallery::{LightboxHost, Placement};
use crate::models::MediaItem;
use crate::ui::media_cell::{CellEvents, MediaCell};
use crate::ui::preview_loader::PreviewLoader;

/// Fullscreen overlay showing one item with close and prev/next controls.
pub struct LightboxView {
    root: Overlay,
    stage: GtkBox,
    caption: Label,
    close_button: Button,
    prev_button: Button,
    next_button: Button,
    current: RefCell<Option<Rc<MediaCell>>>,
}

impl LightboxView {
    pub fn new() -> Rc<Self> {
        let root = Overlay::new();
        root.add_css_class("lightbox");
        root.set_hexpand(true);
        root.set_vexpand(true);
        root.set_visible(false);

        let column = GtkBox::new(Orientation::Vertical, 0);
        let stage = GtkBox::new(Orientation::Vertical, 0);
        stage.set_hexpand(true);
        stage.set_vexpand(true);
        stage.set_margin_start(72);
        stage.set_margin_end(72);
        stage.set_margin_top(48);
        column.append(&stage);

        let caption = Label::new(None);
        caption.add_css_class("lightbox-caption");
        caption.set_visible(false);
        column.append(&caption);
        root.set_child(Some(&column));

        let close_button = nav_button("✕", Align::End, Align::Start);
        let prev_button = nav_button("‹", Align::Start, Align::Center);
        let next_button = nav_button("›", Align::End, Align::Center);
        root.add_overlay(&close_button);
        root.add_overlay(&prev_button);
        root.add_overlay(&next_button);

        Rc::new(Self {
            root,
            stage,
            caption,
            close_button,
            prev_button,
            next_button,
            current: RefCell::new(None),
        })
    }

    pub fn widget(&self) -> &Overlay {
        &self.root
    }

    pub fn connect_close<F: Fn() + 'static>(&self, f: F) {
        self.close_button.connect_clicked(move |_| f());
    }

    pub fn connect_prev<F: Fn() + 'static>(&self, f: F) {
        self.prev_button.connect_clicked(move |_| f());
    }

    pub fn connect_next<F: Fn() + 'static>(&self, f: F) {
        self.next_button.connect_clicked(move |_| f());
    }

    /// The cell on stage, if any.
    pub fn current(&self) -> Option<Rc<MediaCell>> {
        self.current.borrow().clone()
    }

    /// Puts `item` on stage, reusing the current cell when it already shows it.
    pub fn show(
        &self,
        item: &MediaItem,
        caption: Option<String>,
        previews: &Rc<PreviewLoader>,
        events: CellEvents,
    ) -> Rc<MediaCell> {
        let reuse = self.current().filter(|cell| cell.id() == &item.id);
        let cell = match reuse {
            Some(cell) => cell,
            None => {
                self.clear_stage();
                let cell = MediaCell::new(item, Placement::Lightbox, previews, events);
                self.stage.append(cell.widget());
                *self.current.borrow_mut() = Some(cell.clone());
                cell
            }
        };

        match caption {
            Some(text) => {
                self.caption.set_label(&text);
                self.caption.set_visible(true);
            }
            None => self.caption.set_visible(false),
        }
        self.root.set_visible(true);
        cell
    }

    pub fn hide(&self) {
        self.clear_stage();
        self.root.set_visible(false);
    }

    fn clear_stage(&self) {
        if let Some(cell) = self.current.borrow_mut().take() {
            cell.teardown();
            self.stage.remove(cell.widget());
        }
    }
}

fn nav_button(label: &str, halign: Align, valign: Align) -> Button {
    let button = Button::with_label(label);
    button.add_css_class("lightbox-nav");
    button.add_css_class("flat");
    button.set_halign(halign);
    button.set_valign(valign);
    button.set_focusable(false);
    button
}

/// Scroll lock and key routing for the lightbox session.
///
/// The grid stops taking input while the overlay is up, and the key
/// controller lives on the window only for the session's duration.
pub struct WindowLightboxHost {
    window: ApplicationWindow,
    scroller: ScrolledWindow,
    keys: EventControllerKey,
}

impl WindowLightboxHost {
    pub fn new(window: &ApplicationWindow, scroller: &ScrolledWindow, keys: EventControllerKey) -> Self {
        keys.set_propagation_phase(PropagationPhase::Capture);
        Self {
            window: window.clone(),
            scroller: scroller.clone(),
            keys,
        }
    }
}

impl LightboxHost for WindowLightboxHost {
    fn lock_scroll(&mut self) {
        self.scroller.set_can_target(false);
    }

    fn unlock_scroll(&mut self) {
        self.scroller.set_can_target(true);
    }

    fn attach_keys(&mut self) {
        self.window.add_controller(self.keys.clone());
    }

    fn detach_keys(&mut self) {
        self.window.remove_controller(&self.keys);
    }
}
