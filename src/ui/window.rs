use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gtk4::prelude::*;
use gtk4::{
    glib, Align, Application, ApplicationWindow, Box as GtkBox, EventControllerKey, Label,
    Orientation, Overlay, PolicyType, ScrolledWindow, Settings, ToggleButton,
};
use tracing::{debug, info, warn};

use crate::config::GalleryConfig;
use crate::gallery::{CellRegistry, FilterKey, Gallery, LightboxKey, LoadTicket, Placement, Rect};
use crate::loader::SimulatedLoader;
use crate::models::{Catalog, CatalogSource, MediaId, MediaItem};
use crate::ui::lightbox::{LightboxView, WindowLightboxHost};
use crate::ui::media_cell::{CellEvent, CellEvents, MediaCell};
use crate::ui::preview_loader::PreviewLoader;
use crate::ui::style;

const COLUMN_SPACING: i32 = 16;
const GRID_MARGIN: i32 = 16;

/// Gallery window: filter bar, masonry grid with load-more footer, and the
/// lightbox overlay on top.
pub struct MainWindow {
    self_weak: RefCell<Weak<MainWindow>>,
    window: ApplicationWindow,
    runtime: tokio::runtime::Handle,
    config: GalleryConfig,
    gallery: RefCell<Gallery>,
    loader: SimulatedLoader,
    previews: Rc<PreviewLoader>,
    filter_bar: GtkBox,
    filter_buttons: RefCell<Vec<(FilterKey, ToggleButton)>>,
    syncing_filter_buttons: Cell<bool>,
    scroller: ScrolledWindow,
    content: GtkBox,
    columns_box: GtkBox,
    footer: Label,
    lightbox: Rc<LightboxView>,
    lightbox_keys: EventControllerKey,
    cells: RefCell<CellRegistry<Rc<MediaCell>>>,
    column_count: Cell<u32>,
    last_layout_width: Cell<i32>,
    observe_pending: Cell<bool>,
}

impl MainWindow {
    pub fn new(
        app: &Application,
        source: Option<CatalogSource>,
        config: GalleryConfig,
        runtime: tokio::runtime::Handle,
    ) -> Rc<Self> {
        style::ensure_registered();
        if let Some(settings) = Settings::default() {
            settings.set_gtk_application_prefer_dark_theme(true);
        }

        let window = ApplicationWindow::builder()
            .application(app)
            .title("Galleria")
            .default_width(1200)
            .default_height(800)
            .build();
        window.add_css_class("galleria");

        let main_box = GtkBox::new(Orientation::Vertical, 0);

        let filter_bar = GtkBox::new(Orientation::Horizontal, 8);
        filter_bar.add_css_class("filter-bar");
        filter_bar.set_halign(Align::Center);
        main_box.append(&filter_bar);

        let columns_box = GtkBox::new(Orientation::Horizontal, COLUMN_SPACING);
        columns_box.set_homogeneous(true);
        columns_box.set_margin_start(GRID_MARGIN);
        columns_box.set_margin_end(GRID_MARGIN);
        columns_box.set_margin_top(GRID_MARGIN);

        let footer = Label::new(None);
        footer.add_css_class("gallery-footer");
        footer.set_halign(Align::Center);

        let content = GtkBox::new(Orientation::Vertical, 0);
        content.append(&columns_box);
        content.append(&footer);

        let scroller = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .vexpand(true)
            .hexpand(true)
            .child(&content)
            .build();
        main_box.append(&scroller);

        let lightbox = LightboxView::new();
        let root = Overlay::new();
        root.set_child(Some(&main_box));
        root.add_overlay(lightbox.widget());
        window.set_child(Some(&root));

        let gallery = Gallery::new(Catalog::default(), config.clone());
        let main_window = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            runtime,
            loader: SimulatedLoader::new(config.simulated_delay),
            previews: PreviewLoader::new(config.preview_cache_bytes),
            config,
            gallery: RefCell::new(gallery),
            filter_bar,
            filter_buttons: RefCell::new(Vec::new()),
            syncing_filter_buttons: Cell::new(false),
            scroller,
            content,
            columns_box,
            footer,
            lightbox,
            lightbox_keys: EventControllerKey::new(),
            cells: RefCell::new(CellRegistry::new()),
            column_count: Cell::new(0),
            last_layout_width: Cell::new(0),
            observe_pending: Cell::new(false),
        });
        *main_window.self_weak.borrow_mut() = Rc::downgrade(&main_window);

        main_window.install_lightbox_host();
        main_window.setup_lightbox_controls();
        main_window.setup_scroll_observer();
        main_window.setup_layout_resize_observer();
        main_window.render_footer();

        match source {
            Some(source) => main_window.load_catalog(source),
            None => {
                warn!("No catalog given and no default location found");
                main_window.footer.set_label("No catalog found");
            }
        }

        main_window
    }

    pub fn present(&self) {
        self.window.present();
    }

    pub fn connect_close_request<F>(&self, callback: F)
    where
        F: Fn() + 'static,
    {
        let weak_self = self.self_weak.borrow().clone();
        self.window.connect_close_request(move |_| {
            if let Some(window) = weak_self.upgrade() {
                window.dispose();
            }
            callback();
            glib::Propagation::Proceed
        });
    }

    fn load_catalog(&self, source: CatalogSource) {
        info!("Loading catalog from {:?}", source.path());
        self.footer.set_label("Loading catalog…");

        let (tx, rx) = async_channel::bounded(1);
        let task_source = source.clone();
        self.runtime.spawn(async move {
            let result = Catalog::load(&task_source).await;
            let _ = tx.send(result).await;
        });

        let weak_self = self.self_weak.borrow().clone();
        glib::spawn_future_local(async move {
            let Ok(result) = rx.recv().await else {
                return;
            };
            let Some(window) = weak_self.upgrade() else {
                return;
            };
            match result {
                Ok(catalog) => window.set_catalog(catalog),
                Err(e) => {
                    warn!("Failed to load catalog {:?}: {:#}", source.path(), e);
                    window
                        .footer
                        .set_label(&format!("Could not load {}: {}", source.path().display(), e));
                }
            }
        });
    }

    fn set_catalog(&self, catalog: Catalog) {
        info!(items = catalog.len(), "Catalog loaded");
        self.teardown_cells();
        let gallery = Gallery::new(catalog, self.config.clone());
        let previous = std::mem::replace(&mut *self.gallery.borrow_mut(), gallery);
        drop(previous);

        self.install_lightbox_host();
        self.build_filter_bar();
        self.scroller.vadjustment().set_value(0.0);
        self.rebuild_grid();
        self.sync_lightbox();
    }

    fn install_lightbox_host(&self) {
        let host = WindowLightboxHost::new(&self.window, &self.scroller, self.lightbox_keys.clone());
        self.gallery.borrow_mut().set_lightbox_host(Box::new(host));
    }

    fn setup_lightbox_controls(&self) {
        let weak_self = self.self_weak.borrow().clone();
        self.lightbox_keys
            .connect_key_pressed(move |_, key, _code, _state| {
                let Some(window) = weak_self.upgrade() else {
                    return glib::Propagation::Proceed;
                };
                let Some(key) = key.name().and_then(|name| LightboxKey::from_name(&name)) else {
                    return glib::Propagation::Proceed;
                };
                if window.gallery.borrow_mut().handle_key(key) {
                    window.sync_lightbox();
                    glib::Propagation::Stop
                } else {
                    glib::Propagation::Proceed
                }
            });

        let weak_self = self.self_weak.borrow().clone();
        self.lightbox.connect_close(move || {
            if let Some(window) = weak_self.upgrade() {
                if window.gallery.borrow_mut().close_lightbox() {
                    window.sync_lightbox();
                }
            }
        });
        let weak_self = self.self_weak.borrow().clone();
        self.lightbox.connect_prev(move || {
            if let Some(window) = weak_self.upgrade() {
                window.gallery.borrow_mut().lightbox_prev();
                window.sync_lightbox();
            }
        });
        let weak_self = self.self_weak.borrow().clone();
        self.lightbox.connect_next(move || {
            if let Some(window) = weak_self.upgrade() {
                window.gallery.borrow_mut().lightbox_next();
                window.sync_lightbox();
            }
        });
    }

    fn setup_scroll_observer(&self) {
        let adjustment = self.scroller.vadjustment();
        let weak_self = self.self_weak.borrow().clone();
        adjustment.connect_value_changed(move |_| {
            if let Some(window) = weak_self.upgrade() {
                window.schedule_observe();
            }
        });
        // Fires after allocation, when cell bounds are current.
        let weak_self = self.self_weak.borrow().clone();
        adjustment.connect_changed(move |_| {
            if let Some(window) = weak_self.upgrade() {
                window.schedule_observe();
            }
        });
    }

    fn setup_layout_resize_observer(&self) {
        let weak_self = self.self_weak.borrow().clone();
        self.scroller.add_tick_callback(move |_widget, _clock| {
            let Some(window) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            let width = window.scroller.width();
            if width <= 0 || width == window.last_layout_width.get() {
                return glib::ControlFlow::Continue;
            }
            window.last_layout_width.set(width);
            let columns = window.gallery.borrow().column_count(width as f32);
            if columns != window.column_count.get() {
                debug!(width, columns, "Column count changed");
                window.rebuild_grid();
            } else {
                window.schedule_observe();
            }
            glib::ControlFlow::Continue
        });
    }

    fn build_filter_bar(&self) {
        while let Some(child) = self.filter_bar.first_child() {
            self.filter_bar.remove(&child);
        }

        let keys: Vec<FilterKey> = std::iter::once(FilterKey::All)
            .chain(
                self.gallery
                    .borrow()
                    .catalog()
                    .categories()
                    .into_iter()
                    .map(FilterKey::Category),
            )
            .collect();

        let mut buttons = Vec::with_capacity(keys.len());
        let mut group: Option<ToggleButton> = None;
        for key in keys {
            let button = ToggleButton::with_label(&key.label());
            button.set_focusable(false);
            if let Some(first) = group.as_ref() {
                button.set_group(Some(first));
            } else {
                group = Some(button.clone());
            }

            let weak_self = self.self_weak.borrow().clone();
            let button_key = key.clone();
            button.connect_toggled(move |button| {
                let Some(window) = weak_self.upgrade() else {
                    return;
                };
                if button.is_active() && !window.syncing_filter_buttons.get() {
                    window.select_filter(button_key.clone());
                }
            });

            self.filter_bar.append(&button);
            buttons.push((key, button));
        }
        *self.filter_buttons.borrow_mut() = buttons;
        self.sync_filter_buttons();
    }

    fn sync_filter_buttons(&self) {
        let current = self.gallery.borrow().filter_key().clone();
        self.syncing_filter_buttons.set(true);
        for (key, button) in self.filter_buttons.borrow().iter() {
            button.set_active(*key == current);
        }
        self.syncing_filter_buttons.set(false);
    }

    fn select_filter(&self, key: FilterKey) {
        if !self.gallery.borrow_mut().set_filter(key) {
            return;
        }
        self.scroller.vadjustment().set_value(0.0);
        self.sync_filter_buttons();
        self.rebuild_grid();
        self.sync_lightbox();
    }

    fn grid_width(&self) -> f32 {
        match self.scroller.width() {
            w if w > 0 => w as f32,
            _ => self.window.default_width() as f32,
        }
    }

    /// Re-packs the visible prefix into columns, reusing mounted cells.
    fn rebuild_grid(&self) {
        let width = self.grid_width();
        let (columns, column_count, items) = {
            let gallery = self.gallery.borrow();
            let items: HashMap<MediaId, MediaItem> = gallery
                .visible_prefix()
                .iter()
                .map(|item| (item.id.clone(), item.clone()))
                .collect();
            (gallery.columns(width), gallery.column_count(width), items)
        };

        let removed: Vec<Rc<MediaCell>> = {
            let mut cells = self.cells.borrow_mut();
            let gone: Vec<MediaId> = cells
                .iter()
                .filter(|(id, _)| !items.contains_key(*id))
                .map(|(id, _)| id.clone())
                .collect();
            gone.iter().filter_map(|id| cells.unregister(id)).collect()
        };
        {
            let mut gallery = self.gallery.borrow_mut();
            for cell in &removed {
                gallery.forget_cell(cell.id());
            }
        }
        for cell in &removed {
            cell.teardown();
        }

        while let Some(child) = self.columns_box.first_child() {
            if let Some(column) = child.downcast_ref::<GtkBox>() {
                while let Some(cell) = column.first_child() {
                    column.remove(&cell);
                }
            }
            self.columns_box.remove(&child);
        }

        let events = self.cell_events();
        let mut mounted = Vec::new();
        for column in &columns {
            let column_box = GtkBox::new(Orientation::Vertical, COLUMN_SPACING);
            column_box.set_hexpand(true);
            column_box.set_valign(Align::Start);
            for entry in &column.items {
                let existing = self.cells.borrow().get(&entry.media_id).cloned();
                let cell = match existing {
                    Some(cell) => cell,
                    None => {
                        let Some(item) = items.get(&entry.media_id) else {
                            continue;
                        };
                        let cell = MediaCell::new(item, Placement::Grid, &self.previews, events.clone());
                        self.cells
                            .borrow_mut()
                            .register(entry.media_id.clone(), cell.clone());
                        mounted.push(cell.clone());
                        cell
                    }
                };
                column_box.append(cell.widget());
            }
            self.columns_box.append(&column_box);
        }
        self.column_count.set(column_count);
        debug!(
            columns = columns.len(),
            cells = self.cells.borrow().len(),
            mounted = mounted.len(),
            "Grid rebuilt"
        );

        for cell in &mounted {
            cell.set_entered(self.gallery.borrow().is_cell_visible(cell.id()));
            if cell.is_video() {
                self.apply_grid_video(cell);
            }
        }

        self.render_footer();
        self.schedule_observe();
    }

    fn render_footer(&self) {
        let footer = self.gallery.borrow().footer();
        self.footer.set_label(&footer.to_string());
    }

    fn schedule_observe(&self) {
        if self.observe_pending.replace(true) {
            return;
        }
        let weak_self = self.self_weak.borrow().clone();
        glib::idle_add_local_once(move || {
            if let Some(window) = weak_self.upgrade() {
                window.observe_geometry();
            }
        });
    }

    fn viewport_rect(&self) -> Option<Rect> {
        let adjustment = self.scroller.vadjustment();
        let width = self.content.width();
        if width <= 0 || adjustment.page_size() <= 0.0 {
            return None;
        }
        Some(Rect::new(
            0.0,
            adjustment.value() as f32,
            width as f32,
            adjustment.page_size() as f32,
        ))
    }

    fn bounds_in_content(&self, widget: &impl IsA<gtk4::Widget>) -> Option<Rect> {
        let bounds = widget.compute_bounds(&self.content)?;
        Some(Rect::new(bounds.x(), bounds.y(), bounds.width(), bounds.height()))
    }

    /// Feeds current cell and sentinel geometry to the visibility tracker.
    fn observe_geometry(&self) {
        self.observe_pending.set(false);
        let Some(viewport) = self.viewport_rect() else {
            return;
        };

        let cells: Vec<Rc<MediaCell>> = self.cells.borrow().iter().map(|(_, c)| c.clone()).collect();
        let mut autoplay_changed = Vec::new();
        let ticket = {
            let mut gallery = self.gallery.borrow_mut();
            for cell in &cells {
                let Some(rect) = self.bounds_in_content(cell.widget()) else {
                    continue;
                };
                let seen = gallery.observe_cell(cell.id(), &rect, &viewport);
                if seen.entrance.is_some() {
                    cell.set_entered(gallery.is_cell_visible(cell.id()));
                }
                if seen.autoplay.is_some() {
                    autoplay_changed.push(cell.clone());
                }
            }
            self.bounds_in_content(&self.footer)
                .and_then(|sentinel| gallery.observe_sentinel(&sentinel, &viewport))
        };

        for cell in &autoplay_changed {
            self.apply_grid_video(cell);
        }
        if let Some(ticket) = ticket {
            self.start_load(ticket);
        }
    }

    fn start_load(&self, ticket: LoadTicket) {
        self.render_footer();
        if self.loader.delay().is_zero() {
            self.finish_load(ticket);
            return;
        }

        let (tx, rx) = async_channel::bounded(1);
        let loader = self.loader;
        self.runtime.spawn(async move {
            let _ = tx.send(loader.load(ticket).await).await;
        });

        let weak_self = self.self_weak.borrow().clone();
        glib::spawn_future_local(async move {
            if let Ok(ticket) = rx.recv().await {
                if let Some(window) = weak_self.upgrade() {
                    window.finish_load(ticket);
                }
            }
        });
    }

    fn finish_load(&self, ticket: LoadTicket) {
        let revealed = self.gallery.borrow_mut().complete_load(ticket);
        if revealed {
            self.rebuild_grid();
        } else {
            self.render_footer();
        }
    }

    fn cell_events(&self) -> CellEvents {
        let weak_self = self.self_weak.borrow().clone();
        Rc::new(move |event| {
            if let Some(window) = weak_self.upgrade() {
                window.on_cell_event(event);
            }
        })
    }

    fn on_cell_event(&self, event: CellEvent) {
        match event {
            CellEvent::Activated(id) => {
                if self.gallery.borrow_mut().open_lightbox_at(&id) {
                    self.sync_lightbox();
                }
            }
            CellEvent::Broken(id) => {
                if self.gallery.borrow_mut().mark_broken(&id) {
                    warn!(%id, "Media failed to load; hiding it");
                    self.rebuild_grid();
                    self.sync_lightbox();
                }
            }
            CellEvent::VideoClicked(id, placement) => self.on_video_clicked(&id, placement),
            CellEvent::VideoDoubleClicked(id) => {
                if self.gallery.borrow_mut().video_double_clicked(&id) {
                    self.sync_lightbox();
                }
            }
            CellEvent::MuteClicked(id, placement) => {
                let Some(mut element) = self.find_cell(&id, placement).and_then(|c| c.element()) else {
                    return;
                };
                self.gallery.borrow_mut().video_mute_clicked(&id, &mut element);
                self.render_video(&id);
            }
            CellEvent::PlaybackChanged(id, playing) => {
                // Changes we cause ourselves arrive while the gallery is
                // borrowed; those are recorded by the caller.
                let Ok(mut gallery) = self.gallery.try_borrow_mut() else {
                    return;
                };
                gallery.video_element_changed(&id, playing);
                drop(gallery);
                self.render_video(&id);
            }
        }
    }

    fn find_cell(&self, id: &MediaId, placement: Placement) -> Option<Rc<MediaCell>> {
        match placement {
            Placement::Grid => self.cells.try_borrow().ok()?.get(id).cloned(),
            Placement::Lightbox => self.lightbox.current().filter(|cell| cell.id() == id),
        }
    }

    fn on_video_clicked(&self, id: &MediaId, placement: Placement) {
        let Some(mut element) = self.find_cell(id, placement).and_then(|c| c.element()) else {
            return;
        };
        let ticket = self
            .gallery
            .borrow_mut()
            .video_clicked(id, placement, &mut element);
        self.render_video(id);

        let weak_self = self.self_weak.borrow().clone();
        glib::timeout_add_local_once(ticket.delay, move || {
            if let Some(window) = weak_self.upgrade() {
                if window.gallery.borrow_mut().video_icon_elapsed(&ticket) {
                    window.render_video(&ticket.id);
                }
            }
        });
    }

    fn apply_grid_video(&self, cell: &MediaCell) {
        let Some(mut element) = cell.element() else {
            return;
        };
        self.gallery
            .borrow_mut()
            .apply_video_activation(cell.id(), Placement::Grid, &mut element);
        cell.render_activation(&self.gallery.borrow().activation(cell.id()));
    }

    /// Redraws every instance of a video from the shared activation state.
    fn render_video(&self, id: &MediaId) {
        let state = self.gallery.borrow().activation(id);
        for placement in [Placement::Grid, Placement::Lightbox] {
            if let Some(cell) = self.find_cell(id, placement) {
                cell.render_activation(&state);
            }
        }
    }

    /// Brings the overlay and every video in line with the lightbox state.
    fn sync_lightbox(&self) {
        let (item, caption) = {
            let gallery = self.gallery.borrow();
            (gallery.lightbox_item().cloned(), gallery.caption())
        };
        let staged = match item {
            Some(item) => Some(self.lightbox.show(&item, caption, &self.previews, self.cell_events())),
            None => {
                self.lightbox.hide();
                None
            }
        };

        // Grid first: the lightbox instance must win the shared play flag.
        let grid_videos: Vec<Rc<MediaCell>> = self
            .cells
            .borrow()
            .iter()
            .filter(|(_, cell)| cell.is_video())
            .map(|(_, cell)| cell.clone())
            .collect();
        for cell in &grid_videos {
            self.apply_grid_video(cell);
        }

        if let Some(cell) = staged.filter(|cell| cell.is_video()) {
            if let Some(mut element) = cell.element() {
                self.gallery
                    .borrow_mut()
                    .apply_video_activation(cell.id(), Placement::Lightbox, &mut element);
            }
            self.render_video(cell.id());
        }
    }

    fn teardown_cells(&self) {
        let cells = self.cells.borrow_mut().drain();
        for (_, cell) in &cells {
            cell.teardown();
        }
        while let Some(child) = self.columns_box.first_child() {
            self.columns_box.remove(&child);
        }
    }

    fn dispose(&self) {
        if self.gallery.borrow_mut().dispose() {
            debug!("Gallery observers disconnected");
        }
        self.lightbox.hide();
        self.teardown_cells();
    }
}
