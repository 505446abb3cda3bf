use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use galleria::models::CatalogSource;
use galleria::ui::MainWindow;
use galleria::GalleryConfig;
use gtk4::prelude::*;
use gtk4::{gio, Application};
use tokio::runtime::Runtime;

const APP_ID: &str = "io.github.Galleria";
const IO_THREADS: usize = 2;

type Windows = Rc<RefCell<Vec<Rc<MainWindow>>>>;

pub struct GalleriaApp {
    app: Application,
    // Catalog loads and staged pages run here.
    _runtime: Runtime,
}

impl GalleriaApp {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(IO_THREADS)
            .thread_name("galleria-io")
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;

        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        let windows: Windows = Rc::default();
        let handle = runtime.handle().clone();
        {
            let windows = windows.clone();
            let handle = handle.clone();
            app.connect_activate(move |app| {
                open_window(app, CatalogSource::default_location(), &handle, &windows);
            });
        }
        app.connect_open(move |app, files, _hint| {
            let source = files
                .first()
                .and_then(|f| f.path())
                .map(|path| CatalogSource::from_path(&path))
                .or_else(CatalogSource::default_location);
            open_window(app, source, &handle, &windows);
        });

        Ok(Self {
            app,
            _runtime: runtime,
        })
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }
}

fn open_window(
    app: &Application,
    source: Option<CatalogSource>,
    handle: &tokio::runtime::Handle,
    windows: &Windows,
) {
    let window = MainWindow::new(app, source, GalleryConfig::from_env(), handle.clone());
    window.present();

    // The application holds its windows until they close.
    let windows_weak = Rc::downgrade(windows);
    let window_weak = Rc::downgrade(&window);
    window.connect_close_request(move || {
        if let (Some(windows), Some(window)) = (windows_weak.upgrade(), window_weak.upgrade()) {
            windows.borrow_mut().retain(|w| !Rc::ptr_eq(w, &window));
        }
    });
    windows.borrow_mut().push(window);
}
