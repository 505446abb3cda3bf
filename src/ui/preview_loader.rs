//! Background decoding of grid previews.
//!
//! Requests go to a small pool of worker threads over a bounded flume queue.
//! Decoded pixels come back on an async channel drained on the GTK main
//! loop, where they become textures in a byte-bounded LRU.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gdk4::Texture;
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use tracing::{debug, warn};

use crate::image_loader::{decode_preview, DecodedPreview};

/// Longest side of a grid preview in pixels.
pub const PREVIEW_SIZE: u32 = 768;
const LOADER_THREADS: usize = 2;
const LOADER_QUEUE: usize = 512;

type Waiter = Box<dyn FnOnce(Option<&Texture>)>;

struct DecodeResult {
    path: PathBuf,
    preview: Option<DecodedPreview>,
}

struct LoaderState {
    pending: HashSet<PathBuf>,
    waiters: HashMap<PathBuf, Vec<Waiter>>,
    cache: lru::LruCache<PathBuf, Texture>,
    cached_bytes: usize,
}

pub struct PreviewLoader {
    request_tx: flume::Sender<PathBuf>,
    state: RefCell<LoaderState>,
    budget_bytes: usize,
}

impl PreviewLoader {
    pub fn new(budget_bytes: usize) -> Rc<Self> {
        let (request_tx, request_rx) = flume::bounded::<PathBuf>(LOADER_QUEUE);
        let (result_tx, result_rx) = async_channel::unbounded::<DecodeResult>();

        for _ in 0..LOADER_THREADS {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            std::thread::spawn(move || {
                while let Ok(path) = rx.recv() {
                    let preview = match decode_preview(&path, PREVIEW_SIZE) {
                        Ok(preview) => Some(preview),
                        Err(e) => {
                            warn!("Preview decode failed: {:#}", e);
                            None
                        }
                    };
                    if tx.send_blocking(DecodeResult { path, preview }).is_err() {
                        break;
                    }
                }
            });
        }

        let loader = Rc::new(Self {
            request_tx,
            state: RefCell::new(LoaderState {
                pending: HashSet::new(),
                waiters: HashMap::new(),
                cache: lru::LruCache::unbounded(),
                cached_bytes: 0,
            }),
            budget_bytes,
        });

        let loader_weak = Rc::downgrade(&loader);
        glib::spawn_future_local(async move {
            while let Ok(result) = result_rx.recv().await {
                let Some(loader) = loader_weak.upgrade() else {
                    break;
                };
                loader.process_result(result);
            }
        });

        loader
    }

    /// Calls `done` with the preview for `path`, or `None` if it cannot be
    /// decoded. Always asynchronous, even on a cache hit.
    pub fn request<F>(&self, path: &Path, done: F)
    where
        F: FnOnce(Option<&Texture>) + 'static,
    {
        let mut state = self.state.borrow_mut();

        if let Some(texture) = state.cache.get(path).cloned() {
            glib::idle_add_local_once(move || done(Some(&texture)));
            return;
        }

        state
            .waiters
            .entry(path.to_path_buf())
            .or_default()
            .push(Box::new(done));

        if state.pending.insert(path.to_path_buf())
            && self.request_tx.try_send(path.to_path_buf()).is_err()
        {
            // Queue full: fail the waiters rather than leave them hanging.
            debug!("Preview queue full, dropping {:?}", path);
            state.pending.remove(path);
            let waiters = state.waiters.remove(path).unwrap_or_default();
            glib::idle_add_local_once(move || {
                for waiter in waiters {
                    waiter(None);
                }
            });
        }
    }

    fn process_result(&self, result: DecodeResult) {
        let texture = result
            .preview
            .and_then(|p| create_texture_from_rgba(p.rgba, p.width, p.height));

        let waiters = {
            let mut state = self.state.borrow_mut();
            state.pending.remove(&result.path);
            if let Some(ref texture) = texture {
                state.cached_bytes += texture_bytes(texture);
                if let Some(old) = state.cache.put(result.path.clone(), texture.clone()) {
                    state.cached_bytes = state.cached_bytes.saturating_sub(texture_bytes(&old));
                }
                while state.cached_bytes > self.budget_bytes && state.cache.len() > 1 {
                    let Some((_, evicted)) = state.cache.pop_lru() else {
                        break;
                    };
                    state.cached_bytes = state.cached_bytes.saturating_sub(texture_bytes(&evicted));
                }
            }
            state.waiters.remove(&result.path).unwrap_or_default()
        };

        for waiter in waiters {
            waiter(texture.as_ref());
        }
    }
}

fn texture_bytes(texture: &Texture) -> usize {
    (texture.width().max(0) as usize) * (texture.height().max(0) as usize) * 4
}

fn create_texture_from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Option<Texture> {
    if width == 0 || height == 0 {
        return None;
    }
    let expected = (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4);
    if rgba.len() < expected {
        return None;
    }
    let bytes = glib::Bytes::from_owned(rgba);
    let texture = gdk::MemoryTexture::new(
        width as i32,
        height as i32,
        gdk::MemoryFormat::R8g8b8a8,
        &bytes,
        (width as usize) * 4,
    );
    Some(texture.upcast())
}
