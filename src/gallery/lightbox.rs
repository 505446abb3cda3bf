use std::fmt;

use tracing::debug;

use crate::gallery::FilterKey;

/// Position of the lightbox within the visible prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightboxState {
    #[default]
    Closed,
    Open { index: usize },
}

impl LightboxState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Open { index } => Some(*index),
            Self::Closed => None,
        }
    }

    /// Steps forward, wrapping over the prefix length at the time of the call.
    /// An index left out of range by a shrinking prefix is folded back first.
    fn stepped(self, len: usize, forward: bool) -> Self {
        match self {
            Self::Closed => Self::Closed,
            Self::Open { .. } if len == 0 => Self::Closed,
            Self::Open { index } => {
                let index = index % len;
                let index = if forward {
                    (index + 1) % len
                } else {
                    (index + len - 1) % len
                };
                Self::Open { index }
            }
        }
    }
}

/// Keys the lightbox reacts to while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxKey {
    Escape,
    ArrowLeft,
    ArrowRight,
}

impl LightboxKey {
    /// Accepts DOM-style names and the GDK keyval names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Escape" => Some(Self::Escape),
            "ArrowLeft" | "Left" | "KP_Left" => Some(Self::ArrowLeft),
            "ArrowRight" | "Right" | "KP_Right" => Some(Self::ArrowRight),
            _ => None,
        }
    }
}

impl fmt::Display for LightboxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Escape => "Escape",
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
        };
        f.write_str(name)
    }
}

/// Side effects the host performs while the lightbox is open.
pub trait LightboxHost {
    /// Stop the page behind the lightbox from scrolling.
    fn lock_scroll(&mut self);
    fn unlock_scroll(&mut self);
    /// Start delivering lightbox keys.
    fn attach_keys(&mut self);
    fn detach_keys(&mut self);
}

/// Lightbox state machine plus the host session bound to its open period.
///
/// Entering `Open` locks scrolling and attaches the key listener; leaving it
/// undoes both. Dropping an open lightbox leaves it as well, so a torn-down
/// window never keeps the page locked.
#[derive(Default)]
pub struct Lightbox {
    state: LightboxState,
    host: Option<Box<dyn LightboxHost>>,
}

impl fmt::Debug for Lightbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lightbox")
            .field("state", &self.state)
            .field("has_host", &self.host.is_some())
            .finish()
    }
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the host. An already-open lightbox moves its session over.
    pub fn set_host(&mut self, host: Box<dyn LightboxHost>) {
        if self.state.is_open() {
            self.leave();
        }
        self.host = Some(host);
        if self.state.is_open() {
            self.enter();
        }
    }

    pub fn state(&self) -> LightboxState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn index(&self) -> Option<usize> {
        self.state.index()
    }

    /// Opens at `index` of a `len`-item prefix. Out-of-range indices are
    /// refused. Opening while open just moves to `index`.
    pub fn open(&mut self, index: usize, len: usize) -> bool {
        if index >= len {
            return false;
        }
        let was_open = self.state.is_open();
        self.state = LightboxState::Open { index };
        if !was_open {
            debug!(index, "Lightbox opened");
            self.enter();
        }
        true
    }

    pub fn close(&mut self) -> bool {
        if !self.state.is_open() {
            return false;
        }
        self.state = LightboxState::Closed;
        debug!("Lightbox closed");
        self.leave();
        true
    }

    /// Folds the index back into a prefix that shrank to `len` items, closing
    /// when nothing is left.
    pub fn fit(&mut self, len: usize) -> Option<usize> {
        match self.state {
            LightboxState::Open { .. } if len == 0 => {
                self.close();
            }
            LightboxState::Open { index } => {
                self.state = LightboxState::Open { index: index % len };
            }
            LightboxState::Closed => {}
        }
        self.state.index()
    }

    pub fn next(&mut self, len: usize) -> Option<usize> {
        self.step(len, true)
    }

    pub fn prev(&mut self, len: usize) -> Option<usize> {
        self.step(len, false)
    }

    fn step(&mut self, len: usize, forward: bool) -> Option<usize> {
        let stepped = self.state.stepped(len, forward);
        if self.state.is_open() && !stepped.is_open() {
            self.close();
        } else {
            self.state = stepped;
        }
        self.state.index()
    }

    /// Applies a key press. Keys are ignored while closed.
    ///
    /// # Returns
    /// Whether the key was consumed.
    pub fn handle_key(&mut self, key: LightboxKey, len: usize) -> bool {
        if !self.state.is_open() {
            return false;
        }
        match key {
            LightboxKey::Escape => {
                self.close();
            }
            LightboxKey::ArrowLeft => {
                self.prev(len);
            }
            LightboxKey::ArrowRight => {
                self.next(len);
            }
        }
        true
    }

    fn enter(&mut self) {
        if let Some(host) = self.host.as_mut() {
            host.lock_scroll();
            host.attach_keys();
        }
    }

    fn leave(&mut self) {
        if let Some(host) = self.host.as_mut() {
            host.detach_keys();
            host.unlock_scroll();
        }
    }
}

impl Drop for Lightbox {
    fn drop(&mut self) {
        if self.state.is_open() {
            self.leave();
        }
    }
}

/// Caption under the lightbox content.
///
/// Shows the active filter's label, never the item's own tags, and nothing
/// while every category is shown.
pub fn caption(filter: &FilterKey) -> Option<String> {
    if filter.is_all() {
        None
    } else {
        Some(filter.label())
    }
}
