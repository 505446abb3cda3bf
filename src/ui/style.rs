use std::sync::Once;

use gtk4::{gdk, CssProvider};
use tracing::warn;

/// Theme for the grid, filter bar and lightbox.
pub const FALLBACK_CSS: &str = r#"
window.galleria {
    background-color: #101010;
    color: #e8e8e8;
}

.filter-bar {
    padding: 12px 16px;
}

.filter-bar togglebutton {
    border-radius: 999px;
    padding: 4px 14px;
    background: #1c1c1c;
    color: #c8c8c8;
    border: 1px solid #2c2c2c;
}

.filter-bar togglebutton:checked {
    background: #e8e8e8;
    color: #101010;
}

.media-cell {
    border-radius: 10px;
    background-color: #1a1a1a;
    opacity: 0;
    transition: opacity 400ms ease-out;
}

.media-cell.entered {
    opacity: 1;
}

.video-icon {
    font-size: 48px;
    color: rgba(255, 255, 255, 0.9);
    background-color: rgba(0, 0, 0, 0.45);
    border-radius: 999px;
    padding: 12px 22px;
}

.mute-button {
    margin: 8px;
    min-width: 28px;
    min-height: 28px;
    border-radius: 999px;
    background: rgba(0, 0, 0, 0.55);
    color: #ffffff;
}

.gallery-footer {
    padding: 24px;
    color: #8a8a8a;
}

.lightbox {
    background-color: rgba(0, 0, 0, 0.92);
}

.lightbox-nav {
    min-width: 48px;
    min-height: 48px;
    border-radius: 999px;
    background: rgba(255, 255, 255, 0.08);
    color: #ffffff;
    margin: 16px;
}

.lightbox-caption {
    padding: 12px;
    color: #d0d0d0;
}
"#;

static REGISTER: Once = Once::new();

/// Registers the theme on the default display. Later calls are no-ops.
pub fn ensure_registered() {
    REGISTER.call_once(|| {
        let Some(display) = gdk::Display::default() else {
            warn!("No default display; skipping stylesheet");
            return;
        };
        let provider = CssProvider::new();
        provider.load_from_string(FALLBACK_CSS);
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    });
}
