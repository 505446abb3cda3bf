//! Filterable, infinitely scrolling masonry gallery of images and videos with
//! a lightbox viewer.
//!
//! The core (everything but `ui`) is toolkit-independent; the GTK front end is
//! behind the `gtk` feature.

pub mod config;
pub mod error;
pub mod gallery;
pub mod image_loader;
pub mod layout;
pub mod loader;
pub mod models;

#[cfg(feature = "gtk")]
pub mod ui;

pub use config::GalleryConfig;
pub use error::CatalogError;
pub use gallery::Gallery;
pub use models::Catalog;
