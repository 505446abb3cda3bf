pub mod layout_cache;
pub mod masonry;

pub use layout_cache::{CachedMasonry, LayoutCache};
pub use masonry::{Breakpoints, MasonryLayout};
