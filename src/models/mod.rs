pub mod catalog;
pub mod column_model;
pub mod media_item;

pub use catalog::*;
pub use column_model::*;
pub use media_item::*;
