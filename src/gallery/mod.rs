pub mod filter;
pub mod lightbox;
pub mod pagination;
pub mod shuffle;
pub mod state;
pub mod video;
pub mod visibility;

pub use filter::{category_label, filter, FilterKey};
pub use lightbox::{Lightbox, LightboxHost, LightboxKey, LightboxState};
pub use pagination::{Footer, Pagination};
pub use shuffle::{shuffle, ShuffleCache};
pub use state::{Gallery, LoadTicket};
pub use video::{
    ActivationMap, ActivationStore, IconTicket, LocalActivation, MediaElement, Placement,
    VideoActivationState, VideoCell,
};
pub use visibility::{CellRegistry, CellVisibility, Rect, Transition, VisibilityTracker};
