mod lightbox;
mod media_cell;
mod preview_loader;
mod style;
mod window;

pub use window::MainWindow;
