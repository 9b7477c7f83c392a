//! Customer media: filtered views, selection, uploads and the gallery
//! container tying them to the backend.

pub mod filters;
pub mod gallery;
pub mod selection;
pub mod upload;

pub use filters::{MediaFilters, MediaTab, MediaView, SortBy, TabCounts};
pub use gallery::MediaGallery;
pub use selection::MediaSelection;
pub use upload::{guess_media_type, prepare_uploads};
