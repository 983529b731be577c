pub mod walk;

pub use walk::{scan_media, MediaFilter, MediaWalk, ScannedMedia};
