pub mod entry;
pub mod feed;
pub mod filter;

pub use entry::Entry;
pub use feed::{apply_folders, derive_folders, Feed, Tagging};
pub use filter::EntryFilter;
