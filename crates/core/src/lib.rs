//! Archival pipeline for chat server message history.
//!
//! The core is platform neutral: it talks to the chat platform, the media
//! CDN and the document library only through the traits in [`ports`].

pub mod application;
pub mod channel;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod media;
pub mod normalizer;
pub mod pager;
pub mod ports;
pub mod summary;
pub mod utils;

#[cfg(test)]
mod testing;

pub use application::ServerArchiver;
pub use config::ArchiveConfig;
pub use error::{ArchiveError, CanvasError, ChannelError, PlatformError};
pub use summary::RunSummary;
