use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a chat platform adapter
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("credential rejected: {0}")]
    Unauthorized(String),
    #[error("rate limited on {endpoint}, retry after {retry_after_secs:.1}s")]
    RateLimited { endpoint: String, retry_after_secs: f64 },
    #[error("platform returned status {status} for {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Failure while drawing onto a document canvas
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("image {path} could not be embedded: {reason}")]
    Image { path: PathBuf, reason: String },
    #[error("document could not be written to {path}: {reason}")]
    Save { path: PathBuf, reason: String },
    #[error("no page has been added yet")]
    NoPage,
}

/// Error that abandons a single channel but not the run
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("page fetch failed after {pages_done} page(s): {source}")]
    Page {
        pages_done: usize,
        #[source]
        source: PlatformError,
    },
    #[error("refetch of message {message_id} failed: {source}")]
    Refetch {
        message_id: String,
        #[source]
        source: PlatformError,
    },
}

/// Fatal error that aborts the whole archival run
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("login failed")]
    Login(#[source] PlatformError),
    #[error("server {server_id} could not be resolved")]
    ServerLookup {
        server_id: String,
        #[source]
        source: PlatformError,
    },
    #[error("channels of server {server_id} could not be listed")]
    ChannelListing {
        server_id: String,
        #[source]
        source: PlatformError,
    },
    #[error("media workspace {path} could not be prepared")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output directory {path} could not be created")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document rendering failed")]
    Render(#[source] CanvasError),
}
