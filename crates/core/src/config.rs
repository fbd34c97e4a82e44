use std::path::PathBuf;
use std::time::Duration;

/// Largest page the platform serves per listing call
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 99;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_WORK_DIR: &str = "temp_images";

/// Tunables for one archival run
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub page_size: usize,
    pub page_delay: Duration,
    /// Root of the transient media tree
    pub work_dir: PathBuf,
    /// Directory receiving the output document
    pub output_dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ArchiveConfig {
    /// Page size clamped to what the platform accepts
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}
