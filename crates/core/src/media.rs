use crate::summary::RunSummary;
use crate::utils::sanitize_filename;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ICONS_DIR: &str = "icons";
const ATTACHMENTS_DIR: &str = "attachments";
const EMBEDS_DIR: &str = "embeds";
const FALLBACK_EXTENSION: &str = "png";

/// Raster image extensions accepted for attachments
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Result of one best-effort media download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    Downloaded(PathBuf),
    /// Terminal answer that produced no file (e.g. 404)
    Skipped(String),
    Failed(String),
}

impl MediaOutcome {
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Downloaded(path) => Some(path),
            Self::Skipped(_) | Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Icon,
    Attachment,
    EmbedThumbnail,
    EmbedImage,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Icon => "icon",
            Self::Attachment => "attachment",
            Self::EmbedThumbnail => "thumbnail",
            Self::EmbedImage => "image",
        }
    }
}

/// Returns true when `filename` ends in one of the allowed image extensions
pub fn is_image_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

/// Extension of the last path segment of `url`, ignoring query and fragment
pub fn extension_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or("");
    let last_segment = without_query.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// Working directory tree holding transient media for one run
#[derive(Debug, Clone)]
pub struct MediaWorkspace {
    root: PathBuf,
}

impl MediaWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root and its subareas
    pub fn prepare(&self) -> io::Result<()> {
        for sub in [ICONS_DIR, ATTACHMENTS_DIR, EMBEDS_DIR] {
            fs::create_dir_all(self.root.join(sub))?;
        }
        Ok(())
    }

    pub fn icon_path(&self, server_id: &str, url: &str) -> PathBuf {
        let name = format!("{}.{}", server_id, extension_from_url(url));
        self.root.join(ICONS_DIR).join(sanitize_filename(&name))
    }

    pub fn attachment_path(&self, channel_name: &str, attachment_id: &str, filename: &str) -> PathBuf {
        let ext = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        let name = format!("{}_{}.{}", channel_name, attachment_id, ext);
        self.root.join(ATTACHMENTS_DIR).join(sanitize_filename(&name))
    }

    pub fn embed_path(&self, message_id: &str, embed_index: usize, kind: MediaKind, url: &str) -> PathBuf {
        let name = format!(
            "{}_{}_{}.{}",
            message_id,
            embed_index,
            kind.as_str(),
            extension_from_url(url)
        );
        self.root.join(EMBEDS_DIR).join(sanitize_filename(&name))
    }

    /// Deletes every listed file, then the workspace directories if they
    /// are left empty. Failures are logged and counted.
    pub fn teardown<'a>(&self, files: impl IntoIterator<Item = &'a Path>, summary: &mut RunSummary) {
        for file in files {
            match remove_transient_file(file) {
                Ok(true) => debug!(path = %file.display(), "Deleted transient media"),
                Ok(false) => debug!(path = %file.display(), "Transient media already gone"),
                Err(err) => {
                    warn!(path = %file.display(), "Error deleting transient media: {err}");
                    summary.cleanup_failures += 1;
                }
            }
        }

        for sub in [ICONS_DIR, ATTACHMENTS_DIR, EMBEDS_DIR] {
            remove_dir_if_empty(&self.root.join(sub));
        }
        remove_dir_if_empty(&self.root);
    }
}

/// Removes a file; a file that does not exist counts as already removed.
/// Returns whether a file was actually deleted.
pub fn remove_transient_file(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn remove_dir_if_empty(dir: &Path) {
    let is_empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => return,
    };
    if is_empty {
        if let Err(err) = fs::remove_dir(dir) {
            debug!(path = %dir.display(), "Workspace directory left in place: {err}");
        }
    }
}
