use crate::media::{MediaKind, MediaOutcome};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MediaTally {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl MediaTally {
    fn record(&mut self, outcome: &MediaOutcome) {
        match outcome {
            MediaOutcome::Downloaded(_) => self.downloaded += 1,
            MediaOutcome::Skipped(_) => self.skipped += 1,
            MediaOutcome::Failed(_) => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaStats {
    pub icon: MediaTally,
    pub attachment: MediaTally,
    pub thumbnail: MediaTally,
    pub image: MediaTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbandonedChannel {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaFailure {
    pub kind: &'static str,
    pub url: String,
    pub reason: String,
}

/// Diagnostics collected over one archival run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub server_id: String,
    pub server_name: String,
    pub channels_seen: usize,
    pub channels_archived: Vec<String>,
    pub channels_empty: Vec<String>,
    pub channels_abandoned: Vec<AbandonedChannel>,
    pub records_archived: usize,
    pub media: MediaStats,
    pub media_failures: Vec<MediaFailure>,
    pub render_placeholders: usize,
    pub cleanup_failures: usize,
    pub output_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn record_media(&mut self, kind: MediaKind, url: &str, outcome: &MediaOutcome) {
        let tally = match kind {
            MediaKind::Icon => &mut self.media.icon,
            MediaKind::Attachment => &mut self.media.attachment,
            MediaKind::EmbedThumbnail => &mut self.media.thumbnail,
            MediaKind::EmbedImage => &mut self.media.image,
        };
        tally.record(outcome);

        if let MediaOutcome::Failed(reason) = outcome {
            self.media_failures.push(MediaFailure {
                kind: kind.as_str(),
                url: url.to_string(),
                reason: reason.clone(),
            });
        }
    }

    pub fn abandon_channel(&mut self, name: &str, reason: impl Into<String>) {
        self.channels_abandoned.push(AbandonedChannel {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn log(&self) {
        let failed_media = self.media.icon.failed
            + self.media.attachment.failed
            + self.media.thumbnail.failed
            + self.media.image.failed;
        info!(
            server = %self.server_name,
            channels_seen = self.channels_seen,
            channels_archived = self.channels_archived.len(),
            channels_empty = self.channels_empty.len(),
            channels_abandoned = self.channels_abandoned.len(),
            records = self.records_archived,
            media_failed = failed_media,
            placeholders = self.render_placeholders,
            cleanup_failures = self.cleanup_failures,
            "Archive run finished"
        );
    }
}
