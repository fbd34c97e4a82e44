use crate::domain::{ArchiveRecord, EmbedRecord, RawAttachment, RawEmbed, RawMessage};
use crate::media::{is_image_filename, MediaKind, MediaOutcome, MediaWorkspace};
use crate::ports::MediaFetcher;
use crate::summary::RunSummary;
use crate::utils::display_timestamp;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Turns raw platform messages into archive records, downloading every
/// image the message references along the way.
pub struct RecordNormalizer<'a> {
    fetcher: &'a dyn MediaFetcher,
    workspace: &'a MediaWorkspace,
}

impl<'a> RecordNormalizer<'a> {
    pub fn new(fetcher: &'a dyn MediaFetcher, workspace: &'a MediaWorkspace) -> Self {
        Self { fetcher, workspace }
    }

    /// Produces exactly one record per message. Media problems only leave
    /// the matching path unset.
    pub fn normalize(&self, channel_name: &str, message: RawMessage, summary: &mut RunSummary) -> ArchiveRecord {
        let RawMessage {
            id,
            author_tag,
            content,
            created_at,
            embeds,
            attachments,
        } = message;

        let embeds = embeds
            .into_iter()
            .enumerate()
            .map(|(index, embed)| self.normalize_embed(&id, index, embed, summary))
            .collect();

        let mut media = self.download_attachments(channel_name, &id, &attachments, summary).into_iter();

        ArchiveRecord {
            created_at_display: display_timestamp(&created_at),
            id,
            author: author_tag,
            content,
            created_at,
            embeds,
            media_path: media.next(),
            extra_media_paths: media.collect(),
        }
    }

    fn normalize_embed(&self, message_id: &str, index: usize, embed: RawEmbed, summary: &mut RunSummary) -> EmbedRecord {
        let thumbnail_path = embed.thumbnail_url.as_deref().and_then(|url| {
            let destination = self
                .workspace
                .embed_path(message_id, index, MediaKind::EmbedThumbnail, url);
            self.fetch(MediaKind::EmbedThumbnail, url, destination, summary)
        });
        let image_path = embed.image_url.as_deref().and_then(|url| {
            let destination = self
                .workspace
                .embed_path(message_id, index, MediaKind::EmbedImage, url);
            self.fetch(MediaKind::EmbedImage, url, destination, summary)
        });

        EmbedRecord {
            title: embed.title,
            url: embed.url,
            description: embed.description,
            author: embed.author,
            footer: embed.footer,
            color: embed.color,
            timestamp: embed.timestamp,
            fields: embed.fields,
            thumbnail_path,
            image_path,
        }
    }

    fn download_attachments(
        &self,
        channel_name: &str,
        message_id: &str,
        attachments: &[RawAttachment],
        summary: &mut RunSummary,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for attachment in attachments {
            if !is_image_filename(&attachment.filename) {
                debug!(
                    message = message_id,
                    filename = %attachment.filename,
                    "Skipping non-image attachment"
                );
                continue;
            }
            let destination = self
                .workspace
                .attachment_path(channel_name, &attachment.id, &attachment.filename);
            if let Some(path) = self.fetch(MediaKind::Attachment, &attachment.url, destination, summary) {
                paths.push(path);
            }
        }
        paths
    }

    fn fetch(&self, kind: MediaKind, url: &str, destination: PathBuf, summary: &mut RunSummary) -> Option<PathBuf> {
        let outcome = self.fetcher.fetch(url, &destination);
        summary.record_media(kind, url, &outcome);
        match &outcome {
            MediaOutcome::Downloaded(path) => {
                debug!(kind = kind.as_str(), path = %path.display(), "Downloaded media");
            }
            MediaOutcome::Skipped(reason) => {
                debug!(kind = kind.as_str(), url, reason = %reason, "Media not downloaded");
            }
            MediaOutcome::Failed(reason) => {
                warn!(kind = kind.as_str(), url, "Error downloading media: {reason}");
            }
        }
        outcome.into_path()
    }
}
