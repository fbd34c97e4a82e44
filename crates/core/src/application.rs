use crate::channel::ChannelArchiver;
use crate::config::ArchiveConfig;
use crate::document::DocumentBuilder;
use crate::domain::{ArchiveRecord, ChannelArchive, GuildInfo, ServerInfo, SessionUser};
use crate::error::ArchiveError;
use crate::media::{MediaKind, MediaOutcome, MediaWorkspace};
use crate::normalizer::RecordNormalizer;
use crate::ports::{ChatPlatform, DocumentRenderer, MediaFetcher};
use crate::summary::RunSummary;
use crate::utils::output_filename;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Application service archiving one server into one document
pub struct ServerArchiver {
    platform: Box<dyn ChatPlatform>,
    fetcher: Box<dyn MediaFetcher>,
    renderer: Box<dyn DocumentRenderer>,
    config: ArchiveConfig,
    clock: fn() -> DateTime<Utc>,
}

impl ServerArchiver {
    /// Creates a new ServerArchiver with the given dependencies
    pub fn new(
        platform: Box<dyn ChatPlatform>,
        fetcher: Box<dyn MediaFetcher>,
        renderer: Box<dyn DocumentRenderer>,
        config: ArchiveConfig,
    ) -> Self {
        Self {
            platform,
            fetcher,
            renderer,
            config,
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock used to stamp the output document
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn login(&self) -> Result<SessionUser, ArchiveError> {
        let user = self.platform.login().map_err(ArchiveError::Login)?;
        info!(user = %user.tag, id = %user.id, "Logged in");
        Ok(user)
    }

    /// Archives every text channel of `server_id`.
    ///
    /// Channel failures are contained and reported in the summary; only
    /// server resolution, channel listing, workspace and output failures
    /// abort the run. Downloaded media is deleted before returning, whether
    /// or not the document was written.
    pub fn run(&self, server_id: &str) -> Result<RunSummary, ArchiveError> {
        let guild = self
            .platform
            .fetch_guild(server_id)
            .map_err(|source| ArchiveError::ServerLookup {
                server_id: server_id.to_string(),
                source,
            })?;
        info!(server = %guild.name, id = %guild.id, "Resolved server");

        let workspace = MediaWorkspace::new(&self.config.work_dir);
        workspace
            .prepare()
            .map_err(|source| ArchiveError::Workspace {
                path: self.config.work_dir.clone(),
                source,
            })?;

        let mut summary = RunSummary {
            server_id: guild.id.clone(),
            server_name: guild.name.clone(),
            ..Default::default()
        };
        let server = self.server_info(&guild, &workspace, &mut summary);

        let channels = match self.platform.list_text_channels(&guild) {
            Ok(channels) => channels,
            Err(source) => {
                workspace.teardown(server.icon_path.as_deref(), &mut summary);
                return Err(ArchiveError::ChannelListing {
                    server_id: guild.id,
                    source,
                });
            }
        };
        summary.channels_seen = channels.len();

        let normalizer = RecordNormalizer::new(self.fetcher.as_ref(), &workspace);
        let channel_archiver = ChannelArchiver::new(self.platform.as_ref(), &normalizer, &self.config);
        let mut archive = ChannelArchive::new();
        let mut abandoned_records: Vec<ArchiveRecord> = Vec::new();

        for channel in &channels {
            info!(channel = %channel.name, "Scraping channel");
            match channel_archiver.archive(channel, &mut summary) {
                Ok(records) if records.is_empty() => {
                    info!(channel = %channel.name, "Channel has no messages, omitted");
                    summary.channels_empty.push(channel.name.clone());
                }
                Ok(records) => {
                    summary.records_archived += records.len();
                    summary.channels_archived.push(channel.name.clone());
                    archive.insert(channel.name.clone(), records);
                }
                Err((err, partial)) => {
                    error!(channel = %channel.name, "Error in channel, skipping it: {err}");
                    summary.abandon_channel(&channel.name, err.to_string());
                    abandoned_records.extend(partial);
                }
            }
        }

        let written = if archive.is_empty() {
            warn!(server = %server.name, "No channel produced any messages, no document written");
            Ok(())
        } else {
            self.write_document(&server, &archive, &mut summary)
        };

        let media = archive
            .records()
            .chain(abandoned_records.iter())
            .flat_map(|record| record.media_files())
            .chain(server.icon_path.as_deref());
        workspace.teardown(media, &mut summary);

        written?;
        summary.log();
        Ok(summary)
    }

    fn server_info(&self, guild: &GuildInfo, workspace: &MediaWorkspace, summary: &mut RunSummary) -> ServerInfo {
        let icon_path = guild.icon_url.as_deref().and_then(|url| {
            let destination = workspace.icon_path(&guild.id, url);
            let outcome = self.fetcher.fetch(url, &destination);
            summary.record_media(MediaKind::Icon, url, &outcome);
            match outcome {
                MediaOutcome::Downloaded(path) => Some(path),
                MediaOutcome::Skipped(reason) | MediaOutcome::Failed(reason) => {
                    warn!(url, "Server icon unavailable: {reason}");
                    None
                }
            }
        });

        ServerInfo {
            name: guild.name.clone(),
            id: guild.id.clone(),
            icon_path,
        }
    }

    fn write_document(
        &self,
        server: &ServerInfo,
        archive: &ChannelArchive,
        summary: &mut RunSummary,
    ) -> Result<(), ArchiveError> {
        let output_dir: &Path = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|source| ArchiveError::Output {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let archived_at = (self.clock)();
        let path = output_dir.join(output_filename(&server.name, &archived_at));

        let mut canvas = self
            .renderer
            .new_canvas(&format!("{} message archive", server.name))
            .map_err(ArchiveError::Render)?;
        let placeholders = DocumentBuilder::new(canvas.as_mut())
            .build(server, archive, &archived_at)
            .map_err(ArchiveError::Render)?;
        canvas.save(&path).map_err(ArchiveError::Render)?;

        info!(path = %path.display(), channels = archive.len(), "PDF created");
        summary.render_placeholders = placeholders;
        summary.output_path = Some(path);
        Ok(())
    }
}
