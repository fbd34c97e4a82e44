use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Authenticated account returned by a successful login
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub tag: String,
}

/// Server (guild) metadata as reported by the platform
#[derive(Debug, Clone)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
    pub icon_url: Option<String>,
}

/// A text channel of a server
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

/// One message exactly as the platform hands it over
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: String,
    pub author_tag: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub embeds: Vec<RawEmbed>,
    pub attachments: Vec<RawAttachment>,
}

#[derive(Debug, Clone, Default)]
pub struct RawEmbed {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub author: Option<EmbedAuthor>,
    pub footer: Option<String>,
    pub color: Option<u32>,
    pub timestamp: Option<String>,
    pub fields: Vec<EmbedField>,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawAttachment {
    pub id: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// One rich-content block attached to an archived message
#[derive(Debug, Clone, Default)]
pub struct EmbedRecord {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub author: Option<EmbedAuthor>,
    pub footer: Option<String>,
    pub color: Option<u32>,
    pub timestamp: Option<String>,
    pub fields: Vec<EmbedField>,
    pub thumbnail_path: Option<PathBuf>,
    pub image_path: Option<PathBuf>,
}

/// One chat message, normalized for rendering
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub created_at_display: String,
    pub embeds: Vec<EmbedRecord>,
    /// First successfully downloaded image attachment
    pub media_path: Option<PathBuf>,
    /// Any further image attachments of the same message
    pub extra_media_paths: Vec<PathBuf>,
}

impl ArchiveRecord {
    /// Every local file this record refers to, in render order.
    pub fn media_files(&self) -> impl Iterator<Item = &Path> {
        let embed_files = self.embeds.iter().flat_map(|embed| {
            embed
                .thumbnail_path
                .iter()
                .chain(embed.image_path.iter())
                .map(PathBuf::as_path)
        });
        embed_files
            .chain(self.media_path.iter().map(PathBuf::as_path))
            .chain(self.extra_media_paths.iter().map(PathBuf::as_path))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub id: String,
    pub icon_path: Option<PathBuf>,
}

/// Channel name to ordered records, kept in channel enumeration order
#[derive(Debug, Clone, Default)]
pub struct ChannelArchive {
    sections: Vec<(String, Vec<ArchiveRecord>)>,
}

impl ChannelArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a channel section. Empty sections are never stored.
    pub fn insert(&mut self, channel_name: impl Into<String>, records: Vec<ArchiveRecord>) -> bool {
        if records.is_empty() {
            return false;
        }
        self.sections.push((channel_name.into(), records));
        true
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn record_count(&self) -> usize {
        self.sections.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &[ArchiveRecord])> {
        self.sections
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn records(&self) -> impl Iterator<Item = &ArchiveRecord> {
        self.sections.iter().flat_map(|(_, records)| records.iter())
    }
}
