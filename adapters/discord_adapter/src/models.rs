use archive_core::domain::{
    ChannelInfo, EmbedAuthor, EmbedField, GuildInfo, RawAttachment, RawEmbed, RawMessage, SessionUser,
};
use archive_core::PlatformError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Channel type of a plain guild text channel
pub const GUILD_TEXT: u8 = 0;

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl UserDto {
    /// `name#1234` for legacy accounts, the bare username otherwise
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(disc) if !disc.is_empty() && disc != "0" => format!("{}#{}", self.username, disc),
            _ => self.username.clone(),
        }
    }

    pub fn into_session_user(self) -> SessionUser {
        SessionUser {
            tag: self.tag(),
            id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GuildDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl GuildDto {
    pub fn into_guild(self) -> GuildInfo {
        let icon_url = self
            .icon
            .as_deref()
            .map(|hash| format!("{}/icons/{}/{}.png", CDN_BASE, self.id, hash));
        GuildInfo {
            id: self.id,
            name: self.name,
            icon_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChannelDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub position: Option<i64>,
}

/// Keeps text channels only, ordered as the client lists them
pub fn text_channels(channels: Vec<ChannelDto>) -> Vec<ChannelInfo> {
    let mut text: Vec<ChannelDto> = channels
        .into_iter()
        .filter(|channel| channel.kind == GUILD_TEXT)
        .collect();
    text.sort_by_key(|channel| {
        (
            channel.position.unwrap_or(i64::MAX),
            channel.id.parse::<u64>().unwrap_or(u64::MAX),
        )
    });
    text.into_iter()
        .map(|channel| ChannelInfo {
            name: channel.name.unwrap_or_else(|| channel.id.clone()),
            id: channel.id,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub author: UserDto,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub embeds: Vec<EmbedDto>,
    #[serde(default)]
    pub attachments: Vec<AttachmentDto>,
}

impl MessageDto {
    pub fn into_raw(self) -> Result<RawMessage, PlatformError> {
        let created_at = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|err| {
                PlatformError::Decode(format!(
                    "message {} has invalid timestamp {:?}: {err}",
                    self.id, self.timestamp
                ))
            })?
            .with_timezone(&Utc);

        Ok(RawMessage {
            author_tag: self.author.tag(),
            id: self.id,
            content: self.content,
            created_at,
            embeds: self.embeds.into_iter().map(EmbedDto::into_raw).collect(),
            attachments: self
                .attachments
                .into_iter()
                .map(|attachment| RawAttachment {
                    id: attachment.id,
                    filename: attachment.filename,
                    url: attachment.url,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbedDto {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub author: Option<EmbedAuthorDto>,
    #[serde(default)]
    pub footer: Option<EmbedFooterDto>,
    #[serde(default)]
    pub fields: Vec<EmbedFieldDto>,
    #[serde(default)]
    pub thumbnail: Option<EmbedMediaDto>,
    #[serde(default)]
    pub image: Option<EmbedMediaDto>,
}

impl EmbedDto {
    fn into_raw(self) -> RawEmbed {
        RawEmbed {
            title: self.title,
            url: self.url,
            description: self.description,
            author: self.author.map(|author| EmbedAuthor {
                name: author.name,
                url: author.url,
            }),
            footer: self.footer.map(|footer| footer.text),
            color: self.color,
            timestamp: self.timestamp,
            fields: self
                .fields
                .into_iter()
                .map(|field| EmbedField {
                    name: field.name,
                    value: field.value,
                    inline: field.inline,
                })
                .collect(),
            thumbnail_url: self.thumbnail.and_then(|media| media.url),
            image_url: self.image.and_then(|media| media.url),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbedAuthorDto {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbedFooterDto {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbedFieldDto {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Deserialize)]
pub struct EmbedMediaDto {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentDto {
    pub id: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitDto {
    #[serde(default)]
    pub retry_after: f64,
}
