use crate::domain::{ChannelInfo, GuildInfo, RawMessage, SessionUser};
use crate::error::{CanvasError, PlatformError};
use crate::media::MediaOutcome;
use std::path::Path;

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Transport-level access to the chat platform
pub trait ChatPlatform {
    /// Validates the credential and returns the account it belongs to
    fn login(&self) -> Result<SessionUser>;

    fn fetch_guild(&self, guild_id: &str) -> Result<GuildInfo>;

    /// Lists the text-capable channels of a guild in platform display order
    fn list_text_channels(&self, guild: &GuildInfo) -> Result<Vec<ChannelInfo>>;

    /// Fetches up to `limit` messages strictly older than `before`, newest first.
    /// `before = None` starts from the newest message.
    fn fetch_message_page(
        &self,
        channel: &ChannelInfo,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawMessage>>;

    /// Fetches one message with its full embed and attachment detail
    fn fetch_message(&self, channel: &ChannelInfo, message_id: &str) -> Result<RawMessage>;
}

/// Downloads one remote resource to a local path. Never fails loudly:
/// every problem is folded into the returned outcome.
pub trait MediaFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> MediaOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Regular,
    Bold,
    Italic,
}

/// Axis-aligned box in points, origin at the top-left of the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn from_packed(color: u32) -> Self {
        Self {
            r: ((color >> 16) & 0xff) as u8,
            g: ((color >> 8) & 0xff) as u8,
            b: (color & 0xff) as u8,
        }
    }
}

/// Drawing primitives offered by the document library
pub trait DocumentCanvas {
    /// Page size in points as (width, height)
    fn page_size(&self) -> (f32, f32);

    fn add_page(&mut self) -> std::result::Result<(), CanvasError>;

    /// Places a single line of text with its top edge at `y`
    fn place_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        style: TextStyle,
    ) -> std::result::Result<(), CanvasError>;

    /// Fits the image inside `frame` keeping its aspect ratio and returns
    /// the height actually used
    fn place_image(&mut self, path: &Path, frame: Frame) -> std::result::Result<f32, CanvasError>;

    fn draw_rect(&mut self, frame: Frame, color: Rgb) -> std::result::Result<(), CanvasError>;

    fn save(&mut self, path: &Path) -> std::result::Result<(), CanvasError>;
}

/// Creates fresh canvases for output documents
pub trait DocumentRenderer {
    fn new_canvas(&self, title: &str) -> std::result::Result<Box<dyn DocumentCanvas>, CanvasError>;
}
