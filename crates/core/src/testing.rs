//! In-memory port doubles shared by the unit tests of this crate.

use crate::domain::{ChannelInfo, GuildInfo, RawAttachment, RawEmbed, RawMessage, SessionUser};
use crate::error::{CanvasError, PlatformError};
use crate::media::MediaOutcome;
use crate::ports::{ChatPlatform, DocumentCanvas, DocumentRenderer, Frame, MediaFetcher, Rgb, TextStyle};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn message(id: &str, secs: i64) -> RawMessage {
    RawMessage {
        id: id.to_string(),
        author_tag: "user#0001".to_string(),
        content: format!("message {id}"),
        created_at: at(secs),
        embeds: Vec::new(),
        attachments: Vec::new(),
    }
}

pub fn attachment(id: &str, filename: &str, url: &str) -> RawAttachment {
    RawAttachment {
        id: id.to_string(),
        filename: filename.to_string(),
        url: url.to_string(),
    }
}

pub fn embed_with_media(thumbnail: Option<&str>, image: Option<&str>) -> RawEmbed {
    RawEmbed {
        title: Some("Embed title".to_string()),
        thumbnail_url: thumbnail.map(str::to_string),
        image_url: image.map(str::to_string),
        ..Default::default()
    }
}

/// Chat platform double serving scripted histories (stored newest first)
#[derive(Default)]
pub struct ScriptedPlatform {
    guild: Option<GuildInfo>,
    channels: Vec<ChannelInfo>,
    histories: HashMap<String, Vec<RawMessage>>,
    stuck: HashMap<String, Vec<RawMessage>>,
    details: HashMap<String, RawMessage>,
    fail_page_after: HashMap<String, usize>,
    fail_refetch: HashSet<String>,
    fail_login: bool,
    fail_channel_listing: bool,
    page_calls: Cell<usize>,
    calls_per_channel: RefCell<HashMap<String, usize>>,
    cursors: RefCell<Vec<Option<String>>>,
    refetches: RefCell<Vec<String>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self {
            guild: Some(GuildInfo {
                id: "g1".to_string(),
                name: "Foo".to_string(),
                icon_url: None,
            }),
            ..Default::default()
        }
    }

    /// One channel `general` holding `count` messages `0001..=count`,
    /// one second apart.
    pub fn with_history(channel_id: &str, count: usize) -> Self {
        let messages = (1..=count)
            .map(|n| message(&format!("{n:04}"), n as i64))
            .collect();
        Self::new().with_channel(channel_id, "general", messages)
    }

    /// Adds a channel; `messages` are given oldest first.
    pub fn with_channel(mut self, channel_id: &str, name: &str, mut messages: Vec<RawMessage>) -> Self {
        messages.reverse();
        self.channels.push(ChannelInfo {
            id: channel_id.to_string(),
            name: name.to_string(),
        });
        self.histories.insert(channel_id.to_string(), messages);
        self
    }

    /// Adds a channel whose listing ignores the cursor and returns `page` forever
    pub fn with_stuck_channel(mut self, channel_id: &str, page: Vec<RawMessage>) -> Self {
        self.channels.push(ChannelInfo {
            id: channel_id.to_string(),
            name: "stuck".to_string(),
        });
        self.stuck.insert(channel_id.to_string(), page);
        self
    }

    /// Serves `detail` from the single-message lookup instead of the page copy
    pub fn with_detail(mut self, detail: RawMessage) -> Self {
        self.details.insert(detail.id.clone(), detail);
        self
    }

    pub fn with_icon(mut self, url: &str) -> Self {
        if let Some(guild) = self.guild.as_mut() {
            guild.icon_url = Some(url.to_string());
        }
        self
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn failing_channel_listing(mut self) -> Self {
        self.fail_channel_listing = true;
        self
    }

    /// Page requests for `channel_id` fail once `ok_pages` have been served
    pub fn fail_page_after(mut self, channel_id: &str, ok_pages: usize) -> Self {
        self.fail_page_after.insert(channel_id.to_string(), ok_pages);
        self
    }

    pub fn fail_refetch(mut self, message_id: &str) -> Self {
        self.fail_refetch.insert(message_id.to_string());
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.get()
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.borrow().clone()
    }

    pub fn refetches(&self) -> Vec<String> {
        self.refetches.borrow().clone()
    }
}

impl ChatPlatform for ScriptedPlatform {
    fn login(&self) -> Result<SessionUser, PlatformError> {
        if self.fail_login {
            return Err(PlatformError::Unauthorized("401 Unauthorized".to_string()));
        }
        Ok(SessionUser {
            id: "u1".to_string(),
            tag: "archiver".to_string(),
        })
    }

    fn fetch_guild(&self, guild_id: &str) -> Result<GuildInfo, PlatformError> {
        match &self.guild {
            Some(guild) if guild.id == guild_id => Ok(guild.clone()),
            _ => Err(PlatformError::Status {
                status: 404,
                endpoint: format!("/guilds/{guild_id}"),
            }),
        }
    }

    fn list_text_channels(&self, _guild: &GuildInfo) -> Result<Vec<ChannelInfo>, PlatformError> {
        if self.fail_channel_listing {
            return Err(PlatformError::Transport("connection reset".to_string()));
        }
        Ok(self.channels.clone())
    }

    fn fetch_message_page(
        &self,
        channel: &ChannelInfo,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawMessage>, PlatformError> {
        self.page_calls.set(self.page_calls.get() + 1);
        self.cursors.borrow_mut().push(before.map(str::to_string));

        let served = {
            let mut calls = self.calls_per_channel.borrow_mut();
            let entry = calls.entry(channel.id.clone()).or_insert(0);
            *entry += 1;
            *entry - 1
        };
        if let Some(ok_pages) = self.fail_page_after.get(&channel.id) {
            if served >= *ok_pages {
                return Err(PlatformError::Status {
                    status: 500,
                    endpoint: format!("/channels/{}/messages", channel.id),
                });
            }
        }

        if let Some(page) = self.stuck.get(&channel.id) {
            return Ok(page.clone());
        }

        let history = self.histories.get(&channel.id).cloned().unwrap_or_default();
        let start = match before {
            Some(id) => history
                .iter()
                .position(|m| m.id == id)
                .map(|idx| idx + 1)
                .unwrap_or(history.len()),
            None => 0,
        };
        Ok(history.into_iter().skip(start).take(limit).collect())
    }

    fn fetch_message(&self, channel: &ChannelInfo, message_id: &str) -> Result<RawMessage, PlatformError> {
        self.refetches.borrow_mut().push(message_id.to_string());
        if self.fail_refetch.contains(message_id) {
            return Err(PlatformError::Status {
                status: 404,
                endpoint: format!("/channels/{}/messages/{message_id}", channel.id),
            });
        }
        if let Some(detail) = self.details.get(message_id) {
            return Ok(detail.clone());
        }
        self.histories
            .get(&channel.id)
            .and_then(|history| history.iter().find(|m| m.id == message_id))
            .cloned()
            .ok_or_else(|| PlatformError::Decode(format!("unknown message {message_id}")))
    }
}

/// Media fetcher double. URLs containing `missing` are skipped, URLs
/// containing `down` fail, everything else writes a small file.
#[derive(Default)]
pub struct ScriptedFetcher {
    calls: RefCell<Vec<(String, PathBuf)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.borrow().clone()
    }
}

impl MediaFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> MediaOutcome {
        self.calls
            .borrow_mut()
            .push((url.to_string(), destination.to_path_buf()));
        if url.contains("missing") {
            return MediaOutcome::Skipped("status 404".to_string());
        }
        if url.contains("down") {
            return MediaOutcome::Failed("connection refused".to_string());
        }
        match fs::write(destination, b"img") {
            Ok(()) => MediaOutcome::Downloaded(destination.to_path_buf()),
            Err(err) => MediaOutcome::Failed(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    Page,
    Text { text: String, style: TextStyle, size: f32, y: f32 },
    Image { path: PathBuf, frame: Frame },
    Rect { frame: Frame, color: Rgb },
    Save(PathBuf),
}

pub type CanvasLog = Rc<RefCell<Vec<CanvasOp>>>;

/// Canvas double that records every primitive. Images whose file is absent
/// or whose name contains `corrupt` are rejected.
pub struct RecordingCanvas {
    log: CanvasLog,
    has_page: bool,
}

impl RecordingCanvas {
    pub fn new(log: CanvasLog) -> Self {
        Self { log, has_page: false }
    }
}

impl DocumentCanvas for RecordingCanvas {
    fn page_size(&self) -> (f32, f32) {
        (612.0, 792.0)
    }

    fn add_page(&mut self) -> Result<(), CanvasError> {
        self.has_page = true;
        self.log.borrow_mut().push(CanvasOp::Page);
        Ok(())
    }

    fn place_text(&mut self, text: &str, _x: f32, y: f32, size: f32, style: TextStyle) -> Result<(), CanvasError> {
        if !self.has_page {
            return Err(CanvasError::NoPage);
        }
        self.log.borrow_mut().push(CanvasOp::Text {
            text: text.to_string(),
            style,
            size,
            y,
        });
        Ok(())
    }

    fn place_image(&mut self, path: &Path, frame: Frame) -> Result<f32, CanvasError> {
        let corrupt = path.to_string_lossy().contains("corrupt");
        if !path.exists() || corrupt {
            return Err(CanvasError::Image {
                path: path.to_path_buf(),
                reason: "unreadable".to_string(),
            });
        }
        self.log.borrow_mut().push(CanvasOp::Image {
            path: path.to_path_buf(),
            frame,
        });
        Ok(frame.height / 2.0)
    }

    fn draw_rect(&mut self, frame: Frame, color: Rgb) -> Result<(), CanvasError> {
        self.log.borrow_mut().push(CanvasOp::Rect { frame, color });
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), CanvasError> {
        fs::write(path, b"%PDF-test").map_err(|err| CanvasError::Save {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        self.log.borrow_mut().push(CanvasOp::Save(path.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub log: CanvasLog,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<CanvasOp> {
        self.log.borrow().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                CanvasOp::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl DocumentRenderer for RecordingRenderer {
    fn new_canvas(&self, _title: &str) -> Result<Box<dyn DocumentCanvas>, CanvasError> {
        Ok(Box::new(RecordingCanvas::new(Rc::clone(&self.log))))
    }
}

impl<T: ChatPlatform + ?Sized> ChatPlatform for Rc<T> {
    fn login(&self) -> Result<SessionUser, PlatformError> {
        (**self).login()
    }

    fn fetch_guild(&self, guild_id: &str) -> Result<GuildInfo, PlatformError> {
        (**self).fetch_guild(guild_id)
    }

    fn list_text_channels(&self, guild: &GuildInfo) -> Result<Vec<ChannelInfo>, PlatformError> {
        (**self).list_text_channels(guild)
    }

    fn fetch_message_page(
        &self,
        channel: &ChannelInfo,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawMessage>, PlatformError> {
        (**self).fetch_message_page(channel, before, limit)
    }

    fn fetch_message(&self, channel: &ChannelInfo, message_id: &str) -> Result<RawMessage, PlatformError> {
        (**self).fetch_message(channel, message_id)
    }
}

impl<T: MediaFetcher + ?Sized> MediaFetcher for Rc<T> {
    fn fetch(&self, url: &str, destination: &Path) -> MediaOutcome {
        (**self).fetch(url, destination)
    }
}

impl<T: DocumentRenderer + ?Sized> DocumentRenderer for Rc<T> {
    fn new_canvas(&self, title: &str) -> Result<Box<dyn DocumentCanvas>, CanvasError> {
        (**self).new_canvas(title)
    }
}
