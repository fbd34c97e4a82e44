use crate::domain::{ArchiveRecord, ChannelArchive, EmbedRecord, ServerInfo};
use crate::error::CanvasError;
use crate::ports::{DocumentCanvas, Frame, Rgb, TextStyle};
use crate::utils::{format_timestamp_display, printable_text};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use tracing::{debug, warn};

pub const MARGIN: f32 = 50.0;
pub const IMAGE_PLACEHOLDER: &str = "[Image could not be embedded]";

const LINE_SPACING: f32 = 1.25;
/// Average Helvetica glyph width as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.5;
const EMBED_INDENT: f32 = 12.0;
const RECORD_GAP: f32 = 10.0;
const DEFAULT_EMBED_COLOR: Rgb = Rgb { r: 0x4f, g: 0x54, b: 0x5c };

const ICON_BOX: (f32, f32) = (128.0, 128.0);
const THUMBNAIL_BOX: (f32, f32) = (120.0, 120.0);
const IMAGE_BOX: (f32, f32) = (500.0, 300.0);

/// Lays out an archive onto a canvas, top to bottom, starting new pages as
/// content overflows.
pub struct DocumentBuilder<'c> {
    canvas: &'c mut dyn DocumentCanvas,
    page_width: f32,
    page_height: f32,
    cursor_y: f32,
    placeholders: usize,
}

impl<'c> DocumentBuilder<'c> {
    pub fn new(canvas: &'c mut dyn DocumentCanvas) -> Self {
        let (page_width, page_height) = canvas.page_size();
        Self {
            canvas,
            page_width,
            page_height,
            cursor_y: MARGIN,
            placeholders: 0,
        }
    }

    /// Renders the title page and one section per channel. Returns the
    /// number of images replaced by a placeholder.
    pub fn build(
        mut self,
        server: &ServerInfo,
        archive: &ChannelArchive,
        archived_at: &DateTime<Utc>,
    ) -> Result<usize, CanvasError> {
        self.title_page(server, archived_at)?;
        for (channel_name, records) in archive.sections() {
            debug!(channel = channel_name, records = records.len(), "Rendering channel");
            self.new_page()?;
            self.text(&format!("Channel: {channel_name}"), 16.0, TextStyle::Bold, 0.0)?;
            let rule = Frame {
                x: MARGIN,
                y: self.cursor_y,
                width: self.content_width(),
                height: 1.0,
            };
            self.canvas.draw_rect(rule, Rgb { r: 0, g: 0, b: 0 })?;
            self.move_down(12.0);

            for record in records {
                self.record(record)?;
            }
        }
        Ok(self.placeholders)
    }

    fn title_page(&mut self, server: &ServerInfo, archived_at: &DateTime<Utc>) -> Result<(), CanvasError> {
        self.new_page()?;
        self.text("Server Archive", 24.0, TextStyle::Bold, 0.0)?;
        self.move_down(12.0);
        self.text(&format!("Server: {}", server.name), 14.0, TextStyle::Regular, 0.0)?;
        self.text(&format!("Server ID: {}", server.id), 12.0, TextStyle::Regular, 0.0)?;
        self.text(
            &format!(
                "Archived at: {}",
                archived_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            12.0,
            TextStyle::Regular,
            0.0,
        )?;
        if let Some(icon) = &server.icon_path {
            self.move_down(12.0);
            self.image(icon, ICON_BOX, 0.0)?;
        }
        Ok(())
    }

    fn record(&mut self, record: &ArchiveRecord) -> Result<(), CanvasError> {
        self.text(
            &format!("[{}] {}", record.created_at_display, record.author),
            10.0,
            TextStyle::Bold,
            0.0,
        )?;
        if !record.content.trim().is_empty() {
            self.text(&record.content, 12.0, TextStyle::Regular, 0.0)?;
        }
        for embed in &record.embeds {
            self.embed(embed)?;
        }
        for path in record.media_path.iter().chain(record.extra_media_paths.iter()) {
            self.image(path, IMAGE_BOX, 0.0)?;
        }
        self.move_down(RECORD_GAP);
        Ok(())
    }

    fn embed(&mut self, embed: &EmbedRecord) -> Result<(), CanvasError> {
        self.ensure_space(6.0)?;
        let bar = Frame {
            x: MARGIN + EMBED_INDENT,
            y: self.cursor_y + 2.0,
            width: self.content_width() - EMBED_INDENT,
            height: 2.0,
        };
        let color = embed.color.map(Rgb::from_packed).unwrap_or(DEFAULT_EMBED_COLOR);
        self.canvas.draw_rect(bar, color)?;
        self.move_down(6.0);

        let heading = match (&embed.title, &embed.url) {
            (Some(title), Some(url)) => Some(format!("{title} ({url})")),
            (Some(title), None) => Some(title.clone()),
            (None, Some(url)) => Some(url.clone()),
            (None, None) => None,
        };
        if let Some(heading) = heading {
            self.text(&heading, 11.0, TextStyle::Bold, EMBED_INDENT)?;
        }
        if let Some(author) = &embed.author {
            let line = match &author.url {
                Some(url) => format!("{} ({})", author.name, url),
                None => author.name.clone(),
            };
            self.text(&line, 9.0, TextStyle::Italic, EMBED_INDENT)?;
        }
        if let Some(description) = &embed.description {
            self.text(description, 10.0, TextStyle::Regular, EMBED_INDENT)?;
        }
        for field in &embed.fields {
            let line = format!("{}: {}", field.name, field.value);
            self.text(&line, 10.0, TextStyle::Regular, EMBED_INDENT)?;
        }
        if let Some(path) = &embed.thumbnail_path {
            self.image(path, THUMBNAIL_BOX, EMBED_INDENT)?;
        }
        if let Some(path) = &embed.image_path {
            let width = IMAGE_BOX.0.min(self.content_width() - EMBED_INDENT);
            self.image(path, (width, IMAGE_BOX.1), EMBED_INDENT)?;
        }

        let timestamp = embed.timestamp.as_deref().map(format_timestamp_display);
        let footer = match (embed.footer.as_deref(), timestamp.as_deref()) {
            (Some(text), Some(ts)) => Some(format!("{text} • {ts}")),
            (Some(text), None) => Some(text.to_string()),
            (None, Some(ts)) => Some(ts.to_string()),
            (None, None) => None,
        };
        if let Some(footer) = footer {
            self.text(&footer, 8.0, TextStyle::Italic, EMBED_INDENT)?;
        }
        self.move_down(4.0);
        Ok(())
    }

    fn image(&mut self, path: &Path, (max_width, max_height): (f32, f32), indent: f32) -> Result<(), CanvasError> {
        self.ensure_space(max_height)?;
        let frame = Frame {
            x: MARGIN + indent,
            y: self.cursor_y,
            width: max_width,
            height: max_height,
        };
        match self.canvas.place_image(path, frame) {
            Ok(used) => {
                self.move_down(used + 4.0);
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), "Image could not be embedded: {err}");
                self.placeholders += 1;
                self.text(IMAGE_PLACEHOLDER, 10.0, TextStyle::Italic, indent)
            }
        }
    }

    fn text(&mut self, text: &str, size: f32, style: TextStyle, indent: f32) -> Result<(), CanvasError> {
        let line_height = size * LINE_SPACING;
        let width = self.content_width() - indent;
        for line in wrap_text(&printable_text_keep_newlines(text), size, width) {
            self.ensure_space(line_height)?;
            if !line.is_empty() {
                self.canvas
                    .place_text(&line, MARGIN + indent, self.cursor_y, size, style)?;
            }
            self.move_down(line_height);
        }
        Ok(())
    }

    fn new_page(&mut self) -> Result<(), CanvasError> {
        self.canvas.add_page()?;
        self.cursor_y = MARGIN;
        Ok(())
    }

    fn ensure_space(&mut self, height: f32) -> Result<(), CanvasError> {
        let at_page_top = self.cursor_y <= MARGIN;
        if !at_page_top && self.cursor_y + height > self.page_height - MARGIN {
            self.new_page()?;
        }
        Ok(())
    }

    fn move_down(&mut self, amount: f32) {
        self.cursor_y += amount;
    }

    fn content_width(&self) -> f32 {
        self.page_width - 2.0 * MARGIN
    }
}

fn printable_text_keep_newlines(text: &str) -> String {
    text.split('\n')
        .map(printable_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word wrap using an average glyph width. Explicit newlines are
/// kept; words longer than a line are split.
pub fn wrap_text(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * GLYPH_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            loop {
                let current_len = current.chars().count();
                let needed = if current.is_empty() { word.len() } else { current_len + 1 + word.len() };
                if needed <= max_chars {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.extend(word.iter());
                    break;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    continue;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
                if word.is_empty() {
                    break;
                }
            }
        }
        lines.push(current);
    }
    lines
}
