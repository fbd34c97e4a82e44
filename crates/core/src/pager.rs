use crate::domain::{ChannelInfo, RawMessage};
use crate::error::PlatformError;
use crate::ports::ChatPlatform;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Walks a channel's history backward in fixed-size pages.
///
/// Each item is one page as returned by the platform (newest first). The
/// sequence ends after an empty page, a short page, or the first error, and
/// cannot be restarted. Between two requests the pager sleeps for the
/// configured delay.
pub struct MessagePager<'a, P: ChatPlatform + ?Sized> {
    platform: &'a P,
    channel: &'a ChannelInfo,
    page_size: usize,
    page_delay: Duration,
    before: Option<String>,
    pages_fetched: usize,
    done: bool,
    sleep: Box<dyn FnMut(Duration) + 'a>,
}

impl<'a, P: ChatPlatform + ?Sized> MessagePager<'a, P> {
    pub fn new(platform: &'a P, channel: &'a ChannelInfo, page_size: usize, page_delay: Duration) -> Self {
        Self {
            platform,
            channel,
            page_size: page_size.max(1),
            page_delay,
            before: None,
            pages_fetched: 0,
            done: false,
            sleep: Box::new(thread::sleep),
        }
    }

    /// Replaces the blocking sleep used for the inter-page delay
    pub fn with_sleeper(mut self, sleep: impl FnMut(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Number of non-empty pages handed out so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn oldest_id(page: &[RawMessage]) -> Option<String> {
        // min_by_key keeps the first minimum; reversing keeps the last one,
        // which is the oldest in newest-first source order.
        page.iter()
            .rev()
            .min_by_key(|message| message.created_at)
            .map(|message| message.id.clone())
    }
}

impl<P: ChatPlatform + ?Sized> Iterator for MessagePager<'_, P> {
    type Item = Result<Vec<RawMessage>, PlatformError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.pages_fetched > 0 && !self.page_delay.is_zero() {
            (self.sleep)(self.page_delay);
        }

        let page = match self
            .platform
            .fetch_message_page(self.channel, self.before.as_deref(), self.page_size)
        {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        if page.is_empty() {
            debug!(channel = %self.channel.name, "Reached the beginning of the channel");
            self.done = true;
            return None;
        }

        self.pages_fetched += 1;
        debug!(
            channel = %self.channel.name,
            page = self.pages_fetched,
            size = page.len(),
            "Fetched message page"
        );

        if page.len() < self.page_size {
            self.done = true;
        }

        let cursor = Self::oldest_id(&page);
        if cursor.is_some() && cursor == self.before {
            warn!(channel = %self.channel.name, "Page cursor did not advance, stopping");
            self.done = true;
        }
        self.before = cursor;

        Some(Ok(page))
    }
}
