use crate::config::ArchiveConfig;
use crate::domain::{ArchiveRecord, ChannelInfo, RawMessage};
use crate::error::ChannelError;
use crate::normalizer::RecordNormalizer;
use crate::pager::MessagePager;
use crate::ports::ChatPlatform;
use crate::summary::RunSummary;
use tracing::{debug, info};

/// Archives the complete history of one channel.
///
/// Any error abandons the whole channel. Records normalized before the
/// error are handed back with it so their media can still be deleted.
pub struct ChannelArchiver<'a, P: ChatPlatform + ?Sized> {
    platform: &'a P,
    normalizer: &'a RecordNormalizer<'a>,
    config: &'a ArchiveConfig,
}

pub type ChannelOutcome = Result<Vec<ArchiveRecord>, (ChannelError, Vec<ArchiveRecord>)>;

impl<'a, P: ChatPlatform + ?Sized> ChannelArchiver<'a, P> {
    pub fn new(platform: &'a P, normalizer: &'a RecordNormalizer<'a>, config: &'a ArchiveConfig) -> Self {
        Self {
            platform,
            normalizer,
            config,
        }
    }

    pub fn archive(&self, channel: &ChannelInfo, summary: &mut RunSummary) -> ChannelOutcome {
        let messages = self.collect_history(channel).map_err(|err| (err, Vec::new()))?;
        info!(channel = %channel.name, messages = messages.len(), "Collected channel history");

        let mut records = Vec::with_capacity(messages.len());
        for listed in messages {
            let detailed = match self.platform.fetch_message(channel, &listed.id) {
                Ok(detailed) => detailed,
                Err(source) => {
                    let err = ChannelError::Refetch {
                        message_id: listed.id,
                        source,
                    };
                    return Err((err, records));
                }
            };
            // Ordering comes from the listing; the detail copy only adds content.
            let detailed = RawMessage {
                created_at: listed.created_at,
                ..detailed
            };
            records.push(self.normalizer.normalize(&channel.name, detailed, summary));
        }
        Ok(records)
    }

    /// Drains the pager and sorts the merged pages oldest first. The sort is
    /// stable, so simultaneous messages keep their platform order.
    fn collect_history(&self, channel: &ChannelInfo) -> Result<Vec<RawMessage>, ChannelError> {
        let mut pager = MessagePager::new(
            self.platform,
            channel,
            self.config.effective_page_size(),
            self.config.page_delay,
        );

        let mut messages = Vec::new();
        while let Some(page) = pager.next() {
            match page {
                Ok(page) => messages.extend(page),
                Err(source) => {
                    return Err(ChannelError::Page {
                        pages_done: pager.pages_fetched(),
                        source,
                    })
                }
            }
        }
        debug!(channel = %channel.name, pages = pager.pages_fetched(), "Paging finished");

        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaWorkspace;
    use crate::testing::{attachment, message, ScriptedFetcher, ScriptedPlatform};
    use std::time::Duration;
    use tempfile::tempdir;

    fn config() -> ArchiveConfig {
        ArchiveConfig {
            page_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn general() -> ChannelInfo {
        ChannelInfo {
            id: "c1".to_string(),
            name: "general".to_string(),
        }
    }

    #[test]
    fn test_archive_sorts_full_history() {
        let dir = tempdir().unwrap();
        let ws = MediaWorkspace::new(dir.path());
        let fetcher = ScriptedFetcher::new();
        let normalizer = RecordNormalizer::new(&fetcher, &ws);
        let platform = ScriptedPlatform::with_history("c1", 150);
        let config = config();
        let archiver = ChannelArchiver::new(&platform, &normalizer, &config);
        let mut summary = RunSummary::default();

        let records = archiver.archive(&general(), &mut summary).unwrap();

        assert_eq!(platform.page_calls(), 2);
        assert_eq!(records.len(), 150);
        assert!(records.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(records.first().unwrap().id, "0001");
        assert_eq!(records.last().unwrap().id, "0150");
        assert_eq!(platform.refetches().len(), 150);
    }

    #[test]
    fn test_archive_keeps_platform_order_for_ties() {
        let dir = tempdir().unwrap();
        let ws = MediaWorkspace::new(dir.path());
        let fetcher = ScriptedFetcher::new();
        let normalizer = RecordNormalizer::new(&fetcher, &ws);
        // Given oldest first: "b" and "c" share a timestamp; the platform
        // lists newest first, so "c" arrives before "b".
        let platform = ScriptedPlatform::new().with_channel(
            "c1",
            "general",
            vec![message("a", 1), message("b", 5), message("c", 5), message("d", 9)],
        );
        let config = config();
        let archiver = ChannelArchiver::new(&platform, &normalizer, &config);
        let mut summary = RunSummary::default();

        let records = archiver.archive(&general(), &mut summary).unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_archive_uses_detail_fetch_for_content() {
        let dir = tempdir().unwrap();
        let ws = MediaWorkspace::new(dir.path());
        ws.prepare().unwrap();
        let fetcher = ScriptedFetcher::new();
        let normalizer = RecordNormalizer::new(&fetcher, &ws);

        let mut detail = message("0002", 2);
        detail
            .attachments
            .push(attachment("a1", "pic.png", "https://cdn.example/pic.png"));
        let platform = ScriptedPlatform::with_history("c1", 3).with_detail(detail);
        let config = config();
        let archiver = ChannelArchiver::new(&platform, &normalizer, &config);
        let mut summary = RunSummary::default();

        let records = archiver.archive(&general(), &mut summary).unwrap();

        assert!(records[1].media_path.is_some());
        assert!(records[0].media_path.is_none());
    }

    #[test]
    fn test_page_failure_abandons_channel() {
        let dir = tempdir().unwrap();
        let ws = MediaWorkspace::new(dir.path());
        let fetcher = ScriptedFetcher::new();
        let normalizer = RecordNormalizer::new(&fetcher, &ws);
        let platform = ScriptedPlatform::with_history("c1", 150).fail_page_after("c1", 1);
        let config = config();
        let archiver = ChannelArchiver::new(&platform, &normalizer, &config);
        let mut summary = RunSummary::default();

        let (err, partial) = archiver.archive(&general(), &mut summary).unwrap_err();

        assert!(matches!(err, ChannelError::Page { pages_done: 1, .. }));
        assert!(partial.is_empty());
        assert!(platform.refetches().is_empty());
    }

    #[test]
    fn test_refetch_failure_abandons_channel_and_returns_partial_records() {
        let dir = tempdir().unwrap();
        let ws = MediaWorkspace::new(dir.path());
        let fetcher = ScriptedFetcher::new();
        let normalizer = RecordNormalizer::new(&fetcher, &ws);
        let platform = ScriptedPlatform::with_history("c1", 5).fail_refetch("0004");
        let config = config();
        let archiver = ChannelArchiver::new(&platform, &normalizer, &config);
        let mut summary = RunSummary::default();

        let (err, partial) = archiver.archive(&general(), &mut summary).unwrap_err();

        assert!(matches!(err, ChannelError::Refetch { ref message_id, .. } if message_id == "0004"));
        assert_eq!(partial.len(), 3);
    }
}
