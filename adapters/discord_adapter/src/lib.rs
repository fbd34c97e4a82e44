mod models;

use archive_core::domain::{ChannelInfo, GuildInfo, RawMessage, SessionUser};
use archive_core::ports::{ChatPlatform, Result};
use archive_core::PlatformError;
use models::{ChannelDto, GuildDto, MessageDto, RateLimitDto, UserDto};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RATE_LIMIT_RETRIES: usize = 3;
const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_millis(50);
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
const CLIENT_USER_AGENT: &str = concat!("discord-archiver/", env!("CARGO_PKG_VERSION"));

/// REST implementation of the ChatPlatform port. A 429 answer is waited
/// out and retried a bounded number of times before it surfaces.
pub struct DiscordRestPlatform {
    client: Client,
    api_base: String,
    rate_limit_retries: usize,
}

impl DiscordRestPlatform {
    /// Creates a client authenticating every request with `token`
    pub fn new(token: &str, api_base: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(token)
            .map_err(|_| PlatformError::Unauthorized("token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| PlatformError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
        })
    }

    /// Caps the number of rate-limited retries per request
    pub fn with_rate_limit_retries(mut self, retries: usize) -> Self {
        self.rate_limit_retries = retries;
        self
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let endpoint = format!("{}{}", self.api_base, path);
        let mut attempt = 0;
        loop {
            debug!(%endpoint, ?query, attempt, "GET");
            match self.get_once(&endpoint, path, query) {
                Err(PlatformError::RateLimited {
                    endpoint,
                    retry_after_secs,
                }) if attempt < self.rate_limit_retries => {
                    attempt += 1;
                    let wait = rate_limit_wait(retry_after_secs);
                    warn!(%endpoint, wait_ms = wait.as_millis() as u64, attempt, "Rate limited, waiting before retry");
                    thread::sleep(wait);
                }
                other => return other,
            }
        }
    }

    fn get_once<T: DeserializeOwned>(&self, endpoint: &str, path: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .client
            .get(endpoint)
            .query(query)
            .send()
            .map_err(|err| PlatformError::Transport(err.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = resp.text().unwrap_or_default();
            return Err(PlatformError::Unauthorized(format!("{status} on {path}: {text}")));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .json::<RateLimitDto>()
                .map(|body| body.retry_after)
                .unwrap_or_default();
            return Err(PlatformError::RateLimited {
                endpoint: path.to_string(),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            return Err(PlatformError::Status {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        resp.json::<T>()
            .map_err(|err| PlatformError::Decode(format!("{path}: {err}")))
    }
}

/// Time to wait after a 429, clamped to a sane range
fn rate_limit_wait(retry_after_secs: f64) -> Duration {
    if !retry_after_secs.is_finite() || retry_after_secs <= 0.0 {
        return MIN_RATE_LIMIT_WAIT;
    }
    let secs = retry_after_secs.min(MAX_RATE_LIMIT_WAIT.as_secs_f64());
    Duration::from_secs_f64(secs).max(MIN_RATE_LIMIT_WAIT)
}

/// Query for one history page; `before` is omitted when starting from the newest message
fn page_query(before: Option<&str>, limit: usize) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(before) = before {
        query.push(("before", before.to_string()));
    }
    query
}

impl ChatPlatform for DiscordRestPlatform {
    fn login(&self) -> Result<SessionUser> {
        let user: UserDto = self.get("/users/@me", &[])?;
        Ok(user.into_session_user())
    }

    fn fetch_guild(&self, guild_id: &str) -> Result<GuildInfo> {
        let guild: GuildDto = self.get(&format!("/guilds/{guild_id}"), &[])?;
        Ok(guild.into_guild())
    }

    fn list_text_channels(&self, guild: &GuildInfo) -> Result<Vec<ChannelInfo>> {
        let channels: Vec<ChannelDto> = self.get(&format!("/guilds/{}/channels", guild.id), &[])?;
        Ok(models::text_channels(channels))
    }

    fn fetch_message_page(
        &self,
        channel: &ChannelInfo,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        let messages: Vec<MessageDto> = self.get(
            &format!("/channels/{}/messages", channel.id),
            &page_query(before, limit),
        )?;
        messages.into_iter().map(MessageDto::into_raw).collect()
    }

    fn fetch_message(&self, channel: &ChannelInfo, message_id: &str) -> Result<RawMessage> {
        let message: MessageDto =
            self.get(&format!("/channels/{}/messages/{}", channel.id, message_id), &[])?;
        message.into_raw()
    }
}
