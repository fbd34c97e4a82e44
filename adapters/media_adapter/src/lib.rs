use archive_core::media::{remove_transient_file, MediaOutcome};
use archive_core::ports::MediaFetcher;
use archive_core::utils::sanitize_filename;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Query parameters that carry the CDN access signature
const SIGNED_PARAMS: [&str; 3] = ["ex", "is", "hm"];

/// The CDN rejects default client identifiers
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 5,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Downloads media over HTTP with at most one attempt per call
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(config: &FetcherConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    fn download(&self, url: &str, destination: &Path) -> MediaOutcome {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => return MediaOutcome::Failed(format!("timed out: {err}")),
            Err(err) => return MediaOutcome::Failed(err.to_string()),
        };

        let status = resp.status();
        if status.is_server_error() {
            return MediaOutcome::Failed(format!("server returned {status}"));
        }
        if status != StatusCode::OK {
            return MediaOutcome::Skipped(format!("server returned {status}"));
        }
        if let Some(content_type) = unexpected_content_type(&resp) {
            return MediaOutcome::Failed(format!("unexpected content type {content_type}"));
        }

        match write_body(resp, destination) {
            Ok(0) => {
                discard_partial(destination);
                MediaOutcome::Failed("empty response body".to_string())
            }
            Ok(bytes) => {
                debug!(path = %destination.display(), bytes, "Media written");
                MediaOutcome::Downloaded(destination.to_path_buf())
            }
            Err(err) => {
                discard_partial(destination);
                MediaOutcome::Failed(format!("write to {} failed: {err}", destination.display()))
            }
        }
    }
}

impl MediaFetcher for HttpMediaFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> MediaOutcome {
        let url = clean_media_url(url);
        let destination = sanitize_destination(destination);
        debug!(%url, path = %destination.display(), "Fetching media");
        self.download(&url, &destination)
    }
}

/// Drops query parameters except the ones that sign private CDN links
pub fn clean_media_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| SIGNED_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_fragment(None);
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

/// Replaces filesystem-illegal characters in the final path component
pub fn sanitize_destination(destination: &Path) -> PathBuf {
    match destination.file_name().and_then(|name| name.to_str()) {
        Some(name) => destination.with_file_name(sanitize_filename(name)),
        None => destination.to_path_buf(),
    }
}

fn unexpected_content_type(resp: &Response) -> Option<String> {
    let content_type = resp.headers().get(CONTENT_TYPE)?.to_str().ok()?.to_ascii_lowercase();
    let accepted = content_type.starts_with("image/") || content_type.starts_with("application/octet-stream");
    (!accepted).then_some(content_type)
}

/// Removes a partially written file; returns false when it is left behind
fn discard_partial(destination: &Path) -> bool {
    match remove_transient_file(destination) {
        Ok(_) => true,
        Err(err) => {
            warn!(path = %destination.display(), "Partial media file could not be removed: {err}");
            false
        }
    }
}

/// Streams the body to disk and returns once the data is synced
fn write_body(mut resp: Response, destination: &Path) -> io::Result<u64> {
    let file = File::create(destination)?;
    let mut writer = BufWriter::new(file);
    let bytes = resp
        .copy_to(&mut writer)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    Ok(bytes)
}
