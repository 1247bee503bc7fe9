use std::error::Error as _;
use std::io;

use album_core::{FetchError, FetchSettings, NetworkErrorKind, RetryPolicy, SkipReason};
use album_logging::{album_debug, album_warn};
use encoding_rs::{Encoding, UTF_8};
use futures_util::StreamExt;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, PRAGMA, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};

use crate::pacing::pause;
use crate::user_agent::UserAgentRotator;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Single HTTP GET of a document; returns the decoded HTML.
#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
    agents: UserAgentRotator,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        Self::with_user_agents(settings, UserAgentRotator::default())
    }

    pub fn with_user_agents(
        settings: FetchSettings,
        agents: UserAgentRotator,
    ) -> Result<Self, FetchError> {
        // Certificate checks are relaxed only through the explicit
        // `accept_invalid_certs` setting.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|err| FetchError::new(NetworkErrorKind::Other, err.to_string()))?;
        Ok(Self {
            client,
            settings,
            agents,
        })
    }

    fn request(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(USER_AGENT, self.agents.next_agent())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, self.settings.accept_language.as_str())
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header(UPGRADE_INSECURE_REQUESTS, "1")
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(NetworkErrorKind::Other, err.to_string()))?;

        let response = self
            .request(parsed)
            .send()
            .await
            .map_err(|err| map_reqwest_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                NetworkErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_charset);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(&err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        album_debug!("fetched {} bytes from {}", bytes.len(), url);
        Ok(decode(&bytes, charset.as_deref()))
    }
}

/// Fetches `url`, retrying transport failures with linear backoff.
///
/// Non-retryable failures (HTTP status codes, malformed URLs) return after the
/// first attempt as [`SkipReason::Fetch`].
pub async fn fetch_with_retry(
    fetcher: &dyn DocumentFetcher,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, SkipReason> {
    let mut state = policy.start();
    loop {
        match fetcher.fetch(url).await {
            Ok(html) => return Ok(html),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(SkipReason::Fetch(err));
                }
                if !state.record_failure(err.kind) {
                    return Err(SkipReason::RetriesExhausted {
                        attempts: state.attempts_made(),
                        error: err,
                    });
                }
                let backoff = policy.backoff(state.attempt);
                album_warn!(
                    "fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    err,
                    state.attempt,
                    policy.max_retries,
                    backoff
                );
                pause(backoff).await;
            }
        }
    }
}

fn map_reqwest_error(err: &reqwest::Error) -> FetchError {
    FetchError::new(classify(err), err.to_string())
}

fn classify(err: &reqwest::Error) -> NetworkErrorKind {
    if err.is_timeout() {
        return NetworkErrorKind::Timeout;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::TimedOut => return NetworkErrorKind::Timeout,
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => return NetworkErrorKind::ConnectionReset,
                _ => {}
            }
        }
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
        {
            return NetworkErrorKind::DnsFailure;
        }
        source = cause.source();
    }

    // The body stream broke after headers arrived.
    if err.is_body() {
        return NetworkErrorKind::ConnectionReset;
    }
    NetworkErrorKind::Other
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        NetworkErrorKind::Other,
        format!("response too large (max {max_bytes}, actual {actual})"),
    )
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\'']).to_string())
    })
}

fn decode(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| charset.and_then(|label| Encoding::for_label(label.as_bytes())))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_is_read_from_content_type() {
        assert_eq!(
            extract_charset("text/html; Charset=\"GBK\"").as_deref(),
            Some("GBK")
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn decode_honours_bom_then_charset() {
        assert_eq!(decode(b"\xEF\xBB\xBFhello", Some("iso-8859-1")), "hello");
        assert_eq!(decode(b"caf\xe9", Some("ISO-8859-1")), "café");
        assert_eq!(decode("中文".as_bytes(), None), "中文");
    }
}
