pub mod page;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use std::{error::Error, net::IpAddr};
use url::Url;

use crate::config::HttpConfig;

const ACCEPT_HTML: &str = "text/html,*/*";
const ACCEPT_JSON: &str = "application/json,*/*;q=0.5";

/// Bodies past this size are treated as hostile and dropped.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Failure of a single outbound fetch. Never surfaced to resolver callers;
/// the enrichment layer that issued the fetch treats it as a miss.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("blocked by url policy: {0}")]
    Blocked(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "network-timeout",
            FetchError::Network(_) | FetchError::Status(_) | FetchError::Blocked(_) => {
                "network-error"
            }
            FetchError::Parse(_) => "parse-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Html,
    Json,
}

impl Accept {
    fn header_value(self) -> HeaderValue {
        match self {
            Accept::Html => HeaderValue::from_static(ACCEPT_HTML),
            Accept::Json => HeaderValue::from_static(ACCEPT_JSON),
        }
    }
}

/// Outbound GET used by every enrichment layer and the search client.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_text(&self, url: &str, accept: Accept) -> Result<String, FetchError>;
}

fn is_ip_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

fn is_literal_private(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().map(|ip| is_ip_private(&ip)).unwrap_or(false)
}

async fn resolves_to_private(host: &str, port: u16) -> bool {
    if is_literal_private(host) {
        return true;
    }

    match tokio::net::lookup_host((host, port)).await {
        Ok(mut addrs) => addrs.any(|addr| is_ip_private(&addr.ip())),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
struct UrlPolicy {
    block_private_ips: bool,
    blocked_hosts: Vec<String>,
}

impl UrlPolicy {
    /// Checks that need no DNS lookup; also applied on every redirect hop.
    fn check_static(&self, url: &Url) -> Result<(), FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::Blocked(format!(
                "scheme '{}' not allowed",
                url.scheme()
            )));
        }

        let host = url.host_str().unwrap_or_default();
        if self.blocked_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(FetchError::Blocked(format!("host '{host}' is blocked")));
        }

        if self.block_private_ips && is_literal_private(host) {
            return Err(FetchError::Blocked(format!("host '{host}' is private")));
        }

        Ok(())
    }

    /// Redirect hops only get `check_static`, so the final hop is re-checked
    /// with a DNS lookup before its body is read.
    async fn check_landed(&self, requested: &Url, landed: &Url) -> Result<(), FetchError> {
        if requested == landed {
            return Ok(());
        }
        self.check(landed).await
    }

    async fn check(&self, url: &Url) -> Result<(), FetchError> {
        self.check_static(url)?;

        let host = url.host_str().unwrap_or_default();
        let port = url.port_or_known_default().unwrap_or(443);
        if self.block_private_ips && resolves_to_private(host, port).await {
            return Err(FetchError::Blocked(format!(
                "host '{host}' resolves to a private address"
            )));
        }

        Ok(())
    }
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

/// `reqwest` backed fetcher: browser user agent, bounded timeout and
/// redirects, optional proxy.
pub struct HttpClient {
    client: reqwest::Client,
    policy: UrlPolicy,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let policy = UrlPolicy {
            block_private_ips: config.block_private_ips,
            blocked_hosts: config.blocked_hosts.clone(),
        };

        let max_redirects = config.max_redirects;
        let redirect_policy = policy.clone();
        let redirect = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                attempt.error("too many redirects")
            } else if let Err(err) = redirect_policy.check_static(attempt.url()) {
                attempt.error(err)
            } else {
                attempt.follow()
            }
        });

        let mut builder = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .redirect(redirect);

        if let Some(proxy) = &config.proxy {
            log::debug!("using proxy {proxy}");
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            policy,
        })
    }

    fn map_error(iden: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            log::debug!("{iden}: timed out");
            FetchError::Timeout
        } else {
            let msg = get_error(&err);
            log::debug!("{iden}: {msg}");
            FetchError::Network(msg)
        }
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn get_text(&self, url: &str, accept: Accept) -> Result<String, FetchError> {
        let url_parsed =
            Url::parse(url).map_err(|e| FetchError::Parse(format!("invalid url: {e}")))?;
        self.policy.check(&url_parsed).await?;

        let host = url_parsed.host_str().unwrap_or_default();
        let path = url_parsed.path();
        let iden = format!("{host}{path}");

        log::debug!("{iden}: requesting");

        let mut resp = self
            .client
            .get(url_parsed.clone())
            .header(ACCEPT, accept.header_value())
            .send()
            .await
            .map_err(|err| Self::map_error(&iden, err))?;

        if let Err(err) = self.policy.check_landed(&url_parsed, resp.url()).await {
            log::debug!("{iden}: redirected to {}: {err}", resp.url());
            return Err(err);
        }

        let status = resp.status();
        if !status.is_success() {
            log::debug!("{iden}: {status}");
            return Err(FetchError::Status(status.as_u16()));
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|err| Self::map_error(&iden, err))?
        {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(FetchError::Parse(format!(
                    "body exceeds {MAX_BODY_BYTES} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
