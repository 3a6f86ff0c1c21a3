use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue};
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use crate::browser::driver::{BrowserCookie, HttpReply, PageDriver, PostRequest, cookie_header};
use crate::form::error::FormError;
use crate::transport::{SubmissionResult, Transport, TransportStrategy};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Out-of-page HTTP client that shares the browser session's cookie jar.
///
/// The client keeps no cookies of its own. Every dispatch reads the
/// browser's jar to build the `Cookie` header, and every `Set-Cookie` in
/// the reply is written back to the browser, so the two never drift.
/// Redirects are not followed: the reply as served is what gets
/// reconciled.
pub struct SessionRequest {
    client: Client,
}

impl SessionRequest {
    pub fn new() -> Result<Self, FormError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| FormError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(SessionRequest { client })
    }

    fn dispatch(
        &self,
        url: &Url,
        request: &PostRequest,
        cookies: Option<&str>,
        now: f64,
    ) -> Result<(HttpReply, Vec<BrowserCookie>), reqwest::Error> {
        let mut builder = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
            .header("X-Requested-With", "XMLHttpRequest")
            .timeout(Duration::from_millis(request.timeout_ms))
            .body(request.body.clone());
        if let Some(cookies) = cookies {
            builder = builder.header(COOKIE, cookies);
        }

        let response = builder.send()?;
        let set_cookies = reply_cookies(&response, url, now);
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text()?;
        Ok((
            HttpReply {
                status,
                body,
                url: Some(final_url),
            },
            set_cookies,
        ))
    }
}

impl Transport for SessionRequest {
    fn strategy(&self) -> TransportStrategy {
        TransportStrategy::SessionRequest
    }

    fn send(
        &self,
        driver: &mut dyn PageDriver,
        request: &PostRequest,
    ) -> Result<SubmissionResult, FormError> {
        let url = Url::parse(&request.url).map_err(|e| FormError::InvalidUrl {
            url: request.url.clone(),
            source: e,
        })?;
        let now = unix_now();
        let header = cookie_header(&driver.cookies()?, &url, now);
        debug!(url = %request.url, with_cookies = header.is_some(), "session-bound request");

        let (reply, set_cookies) = self
            .dispatch(&url, request, header.as_deref(), now)
            .map_err(|e| {
                if e.is_timeout() {
                    FormError::Timeout {
                        url: request.url.clone(),
                        timeout_ms: request.timeout_ms,
                    }
                } else {
                    FormError::Transport {
                        url: request.url.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !set_cookies.is_empty() {
            debug!(count = set_cookies.len(), "writing reply cookies back to browser");
            driver.set_cookies(&set_cookies)?;
        }

        Ok(SubmissionResult::from_reply(self.strategy(), &request.url, reply))
    }
}

/// `Set-Cookie` headers of a reply, in the browser's cookie shape.
fn reply_cookies(response: &Response, url: &Url, now: f64) -> Vec<BrowserCookie> {
    let host = url.host_str().unwrap_or_default();
    response
        .cookies()
        .map(|c| BrowserCookie {
            name: c.name().to_string(),
            value: c.value().to_string(),
            domain: match c.domain() {
                Some(domain) => format!(".{}", domain.trim_start_matches('.')),
                None => host.to_string(),
            },
            path: c
                .path()
                .map(str::to_string)
                .unwrap_or_else(|| default_cookie_path(url)),
            expires: c
                .max_age()
                .map(|age| now + age.as_secs_f64())
                .or_else(|| c.expires().map(unix_seconds)),
        })
        .collect()
}

/// Directory of the request path, per RFC 6265 §5.1.4.
fn default_cookie_path(url: &Url) -> String {
    match url.path().rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(end) => url.path()[..end].to_string(),
    }
}

fn unix_seconds(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn unix_now() -> f64 {
    unix_seconds(SystemTime::now())
}
