use serde::{Deserialize, Serialize};

use crate::form::error::FormError;
use crate::form::snapshot::FormLocator;
use crate::reconcile::patch::DomPatch;

/// One form control as reported by the browser, in DOM encounter order.
///
/// Encoding rules (disabled, unchecked, unnamed) are applied on the Rust
/// side by `FormSnapshot::from_read`, so the browser reports everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    /// `None` when the control has no `value` attribute at all
    #[serde(default)]
    pub value: Option<String>,
    /// Lowercased `type` of an input, or the tag name for select/textarea
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub disabled: bool,
}

/// Result of reading a form element from the live page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRead {
    /// Raw `action` attribute (may be relative or empty)
    #[serde(default)]
    pub action: String,
    /// URL of the document the form lives in
    #[serde(rename = "pageUrl")]
    pub page_url: String,
    pub fields: Vec<RawField>,
}

/// A form-encoded POST to be carried by one of the transports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRequest {
    pub url: String,
    /// `application/x-www-form-urlencoded` body
    pub body: String,
    /// Same data as `body`, unencoded, for building a native form
    pub entries: Vec<(String, String)>,
    pub timeout_ms: u64,
}

/// Raw HTTP reply as seen by the transport.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
    /// Final URL after any navigation/redirects
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    /// Leading `.` for a domain cookie; bare host for a host-only one
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; absent or negative for a session cookie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl BrowserCookie {
    /// Whether the cookie would be sent to `host`. Only a dotted domain
    /// reaches subdomains.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match self.domain.strip_prefix('.') {
            Some(domain) => {
                let domain = domain.to_ascii_lowercase();
                host == domain || host.ends_with(&format!(".{}", domain))
            }
            None => self.domain.is_empty() || host == self.domain.to_ascii_lowercase(),
        }
    }

    /// RFC 6265 path-match against a request path.
    pub fn matches_path(&self, request_path: &str) -> bool {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        request_path == path
            || (request_path.starts_with(path)
                && (path.ends_with('/') || request_path[path.len()..].starts_with('/')))
    }

    /// Expired at `now` (unix seconds); the browser drops such cookies.
    pub fn is_expired(&self, now: f64) -> bool {
        matches!(self.expires, Some(at) if at >= 0.0 && at <= now)
    }

    /// `name=value` pair for a `Cookie` request header.
    pub fn header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Build the `Cookie` header the browser would send to `url`, or `None`
/// when no cookie applies. Longer paths go first.
pub fn cookie_header(cookies: &[BrowserCookie], url: &url::Url, now: f64) -> Option<String> {
    let host = url.host_str().unwrap_or_default();
    let mut matching: Vec<&BrowserCookie> = cookies
        .iter()
        .filter(|c| c.matches_host(host) && c.matches_path(url.path()) && !c.is_expired(now))
        .collect();
    if matching.is_empty() {
        return None;
    }
    matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
    Some(
        matching
            .iter()
            .map(|c| c.header_pair())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// The live page a submission pipeline operates on.
///
/// `BrowserSession` is the production implementation; anything that can
/// read forms, dispatch requests from the page and apply DOM patches can
/// stand in for it.
pub trait PageDriver {
    /// Navigate and wait for network idle.
    fn navigate(&mut self, url: &str) -> Result<(), FormError>;

    fn current_url(&mut self) -> Result<String, FormError>;

    fn wait_idle(&mut self, ms: u64) -> Result<(), FormError>;

    /// Read the controls of one form. `Ok(None)` when nothing matches.
    fn read_form(&mut self, locator: &FormLocator) -> Result<Option<FormRead>, FormError>;

    /// POST from inside the page's script context.
    fn fetch(&mut self, request: &PostRequest) -> Result<HttpReply, FormError>;

    /// POST by submitting a real (hidden) form and waiting for the navigation.
    fn native_submit(&mut self, request: &PostRequest) -> Result<HttpReply, FormError>;

    /// GET a URL from the page and return its text (partial reloads).
    fn fetch_text(&mut self, url: &str, timeout_ms: u64) -> Result<String, FormError>;

    /// Cookies of the browser context.
    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, FormError>;

    /// Store cookies in the browser context; expired ones are removed.
    fn set_cookies(&mut self, cookies: &[BrowserCookie]) -> Result<(), FormError>;

    /// Apply DOM patches in order.
    fn apply_patches(&mut self, patches: &[DomPatch]) -> Result<(), FormError>;
}
