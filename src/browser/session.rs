use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::driver::{BrowserCookie, FormRead, HttpReply, PageDriver, PostRequest};
use crate::form::error::FormError;
use crate::form::snapshot::FormLocator;
use crate::reconcile::patch::DomPatch;

pub const DEFAULT_SERVER_SCRIPT: &str = "node/form-bridge/browser_server.js";

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest<'a> {
    Navigate {
        cmd: &'static str,
        url: &'a str,
    },
    CurrentUrl {
        cmd: &'static str,
    },
    Wait {
        cmd: &'static str,
        duration_ms: u64,
    },
    ReadForm {
        cmd: &'static str,
        selector: &'a str,
        index: usize,
    },
    Post {
        cmd: &'static str,
        url: &'a str,
        body: &'a str,
        entries: &'a [(String, String)],
        timeout_ms: u64,
    },
    FetchText {
        cmd: &'static str,
        url: &'a str,
        timeout_ms: u64,
    },
    Cookies {
        cmd: &'static str,
    },
    SetCookies {
        cmd: &'static str,
        cookies: &'a [BrowserCookie],
    },
    ApplyPatches {
        cmd: &'static str,
        patches: &'a [DomPatch],
    },
    Quit {
        cmd: &'static str,
    },
}

impl<'a> BrowserRequest<'a> {
    pub fn navigate(url: &'a str) -> Self {
        BrowserRequest::Navigate { cmd: "navigate", url }
    }

    pub fn current_url() -> Self {
        BrowserRequest::CurrentUrl { cmd: "current_url" }
    }

    pub fn wait(duration_ms: u64) -> Self {
        BrowserRequest::Wait {
            cmd: "wait",
            duration_ms,
        }
    }

    pub fn read_form(locator: &'a FormLocator) -> Self {
        BrowserRequest::ReadForm {
            cmd: "read_form",
            selector: &locator.selector,
            index: locator.index,
        }
    }

    pub fn fetch(request: &'a PostRequest) -> Self {
        Self::post("fetch", request)
    }

    pub fn native_submit(request: &'a PostRequest) -> Self {
        Self::post("native_submit", request)
    }

    fn post(cmd: &'static str, request: &'a PostRequest) -> Self {
        BrowserRequest::Post {
            cmd,
            url: &request.url,
            body: &request.body,
            entries: &request.entries,
            timeout_ms: request.timeout_ms,
        }
    }

    pub fn fetch_text(url: &'a str, timeout_ms: u64) -> Self {
        BrowserRequest::FetchText {
            cmd: "fetch_text",
            url,
            timeout_ms,
        }
    }

    pub fn cookies() -> Self {
        BrowserRequest::Cookies { cmd: "cookies" }
    }

    pub fn set_cookies(cookies: &'a [BrowserCookie]) -> Self {
        BrowserRequest::SetCookies {
            cmd: "set_cookies",
            cookies,
        }
    }

    pub fn apply_patches(patches: &'a [DomPatch]) -> Self {
        BrowserRequest::ApplyPatches {
            cmd: "apply_patches",
            patches,
        }
    }

    pub fn quit() -> Self {
        BrowserRequest::Quit { cmd: "quit" }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub form: Option<FormRead>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub cookies: Option<Vec<BrowserCookie>>,
}

/// A persistent browser session backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    current_url: Option<String>,
    closed: bool,
}

impl BrowserSession {
    /// Launch a new browser session by spawning the given server script.
    pub fn launch(script: &str, headless: bool) -> Result<Self, FormError> {
        let mut child = Command::new("node")
            .arg(script)
            .env("HEADLESS", if headless { "true" } else { "false" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| FormError::SessionSpawn {
                script: script.to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            FormError::SessionIO(format!("Failed to capture stdin of {}", script))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            FormError::SessionIO(format!("Failed to capture stdout of {}", script))
        })?;

        let mut reader = BufReader::new(stdout);

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| FormError::SessionIO(format!("Failed to read ready signal: {}", e)))?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| FormError::JsonParse {
                context: "browser server ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(FormError::SessionProtocol {
                command: "launch".into(),
                error: "Did not receive ready signal from browser server".into(),
            });
        }

        debug!(script, headless, "browser session ready");

        Ok(BrowserSession {
            child,
            stdin,
            reader,
            current_url: None,
            closed: false,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest<'_>) -> Result<BrowserResponse, FormError> {
        let json = serde_json::to_string(request).map_err(|e| FormError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json).map_err(|e| {
            FormError::SessionIO(format!("Failed to write to browser server stdin: {}", e))
        })?;

        self.stdin.flush().map_err(|e| {
            FormError::SessionIO(format!("Failed to flush browser server stdin: {}", e))
        })?;

        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            FormError::SessionIO(format!("Failed to read from browser server stdout: {}", e))
        })?;

        if line.trim().is_empty() {
            return Err(FormError::SessionIO(
                "Empty response from browser server (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| FormError::JsonParse {
            context: "browser server response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(
        &mut self,
        request: &BrowserRequest<'_>,
        command_name: &str,
    ) -> Result<BrowserResponse, FormError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(FormError::SessionProtocol {
                command: command_name.into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response)
    }

    /// Send a POST-carrying request. Failures here are network failures,
    /// not protocol errors, so a transport chain can fail over on them.
    fn send_post(
        &mut self,
        request: &BrowserRequest<'_>,
        post: &PostRequest,
    ) -> Result<HttpReply, FormError> {
        let response = self.send(request)?;
        if response.timed_out {
            return Err(FormError::Timeout {
                url: post.url.clone(),
                timeout_ms: post.timeout_ms,
            });
        }
        if !response.ok {
            return Err(FormError::Transport {
                url: post.url.clone(),
                message: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        let status = response.status.ok_or_else(|| FormError::SessionProtocol {
            command: "post".into(),
            error: "No status in response".into(),
        })?;
        Ok(HttpReply {
            status,
            body: response.body.unwrap_or_default(),
            url: response.url,
        })
    }

    /// Get the last known URL (cached, no browser call).
    pub fn last_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), FormError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best-effort: the process may already be gone
        if let Err(e) = self.send(&BrowserRequest::quit()) {
            warn!(error = %e, "browser server did not acknowledge quit");
        }
        let _ = self.child.wait();
        Ok(())
    }
}

impl PageDriver for BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), FormError> {
        self.send_ok(&BrowserRequest::navigate(url), "navigate")?;
        self.current_url = Some(url.to_string());
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, FormError> {
        let response = self.send_ok(&BrowserRequest::current_url(), "current_url")?;
        let url = response.url.ok_or_else(|| FormError::SessionProtocol {
            command: "current_url".into(),
            error: "No URL in current_url response".into(),
        })?;
        self.current_url = Some(url.clone());
        Ok(url)
    }

    fn wait_idle(&mut self, ms: u64) -> Result<(), FormError> {
        self.send_ok(&BrowserRequest::wait(ms), "wait")?;
        Ok(())
    }

    fn read_form(&mut self, locator: &FormLocator) -> Result<Option<FormRead>, FormError> {
        let response = self.send_ok(&BrowserRequest::read_form(locator), "read_form")?;
        Ok(response.form)
    }

    fn fetch(&mut self, request: &PostRequest) -> Result<HttpReply, FormError> {
        self.send_post(&BrowserRequest::fetch(request), request)
    }

    fn native_submit(&mut self, request: &PostRequest) -> Result<HttpReply, FormError> {
        let reply = self.send_post(&BrowserRequest::native_submit(request), request)?;
        if let Some(url) = &reply.url {
            self.current_url = Some(url.clone());
        }
        Ok(reply)
    }

    fn fetch_text(&mut self, url: &str, timeout_ms: u64) -> Result<String, FormError> {
        let response = self.send(&BrowserRequest::fetch_text(url, timeout_ms))?;
        if response.timed_out {
            return Err(FormError::Timeout {
                url: url.to_string(),
                timeout_ms,
            });
        }
        if !response.ok {
            return Err(FormError::Transport {
                url: url.to_string(),
                message: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response.text.unwrap_or_default())
    }

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, FormError> {
        let response = self.send_ok(&BrowserRequest::cookies(), "cookies")?;
        Ok(response.cookies.unwrap_or_default())
    }

    fn set_cookies(&mut self, cookies: &[BrowserCookie]) -> Result<(), FormError> {
        if cookies.is_empty() {
            return Ok(());
        }
        self.send_ok(&BrowserRequest::set_cookies(cookies), "set_cookies")?;
        Ok(())
    }

    fn apply_patches(&mut self, patches: &[DomPatch]) -> Result<(), FormError> {
        if patches.is_empty() {
            return Ok(());
        }
        self.send_ok(&BrowserRequest::apply_patches(patches), "apply_patches")?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
