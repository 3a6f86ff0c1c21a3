#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio::sync::oneshot;

use form_reconciler::browser::driver::{
    BrowserCookie, FormRead, HttpReply, PageDriver, PostRequest, RawField,
};
use form_reconciler::form::error::FormError;
use form_reconciler::form::snapshot::FormLocator;
use form_reconciler::reconcile::patch::DomPatch;

// ============================================================================
// Scripted page driver
// ============================================================================

/// What a scripted `fetch`/`native_submit` call does.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(HttpReply),
    Refused,
    TimedOut,
}

impl Scripted {
    pub fn json(status: u16, body: &str) -> Self {
        Scripted::Reply(HttpReply {
            status,
            body: body.to_string(),
            url: None,
        })
    }

    /// A navigation that lands on `url` with an HTML body.
    pub fn page(url: &str, html: &str) -> Self {
        Scripted::Reply(HttpReply {
            status: 200,
            body: html.to_string(),
            url: Some(url.to_string()),
        })
    }

    fn resolve(self, url: &str, timeout_ms: u64) -> Result<HttpReply, FormError> {
        match self {
            Scripted::Reply(reply) => Ok(reply),
            Scripted::Refused => Err(FormError::Transport {
                url: url.to_string(),
                message: "connection refused".into(),
            }),
            Scripted::TimedOut => Err(FormError::Timeout {
                url: url.to_string(),
                timeout_ms,
            }),
        }
    }
}

/// In-memory `PageDriver` that replays scripted replies and records
/// everything done to it.
#[derive(Debug, Default)]
pub struct FakePage {
    pub url: String,
    pub forms: HashMap<FormLocator, FormRead>,
    pub fetch_replies: VecDeque<Scripted>,
    pub native_replies: VecDeque<Scripted>,
    pub texts: HashMap<String, String>,
    pub cookie_jar: Vec<BrowserCookie>,

    pub cookie_writes: Vec<Vec<BrowserCookie>>,
    pub navigations: Vec<String>,
    pub fetches: Vec<PostRequest>,
    pub native_posts: Vec<PostRequest>,
    pub text_gets: Vec<String>,
    pub patch_batches: Vec<Vec<DomPatch>>,
    pub waits: usize,
}

impl FakePage {
    pub fn at(url: &str) -> Self {
        FakePage {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_form(mut self, locator: impl Into<FormLocator>, read: FormRead) -> Self {
        self.forms.insert(locator.into(), read);
        self
    }

    pub fn on_fetch(mut self, reply: Scripted) -> Self {
        self.fetch_replies.push_back(reply);
        self
    }

    pub fn on_native(mut self, reply: Scripted) -> Self {
        self.native_replies.push_back(reply);
        self
    }

    pub fn with_text(mut self, url: &str, html: &str) -> Self {
        self.texts.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_cookie(mut self, cookie: BrowserCookie) -> Self {
        self.cookie_jar.push(cookie);
        self
    }

    pub fn all_patches(&self) -> Vec<DomPatch> {
        self.patch_batches.iter().flatten().cloned().collect()
    }
}

impl PageDriver for FakePage {
    fn navigate(&mut self, url: &str) -> Result<(), FormError> {
        self.url = url.to_string();
        self.navigations.push(url.to_string());
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, FormError> {
        Ok(self.url.clone())
    }

    fn wait_idle(&mut self, _ms: u64) -> Result<(), FormError> {
        self.waits += 1;
        Ok(())
    }

    fn read_form(&mut self, locator: &FormLocator) -> Result<Option<FormRead>, FormError> {
        Ok(self.forms.get(locator).cloned())
    }

    fn fetch(&mut self, request: &PostRequest) -> Result<HttpReply, FormError> {
        self.fetches.push(request.clone());
        let scripted = self.fetch_replies.pop_front().unwrap_or(Scripted::Refused);
        scripted.resolve(&request.url, request.timeout_ms)
    }

    fn native_submit(&mut self, request: &PostRequest) -> Result<HttpReply, FormError> {
        self.native_posts.push(request.clone());
        let scripted = self.native_replies.pop_front().unwrap_or(Scripted::Refused);
        let reply = scripted.resolve(&request.url, request.timeout_ms)?;
        self.url = reply.url.clone().unwrap_or_else(|| request.url.clone());
        Ok(reply)
    }

    fn fetch_text(&mut self, url: &str, timeout_ms: u64) -> Result<String, FormError> {
        self.text_gets.push(url.to_string());
        self.texts.get(url).cloned().ok_or(FormError::Timeout {
            url: url.to_string(),
            timeout_ms,
        })
    }

    fn cookies(&mut self) -> Result<Vec<BrowserCookie>, FormError> {
        Ok(self.cookie_jar.clone())
    }

    /// Upsert by (name, domain, path); an expired cookie deletes its match.
    fn set_cookies(&mut self, cookies: &[BrowserCookie]) -> Result<(), FormError> {
        self.cookie_writes.push(cookies.to_vec());
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        for cookie in cookies {
            self.cookie_jar.retain(|c| {
                !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
            });
            if !cookie.is_expired(now) {
                self.cookie_jar.push(cookie.clone());
            }
        }
        Ok(())
    }

    fn apply_patches(&mut self, patches: &[DomPatch]) -> Result<(), FormError> {
        self.patch_batches.push(patches.to_vec());
        Ok(())
    }
}

// ============================================================================
// Form fixtures
// ============================================================================

pub fn field(name: &str, value: &str) -> RawField {
    RawField {
        name: name.into(),
        value: Some(value.into()),
        kind: "text".into(),
        checked: false,
        disabled: false,
    }
}

pub fn hidden(name: &str, value: &str) -> RawField {
    RawField {
        kind: "hidden".into(),
        ..field(name, value)
    }
}

pub fn checkbox(name: &str, value: &str, checked: bool) -> RawField {
    RawField {
        kind: "checkbox".into(),
        checked,
        ..field(name, value)
    }
}

/// A checkbox without a `value` attribute.
pub fn bare_checkbox(name: &str, checked: bool) -> RawField {
    RawField {
        value: None,
        ..checkbox(name, "", checked)
    }
}

pub fn form(page_url: &str, action: &str, fields: Vec<RawField>) -> FormRead {
    FormRead {
        action: action.into(),
        page_url: page_url.into(),
        fields,
    }
}

// ============================================================================
// HTTP stub server
// ============================================================================

/// One request as the stub received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

struct StubState {
    status: StatusCode,
    body: String,
    set_cookie: Option<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// axum server on its own runtime thread that answers every request with
/// the same status and JSON body, recording what it received.
pub struct StubServer {
    pub base: String,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    pub fn start(status: u16, body: &str) -> Self {
        Self::launch(status, body, None)
    }

    /// Same as `start`, adding a `Set-Cookie` header to every reply.
    pub fn with_set_cookie(status: u16, body: &str, set_cookie: &str) -> Self {
        Self::launch(status, body, Some(set_cookie.to_string()))
    }

    fn launch(status: u16, body: &str, set_cookie: Option<String>) -> Self {
        let state = Arc::new(StubState {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            set_cookie,
            requests: Mutex::new(Vec::new()),
        });

        let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new().fallback(record).with_state(state.clone());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build stub runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("Failed to bind stub server");
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("Stub server error");
            });
        });

        let addr = addr_rx.recv().expect("Stub server did not start");
        StubServer {
            base: format!("http://{}", addr),
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn record(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        uri,
        headers,
        body,
    });

    let mut response = (
        state.status,
        [(CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
        .into_response();
    if let Some(cookie) = &state.set_cookie {
        response
            .headers_mut()
            .insert(SET_COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    response
}

/// A local URL nothing is listening on.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/index.php?route=checkout/cart.edit", addr)
}
