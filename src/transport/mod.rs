use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::browser::driver::{HttpReply, PageDriver, PostRequest};
use crate::form::error::FormError;

pub mod chain;
pub mod in_page;
pub mod native;
pub mod session_request;

// ============================================================================
// Strategy selection
// ============================================================================

/// Interchangeable ways of delivering a form POST with the browser's
/// session credentials attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportStrategy {
    /// `fetch()` from inside the page's script context
    InPageFetch,
    /// Out-of-page HTTP client sharing the browser's cookies
    SessionRequest,
    /// Real form submission (a navigation); the page body is the reply
    NativeForm,
}

impl TransportStrategy {
    /// Preference order when session-cookie propagation is reliable.
    pub const PREFERENCE: [TransportStrategy; 3] = [
        TransportStrategy::InPageFetch,
        TransportStrategy::SessionRequest,
        TransportStrategy::NativeForm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportStrategy::InPageFetch => "in-page-fetch",
            TransportStrategy::SessionRequest => "session-request",
            TransportStrategy::NativeForm => "native-form",
        }
    }
}

impl fmt::Display for TransportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-page-fetch" | "fetch" => Ok(TransportStrategy::InPageFetch),
            "session-request" | "request" => Ok(TransportStrategy::SessionRequest),
            "native-form" | "native" => Ok(TransportStrategy::NativeForm),
            other => Err(format!(
                "unknown transport strategy '{}' (expected in-page-fetch, session-request or native-form)",
                other
            )),
        }
    }
}

/// Delivers a form-encoded POST and reports what came back.
///
/// Connection failures surface as `FormError::Transport`, missed deadlines
/// as `FormError::Timeout`. Any HTTP status, including 4xx/5xx, is a
/// successful delivery.
pub trait Transport {
    fn strategy(&self) -> TransportStrategy;

    fn send(
        &self,
        driver: &mut dyn PageDriver,
        request: &PostRequest,
    ) -> Result<SubmissionResult, FormError>;
}

// ============================================================================
// Response model
// ============================================================================

/// `error` member of a storefront JSON reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    /// Page-level message
    Message(String),
    /// Field key → message; the key `warning` is page-level
    Fields(BTreeMap<String, String>),
}

/// Structured storefront reply: `{success?, error?, redirect?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl ResponseBody {
    /// Parse a reply body. `None` when it is not a JSON object, e.g. the
    /// HTML page a native form post lands on.
    ///
    /// Members follow script truthiness: `null`, `false`, `0` and `""`
    /// count as absent.
    pub fn parse(raw: &str) -> Option<ResponseBody> {
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        let object = value.as_object()?;

        let error = match object.get("error") {
            Some(Value::Object(map)) => Some(ErrorPayload::Fields(
                map.iter()
                    .filter_map(|(k, v)| truthy_text(v).map(|msg| (k.clone(), msg)))
                    .collect(),
            )),
            Some(other) => truthy_text(other).map(ErrorPayload::Message),
            None => None,
        };

        Some(ResponseBody {
            success: object.get("success").and_then(truthy_text),
            error,
            redirect: object.get("redirect").and_then(truthy_text),
        })
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Success,
    NetworkError,
    Timeout,
}

/// Outcome of one submit attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub strategy: TransportStrategy,
    pub url: String,
    pub transport_status: TransportStatus,
    /// Present only when a response was received
    pub http_status: Option<u16>,
    /// Structured reply, `None` when the body was not JSON
    pub body: Option<ResponseBody>,
    /// Raw reply text for fallback inspection
    pub raw_body: String,
    /// URL the reply came from, when the transport navigated
    pub final_url: Option<String>,
}

impl SubmissionResult {
    /// Wrap a delivered reply. A body that is not JSON is logged and kept
    /// raw; it never fails the submission.
    pub fn from_reply(strategy: TransportStrategy, url: &str, reply: HttpReply) -> Self {
        let body = ResponseBody::parse(&reply.body);
        if body.is_none() {
            warn!(
                %strategy,
                url,
                status = reply.status,
                bytes = reply.body.len(),
                "reply is not a JSON object, keeping raw body"
            );
        }
        SubmissionResult {
            strategy,
            url: url.to_string(),
            transport_status: TransportStatus::Success,
            http_status: Some(reply.status),
            body,
            raw_body: reply.body,
            final_url: reply.url,
        }
    }

    /// Record of an attempt that never got a reply.
    pub fn from_error(strategy: TransportStrategy, url: &str, error: &FormError) -> Self {
        let transport_status = match error {
            FormError::Timeout { .. } => TransportStatus::Timeout,
            _ => TransportStatus::NetworkError,
        };
        SubmissionResult {
            strategy,
            url: url.to_string(),
            transport_status,
            http_status: None,
            body: None,
            raw_body: String::new(),
            final_url: None,
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.redirect.as_deref())
    }

    pub fn is_structured(&self) -> bool {
        self.body.is_some()
    }
}
