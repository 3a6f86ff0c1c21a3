use std::collections::BTreeMap;

use serde::Serialize;

use crate::form::snapshot::FormLocator;
use crate::reconcile::patch::{AlertKind, DomPatch};
use crate::transport::{ErrorPayload, ResponseBody, SubmissionResult};

/// Error-map key rendered as a page-level banner instead of a field error.
pub const WARNING_KEY: &str = "warning";

pub const DEFAULT_ALERT_CONTAINER: &str = "alert";

/// DOM ids derived from an error-map key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    pub error_id: String,
    pub input_id: String,
}

/// `first_name` → `error-first-name` / `input-first-name`.
pub fn field_slot(key: &str) -> FieldSlot {
    let dashed = key.replace('_', "-");
    FieldSlot {
        error_id: format!("error-{}", dashed),
        input_id: format!("input-{}", dashed),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PageAlert {
    pub kind: AlertKind,
    pub message: String,
}

/// Visible validation state this component has put on a page.
///
/// Two states matter: clean (nothing shown) and annotated. Every
/// reconciliation rebuilds it from scratch, never by adding to the
/// previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomAnnotations {
    /// Dasherized field key → message
    pub field_errors: BTreeMap<String, String>,
    /// Banners in render order (danger before success)
    pub alerts: Vec<PageAlert>,
}

impl DomAnnotations {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.field_errors.is_empty() && self.alerts.is_empty()
    }

    /// Stable digest of the visible state.
    pub fn fingerprint(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut hasher = Sha1::new();
        for (key, msg) in &self.field_errors {
            hasher.update(b"field\0");
            hasher.update(key.as_bytes());
            hasher.update(b"\0");
            hasher.update(msg.as_bytes());
            hasher.update(b"\n");
        }
        for alert in &self.alerts {
            hasher.update(b"alert\0");
            hasher.update(alert.kind.css_class().as_bytes());
            hasher.update(b"\0");
            hasher.update(alert.message.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// What reconciliation left on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub field_errors: BTreeMap<String, String>,
    pub page_alerts: Vec<PageAlert>,
    /// Region replaced by a partial reload, if one ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reloaded: Option<String>,
    /// Whether the visible state differs from before
    pub changed: bool,
    pub fingerprint: String,
}

impl ReconciliationOutcome {
    pub fn page_alert(&self, kind: AlertKind) -> Option<&str> {
        self.page_alerts
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.message.as_str())
    }
}

/// Result of reconciling one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reconciliation {
    /// DOM was annotated from the JSON reply
    Applied(ReconciliationOutcome),
    /// Reply asked for navigation; nothing on the page was touched
    FollowRedirect { url: String },
    /// Reply was not JSON; nothing on the page was touched and the raw
    /// body stays on the `SubmissionResult` for inspection
    Unstructured,
}

/// Pure transition from a reply to the next annotations plus the patches
/// that get the DOM there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Redirect(String),
    Unstructured,
    Annotate {
        next: DomAnnotations,
        patches: Vec<DomPatch>,
    },
}

/// Where reconciliation writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTarget {
    /// Form whose inputs get cleared/flagged; whole document when `None`
    pub form: Option<FormLocator>,
    /// Id of the alert container
    pub alert_container: String,
}

impl Default for ReconcileTarget {
    fn default() -> Self {
        ReconcileTarget {
            form: None,
            alert_container: DEFAULT_ALERT_CONTAINER.to_string(),
        }
    }
}

/// Compute the transition for a submission result.
///
/// The next state depends only on the reply, so applying the same result
/// twice lands on the same state.
pub fn transition(result: &SubmissionResult, target: &ReconcileTarget) -> Transition {
    match &result.body {
        None => Transition::Unstructured,
        Some(body) => transition_body(body, target),
    }
}

pub fn transition_body(body: &ResponseBody, target: &ReconcileTarget) -> Transition {
    if let Some(url) = &body.redirect {
        return Transition::Redirect(url.clone());
    }

    let mut next = DomAnnotations::clean();
    let mut patches = vec![
        DomPatch::ClearFieldErrors {
            form: target.form.clone(),
        },
        DomPatch::ClearAlerts {
            container: target.alert_container.clone(),
        },
    ];

    match &body.error {
        Some(ErrorPayload::Message(message)) => {
            push_alert(&mut next, &mut patches, target, AlertKind::Danger, message);
        }
        Some(ErrorPayload::Fields(fields)) => {
            for (key, message) in fields {
                if key == WARNING_KEY {
                    push_alert(&mut next, &mut patches, target, AlertKind::Danger, message);
                    continue;
                }
                let slot = field_slot(key);
                next.field_errors
                    .insert(key.replace('_', "-"), message.clone());
                patches.push(DomPatch::ShowFieldError {
                    error_id: slot.error_id,
                    input_id: slot.input_id,
                    message: message.clone(),
                });
            }
        }
        None => {}
    }

    if let Some(message) = &body.success {
        push_alert(&mut next, &mut patches, target, AlertKind::Success, message);
    }

    Transition::Annotate { next, patches }
}

fn push_alert(
    next: &mut DomAnnotations,
    patches: &mut Vec<DomPatch>,
    target: &ReconcileTarget,
    kind: AlertKind,
    message: &str,
) {
    next.alerts.push(PageAlert {
        kind,
        message: message.to_string(),
    });
    patches.push(DomPatch::ShowAlert {
        container: target.alert_container.clone(),
        kind,
        message: message.to_string(),
    });
}

/// Summarize an applied transition; `current` only decides `changed`.
pub fn outcome(
    current: &DomAnnotations,
    next: &DomAnnotations,
    reloaded: Option<String>,
) -> ReconciliationOutcome {
    ReconciliationOutcome {
        field_errors: next.field_errors.clone(),
        page_alerts: next.alerts.clone(),
        changed: current != next || reloaded.is_some(),
        reloaded,
        fingerprint: next.fingerprint(),
    }
}
