use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::reconcile::reconciler::Reconciliation;
use crate::transport::{SubmissionResult, TransportStatus, TransportStrategy};

/// One line of the JSONL submission trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub form: String,
    pub url: String,

    pub strategy: Option<TransportStrategy>,
    pub transport_status: Option<TransportStatus>,
    pub http_status: Option<u16>,
    pub structured: bool,

    /// Strategies that failed before the delivering one
    pub failed_over: Vec<String>,

    pub outcome: Option<String>,
    pub fingerprint: Option<String>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(form: &str, url: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            form: form.to_string(),
            url: url.to_string(),
            strategy: None,
            transport_status: None,
            http_status: None,
            structured: false,
            failed_over: vec![],
            outcome: None,
            fingerprint: None,
            error: None,
        }
    }

    pub fn with_result(mut self, result: &SubmissionResult) -> Self {
        self.strategy = Some(result.strategy);
        self.transport_status = Some(result.transport_status);
        self.http_status = result.http_status;
        self.structured = result.is_structured();
        self
    }

    pub fn with_failures(mut self, failures: &[SubmissionResult]) -> Self {
        self.failed_over = failures
            .iter()
            .map(|f| format!("{}:{:?}", f.strategy, f.transport_status))
            .collect();
        self
    }

    pub fn with_reconciliation(mut self, reconciliation: &Reconciliation) -> Self {
        match reconciliation {
            Reconciliation::Applied(outcome) => {
                self.outcome = Some("applied".into());
                self.fingerprint = Some(outcome.fingerprint.clone());
            }
            Reconciliation::FollowRedirect { url } => {
                self.outcome = Some(format!("redirect:{}", url));
            }
            Reconciliation::Unstructured => {
                self.outcome = Some("unstructured".into());
            }
        }
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
