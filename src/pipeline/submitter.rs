use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::browser::driver::{PageDriver, PostRequest};
use crate::form::error::FormError;
use crate::form::snapshot::{FormLocator, FormSnapshot, read_form};
use crate::reconcile::patch::{AlertKind, DomPatch};
use crate::reconcile::reconciler::{
    DEFAULT_ALERT_CONTAINER, DomAnnotations, ReconcileTarget, Reconciliation, Transition,
    outcome, transition,
};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;
use crate::transport::chain::TransportChain;
use crate::transport::{SubmissionResult, TransportStrategy};

// ============================================================================
// Request / report model
// ============================================================================

/// Fetch `url` out-of-band and replace `target`'s contents with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialReload {
    pub url: String,
    pub target: String,
    /// Only reload when the reply carried a success message
    pub only_on_success: bool,
}

impl PartialReload {
    pub fn new(url: impl Into<String>, target: impl Into<String>) -> Self {
        PartialReload {
            url: url.into(),
            target: target.into(),
            only_on_success: false,
        }
    }

    pub fn on_success(mut self) -> Self {
        self.only_on_success = true;
        self
    }
}

/// One submit-and-reconcile interaction, as a page object describes it.
#[derive(Debug, Clone, Default)]
pub struct FormRequest {
    pub form: Option<FormLocator>,
    /// Overrides the form's own action URL
    pub url: Option<String>,
    /// Applied to the snapshot in order, before dispatch
    pub overrides: Vec<(String, String)>,
    /// Forces one strategy instead of the configured fallback chain
    pub strategy: Option<TransportStrategy>,
    pub reload: Option<PartialReload>,
}

impl FormRequest {
    pub fn form(locator: impl Into<FormLocator>) -> Self {
        FormRequest {
            form: Some(locator.into()),
            ..Default::default()
        }
    }

    /// A POST built only from `set` fields, with no form on the page
    /// (wishlist, compare and similar button-driven actions).
    pub fn post(url: impl Into<String>) -> Self {
        FormRequest {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Form selector, else the target URL.
    pub fn label(&self) -> String {
        match (&self.form, &self.url) {
            (Some(locator), _) => locator.to_string(),
            (None, Some(url)) => url.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    pub fn strategy(mut self, strategy: TransportStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn reload(mut self, reload: PartialReload) -> Self {
        self.reload = Some(reload);
        self
    }
}

/// Everything one `submit_form` call did, handed back to the caller
/// instead of being stashed in shared state.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    pub form: String,
    pub snapshot: FormSnapshot,
    pub result: SubmissionResult,
    /// Attempts that failed over before `result` was delivered
    pub failed_attempts: Vec<SubmissionResult>,
    pub reconciliation: Reconciliation,
    /// Where the page ended up after a followed redirect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
}

impl SubmissionReport {
    pub fn alert(&self, kind: AlertKind) -> Option<&str> {
        match &self.reconciliation {
            Reconciliation::Applied(outcome) => outcome.page_alert(kind),
            _ => None,
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        match &self.reconciliation {
            Reconciliation::Applied(outcome) => outcome
                .field_errors
                .get(&field.replace('_', "-"))
                .map(String::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterConfig {
    /// Fallback order used when a request names no strategy
    pub strategies: Vec<TransportStrategy>,
    /// Bound for every network step
    pub timeout_ms: u64,
    /// Settle time after navigations and reloads
    pub idle_wait_ms: u64,
    pub alert_container: String,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        SubmitterConfig {
            strategies: TransportStrategy::PREFERENCE.to_vec(),
            timeout_ms: 10_000,
            idle_wait_ms: 500,
            alert_container: DEFAULT_ALERT_CONTAINER.to_string(),
        }
    }
}

// ============================================================================
// FormSubmitter
// ============================================================================

/// Reads, submits and reconciles forms on one page.
///
/// Owns the page driver, so every operation on the page goes through here
/// one at a time. Tracks what it has annotated on the current document so
/// reports can say whether a reconciliation changed anything.
pub struct FormSubmitter<D: PageDriver> {
    driver: D,
    chain: TransportChain,
    config: SubmitterConfig,
    annotations: DomAnnotations,
    tracer: TraceLogger,
}

impl<D: PageDriver> FormSubmitter<D> {
    pub fn new(driver: D, chain: TransportChain, config: SubmitterConfig) -> Self {
        FormSubmitter {
            driver,
            chain,
            config,
            annotations: DomAnnotations::clean(),
            tracer: TraceLogger::disabled(),
        }
    }

    /// Build with the production transports for `config.strategies`.
    pub fn with_config(driver: D, config: SubmitterConfig) -> Result<Self, FormError> {
        let chain = TransportChain::from_strategies(&config.strategies)?;
        Ok(Self::new(driver, chain, config))
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    pub fn annotations(&self) -> &DomAnnotations {
        &self.annotations
    }

    /// Navigate to a new document; its annotations start clean.
    pub fn navigate(&mut self, url: &str) -> Result<(), FormError> {
        self.driver.navigate(url)?;
        self.annotations = DomAnnotations::clean();
        self.driver.wait_idle(self.config.idle_wait_ms)
    }

    pub fn read_form(&mut self, locator: &FormLocator) -> Result<FormSnapshot, FormError> {
        read_form(&mut self.driver, locator)
    }

    /// Deliver a snapshot (or caller-built override data) to `url`, or to
    /// the snapshot's action URL.
    ///
    /// With a strategy only that transport is used; without one the
    /// configured chain is walked.
    pub fn submit(
        &mut self,
        snapshot: &FormSnapshot,
        url: Option<&str>,
        strategy: Option<TransportStrategy>,
    ) -> Result<SubmissionResult, FormError> {
        self.dispatch(snapshot, url, strategy).map(|(result, _)| result)
    }

    /// Walk the configured chain in preference order.
    pub fn submit_with_fallback(
        &mut self,
        snapshot: &FormSnapshot,
        url: Option<&str>,
    ) -> Result<SubmissionResult, FormError> {
        self.submit(snapshot, url, None)
    }

    fn dispatch(
        &mut self,
        snapshot: &FormSnapshot,
        url: Option<&str>,
        strategy: Option<TransportStrategy>,
    ) -> Result<(SubmissionResult, Vec<SubmissionResult>), FormError> {
        let request = PostRequest {
            url: url.unwrap_or(snapshot.action_url()).to_string(),
            body: snapshot.encode(),
            entries: snapshot.entries().to_vec(),
            timeout_ms: self.config.timeout_ms,
        };

        match strategy {
            Some(strategy) => {
                let transport =
                    self.chain
                        .get(strategy)
                        .ok_or_else(|| FormError::Transport {
                            url: request.url.clone(),
                            message: format!("strategy {} is not configured", strategy),
                        })?;
                let result = transport.send(&mut self.driver, &request)?;
                info!(
                    %strategy,
                    url = %request.url,
                    status = ?result.http_status,
                    "submission delivered"
                );
                Ok((result, Vec::new()))
            }
            None => self.chain.send(&mut self.driver, &request),
        }
    }

    /// Reconcile a result into the page, or report the redirect to follow.
    ///
    /// Nothing is written before every network step has finished, so a
    /// failed reload leaves the page untouched.
    pub fn reconcile(
        &mut self,
        result: &SubmissionResult,
        reload: Option<&PartialReload>,
    ) -> Result<Reconciliation, FormError> {
        self.reconcile_into(result, reload, None)
    }

    fn reconcile_into(
        &mut self,
        result: &SubmissionResult,
        reload: Option<&PartialReload>,
        form: Option<&FormLocator>,
    ) -> Result<Reconciliation, FormError> {
        let target = ReconcileTarget {
            form: form.cloned(),
            alert_container: self.config.alert_container.clone(),
        };

        let (next, mut patches) = match transition(result, &target) {
            Transition::Redirect(url) => return Ok(Reconciliation::FollowRedirect { url }),
            Transition::Unstructured => return Ok(Reconciliation::Unstructured),
            Transition::Annotate { next, patches } => (next, patches),
        };

        let mut reloaded = None;
        if let Some(reload) = reload {
            let has_success = next.alerts.iter().any(|a| a.kind == AlertKind::Success);
            if !reload.only_on_success || has_success {
                let html = self.driver.fetch_text(&reload.url, self.config.timeout_ms)?;
                patches.push(DomPatch::ReplaceHtml {
                    target: reload.target.clone(),
                    html,
                });
                reloaded = Some(reload.target.clone());
            }
        }

        debug!(patches = patches.len(), "applying reconciliation");
        self.driver.apply_patches(&patches)?;

        let summary = outcome(&self.annotations, &next, reloaded);
        self.annotations = next;
        Ok(Reconciliation::Applied(summary))
    }

    /// Replace one region with freshly fetched server markup.
    pub fn reload_region(&mut self, url: &str, target: &str) -> Result<(), FormError> {
        let html = self.driver.fetch_text(url, self.config.timeout_ms)?;
        self.driver.apply_patches(&[DomPatch::ReplaceHtml {
            target: target.to_string(),
            html,
        }])?;
        self.driver.wait_idle(self.config.idle_wait_ms)
    }

    /// Read → override → dispatch → reconcile or follow redirect.
    ///
    /// A request without a form posts its `set` fields to its URL.
    pub fn submit_form(&mut self, request: &FormRequest) -> Result<SubmissionReport, FormError> {
        let label = request.label();
        let report = self.run_submission(request);
        match &report {
            Ok(report) => self.tracer.log(
                &TraceEvent::now(&label, &report.result.url)
                    .with_result(&report.result)
                    .with_failures(&report.failed_attempts)
                    .with_reconciliation(&report.reconciliation),
            ),
            Err(e) => self.tracer.log(
                &TraceEvent::now(&label, request.url.as_deref().unwrap_or_default())
                    .with_error(e),
            ),
        }
        report
    }

    fn run_submission(&mut self, request: &FormRequest) -> Result<SubmissionReport, FormError> {
        let origin = self.driver.current_url()?;
        let snapshot = match (&request.form, &request.url) {
            (Some(locator), url) => {
                let snapshot = self.read_form(locator)?;
                match url {
                    Some(url) => snapshot.with_action_url(url.clone()),
                    None => snapshot,
                }
            }
            (None, Some(url)) => FormSnapshot::new(url.clone(), Vec::new()),
            (None, None) => {
                return Err(FormError::ElementNotFound {
                    selector: String::new(),
                    context: "form request names neither a form nor a URL".into(),
                });
            }
        }
        .with_overrides(request.overrides.iter().map(|(k, v)| (k, v)));

        let (result, failed_attempts) = self.dispatch(&snapshot, None, request.strategy)?;

        // A native submission navigated away; annotate the page the form
        // came from, not the reply document.
        if result.strategy == TransportStrategy::NativeForm && result.redirect().is_none() {
            self.driver.navigate(&origin)?;
            self.annotations = DomAnnotations::clean();
        }

        let reconciliation =
            self.reconcile_into(&result, request.reload.as_ref(), request.form.as_ref())?;

        let navigated_to = match &reconciliation {
            Reconciliation::FollowRedirect { url } => {
                let resolved = resolve_redirect(&result.url, url)?;
                info!(redirect = %resolved, "following redirect");
                self.driver.navigate(&resolved)?;
                self.annotations = DomAnnotations::clean();
                Some(resolved)
            }
            _ => None,
        };

        self.driver.wait_idle(self.config.idle_wait_ms)?;

        Ok(SubmissionReport {
            form: request.label(),
            snapshot,
            result,
            failed_attempts,
            reconciliation,
            navigated_to,
        })
    }
}

/// Resolve a redirect from a JSON reply against the URL that was posted
/// to. Storefronts HTML-escape `&` in generated links.
pub fn resolve_redirect(submitted_to: &str, redirect: &str) -> Result<String, FormError> {
    let redirect = redirect.replace("&amp;", "&");
    let base = Url::parse(submitted_to).map_err(|e| FormError::InvalidUrl {
        url: submitted_to.to_string(),
        source: e,
    })?;
    base.join(&redirect)
        .map(|u| u.to_string())
        .map_err(|e| FormError::InvalidUrl {
            url: redirect.clone(),
            source: e,
        })
}
