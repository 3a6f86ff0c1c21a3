use std::io::Read;

use serde::Serialize;
use tracing::info;

use crate::browser::session::BrowserSession;
use crate::cli::config::{AppConfig, parse_override};
use crate::form::snapshot::FormLocator;
use crate::pipeline::submitter::{FormRequest, FormSubmitter, PartialReload, SubmissionReport};
use crate::reconcile::patch::DomPatch;
use crate::reconcile::reconciler::{
    DomAnnotations, ReconcileTarget, Transition, outcome, transition_body,
};
use crate::trace::logger::TraceLogger;
use crate::transport::{ResponseBody, TransportStrategy};

// ============================================================================
// submit subcommand
// ============================================================================

/// Arguments of `submit`, already split out of clap's enum.
#[derive(Debug, Clone, Default)]
pub struct SubmitArgs {
    pub page: String,
    pub form: String,
    pub index: usize,
    pub url: Option<String>,
    pub set: Vec<String>,
    pub strategy: Option<String>,
    pub reload_url: Option<String>,
    pub reload_target: Option<String>,
}

/// Turn CLI arguments into a `FormRequest`.
pub fn build_form_request(args: &SubmitArgs) -> Result<FormRequest, Box<dyn std::error::Error>> {
    let mut request = FormRequest::form(FormLocator::nth(args.form.as_str(), args.index));

    if let Some(url) = &args.url {
        request = request.url(url.as_str());
    }
    for raw in &args.set {
        let (name, value) = parse_override(raw)?;
        request = request.set(name, value);
    }
    if let Some(strategy) = &args.strategy {
        request = request.strategy(strategy.parse::<TransportStrategy>()?);
    }
    if let (Some(url), Some(target)) = (&args.reload_url, &args.reload_target) {
        request = request.reload(PartialReload::new(url.as_str(), target.as_str()));
    }

    Ok(request)
}

/// Launch a browser, submit one form and print the report.
pub fn cmd_submit(
    args: &SubmitArgs,
    config: &AppConfig,
) -> Result<SubmissionReport, Box<dyn std::error::Error>> {
    let request = build_form_request(args)?;

    let session = BrowserSession::launch(&config.browser.server_script, config.browser.headless)?;
    let tracer = match &config.trace.file {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    let mut submitter = FormSubmitter::with_config(session, config.submit.to_submitter_config())?
        .with_tracer(tracer);

    info!(page = %args.page, form = %args.form, "submitting");
    submitter.navigate(&args.page)?;
    let report = submitter.submit_form(&request)?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    submitter.into_driver().quit()?;
    Ok(report)
}

// ============================================================================
// reconcile subcommand
// ============================================================================

/// What reconciling a stored body would do to a clean page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcilePreview {
    Applied {
        patches: Vec<DomPatch>,
        annotations: DomAnnotations,
        fingerprint: String,
    },
    FollowRedirect {
        url: String,
    },
    Unstructured {
        bytes: usize,
    },
}

pub fn preview_reconciliation(raw: &str, target: &ReconcileTarget) -> ReconcilePreview {
    let Some(body) = ResponseBody::parse(raw) else {
        return ReconcilePreview::Unstructured { bytes: raw.len() };
    };

    match transition_body(&body, target) {
        Transition::Redirect(url) => ReconcilePreview::FollowRedirect { url },
        Transition::Unstructured => ReconcilePreview::Unstructured { bytes: raw.len() },
        Transition::Annotate { next, patches } => {
            let summary = outcome(&DomAnnotations::clean(), &next, None);
            ReconcilePreview::Applied {
                patches,
                annotations: next,
                fingerprint: summary.fingerprint,
            }
        }
    }
}

/// Reconcile a body from a file (or stdin for `-`) and print the preview.
pub fn cmd_reconcile(
    body_path: &str,
    form: Option<&str>,
    config: &AppConfig,
) -> Result<ReconcilePreview, Box<dyn std::error::Error>> {
    let raw = if body_path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(body_path)?
    };

    let target = ReconcileTarget {
        form: form.map(FormLocator::from),
        alert_container: config.submit.alert_container.clone(),
    };
    let preview = preview_reconciliation(&raw, &target);
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(preview)
}
