use serde::{Deserialize, Serialize};

use crate::form::snapshot::FormLocator;

/// Bootstrap alert flavour of a page-level banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Danger,
    Success,
}

impl AlertKind {
    /// CSS class list of the rendered banner.
    pub fn css_class(&self) -> &'static str {
        match self {
            AlertKind::Danger => "alert alert-danger alert-dismissible",
            AlertKind::Success => "alert alert-success alert-dismissible",
        }
    }
}

/// One DOM mutation, applied by the browser server in list order.
///
/// A reconciliation batch always starts with the two clear operations,
/// so replaying a batch leaves the same visible state as applying it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomPatch {
    /// Drop `is-invalid` from inputs and hide `.invalid-feedback` slots.
    /// Scoped to the `index`-th match of `form` when given, otherwise the
    /// whole document.
    ClearFieldErrors {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form: Option<FormLocator>,
    },

    /// Remove every `.alert` inside the container.
    ClearAlerts { container: String },

    /// Append a banner to the container, creating the container (prepended
    /// to `#content`, else `body`) when absent.
    ShowAlert {
        container: String,
        kind: AlertKind,
        message: String,
    },

    /// Show the inline error slot with `message` and flag the input.
    ShowFieldError {
        error_id: String,
        input_id: String,
        message: String,
    },

    /// Replace the target region's inner HTML verbatim.
    ReplaceHtml { target: String, html: String },
}
