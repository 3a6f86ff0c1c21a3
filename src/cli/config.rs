use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::session::DEFAULT_SERVER_SCRIPT;
use crate::pipeline::submitter::SubmitterConfig;
use crate::reconcile::reconciler::DEFAULT_ALERT_CONTAINER;
use crate::transport::TransportStrategy;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-reconciler",
    version,
    about = "Submit storefront forms over AJAX and reconcile the JSON reply into the page"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-reconciler.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a page, submit one of its forms and print the report as JSON
    Submit {
        /// Page that hosts the form
        #[arg(long)]
        page: String,

        /// Form selector, e.g. "#form-login"
        #[arg(long)]
        form: String,

        /// Zero-based index when the selector matches several forms
        #[arg(long, default_value_t = 0)]
        index: usize,

        /// Post here instead of the form's action
        #[arg(long)]
        url: Option<String>,

        /// Field override, repeatable: --set quantity=3
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Use only this transport: in-page-fetch, session-request, native-form
        #[arg(long)]
        strategy: Option<String>,

        /// Region source fetched after reconciliation
        #[arg(long, requires = "reload_target")]
        reload_url: Option<String>,

        /// Selector whose contents the reload replaces
        #[arg(long, requires = "reload_url")]
        reload_target: Option<String>,
    },

    /// Reconcile a stored response body offline and print the patches
    Reconcile {
        /// File holding the body, or "-" for stdin
        #[arg(long)]
        body: String,

        /// Form selector the field patches are scoped to
        #[arg(long)]
        form: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-reconciler.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub submit: SubmitSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub trace: TraceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSection {
    #[serde(default = "default_strategies")]
    pub strategies: Vec<TransportStrategy>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,

    #[serde(default = "default_alert_container")]
    pub alert_container: String,
}

impl Default for SubmitSection {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            timeout_ms: default_timeout_ms(),
            idle_wait_ms: default_idle_wait_ms(),
            alert_container: default_alert_container(),
        }
    }
}

impl SubmitSection {
    pub fn to_submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            strategies: self.strategies.clone(),
            timeout_ms: self.timeout_ms,
            idle_wait_ms: self.idle_wait_ms,
            alert_container: self.alert_container.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSection {
    #[serde(default = "default_server_script")]
    pub server_script: String,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            server_script: default_server_script(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceSection {
    /// JSONL submission trace; disabled when unset
    pub file: Option<String>,
}

// Serde default helpers
fn default_strategies() -> Vec<TransportStrategy> { TransportStrategy::PREFERENCE.to_vec() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_idle_wait_ms() -> u64 { 500 }
fn default_alert_container() -> String { DEFAULT_ALERT_CONTAINER.to_string() }
fn default_server_script() -> String { DEFAULT_SERVER_SCRIPT.to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-reconciler.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

/// Split `name=value`; only the first `=` separates.
pub fn parse_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}
