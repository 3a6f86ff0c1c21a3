use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    /// Required form or field missing from the DOM
    #[error("Element '{selector}' not found: {context}")]
    ElementNotFound { selector: String, context: String },

    /// Connection-level failure while dispatching a submission
    #[error("Transport failed for {url}: {message}")]
    Transport { url: String, message: String },

    /// No reply within the caller's bound
    #[error("Timed out after {timeout_ms}ms waiting for {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// Action or redirect URL could not be resolved
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Browser server subprocess failed to spawn
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SessionSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the browser server failed
    #[error("Browser session I/O: {0}")]
    SessionIO(String),

    /// Browser server replied with ok=false or an unexpected shape
    #[error("Browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// JSON parsing failed (browser server output)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (command to browser server)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FormError {
    /// Connection failures and timeouts are the only errors a transport
    /// chain fails over on.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, FormError::Transport { .. } | FormError::Timeout { .. })
    }
}
