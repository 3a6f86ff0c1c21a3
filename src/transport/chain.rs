use tracing::{info, warn};

use crate::browser::driver::{PageDriver, PostRequest};
use crate::form::error::FormError;
use crate::transport::in_page::InPageFetch;
use crate::transport::native::NativeFormSubmission;
use crate::transport::session_request::SessionRequest;
use crate::transport::{SubmissionResult, Transport, TransportStrategy};

/// Ordered set of transports tried one after another.
///
/// Only connection failures and timeouts move on to the next transport.
/// A reply with any HTTP status ends the chain: the server was reached and
/// re-posting through another channel could apply the same action twice.
pub struct TransportChain {
    transports: Vec<Box<dyn Transport>>,
}

impl TransportChain {
    pub fn new(transports: Vec<Box<dyn Transport>>) -> Self {
        TransportChain { transports }
    }

    /// Build the production transports for the given strategies, in order.
    /// Repeated strategies are tried once.
    pub fn from_strategies(strategies: &[TransportStrategy]) -> Result<Self, FormError> {
        let mut transports: Vec<Box<dyn Transport>> = Vec::new();
        let mut seen = Vec::new();
        for &strategy in strategies {
            if seen.contains(&strategy) {
                continue;
            }
            seen.push(strategy);
            transports.push(build_transport(strategy)?);
        }
        Ok(TransportChain { transports })
    }

    pub fn strategies(&self) -> Vec<TransportStrategy> {
        self.transports.iter().map(|t| t.strategy()).collect()
    }

    /// The transport for one strategy, if the chain carries it.
    pub fn get(&self, strategy: TransportStrategy) -> Option<&dyn Transport> {
        self.transports
            .iter()
            .find(|t| t.strategy() == strategy)
            .map(|t| t.as_ref())
    }

    /// Try each transport in order until one gets a reply.
    ///
    /// Alongside the delivered result comes a record of every attempt that
    /// failed before it. Returns the last transport error when every
    /// transport fails.
    pub fn send(
        &self,
        driver: &mut dyn PageDriver,
        request: &PostRequest,
    ) -> Result<(SubmissionResult, Vec<SubmissionResult>), FormError> {
        let mut failures = Vec::new();
        let mut last_error = None;

        for transport in &self.transports {
            let strategy = transport.strategy();
            match transport.send(driver, request) {
                Ok(result) => {
                    info!(
                        %strategy,
                        url = %request.url,
                        status = ?result.http_status,
                        "submission delivered"
                    );
                    return Ok((result, failures));
                }
                Err(e) if e.is_transport_failure() => {
                    warn!(%strategy, url = %request.url, error = %e, "transport failed, trying next");
                    failures.push(SubmissionResult::from_error(strategy, &request.url, &e));
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| FormError::Transport {
            url: request.url.clone(),
            message: "no transport strategies configured".into(),
        }))
    }
}

/// Production transport for a strategy.
pub fn build_transport(strategy: TransportStrategy) -> Result<Box<dyn Transport>, FormError> {
    Ok(match strategy {
        TransportStrategy::InPageFetch => Box::new(InPageFetch),
        TransportStrategy::SessionRequest => Box::new(SessionRequest::new()?),
        TransportStrategy::NativeForm => Box::new(NativeFormSubmission),
    })
}
