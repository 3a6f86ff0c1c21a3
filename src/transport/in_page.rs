use tracing::debug;

use crate::browser::driver::{PageDriver, PostRequest};
use crate::form::error::FormError;
use crate::transport::{SubmissionResult, Transport, TransportStrategy};

/// Issues the POST with `fetch()` from the page's own script context.
///
/// Cheapest option; relies on the page having the right cookie/CORS
/// posture for the target URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct InPageFetch;

impl Transport for InPageFetch {
    fn strategy(&self) -> TransportStrategy {
        TransportStrategy::InPageFetch
    }

    fn send(
        &self,
        driver: &mut dyn PageDriver,
        request: &PostRequest,
    ) -> Result<SubmissionResult, FormError> {
        debug!(url = %request.url, bytes = request.body.len(), "in-page fetch");
        let reply = driver.fetch(request)?;
        Ok(SubmissionResult::from_reply(self.strategy(), &request.url, reply))
    }
}
