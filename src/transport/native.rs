use tracing::debug;

use crate::browser::driver::{PageDriver, PostRequest};
use crate::form::error::FormError;
use crate::transport::{SubmissionResult, Transport, TransportStrategy};

/// Submits a hidden `<form method="post">` carrying the snapshot entries
/// and reads the landed page as the reply.
///
/// Reuses the browser's own credential handling, at the cost of a full
/// navigation: the original page context is gone afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFormSubmission;

impl Transport for NativeFormSubmission {
    fn strategy(&self) -> TransportStrategy {
        TransportStrategy::NativeForm
    }

    fn send(
        &self,
        driver: &mut dyn PageDriver,
        request: &PostRequest,
    ) -> Result<SubmissionResult, FormError> {
        debug!(url = %request.url, fields = request.entries.len(), "native form submission");
        let reply = driver.native_submit(request)?;
        Ok(SubmissionResult::from_reply(self.strategy(), &request.url, reply))
    }
}
