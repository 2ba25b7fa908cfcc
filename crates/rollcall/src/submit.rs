//! Check-in submission.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::LedgerApi;
use crate::error::Result;
use crate::handshake::EventContext;
use crate::record::{CheckInPayload, Identity};

/// What happened to a submission that didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The ledger accepted the check-in.
    Accepted,
    /// No name was chosen, so nothing was sent.
    Skipped,
}

/// Sends check-ins to the ledger.
///
/// There is no automatic retry. A rejected or failed submission is returned
/// to the caller, who shows it to the person at the desk.
#[derive(Clone)]
pub struct Submitter {
    ledger: Arc<dyn LedgerApi>,
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter").finish_non_exhaustive()
    }
}

impl Submitter {
    /// Create a submitter backed by `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerApi>) -> Self {
        Self { ledger }
    }

    /// Submit a check-in for `identity`.
    ///
    /// A blank name is a no-op and returns [`SubmitOutcome::Skipped`]
    /// without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) if the ledger could
    /// not be reached and [`Error::ServerRejected`](crate::Error::ServerRejected)
    /// if it answered with a non-success status.
    pub async fn submit(
        &self,
        identity: &Identity,
        context: Option<&EventContext>,
    ) -> Result<SubmitOutcome> {
        if identity.is_blank() {
            return Ok(SubmitOutcome::Skipped);
        }

        let payload = CheckInPayload::now(identity);
        let event = context.map_or("", |c| c.event_name.as_str());

        match self.ledger.submit_checkin(&payload).await {
            Ok(()) => {
                info!(
                    name = %payload.name,
                    category = %payload.category,
                    event,
                    "Check-in accepted"
                );
                Ok(SubmitOutcome::Accepted)
            }
            Err(e) => {
                warn!(name = %payload.name, event, error = %e, "Check-in failed");
                Err(e)
            }
        }
    }
}
