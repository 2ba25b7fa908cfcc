//! Event issuing.
//!
//! An admin creates an event by name and date. The event gets a QR payload
//! for display right away; registering it with the ledger happens in the
//! background and only logs on failure.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{EventRegistration, LedgerApi};
use crate::error::Result;
use crate::handshake::EventContext;

/// A freshly issued event.
#[derive(Debug)]
pub struct IssuedEvent {
    /// The event as encoded in the QR code.
    pub context: EventContext,
    /// JSON text to render as a QR code.
    pub payload: String,
    /// Background registration with the ledger.
    ///
    /// Awaiting it is optional. It never fails; registration errors are
    /// logged.
    pub registration: JoinHandle<()>,
}

/// Issue an event and start registering it.
///
/// Returns `Ok(None)` without doing anything if `name` or `date` is blank.
/// The event id is the current Unix time in milliseconds.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error only if the payload can't be serialized.
pub fn issue(ledger: Arc<dyn LedgerApi>, name: &str, date: &str) -> Result<Option<IssuedEvent>> {
    let name = name.trim();
    let date = date.trim();
    if name.is_empty() || date.is_empty() {
        return Ok(None);
    }

    let context = EventContext {
        event_name: name.to_string(),
        date: date.to_string(),
        id: Utc::now().timestamp_millis().to_string(),
    };
    let payload = context.to_payload()?;

    let registration = EventRegistration {
        name: context.event_name.clone(),
        date: context.date.clone(),
    };
    let task = tokio::spawn(async move {
        match ledger.register_event(&registration).await {
            Ok(()) => info!(event = %registration.name, "Event registered"),
            Err(e) => warn!(event = %registration.name, error = %e, "Event registration failed"),
        }
    });

    Ok(Some(IssuedEvent {
        context,
        payload,
        registration: task,
    }))
}
