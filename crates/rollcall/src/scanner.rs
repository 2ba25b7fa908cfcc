//! QR scanning sessions.
//!
//! Only one scan may be in progress at a time. A [`ScannerSlot`] hands out
//! a single [`ScannerLease`]; the lease frees the slot when dropped, on
//! every exit path including errors and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::handshake::{self, DecodeError, EventContext};

/// The single scanning resource.
#[derive(Debug, Clone, Default)]
pub struct ScannerSlot {
    held: Arc<AtomicBool>,
}

impl ScannerSlot {
    /// Create a free slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScannerBusy`] if a lease is already held.
    pub fn acquire(&self) -> Result<ScannerLease> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ScannerBusy);
        }
        debug!("Scanner acquired");
        Ok(ScannerLease {
            held: Arc::clone(&self.held),
        })
    }

    /// Whether a lease is currently held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Exclusive use of the scanner. Dropping it releases the slot.
#[derive(Debug)]
pub struct ScannerLease {
    held: Arc<AtomicBool>,
}

impl Drop for ScannerLease {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
        debug!("Scanner released");
    }
}

/// Something that yields raw QR payloads.
///
/// Payloads are bytes as read from the device; a scanner may emit text in
/// any encoding and deciding what is usable is up to [`scan_event`].
#[async_trait::async_trait]
pub trait ScanSource: Send {
    /// Wait for the next payload. `None` means the source is exhausted.
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Reads one payload per line, skipping blank lines.
///
/// Handheld scanners in keyboard mode end each code with a newline, so
/// stdin works as a source.
#[derive(Debug)]
pub struct LineScanner<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> LineScanner<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait::async_trait]
impl<R: AsyncBufRead + Unpin + Send> ScanSource for LineScanner<R> {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let mut line = Vec::new();
            if self.reader.read_until(b'\n', &mut line).await? == 0 {
                return Ok(None);
            }
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                return Ok(Some(line));
            }
        }
    }
}

/// Scan until a valid event handshake is read.
///
/// Invalid payloads, including ones that aren't UTF-8, are passed to
/// `on_rejected` as [`DecodeError`]s and scanning continues.
/// The scanner is held for the whole call.
///
/// # Errors
///
/// Returns [`Error::ScannerBusy`] if another scan is running and
/// [`Error::ScanAborted`] if the source runs out first.
pub async fn scan_event<S, F>(
    slot: &ScannerSlot,
    source: &mut S,
    mut on_rejected: F,
) -> Result<EventContext>
where
    S: ScanSource + ?Sized,
    F: FnMut(&DecodeError),
{
    let _lease = slot.acquire()?;

    while let Some(raw) = source.next_payload().await? {
        let decoded = String::from_utf8(raw)
            .map_err(|e| DecodeError::MalformedPayload(format!("payload is not UTF-8: {e}")))
            .and_then(|text| handshake::decode(&text));

        match decoded {
            Ok(context) => {
                info!(event = %context.event_name, date = %context.date, "Event scanned");
                return Ok(context);
            }
            Err(e) => {
                debug!(error = %e, "Rejected scanned payload");
                on_rejected(&e);
            }
        }
    }

    Err(Error::ScanAborted)
}
