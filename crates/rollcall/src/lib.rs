//! `rollcall` - live event check-in
//!
//! Check-in desks decode an event from a QR handshake and submit
//! attendance records to a server-owned ledger. Admin dashboards load the
//! ledger once, then follow new check-ins over a push channel that
//! reconnects on its own after drops.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod handshake;
pub mod issuer;
pub mod logging;
pub mod members;
pub mod record;
pub mod scanner;
pub mod session;
pub mod stats;
pub mod store;
pub mod submit;

#[cfg(test)]
mod test_support;

pub use api::{HttpLedger, LedgerApi};
pub use channel::{ChannelEvent, ChannelState, LiveSyncChannel};
pub use config::Config;
pub use error::{Error, Result};
pub use handshake::{decode, DecodeError, EventContext};
pub use logging::init_logging;
pub use members::MemberDirectory;
pub use record::{Category, CheckInPayload, CheckInRecord, Identity};
pub use session::DashboardSession;
pub use stats::Stats;
pub use store::RecordStore;
pub use submit::{SubmitOutcome, Submitter};
