//! Test doubles shared by unit tests.

use std::sync::Mutex;

use crate::api::{EventRegistration, LedgerApi};
use crate::error::{Error, Result};
use crate::record::{CheckInPayload, CheckInRecord};

/// Ledger stub recording every call it receives.
#[derive(Debug, Default)]
pub struct StubLedger {
    pub members: Mutex<Option<Vec<String>>>,
    pub records: Mutex<Option<Vec<CheckInRecord>>>,
    pub reject_with: Option<u16>,
    pub submitted: Mutex<Vec<CheckInPayload>>,
    pub registered: Mutex<Vec<EventRegistration>>,
    pub record_fetches: Mutex<usize>,
}

impl StubLedger {
    pub fn with_records(records: Vec<CheckInRecord>) -> Self {
        Self {
            records: Mutex::new(Some(records)),
            ..Self::default()
        }
    }

    pub fn with_members(members: &[&str]) -> Self {
        Self {
            members: Mutex::new(Some(members.iter().map(ToString::to_string).collect())),
            ..Self::default()
        }
    }

    pub fn set_records(&self, records: Option<Vec<CheckInRecord>>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn set_members(&self, members: Option<Vec<String>>) {
        *self.members.lock().unwrap() = members;
    }

    fn check(&self, endpoint: &'static str) -> Result<()> {
        match self.reject_with {
            Some(status) => Err(Error::ServerRejected { endpoint, status }),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl LedgerApi for StubLedger {
    async fn list_members(&self) -> Result<Vec<String>> {
        self.members
            .lock()
            .unwrap()
            .clone()
            .ok_or(Error::ServerRejected {
                endpoint: crate::api::MEMBERS_PATH,
                status: 503,
            })
    }

    async fn list_records(&self) -> Result<Vec<CheckInRecord>> {
        *self.record_fetches.lock().unwrap() += 1;
        self.records
            .lock()
            .unwrap()
            .clone()
            .ok_or(Error::ServerRejected {
                endpoint: crate::api::RECORDS_PATH,
                status: 503,
            })
    }

    async fn submit_checkin(&self, payload: &CheckInPayload) -> Result<()> {
        self.check(crate::api::CHECKIN_PATH)?;
        self.submitted.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn register_event(&self, registration: &EventRegistration) -> Result<()> {
        self.check(crate::api::EVENTS_PATH)?;
        self.registered.lock().unwrap().push(registration.clone());
        Ok(())
    }
}
