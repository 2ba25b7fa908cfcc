//! Member directory.

use tracing::{debug, warn};

use crate::api::LedgerApi;
use crate::error::Result;

/// Cached member list used to pick a name at the desk.
#[derive(Debug, Clone, Default)]
pub struct MemberDirectory {
    members: Vec<String>,
}

impl MemberDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names in the order the server returned them.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Whether `name` is on the list, ignoring surrounding whitespace.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.members.iter().any(|m| m == name)
    }

    /// Fetch the member list again.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The previous list is kept.
    pub async fn refresh(&mut self, ledger: &dyn LedgerApi) -> Result<usize> {
        match ledger.list_members().await {
            Ok(members) => {
                debug!(count = members.len(), "Member list refreshed");
                self.members = members;
                Ok(self.members.len())
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh member list");
                Err(e)
            }
        }
    }
}
