//! Organization allow-list
//!
//! The list is written once, under a reserved simple key, when the contract is
//! instantiated. Later invocations only read it.

use crate::ledger::Ledger;
use crate::types::Identity;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Organizations permitted to cast ballots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedOrganizations {
    organizations: Vec<String>,
}

impl AllowedOrganizations {
    pub fn new(organizations: Vec<String>) -> Self {
        Self { organizations }
    }

    /// Case-sensitive exact membership
    pub fn is_allowed(&self, organization: &str) -> bool {
        self.organizations.iter().any(|o| o == organization)
    }

    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }

    /// Ledger value encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reads and writes the allow-list stored under `key`
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    key: Vec<u8>,
}

impl AuthorizationGate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into().into_bytes(),
        }
    }

    /// Store the allow-list; refused once a list exists
    pub fn initialize<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        organizations: &[String],
    ) -> Result<()> {
        if ledger.get_state(&self.key)?.is_some() {
            return Err(Error::already_initialized(
                "organization allow-list is already set",
            ));
        }
        if organizations.is_empty() {
            warn!("Initializing with an empty allow-list; no organization will be able to vote");
        }

        let allowed = AllowedOrganizations::new(organizations.to_vec());
        ledger.put_state(&self.key, &allowed.to_bytes()?)?;
        info!(organizations = ?allowed.organizations(), "Stored organization allow-list");
        Ok(())
    }

    /// Read the stored allow-list
    pub fn load<L: Ledger + ?Sized>(&self, ledger: &L) -> Result<AllowedOrganizations> {
        let bytes = ledger
            .get_state(&self.key)?
            .ok_or_else(|| Error::not_initialized("organization allow-list has not been set"))?;
        AllowedOrganizations::from_bytes(&bytes)
    }

    /// Fail unless `identity` belongs to an allowed organization
    pub fn authorize<L: Ledger + ?Sized>(&self, ledger: &L, identity: &Identity) -> Result<()> {
        let allowed = self.load(ledger)?;
        if !allowed.is_allowed(&identity.organization) {
            warn!(
                user = %identity.user,
                organization = %identity.organization,
                "Rejected ballot from organization outside the allow-list"
            );
            return Err(Error::not_authorized(&identity.organization));
        }
        debug!(organization = %identity.organization, "Organization authorized");
        Ok(())
    }
}
