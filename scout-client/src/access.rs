use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cloud::AccessCodes;
use crate::local_store::{LocalStore, UA_ACCESS};
use crate::{ClientError, ClientResult};

/// Cached proof that a UA access code was redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub expiry: DateTime<Utc>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl AccessGrant {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

/// Gate in front of the UA direct-API mode.
#[derive(Clone)]
pub struct AccessGate {
    store: Arc<LocalStore>,
}

impl AccessGate {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// Check `code` against the published list and cache the grant.
    pub fn redeem(
        &self,
        code: &str,
        codes: &AccessCodes,
        now: DateTime<Utc>,
    ) -> ClientResult<AccessGrant> {
        let entry = codes
            .access_codes
            .iter()
            .find(|c| c.code.trim().eq_ignore_ascii_case(code.trim()))
            .ok_or(ClientError::InvalidAccessCode)?;

        if now >= entry.expiry_date {
            tracing::info!("Rejected expired access code");
            return Err(ClientError::ExpiredAccess);
        }

        let grant = AccessGrant {
            expiry: entry.expiry_date,
            description: entry.description.clone(),
            timestamp: now,
        };
        self.store.set(UA_ACCESS, &grant)?;
        tracing::info!(expiry = %grant.expiry, "Access code redeemed");
        Ok(grant)
    }

    /// Current grant, if any. An expired grant is cleared from the store.
    pub fn ensure_valid(&self, now: DateTime<Utc>) -> ClientResult<AccessGrant> {
        let grant = match self.store.get::<AccessGrant>(UA_ACCESS) {
            Ok(Some(grant)) => grant,
            Ok(None) => return Err(ClientError::ExpiredAccess),
            Err(e) => {
                // an unreadable cache is treated like an expired one
                tracing::warn!("Discarding unreadable access grant: {}", e);
                self.store.remove(UA_ACCESS)?;
                return Err(ClientError::ExpiredAccess);
            }
        };

        if grant.is_expired(now) {
            tracing::info!("Cached access grant expired, clearing");
            self.store.remove(UA_ACCESS)?;
            return Err(ClientError::ExpiredAccess);
        }
        Ok(grant)
    }

    pub fn clear(&self) -> ClientResult<()> {
        self.store.remove(UA_ACCESS)
    }
}
