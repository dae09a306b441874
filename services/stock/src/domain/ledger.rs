use std::sync::Arc;

use chrono::{DateTime, Utc};

use nexus_domain::id::AccessKeyId;

use crate::domain::repository::{KeyLedgerTx, KeyLookup};
use crate::domain::types::{AccessKey, KeyGrant, LoginCheck};
use crate::error::StockServiceError;

/// Key validation rules shared by the transactional and the login-time paths.
///
/// Holds the administrative override code, which bypasses the stored state
/// entirely: it is honored whether or not a row exists for it, never expires
/// and is never marked used.
#[derive(Debug, Clone, Default)]
pub struct KeyLedger {
    override_code: Option<Arc<str>>,
}

impl KeyLedger {
    /// An empty override code disables the override.
    pub fn new(override_code: Option<String>) -> Self {
        Self {
            override_code: override_code
                .filter(|code| !code.is_empty())
                .map(Arc::from),
        }
    }

    pub fn is_override(&self, code: &str) -> bool {
        self.override_code.as_deref() == Some(code)
    }

    /// Decide whether a stored key may be consumed at `now`.
    ///
    /// Used is reported before expired: a consumed key stays consumed.
    pub fn evaluate(
        key: Option<&AccessKey>,
        now: DateTime<Utc>,
    ) -> Result<AccessKeyId, StockServiceError> {
        let key = key.ok_or(StockServiceError::KeyInvalid)?;
        if key.is_used() {
            return Err(StockServiceError::KeyAlreadyUsed);
        }
        if key.is_expired_at(now) {
            return Err(StockServiceError::KeyExpired);
        }
        Ok(key.id)
    }

    /// Transactional validation. Locks the stored key for the rest of `tx`.
    pub async fn validate<T: KeyLedgerTx>(
        &self,
        tx: &mut T,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyGrant, StockServiceError> {
        if self.is_override(code) {
            return Ok(KeyGrant::Override);
        }
        let key = tx.lock_key(code).await?;
        Self::evaluate(key.as_ref(), now).map(KeyGrant::SingleUse)
    }

    /// Burn a single-use grant. The override grant is left untouched.
    pub async fn mark_used<T: KeyLedgerTx>(
        &self,
        tx: &mut T,
        grant: &KeyGrant,
        now: DateTime<Utc>,
    ) -> Result<(), StockServiceError> {
        match grant {
            KeyGrant::SingleUse(id) => tx.mark_used(*id, now).await,
            KeyGrant::Override => Ok(()),
        }
    }

    /// Read-only check for the login screen. Takes no locks and writes nothing.
    pub async fn check_for_login<R: KeyLookup>(
        &self,
        keys: &R,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginCheck, StockServiceError> {
        if self.is_override(code) {
            return Ok(LoginCheck {
                valid: true,
                expires_at: None,
                already_used: false,
                is_override: true,
            });
        }
        let key = keys
            .find_key(code)
            .await?
            .ok_or(StockServiceError::KeyInvalid)?;
        Ok(LoginCheck {
            valid: Self::evaluate(Some(&key), now).is_ok(),
            expires_at: key.expires_at,
            already_used: key.is_used(),
            is_override: false,
        })
    }
}
