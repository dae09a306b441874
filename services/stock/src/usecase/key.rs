use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use tracing::{info, warn};

use nexus_domain::id::AccessKeyId;
use nexus_domain::pagination::PageRequest;

use crate::domain::ledger::KeyLedger;
use crate::domain::repository::{KeyLookup, KeyRepository};
use crate::domain::types::{
    AccessKey, KEY_CODE_LEN, KEY_CODE_PREFIX, KeyStatus, LoginCheck, MAX_KEYS_PER_BATCH,
};
use crate::error::StockServiceError;

/// Charset for generated key codes (uppercase alphanumeric).
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Batches drawn before giving up when generated codes keep colliding.
const MAX_ISSUE_ATTEMPTS: usize = 3;

fn generate_code() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..KEY_CODE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    format!("{KEY_CODE_PREFIX}{suffix}")
}

// ── ValidateKeyForLogin ──────────────────────────────────────────────────────

pub struct ValidateKeyForLoginUseCase<R: KeyLookup> {
    pub keys: R,
    pub ledger: KeyLedger,
}

impl<R: KeyLookup> ValidateKeyForLoginUseCase<R> {
    pub async fn execute(&self, code: &str) -> Result<LoginCheck, StockServiceError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(StockServiceError::KeyInvalid);
        }
        self.ledger.check_for_login(&self.keys, code, Utc::now()).await
    }
}

// ── IssueKeys ────────────────────────────────────────────────────────────────

pub struct IssueKeysInput {
    pub count: u32,
    /// `None` issues keys that never expire.
    pub ttl_hours: Option<u32>,
}

pub struct IssueKeysUseCase<R: KeyRepository> {
    pub keys: R,
}

impl<R: KeyRepository> IssueKeysUseCase<R> {
    pub async fn execute(&self, input: IssueKeysInput) -> Result<Vec<AccessKey>, StockServiceError> {
        if input.count == 0 || input.count > MAX_KEYS_PER_BATCH {
            return Err(StockServiceError::InvalidInput("count must be between 1 and 500"));
        }
        if input.ttl_hours == Some(0) {
            return Err(StockServiceError::InvalidInput("ttl_hours must be positive"));
        }

        let now = Utc::now();
        let expires_at = match input.ttl_hours {
            Some(hours) => Some(
                Duration::try_hours(i64::from(hours))
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or(StockServiceError::InvalidInput("ttl_hours out of range"))?,
            ),
            None => None,
        };

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let keys = draw_batch(input.count, expires_at, now);
            if self.keys.insert_keys(&keys).await? {
                info!(count = keys.len(), ttl_hours = ?input.ttl_hours, "access keys issued");
                return Ok(keys);
            }
            warn!(attempt, "generated key code already taken, drawing a new batch");
        }
        Err(anyhow!("no free key codes after {MAX_ISSUE_ATTEMPTS} attempts").into())
    }
}

/// `count` unused keys with pairwise distinct codes.
fn draw_batch(
    count: u32,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<AccessKey> {
    let mut codes = std::collections::HashSet::with_capacity(count as usize);
    while codes.len() < count as usize {
        codes.insert(generate_code());
    }
    codes
        .into_iter()
        .map(|code| AccessKey {
            id: AccessKeyId::new(),
            code,
            expires_at,
            status: KeyStatus::Unused,
            used_at: None,
            created_at: now,
        })
        .collect()
}

// ── ListKeys ─────────────────────────────────────────────────────────────────

pub struct ListKeysUseCase<R: KeyRepository> {
    pub keys: R,
}

impl<R: KeyRepository> ListKeysUseCase<R> {
    pub async fn execute(&self, page: PageRequest) -> Result<Vec<AccessKey>, StockServiceError> {
        self.keys.list_keys(page.clamped()).await
    }
}

// ── RevokeKey ────────────────────────────────────────────────────────────────

pub struct RevokeKeyUseCase<R: KeyRepository> {
    pub keys: R,
}

impl<R: KeyRepository> RevokeKeyUseCase<R> {
    pub async fn execute(&self, id: AccessKeyId) -> Result<(), StockServiceError> {
        if !self.keys.delete_key(id).await? {
            return Err(StockServiceError::KeyNotFound);
        }
        info!(key_id = %id, "access key revoked");
        Ok(())
    }
}
