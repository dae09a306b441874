use chrono::{DateTime, Utc};

use nexus_domain::id::{AccessKeyId, AuditEntryId, ProductId, StockItemId};

/// Lifecycle of a stored access key. `Used` is terminal; expiry is computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Unused,
    Used,
}

/// Bearer key granting one stock consumption.
#[derive(Debug, Clone)]
pub struct AccessKey {
    pub id: AccessKeyId,
    pub code: String,
    /// `None` means the key never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub status: KeyStatus,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    pub fn is_used(&self) -> bool {
        self.status == KeyStatus::Used
    }
}

/// One unit of deliverable content, queued under its product until consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    pub id: StockItemId,
    pub product_id: ProductId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StockItem {
    /// FIFO position: oldest first, id breaks ties.
    pub fn fifo_key(&self) -> (DateTime<Utc>, StockItemId) {
        (self.created_at, self.id)
    }
}

/// Immutable record of a completed consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub product_id: ProductId,
    pub content: String,
    pub key_used: String,
    pub consumed_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Copy a dequeued item into an audit record against the presented key code.
    pub fn record(item: &StockItem, key_used: &str, consumed_at: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new(),
            product_id: item.product_id,
            content: item.content.clone(),
            key_used: key_used.to_owned(),
            consumed_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

/// Product with its live available count. A snapshot; may lag in-flight consumptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub icon: String,
    pub available_count: u64,
}

/// Outcome of a successful key validation inside a consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGrant {
    /// A stored, unused, unexpired key. Must be marked used on commit.
    SingleUse(AccessKeyId),
    /// The administrative override key. Never marked used.
    Override,
}

/// Read-only login check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCheck {
    pub valid: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub already_used: bool,
    pub is_override: bool,
}

/// Historical fixed override credential, used when `OVERRIDE_KEY` is unset.
pub const DEFAULT_OVERRIDE_KEY: &str = "adminkey777";

/// Prefix of generated key codes.
pub const KEY_CODE_PREFIX: &str = "NEXUS-";

/// Random characters following the prefix.
pub const KEY_CODE_LEN: usize = 6;

/// Upper bound on keys issued in one batch.
pub const MAX_KEYS_PER_BATCH: u32 = 500;

/// Icon given to products created without one.
pub const DEFAULT_PRODUCT_ICON: &str = "✨";
