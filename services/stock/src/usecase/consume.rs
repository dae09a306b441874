use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use nexus_domain::id::{AuditEntryId, ProductId, StockItemId};

use crate::domain::ledger::KeyLedger;
use crate::domain::repository::{AuditTx, ConsumptionTx, InventoryTx, StockStore};
use crate::domain::types::{AuditEntry, KeyGrant};
use crate::error::StockServiceError;

/// Default bound on one consumption, lock waits included.
pub const DEFAULT_CONSUME_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ConsumeInput {
    pub product_id: ProductId,
    pub key_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOutput {
    pub content: String,
    pub item_id: StockItemId,
    pub audit_entry_id: AuditEntryId,
    pub consumed_at: DateTime<Utc>,
}

/// Exchanges a key for one stock item.
///
/// Validation, dequeue, audit append and key burn run in one store
/// transaction; nothing is visible unless all four succeed and the commit
/// goes through. `timeout` bounds the four steps, lock waits included: a run
/// that exceeds it is dropped, which rolls the transaction back, and reported
/// as a storage failure. The commit itself is never cancelled once issued.
pub struct ConsumeUseCase<S: StockStore> {
    pub store: S,
    pub ledger: KeyLedger,
    pub timeout: Duration,
}

impl<S: StockStore> ConsumeUseCase<S> {
    pub async fn execute(&self, input: ConsumeInput) -> Result<ConsumeOutput, StockServiceError> {
        let (tx, output, grant) = match tokio::time::timeout(self.timeout, self.stage(&input)).await
        {
            Ok(staged) => staged?,
            Err(_) => {
                warn!(
                    product_id = %input.product_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "consumption timed out, transaction aborted"
                );
                return Err(anyhow!("consumption timed out after {:?}", self.timeout).into());
            }
        };

        // Not under the timeout: once issued, a commit runs to completion.
        tx.commit().await?;
        info!(
            product_id = %input.product_id,
            item_id = %output.item_id,
            audit_entry_id = %output.audit_entry_id,
            override_key = grant == KeyGrant::Override,
            "stock item consumed"
        );
        Ok(output)
    }

    /// Runs every step short of the commit and hands back the open transaction.
    async fn stage(
        &self,
        input: &ConsumeInput,
    ) -> Result<(S::Tx, ConsumeOutput, KeyGrant), StockServiceError> {
        let mut tx = self.store.begin().await?;
        match self.apply(&mut tx, input).await {
            Ok((output, grant)) => Ok((tx, output, grant)),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = ?rollback_err, "rollback after failed consumption did not complete");
                }
                debug!(product_id = %input.product_id, kind = err.kind(), "consumption rejected");
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut S::Tx,
        input: &ConsumeInput,
    ) -> Result<(ConsumeOutput, KeyGrant), StockServiceError> {
        let now = Utc::now();

        // 1. Key first: a rejected key never touches stock.
        let grant = self.ledger.validate(tx, &input.key_code, now).await?;

        // 2. Claim the oldest item. An empty pool leaves the key as it was.
        let item = tx
            .dequeue_oldest(input.product_id)
            .await?
            .ok_or(StockServiceError::OutOfStock)?;

        // 3. Audit before burning the key so a failed append undoes the dequeue.
        let entry = AuditEntry::record(&item, &input.key_code, now);
        tx.append(&entry).await?;

        // 4. Burn the key (no-op for the override key).
        self.ledger.mark_used(tx, &grant, now).await?;

        let output = ConsumeOutput {
            content: item.content,
            item_id: item.id,
            audit_entry_id: entry.id,
            consumed_at: now,
        };
        Ok((output, grant))
    }
}
