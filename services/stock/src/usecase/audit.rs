use nexus_domain::id::ProductId;
use nexus_domain::pagination::PageRequest;

use crate::domain::repository::AuditRepository;
use crate::domain::types::AuditEntry;
use crate::error::StockServiceError;

pub struct ListAuditEntriesInput {
    pub product_id: Option<ProductId>,
    pub page: PageRequest,
}

pub struct ListAuditEntriesUseCase<R: AuditRepository> {
    pub audit: R,
}

impl<R: AuditRepository> ListAuditEntriesUseCase<R> {
    pub async fn execute(
        &self,
        input: ListAuditEntriesInput,
    ) -> Result<Vec<AuditEntry>, StockServiceError> {
        self.audit
            .list_entries(input.product_id, input.page.clamped())
            .await
    }
}
