use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use tracing::instrument;

use billbook_core::{DocumentFamily, DocumentNumber, TenantId, next_document_number};
use billbook_events::{EventBus, RecordChanged};

use super::BillBook;
use crate::error::ServiceResult;
use crate::session::Session;
use crate::store::RecordStore;

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    /// Next free number in `family` for the financial year containing `date`.
    ///
    /// Read-then-write: nothing reserves the number, so two callers racing
    /// between this read and their insert can be handed the same value.
    #[instrument(skip_all, fields(family = ?family, %date))]
    pub async fn next_number(
        &self,
        session: &Session,
        family: DocumentFamily,
        date: NaiveDate,
    ) -> ServiceResult<DocumentNumber> {
        match session.owner() {
            Some(tenant_id) => self.next_number_for(tenant_id, family, date).await,
            None => Ok(next_document_number(std::iter::empty::<&str>(), date)),
        }
    }

    pub(crate) async fn next_number_for(
        &self,
        tenant_id: TenantId,
        family: DocumentFamily,
        date: NaiveDate,
    ) -> ServiceResult<DocumentNumber> {
        let bodies = self.books.bodies(tenant_id, family.record_family()).await?;
        let numbers: Vec<&str> = bodies
            .iter()
            .filter_map(|b| b.get(family.number_field()).and_then(JsonValue::as_str))
            .collect();
        Ok(next_document_number(numbers, date))
    }
}
