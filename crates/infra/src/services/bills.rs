use serde_json::json;
use tracing::info;

use billbook_accounting::customer_bills;
use billbook_core::{PeriodFilter, RecordFamily, TenantId};
use billbook_events::{EventBus, RecordChanged};
use billbook_invoicing::{Bill, BillId, BillStatus};
use billbook_parties::CustomerId;

use super::BillBook;
use crate::error::{ServiceError, ServiceResult};
use crate::session::Session;
use crate::store::{ListQuery, RecordStore};

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    pub async fn list_bills(&self, session: &Session) -> ServiceResult<Vec<Bill>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        Ok(self
            .books
            .list(tenant_id, &ListQuery::new().order_by("date").descending())
            .await?)
    }

    pub async fn get_bill(&self, session: &Session, id: BillId) -> ServiceResult<Bill> {
        let tenant_id = session.require_owner()?;
        self.load_bill(tenant_id, id).await
    }

    pub async fn customer_bills(
        &self,
        session: &Session,
        customer_id: CustomerId,
        period: &PeriodFilter,
    ) -> ServiceResult<Vec<Bill>> {
        let tenant_id = session.require_owner()?;
        let customer = self.load_customer(tenant_id, customer_id).await?.to_ref();
        let bills: Vec<Bill> = self.books.all(tenant_id).await?;
        Ok(customer_bills(&customer, &bills, period).into_iter().cloned().collect())
    }

    /// Single-field update; the rest of the bill is untouched.
    pub async fn set_bill_status(&self, session: &Session, id: BillId, status: BillStatus) -> ServiceResult<Bill> {
        let tenant_id = session.require_owner()?;
        let mut bill = self.load_bill(tenant_id, id).await?;
        bill.set_status(status);
        self.books
            .patch(tenant_id, RecordFamily::Bills, id.record_id(), json!({ "status": status }))
            .await?;
        info!(%tenant_id, bill_id = %id, ?status, "bill status changed");
        Ok(bill)
    }

    pub(crate) async fn load_bill(&self, tenant_id: TenantId, id: BillId) -> ServiceResult<Bill> {
        self.books
            .get::<Bill>(tenant_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("bill {id}")))
    }
}
