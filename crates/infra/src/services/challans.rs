use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use billbook_accounting::{customer_challans, previous_balance, unbilled_challans};
use billbook_core::{DocumentFamily, PeriodFilter, TenantId};
use billbook_events::{EventBus, RecordChanged};
use billbook_invoicing::Bill;
use billbook_parties::{CustomerId, CustomerRef};
use billbook_sales::{ChallanDraft, ChallanId, DeliveryChallan};

use super::BillBook;
use crate::error::{ServiceError, ServiceResult};
use crate::session::Session;
use crate::store::{ListQuery, RecordStore};

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    /// All challans, newest date first.
    pub async fn list_challans(&self, session: &Session) -> ServiceResult<Vec<DeliveryChallan>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        Ok(self
            .books
            .list(tenant_id, &ListQuery::new().order_by("date").descending())
            .await?)
    }

    pub async fn get_challan(&self, session: &Session, id: ChallanId) -> ServiceResult<DeliveryChallan> {
        let tenant_id = session.require_owner()?;
        self.load_challan(tenant_id, id).await
    }

    /// Number the challan, freeze the customer's carried-forward balance
    /// into it and store it unbilled.
    #[instrument(skip_all, fields(customer = %draft.customer.name, date = %draft.date))]
    pub async fn create_challan(&self, session: &Session, draft: ChallanDraft) -> ServiceResult<DeliveryChallan> {
        let tenant_id = session.require_owner()?;
        draft.validate()?;
        if let Some(id) = draft.customer.id {
            self.load_customer(tenant_id, id).await?;
        }

        let number = self.next_number_for(tenant_id, DocumentFamily::Challan, draft.date).await?;
        let opening = self.balance_for(tenant_id, &draft.customer).await?;
        let challan = DeliveryChallan::create(ChallanId::generate(), number.to_string(), draft, opening, Utc::now())?;

        self.books.insert(tenant_id, &challan).await?;
        info!(
            %tenant_id,
            challan_id = %challan.id,
            number = %challan.challan_number,
            previous_balance = %challan.previous_balance,
            "challan created"
        );
        Ok(challan)
    }

    /// Rejected with a conflict once the challan is billed.
    pub async fn update_challan(
        &self,
        session: &Session,
        id: ChallanId,
        draft: ChallanDraft,
    ) -> ServiceResult<DeliveryChallan> {
        let tenant_id = session.require_owner()?;
        let mut challan = self.load_challan(tenant_id, id).await?;
        challan.update(draft)?;
        self.books.save(tenant_id, &challan).await?;
        Ok(challan)
    }

    pub async fn delete_challan(&self, session: &Session, id: ChallanId) -> ServiceResult<()> {
        let tenant_id = session.require_owner()?;
        let challan = self.load_challan(tenant_id, id).await?;
        challan.ensure_deletable()?;
        self.books.delete::<DeliveryChallan>(tenant_id, id).await?;
        info!(%tenant_id, challan_id = %id, "challan deleted");
        Ok(())
    }

    pub async fn customer_challans(
        &self,
        session: &Session,
        customer_id: CustomerId,
        period: &PeriodFilter,
    ) -> ServiceResult<Vec<DeliveryChallan>> {
        let tenant_id = session.require_owner()?;
        let customer = self.load_customer(tenant_id, customer_id).await?.to_ref();
        let challans: Vec<DeliveryChallan> = self.books.all(tenant_id).await?;
        Ok(customer_challans(&customer, &challans, period).into_iter().cloned().collect())
    }

    pub async fn unbilled_challans(
        &self,
        session: &Session,
        customer_id: CustomerId,
    ) -> ServiceResult<Vec<DeliveryChallan>> {
        let tenant_id = session.require_owner()?;
        let customer = self.load_customer(tenant_id, customer_id).await?.to_ref();
        let challans: Vec<DeliveryChallan> = self.books.all(tenant_id).await?;
        Ok(unbilled_challans(&customer, &challans).into_iter().cloned().collect())
    }

    /// Opening balance a new challan for `customer` would carry.
    pub async fn previous_balance(&self, session: &Session, customer: &CustomerRef) -> ServiceResult<Decimal> {
        match session.owner() {
            Some(tenant_id) => self.balance_for(tenant_id, customer).await,
            None => Ok(Decimal::ZERO),
        }
    }

    async fn balance_for(&self, tenant_id: TenantId, customer: &CustomerRef) -> ServiceResult<Decimal> {
        let bills: Vec<Bill> = self.books.all(tenant_id).await?;
        let challans: Vec<DeliveryChallan> = self.books.all(tenant_id).await?;
        Ok(previous_balance(customer, &bills, &challans))
    }

    pub(crate) async fn load_challan(&self, tenant_id: TenantId, id: ChallanId) -> ServiceResult<DeliveryChallan> {
        self.books
            .get::<DeliveryChallan>(tenant_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("challan {id}")))
    }
}
