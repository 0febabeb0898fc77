use billbook_accounting::{CustomerStatement, DashboardSummary};
use billbook_core::PeriodFilter;
use billbook_events::{EventBus, RecordChanged};
use billbook_invoicing::Invoice;
use billbook_parties::CustomerId;

use super::BillBook;
use crate::error::ServiceResult;
use crate::session::Session;
use crate::store::RecordStore;

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    /// Ledger statement rebuilt from the customer's invoices.
    pub async fn customer_statement(
        &self,
        session: &Session,
        customer_id: CustomerId,
        period: &PeriodFilter,
    ) -> ServiceResult<CustomerStatement> {
        let tenant_id = session.require_owner()?;
        let customer = self.load_customer(tenant_id, customer_id).await?.to_ref();
        let invoices: Vec<Invoice> = self.books.all(tenant_id).await?;
        Ok(CustomerStatement::from_invoices(
            invoices.iter().filter(|inv| customer.matches(&inv.customer)),
            period,
        )?)
    }

    pub async fn dashboard(&self, session: &Session) -> ServiceResult<DashboardSummary> {
        let invoices: Vec<Invoice> = match session.owner() {
            Some(tenant_id) => self.books.all(tenant_id).await?,
            None => Vec::new(),
        };
        Ok(DashboardSummary::from_invoices(&invoices)?)
    }
}
