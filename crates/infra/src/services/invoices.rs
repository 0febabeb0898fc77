use chrono::Utc;
use tracing::{info, instrument};

use billbook_accounting::search_invoices;
use billbook_core::{DocumentFamily, TenantId};
use billbook_events::{EventBus, RecordChanged};
use billbook_invoicing::{BillId, Invoice, InvoiceDraft, InvoiceId, InvoiceStatus};
use billbook_parties::NewCustomer;
use billbook_products::{NewItem, find_by_name};

use super::BillBook;
use crate::error::{ServiceError, ServiceResult};
use crate::session::Session;
use crate::store::RecordStore;

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    /// Sales register: every invoice, newest first, optionally narrowed by a
    /// case-insensitive search over customer name and invoice number.
    pub async fn list_invoices(&self, session: &Session, query: Option<&str>) -> ServiceResult<Vec<Invoice>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        let invoices: Vec<Invoice> = self.books.all(tenant_id).await?;
        Ok(search_invoices(&invoices, query.unwrap_or_default())
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn get_invoice(&self, session: &Session, id: InvoiceId) -> ServiceResult<Invoice> {
        let tenant_id = session.require_owner()?;
        self.load_invoice(tenant_id, id).await
    }

    /// Issue an invoice.
    ///
    /// A blank number is replaced by the next one for the invoice date. An
    /// unknown customer name is registered as a customer, and unknown line
    /// items are added to the catalog on a best-effort basis.
    #[instrument(skip_all, fields(customer = %draft.customer.name, date = %draft.date))]
    pub async fn create_invoice(&self, session: &Session, mut draft: InvoiceDraft) -> ServiceResult<Invoice> {
        let tenant_id = session.require_owner()?;
        draft.validate()?;

        let number = match draft.requested_number() {
            Some(n) => n.to_string(),
            None => self
                .next_number_for(tenant_id, DocumentFamily::Invoice, draft.date)
                .await?
                .to_string(),
        };

        self.link_invoice_parties(tenant_id, &mut draft).await?;

        let invoice = Invoice::issue(InvoiceId::generate(), number, draft, Utc::now())?;
        self.books.insert(tenant_id, &invoice).await?;
        info!(
            %tenant_id,
            invoice_id = %invoice.id,
            number = %invoice.invoice_number,
            grand_total = %invoice.grand_total,
            "invoice created"
        );
        Ok(invoice)
    }

    pub async fn update_invoice(&self, session: &Session, id: InvoiceId, mut draft: InvoiceDraft) -> ServiceResult<Invoice> {
        let tenant_id = session.require_owner()?;
        let mut invoice = self.load_invoice(tenant_id, id).await?;
        draft.validate()?;
        self.link_invoice_parties(tenant_id, &mut draft).await?;
        invoice.revise(draft)?;
        self.books.save(tenant_id, &invoice).await?;
        Ok(invoice)
    }

    pub async fn delete_invoice(&self, session: &Session, id: InvoiceId) -> ServiceResult<()> {
        let tenant_id = session.require_owner()?;
        self.load_invoice(tenant_id, id).await?;
        self.books.delete::<Invoice>(tenant_id, id).await?;
        info!(%tenant_id, invoice_id = %id, "invoice deleted");
        Ok(())
    }

    pub async fn set_invoice_status(
        &self,
        session: &Session,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> ServiceResult<Invoice> {
        let tenant_id = session.require_owner()?;
        let mut invoice = self.load_invoice(tenant_id, id).await?;
        invoice.set_status(status);
        self.books.save(tenant_id, &invoice).await?;
        Ok(invoice)
    }

    /// Invoice draft pre-filled from a bill, numbered for the bill's date.
    pub async fn invoice_draft_from_bill(&self, session: &Session, bill_id: BillId) -> ServiceResult<InvoiceDraft> {
        let tenant_id = session.require_owner()?;
        let bill = self.load_bill(tenant_id, bill_id).await?;
        let number = self.next_number_for(tenant_id, DocumentFamily::Invoice, bill.date).await?;
        Ok(InvoiceDraft::from_bill(&bill, number))
    }

    async fn link_invoice_parties(&self, tenant_id: TenantId, draft: &mut InvoiceDraft) -> ServiceResult<()> {
        if draft.customer.id.is_none() {
            let customer = self
                .ensure_customer(
                    tenant_id,
                    NewCustomer {
                        name: draft.customer.name.clone(),
                        gstin: draft.gstin.clone(),
                        address: draft.address.clone(),
                        phone: None,
                    },
                )
                .await?;
            draft.customer.id = Some(customer.id);
        }

        let wanted = draft
            .lines
            .iter()
            .filter(|l| l.item_id.is_none())
            .map(|l| NewItem {
                name: l.name.trim().to_string(),
                hsn_code: l.hsn_code.clone(),
                rate: Some(l.rate),
            })
            .collect();
        let catalog = self.ensure_items(tenant_id, wanted).await;
        for line in draft.lines.iter_mut().filter(|l| l.item_id.is_none()) {
            line.item_id = find_by_name(&catalog, &line.name).map(|i| i.id);
        }
        Ok(())
    }

    async fn load_invoice(&self, tenant_id: TenantId, id: InvoiceId) -> ServiceResult<Invoice> {
        self.books
            .get::<Invoice>(tenant_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("invoice {id}")))
    }
}
