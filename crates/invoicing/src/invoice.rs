//! Tax invoices.
//!
//! Invoices are numbered in their own family and carry GST percents per line.
//! Unlike bills, the grand total is the exact sum of line totals.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DocumentNumber, DomainError, DomainResult, Entity, record_id};
use billbook_parties::CustomerRef;
use billbook_products::ItemId;

use crate::bill::Bill;
use crate::line::InvoiceLine;
use crate::tax::{TaxLine, TaxTotals};

record_id!(
    /// Invoice identifier.
    InvoiceId
);

/// Default CGST and SGST percent for a new invoice line.
pub const DEFAULT_LINE_PERCENT: Decimal = Decimal::from_parts(9, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Paid,
    #[default]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineInput {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub name: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    pub qty: Decimal,
    pub rate: Decimal,
    #[serde(default)]
    pub cgst_percent: Option<Decimal>,
    #[serde(default)]
    pub sgst_percent: Option<Decimal>,
}

impl InvoiceLineInput {
    fn price(&self) -> DomainResult<InvoiceLine> {
        Ok(InvoiceLine {
            item_id: self.item_id,
            name: self.name.trim().to_string(),
            hsn_code: self.hsn_code.as_deref().map(str::trim).unwrap_or_default().to_string(),
            figures: TaxLine::compute(
                self.qty,
                self.rate,
                self.cgst_percent.unwrap_or(DEFAULT_LINE_PERCENT),
                self.sgst_percent.unwrap_or(DEFAULT_LINE_PERCENT),
            )?,
        })
    }
}

/// Editable invoice content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    /// Blank means "assign the next number for `date`".
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub po: Option<String>,
    pub lines: Vec<InvoiceLineInput>,
    /// Absent means pending for a new invoice and unchanged on revision.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

fn negative(d: Option<Decimal>) -> bool {
    d.is_some_and(|v| v.is_sign_negative() && !v.is_zero())
}

impl InvoiceDraft {
    /// Field checks, plus a dry pricing pass so out-of-range amounts are
    /// caught before any side effect.
    pub fn validate(&self) -> DomainResult<()> {
        if self.customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("at least one item is required"));
        }
        for (idx, line) in self.lines.iter().enumerate() {
            let n = idx + 1;
            if line.name.trim().is_empty() {
                return Err(DomainError::validation(format!("line {n}: item name is required")));
            }
            if negative(Some(line.qty)) || negative(Some(line.rate)) {
                return Err(DomainError::validation(format!("line {n}: quantity and rate cannot be negative")));
            }
            if negative(line.cgst_percent) || negative(line.sgst_percent) {
                return Err(DomainError::validation(format!("line {n}: tax percent cannot be negative")));
            }
        }
        let lines = self.lines.iter().map(InvoiceLineInput::price).collect::<DomainResult<Vec<_>>>()?;
        TaxTotals::of(&lines)?;
        Ok(())
    }

    /// The caller-supplied number, if it is not blank.
    pub fn requested_number(&self) -> Option<&str> {
        self.invoice_number.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Pre-fill an invoice from a bill: same customer, date and lines, with
    /// each line's percents carried over.
    pub fn from_bill(bill: &Bill, number: DocumentNumber) -> Self {
        Self {
            invoice_number: Some(number.to_string()),
            date: bill.date,
            customer: bill.customer.clone(),
            gstin: bill.customer_gstin.clone(),
            address: bill.customer_address.clone(),
            po: None,
            lines: bill
                .lines
                .iter()
                .map(|l| InvoiceLineInput {
                    item_id: None,
                    name: l.name.clone(),
                    hsn_code: Some(l.hsn_code.clone()).filter(|h| !h.is_empty()),
                    qty: l.figures.qty,
                    rate: l.figures.rate,
                    cgst_percent: Some(l.figures.cgst_percent),
                    sgst_percent: Some(l.figures.sgst_percent),
                })
                .collect(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub gstin: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub po: String,
    pub lines: Vec<InvoiceLine>,
    pub without_gst: Decimal,
    pub cgst_total: Decimal,
    pub sgst_total: Decimal,
    pub gst_amount: Decimal,
    pub grand_total: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> InvoiceId {
        self.id
    }
}

impl Invoice {
    pub fn issue(id: InvoiceId, invoice_number: String, draft: InvoiceDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        draft.validate()?;
        let mut invoice = Self {
            id,
            invoice_number,
            date: draft.date,
            customer: draft.customer.clone(),
            gstin: String::new(),
            address: String::new(),
            po: String::new(),
            lines: Vec::new(),
            without_gst: Decimal::ZERO,
            cgst_total: Decimal::ZERO,
            sgst_total: Decimal::ZERO,
            gst_amount: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            status: draft.status.unwrap_or_default(),
            created_at: now,
        };
        invoice.apply(draft)?;
        Ok(invoice)
    }

    /// Replace the content. A blank number in the draft keeps the current one.
    pub fn revise(&mut self, draft: InvoiceDraft) -> DomainResult<()> {
        draft.validate()?;
        let number = draft.requested_number().map(str::to_string);
        self.apply(draft)?;
        if let Some(number) = number {
            self.invoice_number = number;
        }
        Ok(())
    }

    /// Price the draft and overwrite the content. Nothing changes on error.
    fn apply(&mut self, draft: InvoiceDraft) -> DomainResult<()> {
        let lines = draft.lines.iter().map(InvoiceLineInput::price).collect::<DomainResult<Vec<_>>>()?;
        let totals = TaxTotals::of(&lines)?;
        let grand_total = lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.figures.total))
            .ok_or_else(|| DomainError::validation("invoice total is too large"))?;

        self.date = draft.date;
        self.customer = draft.customer;
        self.gstin = draft.gstin.unwrap_or_default();
        self.address = draft.address.unwrap_or_default();
        self.po = draft.po.unwrap_or_default();
        self.without_gst = totals.subtotal;
        self.cgst_total = totals.cgst_total;
        self.sgst_total = totals.sgst_total;
        self.gst_amount = totals.gst_amount;
        self.grand_total = grand_total;
        self.lines = lines;
        if let Some(status) = draft.status {
            self.status = status;
        }
        Ok(())
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    pub fn set_status(&mut self, status: InvoiceStatus) {
        self.status = status;
    }
}
