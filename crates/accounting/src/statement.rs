//! Customer statement reconstructed from invoices.
//!
//! Each invoice is a debit on its date. A paid invoice also yields a credit
//! for the same amount on the same date: there is no separate payment record,
//! so payment is assumed to land on the invoice date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, PeriodFilter};
use billbook_invoicing::{Invoice, amount_in_words};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Debit,
    Credit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub kind: EntryKind,
    pub particulars: String,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Running `Σdebit - Σcredit` up to and including this entry.
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStatement {
    pub entries: Vec<LedgerEntry>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub final_balance: Decimal,
}

impl CustomerStatement {
    /// Build the statement for one customer's invoices.
    ///
    /// Entries are ordered by date; the sort is stable, so a paid invoice's
    /// credit always follows its debit and same-day invoices keep input
    /// order. The period filter is applied before any totals are taken.
    /// Totals past the `Decimal` range are a validation error.
    pub fn from_invoices<'a, I>(invoices: I, period: &PeriodFilter) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a Invoice>,
    {
        let mut raw: Vec<(NaiveDate, EntryKind, String, Decimal)> = Vec::new();
        for inv in invoices {
            raw.push((
                inv.date,
                EntryKind::Debit,
                format!("Bill No: {}", inv.invoice_number),
                inv.grand_total,
            ));
            if inv.is_paid() {
                raw.push((
                    inv.date,
                    EntryKind::Credit,
                    format!("Payment Received - Bill {}", inv.invoice_number),
                    inv.grand_total,
                ));
            }
        }
        raw.sort_by_key(|(date, ..)| *date);

        let overflow = || DomainError::validation("ledger total is too large");
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        let mut balance = Decimal::ZERO;
        let mut entries = Vec::new();
        for (date, kind, particulars, amount) in raw.into_iter().filter(|(date, ..)| period.matches(*date)) {
            let (debit, credit) = match kind {
                EntryKind::Debit => {
                    total_debit = total_debit.checked_add(amount).ok_or_else(overflow)?;
                    balance = balance.checked_add(amount).ok_or_else(overflow)?;
                    (amount, Decimal::ZERO)
                }
                EntryKind::Credit => {
                    total_credit = total_credit.checked_add(amount).ok_or_else(overflow)?;
                    balance = balance.checked_sub(amount).ok_or_else(overflow)?;
                    (Decimal::ZERO, amount)
                }
            };
            entries.push(LedgerEntry {
                date,
                kind,
                particulars,
                debit,
                credit,
                balance,
            });
        }

        Ok(Self {
            entries,
            total_debit,
            total_credit,
            final_balance: balance,
        })
    }

    pub fn final_balance_in_words(&self) -> String {
        amount_in_words(self.final_balance)
    }
}
