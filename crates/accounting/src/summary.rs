//! Dashboard figures and sales-register search.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult};
use billbook_invoicing::{Invoice, InvoiceId, InvoiceStatus};

/// How many invoices the dashboard lists.
pub const RECENT_INVOICES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_name: String,
    pub date: NaiveDate,
    pub grand_total: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceSummary {
    fn from(inv: &Invoice) -> Self {
        Self {
            id: inv.id,
            invoice_number: inv.invoice_number.clone(),
            customer_name: inv.customer.name.clone(),
            date: inv.date,
            grand_total: inv.grand_total,
            status: inv.status,
            created_at: inv.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_invoices: usize,
    pub total_revenue: Decimal,
    pub paid_count: usize,
    pub pending_count: usize,
    pub pending_amount: Decimal,
    pub recent: Vec<InvoiceSummary>,
}

impl DashboardSummary {
    pub fn from_invoices(invoices: &[Invoice]) -> DomainResult<Self> {
        let overflow = || DomainError::validation("dashboard total is too large");
        let mut summary = Self {
            total_invoices: invoices.len(),
            total_revenue: Decimal::ZERO,
            paid_count: 0,
            pending_count: 0,
            pending_amount: Decimal::ZERO,
            recent: Vec::new(),
        };

        for inv in invoices {
            summary.total_revenue = summary.total_revenue.checked_add(inv.grand_total).ok_or_else(overflow)?;
            match inv.status {
                InvoiceStatus::Paid => summary.paid_count += 1,
                InvoiceStatus::Pending => {
                    summary.pending_count += 1;
                    summary.pending_amount = summary.pending_amount.checked_add(inv.grand_total).ok_or_else(overflow)?;
                }
            }
        }

        let mut by_created: Vec<&Invoice> = invoices.iter().collect();
        by_created.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summary.recent = by_created
            .into_iter()
            .take(RECENT_INVOICES)
            .map(InvoiceSummary::from)
            .collect();
        Ok(summary)
    }
}

/// Case-insensitive substring match on customer name or invoice number,
/// newest first. A blank query returns everything.
pub fn search_invoices<'a>(invoices: &'a [Invoice], query: &str) -> Vec<&'a Invoice> {
    let needle = query.trim().to_lowercase();
    let mut hits: Vec<&Invoice> = invoices
        .iter()
        .filter(|inv| {
            needle.is_empty()
                || inv.customer.name.to_lowercase().contains(&needle)
                || inv.invoice_number.to_lowercase().contains(&needle)
        })
        .collect();
    hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{customer, day, invoice};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn sample() -> Vec<Invoice> {
        let acme = customer("Acme Traders").to_ref();
        let bolt = customer("Bolt House").to_ref();
        let mut invoices = vec![
            invoice(&acme, "2025-26-001", day(2025, 4, 2), dec!(100), InvoiceStatus::Paid),
            invoice(&bolt, "2025-26-002", day(2025, 4, 3), dec!(250), InvoiceStatus::Pending),
            invoice(&acme, "2025-26-003", day(2025, 4, 4), dec!(50), InvoiceStatus::Pending),
        ];
        let base = Utc::now();
        for (i, inv) in invoices.iter_mut().enumerate() {
            inv.created_at = base + Duration::seconds(i as i64);
        }
        invoices
    }

    #[test]
    fn dashboard_counts_and_amounts() {
        let s = DashboardSummary::from_invoices(&sample()).unwrap();
        assert_eq!(s.total_invoices, 3);
        assert_eq!(s.total_revenue, dec!(400));
        assert_eq!(s.paid_count, 1);
        assert_eq!(s.pending_count, 2);
        assert_eq!(s.pending_amount, dec!(300));
        assert_eq!(s.recent[0].invoice_number, "2025-26-003");
    }

    #[test]
    fn recent_list_is_capped() {
        let acme = customer("Acme").to_ref();
        let invoices: Vec<_> = (0..8)
            .map(|i| invoice(&acme, &format!("N{i}"), day(2025, 4, 1), dec!(1), InvoiceStatus::Paid))
            .collect();
        assert_eq!(DashboardSummary::from_invoices(&invoices).unwrap().recent.len(), RECENT_INVOICES);
    }

    #[test]
    fn search_is_case_insensitive() {
        let invoices = sample();
        let hits = search_invoices(&invoices, "acme");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].invoice_number, "2025-26-003");

        assert_eq!(search_invoices(&invoices, "26-002").len(), 1);
        assert_eq!(search_invoices(&invoices, "  ").len(), 3);
        assert!(search_invoices(&invoices, "zzz").is_empty());
    }
}
