//! Bills: tax documents consolidating one customer's unbilled challans.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DocumentNumber, DomainError, DomainResult, Entity, record_id};
use billbook_parties::{Customer, CustomerRef};
use billbook_products::{Item, hsn_for};
use billbook_sales::{ChallanId, DeliveryChallan};

use crate::line::{BillLine, merge_lines};
use crate::tax::{GstRate, TaxTotals};

record_id!(
    /// Bill identifier.
    BillId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Paid,
    Unpaid,
}

impl BillStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Paid => Self::Unpaid,
            Self::Unpaid => Self::Paid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub bill_number: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub customer_gstin: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    pub challan_ids: Vec<ChallanId>,
    pub lines: Vec<BillLine>,
    pub subtotal: Decimal,
    pub cgst_total: Decimal,
    pub sgst_total: Decimal,
    pub gst_amount: Decimal,
    pub round_off: Decimal,
    pub net_amount: Decimal,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Bill {
    type Id = BillId;

    fn id(&self) -> BillId {
        self.id
    }
}

/// What the caller chose when converting challans into a bill.
#[derive(Debug, Clone)]
pub struct BillRequest<'a> {
    pub customer: &'a Customer,
    pub date: NaiveDate,
    pub gst: GstRate,
}

impl Bill {
    /// Build an unpaid bill from `challans`.
    ///
    /// Every selected challan must be unbilled and belong to the customer.
    /// HSN codes come from `catalog` by case-insensitive name and are left
    /// empty when the catalog has no match.
    pub fn prepare(
        id: BillId,
        number: DocumentNumber,
        request: BillRequest<'_>,
        challans: &[DeliveryChallan],
        catalog: &[Item],
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if challans.is_empty() {
            return Err(DomainError::validation("no challans selected"));
        }

        let customer = request.customer.to_ref();
        let mut seen = HashSet::new();
        for challan in challans {
            if !seen.insert(challan.id) {
                return Err(DomainError::validation(format!(
                    "challan {} selected twice",
                    challan.challan_number
                )));
            }
            if challan.is_billed() {
                return Err(DomainError::conflict(format!(
                    "challan {} is already billed",
                    challan.challan_number
                )));
            }
            if !customer.matches(&challan.customer) {
                return Err(DomainError::validation(format!(
                    "challan {} belongs to {}, not {}",
                    challan.challan_number, challan.customer.name, customer.name
                )));
            }
        }

        let lines: Vec<BillLine> = merge_lines(challans.iter().flat_map(|c| c.lines.iter()))?
            .into_iter()
            .map(|m| {
                let hsn = hsn_for(catalog, &m.name);
                BillLine::priced(m.name, hsn, m.qty, m.rate, request.gst)
            })
            .collect::<DomainResult<_>>()?;

        let totals = TaxTotals::of(&lines)?;
        let rounded = totals.rounded();

        Ok(Self {
            id,
            bill_number: number.to_string(),
            date: request.date,
            customer,
            customer_gstin: request.customer.gstin.clone(),
            customer_address: Some(request.customer.address.clone()).filter(|a| !a.is_empty()),
            challan_ids: challans.iter().map(|c| c.id).collect(),
            lines,
            subtotal: totals.subtotal,
            cgst_total: totals.cgst_total,
            sgst_total: totals.sgst_total,
            gst_amount: totals.gst_amount,
            round_off: rounded.round_off,
            net_amount: rounded.net_amount,
            status: BillStatus::Unpaid,
            created_at: now,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == BillStatus::Paid
    }

    pub fn set_status(&mut self, status: BillStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::FinancialYear;
    use billbook_parties::{CustomerId, NewCustomer};
    use billbook_products::{ItemId, NewItem};
    use billbook_sales::{ChallanDraft, ChallanLineInput};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn customer(name: &str) -> Customer {
        Customer::register(CustomerId::generate(), NewCustomer::named(name), Utc::now()).unwrap()
    }

    fn challan(owner: CustomerRef, lines: &[(&str, Decimal, Decimal)]) -> DeliveryChallan {
        DeliveryChallan::create(
            ChallanId::generate(),
            "2025-26-001".into(),
            ChallanDraft {
                date: date(),
                customer: owner,
                customer_address: None,
                customer_phone: None,
                lines: lines
                    .iter()
                    .map(|(name, qty, rate)| ChallanLineInput {
                        name: (*name).into(),
                        qty: *qty,
                        rate: *rate,
                    })
                    .collect(),
            },
            Decimal::ZERO,
            Utc::now(),
        )
        .unwrap()
    }

    fn number() -> DocumentNumber {
        DocumentNumber::first(FinancialYear::containing(date()))
    }

    fn request(customer: &Customer) -> BillRequest<'_> {
        BillRequest {
            customer,
            date: date(),
            gst: GstRate::percent(dec!(18)),
        }
    }

    #[test]
    fn merges_lines_across_challans() {
        let acme = customer("Acme");
        let catalog = vec![
            Item::register(
                ItemId::generate(),
                NewItem {
                    name: "bolt".into(),
                    hsn_code: Some("7318".into()),
                    rate: None,
                },
                Utc::now(),
            )
            .unwrap(),
        ];
        let challans = vec![
            challan(acme.to_ref(), &[("Bolt", dec!(5), dec!(10))]),
            challan(acme.to_ref(), &[("Bolt", dec!(3), dec!(10)), ("Nut", dec!(2), dec!(1))]),
        ];

        let bill = Bill::prepare(BillId::generate(), number(), request(&acme), &challans, &catalog, Utc::now()).unwrap();

        assert_eq!(bill.bill_number, "2025-26-001");
        assert_eq!(bill.status, BillStatus::Unpaid);
        assert_eq!(bill.challan_ids, vec![challans[0].id, challans[1].id]);
        assert_eq!(bill.lines.len(), 2);
        assert_eq!(bill.lines[0].figures.qty, dec!(8));
        assert_eq!(bill.lines[0].hsn_code, "7318");
        assert_eq!(bill.lines[1].hsn_code, "");

        assert_eq!(bill.subtotal, dec!(82));
        assert_eq!(bill.gst_amount, dec!(14.76));
        assert_eq!(bill.net_amount, dec!(97));
        assert_eq!(bill.round_off, dec!(0.24));
    }

    #[test]
    fn empty_selection_is_a_validation_error() {
        let acme = customer("Acme");
        let err = Bill::prepare(BillId::generate(), number(), request(&acme), &[], &[], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("no challans selected"));
    }

    #[test]
    fn billed_or_foreign_challans_are_rejected() {
        let acme = customer("Acme");
        let other = customer("Other");

        let mut billed = challan(acme.to_ref(), &[("Bolt", dec!(1), dec!(1))]);
        billed.mark_billed(BillId::generate().record_id()).unwrap();
        let err = Bill::prepare(BillId::generate(), number(), request(&acme), &[billed], &[], Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let foreign = challan(other.to_ref(), &[("Bolt", dec!(1), dec!(1))]);
        let err = Bill::prepare(BillId::generate(), number(), request(&acme), &[foreign], &[], Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn legacy_challans_match_by_name() {
        let acme = customer("Acme");
        let legacy = challan(CustomerRef::unlinked("Acme"), &[("Bolt", dec!(1), dec!(100))]);
        let bill = Bill::prepare(BillId::generate(), number(), request(&acme), &[legacy], &[], Utc::now()).unwrap();
        assert_eq!(bill.customer.id, Some(acme.id));
        assert_eq!(bill.net_amount, dec!(118));
        assert_eq!(bill.round_off, Decimal::ZERO);
    }

    #[test]
    fn totals_beyond_decimal_range_are_rejected() {
        let acme = customer("Acme");
        let huge = Decimal::MAX / dec!(2);
        let challans = vec![
            challan(acme.to_ref(), &[("Bolt", huge, dec!(1))]),
            challan(acme.to_ref(), &[("Bolt", huge, dec!(1))]),
        ];
        let err = Bill::prepare(BillId::generate(), number(), request(&acme), &challans, &[], Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn status_toggles() {
        assert_eq!(BillStatus::Unpaid.toggled(), BillStatus::Paid);
        assert_eq!(BillStatus::Paid.toggled(), BillStatus::Unpaid);
    }
}
