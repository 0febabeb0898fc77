use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, RecordId, record_id};
use billbook_parties::CustomerRef;

record_id!(
    /// Delivery challan identifier.
    ChallanId
);

/// One dispatched line. `total` is always `qty * rate`.
///
/// Construction is fallible: a product outside the `Decimal` range is
/// rejected instead of overflowing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallanLine {
    pub name: String,
    pub qty: Decimal,
    pub rate: Decimal,
    pub total: Decimal,
}

impl ChallanLine {
    pub fn new(name: impl Into<String>, qty: Decimal, rate: Decimal) -> DomainResult<Self> {
        let name = name.into();
        let total = qty
            .checked_mul(rate)
            .ok_or_else(|| DomainError::validation(format!("{name}: quantity times rate is too large")))?;
        Ok(Self { name, qty, rate, total })
    }
}

fn amounts(lines: &[ChallanLine], previous_balance: Decimal) -> DomainResult<(Decimal, Decimal)> {
    let current = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.total))
        .ok_or_else(|| DomainError::validation("challan amount is too large"))?;
    let grand = previous_balance
        .checked_add(current)
        .ok_or_else(|| DomainError::validation("challan grand total is too large"))?;
    Ok((current, grand))
}

/// Line as entered by the user, before totals are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallanLineInput {
    pub name: String,
    pub qty: Decimal,
    pub rate: Decimal,
}

/// User input for creating or editing a challan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallanDraft {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub lines: Vec<ChallanLineInput>,
}

impl ChallanDraft {
    /// Reject input the tax and balance arithmetic must never see.
    pub fn validate(&self) -> DomainResult<()> {
        if self.customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer is required"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("at least one item is required"));
        }
        for (idx, line) in self.lines.iter().enumerate() {
            if line.name.trim().is_empty() {
                return Err(DomainError::validation(format!("line {}: item name is required", idx + 1)));
            }
            if line.qty.is_sign_negative() && !line.qty.is_zero() {
                return Err(DomainError::validation(format!("line {}: quantity cannot be negative", idx + 1)));
            }
            if line.rate.is_sign_negative() && !line.rate.is_zero() {
                return Err(DomainError::validation(format!("line {}: rate cannot be negative", idx + 1)));
            }
        }
        amounts(&self.priced_lines()?, Decimal::ZERO)?;
        Ok(())
    }

    fn priced_lines(&self) -> DomainResult<Vec<ChallanLine>> {
        self.lines
            .iter()
            .map(|l| ChallanLine::new(l.name.trim(), l.qty, l.rate))
            .collect()
    }
}

/// A delivery challan.
///
/// `is_billed` and `bill_id` move together: the challan is billed exactly
/// when it carries a bill back-reference. Both fields are private so the
/// pair can only change through [`DeliveryChallan::mark_billed`] and
/// [`DeliveryChallan::mark_unbilled`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryChallan {
    pub id: ChallanId,
    /// Kept as a string: legacy rows may not follow `YYYY-YY-NNN`.
    pub challan_number: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub customer: CustomerRef,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub lines: Vec<ChallanLine>,
    pub current_amount: Decimal,
    pub previous_balance: Decimal,
    pub grand_total: Decimal,
    #[serde(default)]
    is_billed: bool,
    #[serde(default)]
    bill_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for DeliveryChallan {
    type Id = ChallanId;

    fn id(&self) -> ChallanId {
        self.id
    }
}

impl DeliveryChallan {
    /// Build a new, unbilled challan.
    ///
    /// `previous_balance` is resolved by the caller from the customer's
    /// history at creation time and frozen into the document.
    pub fn create(
        id: ChallanId,
        challan_number: String,
        draft: ChallanDraft,
        previous_balance: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate()?;
        let lines = draft.priced_lines()?;
        let (current_amount, grand_total) = amounts(&lines, previous_balance)?;

        Ok(Self {
            id,
            challan_number,
            date: draft.date,
            customer: draft.customer,
            customer_address: draft.customer_address,
            customer_phone: draft.customer_phone,
            lines,
            current_amount,
            previous_balance,
            grand_total,
            is_billed: false,
            bill_id: None,
            created_at: now,
        })
    }

    /// Replace the editable content. The stored previous balance is kept.
    pub fn update(&mut self, draft: ChallanDraft) -> DomainResult<()> {
        if self.is_billed {
            return Err(DomainError::conflict(format!(
                "challan {} is billed and cannot be edited",
                self.challan_number
            )));
        }
        draft.validate()?;
        let lines = draft.priced_lines()?;
        let (current_amount, grand_total) = amounts(&lines, self.previous_balance)?;
        self.current_amount = current_amount;
        self.grand_total = grand_total;
        self.lines = lines;
        self.date = draft.date;
        self.customer = draft.customer;
        self.customer_address = draft.customer_address;
        self.customer_phone = draft.customer_phone;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_billed {
            return Err(DomainError::conflict(format!(
                "challan {} is billed and cannot be deleted",
                self.challan_number
            )));
        }
        Ok(())
    }

    pub fn is_billed(&self) -> bool {
        self.is_billed
    }

    pub fn bill_id(&self) -> Option<RecordId> {
        self.bill_id
    }

    /// Attach this challan to `bill`. Re-marking for the same bill is a no-op.
    pub fn mark_billed(&mut self, bill: RecordId) -> DomainResult<()> {
        match self.bill_id {
            Some(current) if current == bill => Ok(()),
            Some(current) => Err(DomainError::conflict(format!(
                "challan {} is already billed to {current}",
                self.challan_number
            ))),
            None => {
                self.is_billed = true;
                self.bill_id = Some(bill);
                Ok(())
            }
        }
    }

    pub fn mark_unbilled(&mut self) {
        self.is_billed = false;
        self.bill_id = None;
    }

    /// `bill_id` is set iff `is_billed`.
    pub fn billing_consistent(&self) -> bool {
        self.is_billed == self.bill_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn draft(lines: Vec<(&str, Decimal, Decimal)>) -> ChallanDraft {
        ChallanDraft {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            customer: CustomerRef::unlinked("Acme"),
            customer_address: None,
            customer_phone: None,
            lines: lines
                .into_iter()
                .map(|(name, qty, rate)| ChallanLineInput {
                    name: name.into(),
                    qty,
                    rate,
                })
                .collect(),
        }
    }

    fn challan(previous: Decimal) -> DeliveryChallan {
        DeliveryChallan::create(
            ChallanId::generate(),
            "2025-26-001".into(),
            draft(vec![("Bolt", dec!(5), dec!(10)), ("Nut", dec!(2), dec!(2.5))]),
            previous,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn totals_include_previous_balance() {
        let c = challan(dec!(800));
        assert_eq!(c.current_amount, dec!(55));
        assert_eq!(c.grand_total, dec!(855));
        assert!(!c.is_billed());
        assert!(c.billing_consistent());
    }

    #[test]
    fn drafts_need_a_customer_and_lines() {
        let mut d = draft(vec![]);
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));

        d = draft(vec![("Bolt", dec!(1), dec!(1))]);
        d.customer = CustomerRef::unlinked(" ");
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));

        let d = draft(vec![("Bolt", dec!(-1), dec!(1))]);
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn billed_challans_are_frozen() {
        let mut c = challan(Decimal::ZERO);
        let bill = RecordId::new();
        c.mark_billed(bill).unwrap();
        assert_eq!(c.bill_id(), Some(bill));

        let err = c.update(draft(vec![("Bolt", dec!(1), dec!(1))])).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(matches!(c.ensure_deletable(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn marking_is_idempotent_per_bill() {
        let mut c = challan(Decimal::ZERO);
        let bill = RecordId::new();
        c.mark_billed(bill).unwrap();
        c.mark_billed(bill).unwrap();
        assert!(matches!(c.mark_billed(RecordId::new()), Err(DomainError::Conflict(_))));

        c.mark_unbilled();
        assert!(!c.is_billed());
        assert_eq!(c.bill_id(), None);
        assert!(c.billing_consistent());
    }

    #[test]
    fn update_keeps_previous_balance() {
        let mut c = challan(dec!(100));
        c.update(draft(vec![("Bolt", dec!(3), dec!(10))])).unwrap();
        assert_eq!(c.current_amount, dec!(30));
        assert_eq!(c.grand_total, dec!(130));
    }

    #[test]
    fn serialized_shape_uses_flat_customer_fields() {
        let c = challan(Decimal::ZERO);
        let json = serde_json_value(&c);
        assert_eq!(json["customer_name"], "Acme");
        assert_eq!(json["is_billed"], false);
    }

    fn serde_json_value(c: &DeliveryChallan) -> serde_json::Value {
        serde_json::to_value(c).unwrap()
    }

    #[test]
    fn oversized_lines_are_rejected() {
        let huge = draft(vec![("Bolt", Decimal::MAX, dec!(2))]);
        let err = DeliveryChallan::create(ChallanId::generate(), "2025-26-001".into(), huge, Decimal::ZERO, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let two_halves = draft(vec![("Bolt", Decimal::MAX, dec!(1)), ("Nut", Decimal::MAX, dec!(1))]);
        let err = DeliveryChallan::create(ChallanId::generate(), "2025-26-002".into(), two_halves, Decimal::ZERO, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut c = challan(Decimal::MAX - dec!(55));
        assert_eq!(c.grand_total, Decimal::MAX);
        let before = c.clone();
        assert!(matches!(c.update(draft(vec![("Bolt", dec!(100), dec!(1))])), Err(DomainError::Validation(_))));
        assert_eq!(c, before);
    }

    proptest! {
        #[test]
        fn line_total_is_exact_product(qty in 0u32..10_000, rate_cents in 0u32..1_000_000) {
            let rate = Decimal::new(rate_cents as i64, 2);
            let line = ChallanLine::new("x", Decimal::from(qty), rate).unwrap();
            prop_assert_eq!(line.total, Decimal::from(qty) * rate);
        }
    }
}
