use rust_decimal::Decimal;

use billbook_invoicing::{Bill, BillStatus};
use billbook_parties::CustomerRef;
use billbook_sales::DeliveryChallan;

/// Opening balance for a customer's next challan.
///
/// Only the most recent bill matters: paid means the slate is clean, unpaid
/// carries its net amount forward. With no bills at all, the latest unbilled
/// challan's grand total carries forward instead. Otherwise zero.
///
/// "Most recent" orders by document date, then creation time, so two
/// documents on the same day resolve to the one entered last.
pub fn previous_balance(customer: &CustomerRef, bills: &[Bill], challans: &[DeliveryChallan]) -> Decimal {
    let latest_bill = bills
        .iter()
        .filter(|b| customer.matches(&b.customer))
        .max_by_key(|b| (b.date, b.created_at));

    if let Some(bill) = latest_bill {
        return match bill.status {
            BillStatus::Paid => Decimal::ZERO,
            BillStatus::Unpaid => bill.net_amount,
        };
    }

    challans
        .iter()
        .filter(|c| !c.is_billed() && customer.matches(&c.customer))
        .max_by_key(|c| (c.date, c.created_at))
        .map(|c| c.grand_total)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bill, challan, customer, day};
    use billbook_parties::CustomerRef;
    use rust_decimal_macros::dec;

    #[test]
    fn latest_paid_bill_clears_balance() {
        let acme = customer("Acme");
        let bills = vec![
            bill(&acme.to_ref(), day(2025, 5, 1), dec!(900), BillStatus::Unpaid),
            bill(&acme.to_ref(), day(2025, 6, 1), dec!(1200), BillStatus::Paid),
        ];
        assert_eq!(previous_balance(&acme.to_ref(), &bills, &[]), Decimal::ZERO);
    }

    #[test]
    fn latest_unpaid_bill_carries_net_amount() {
        let acme = customer("Acme");
        let bills = vec![
            bill(&acme.to_ref(), day(2025, 6, 1), dec!(1500), BillStatus::Unpaid),
            bill(&acme.to_ref(), day(2025, 5, 1), dec!(700), BillStatus::Paid),
        ];
        let unbilled = vec![challan(&acme.to_ref(), day(2025, 7, 1), dec!(800))];
        assert_eq!(previous_balance(&acme.to_ref(), &bills, &unbilled), dec!(1500));
    }

    #[test]
    fn without_bills_the_latest_unbilled_challan_carries() {
        let acme = customer("Acme");
        let challans = vec![
            challan(&acme.to_ref(), day(2025, 4, 2), dec!(300)),
            challan(&acme.to_ref(), day(2025, 4, 9), dec!(800)),
        ];
        assert_eq!(previous_balance(&acme.to_ref(), &[], &challans), dec!(800));
    }

    #[test]
    fn billed_challans_do_not_carry() {
        let acme = customer("Acme");
        let mut c = challan(&acme.to_ref(), day(2025, 4, 9), dec!(800));
        c.mark_billed(billbook_core::RecordId::new()).unwrap();
        assert_eq!(previous_balance(&acme.to_ref(), &[], &[c]), Decimal::ZERO);
    }

    #[test]
    fn no_history_is_zero() {
        let acme = customer("Acme");
        assert_eq!(previous_balance(&acme.to_ref(), &[], &[]), Decimal::ZERO);
    }

    #[test]
    fn other_customers_are_ignored() {
        let acme = customer("Acme");
        let other = customer("Other");
        let bills = vec![bill(&other.to_ref(), day(2025, 6, 1), dec!(1500), BillStatus::Unpaid)];
        assert_eq!(previous_balance(&acme.to_ref(), &bills, &[]), Decimal::ZERO);
    }

    #[test]
    fn unlinked_documents_match_by_name() {
        let acme = customer("Acme");
        let bills = vec![bill(&CustomerRef::unlinked("Acme"), day(2025, 6, 1), dec!(640), BillStatus::Unpaid)];
        assert_eq!(previous_balance(&acme.to_ref(), &bills, &[]), dec!(640));
    }
}
