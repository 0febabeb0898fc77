//! A customer's document history, newest first.

use billbook_core::PeriodFilter;
use billbook_invoicing::Bill;
use billbook_parties::CustomerRef;
use billbook_sales::DeliveryChallan;

pub fn customer_challans<'a>(
    customer: &CustomerRef,
    challans: &'a [DeliveryChallan],
    period: &PeriodFilter,
) -> Vec<&'a DeliveryChallan> {
    let mut out: Vec<_> = challans
        .iter()
        .filter(|c| customer.matches(&c.customer) && period.matches(c.date))
        .collect();
    out.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
    out
}

pub fn customer_bills<'a>(customer: &CustomerRef, bills: &'a [Bill], period: &PeriodFilter) -> Vec<&'a Bill> {
    let mut out: Vec<_> = bills
        .iter()
        .filter(|b| customer.matches(&b.customer) && period.matches(b.date))
        .collect();
    out.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
    out
}

/// Challans still available for conversion.
pub fn unbilled_challans<'a>(customer: &CustomerRef, challans: &'a [DeliveryChallan]) -> Vec<&'a DeliveryChallan> {
    customer_challans(customer, challans, &PeriodFilter::any())
        .into_iter()
        .filter(|c| !c.is_billed())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bill, challan, customer, day};
    use billbook_invoicing::BillStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn newest_first_with_period_filter() {
        let acme = customer("Acme");
        let r = acme.to_ref();
        let challans = vec![
            challan(&r, day(2025, 1, 10), dec!(1)),
            challan(&r, day(2025, 3, 10), dec!(2)),
            challan(&r, day(2024, 3, 10), dec!(3)),
        ];

        let all = customer_challans(&r, &challans, &PeriodFilter::any());
        assert_eq!(all.iter().map(|c| c.grand_total).collect::<Vec<_>>(), vec![dec!(2), dec!(1), dec!(3)]);

        let march_2025 = customer_challans(&r, &challans, &PeriodFilter::new(vec![2025], vec![2]));
        assert_eq!(march_2025.len(), 1);
        assert_eq!(march_2025[0].grand_total, dec!(2));
    }

    #[test]
    fn unbilled_excludes_billed() {
        let acme = customer("Acme");
        let r = acme.to_ref();
        let mut billed = challan(&r, day(2025, 1, 10), dec!(1));
        billed.mark_billed(billbook_core::RecordId::new()).unwrap();
        let challans = vec![billed, challan(&r, day(2025, 1, 11), dec!(2))];

        let open = unbilled_challans(&r, &challans);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].grand_total, dec!(2));
    }

    #[test]
    fn bills_are_scoped_to_customer() {
        let acme = customer("Acme");
        let other = customer("Other");
        let bills = vec![
            bill(&acme.to_ref(), day(2025, 5, 1), dec!(10), BillStatus::Paid),
            bill(&other.to_ref(), day(2025, 5, 2), dec!(20), BillStatus::Paid),
        ];
        let mine = customer_bills(&acme.to_ref(), &bills, &PeriodFilter::any());
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].net_amount, dec!(10));
    }
}
