//! GST arithmetic shared by bills and invoices.
//!
//! Every figure is an exact `Decimal`; nothing is rounded per line. The only
//! rounding step is the whole-rupee net amount on bills ([`TaxTotals::rounded`]).
//!
//! The engine trusts the sign of its inputs: negative quantities and rates are
//! rejected by the draft types. Magnitude is checked here, and a figure that
//! leaves the `Decimal` range comes back as a validation error.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, ValueObject};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn too_large(what: &str) -> DomainError {
    DomainError::validation(format!("{what} is too large"))
}

fn tax_on(amount: Decimal, percent: Decimal) -> DomainResult<Decimal> {
    amount
        .checked_mul(percent)
        .and_then(|v| v.checked_div(HUNDRED))
        .ok_or_else(|| too_large("tax amount"))
}

/// A flat GST percentage applied to a whole document, split evenly into the
/// central and state halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GstRate(Decimal);

impl ValueObject for GstRate {}

impl GstRate {
    pub fn percent(percent: Decimal) -> Self {
        Self(percent)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `(cgst_percent, sgst_percent)`.
    pub fn split(&self) -> (Decimal, Decimal) {
        let half = self.0 / Decimal::TWO;
        (half, half)
    }
}

impl Default for GstRate {
    fn default() -> Self {
        Self(Decimal::from(18))
    }
}

/// The computed figures of one tax-bearing line.
///
/// `amount = qty * rate`, each tax half is `amount * percent / 100`, and
/// `total = amount + cgst_amount + sgst_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    pub qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub cgst_percent: Decimal,
    pub sgst_percent: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    pub total: Decimal,
}

impl TaxLine {
    pub fn compute(qty: Decimal, rate: Decimal, cgst_percent: Decimal, sgst_percent: Decimal) -> DomainResult<Self> {
        let amount = qty.checked_mul(rate).ok_or_else(|| too_large("line amount"))?;
        let cgst_amount = tax_on(amount, cgst_percent)?;
        let sgst_amount = tax_on(amount, sgst_percent)?;
        let total = amount
            .checked_add(cgst_amount)
            .and_then(|v| v.checked_add(sgst_amount))
            .ok_or_else(|| too_large("line total"))?;
        Ok(Self {
            qty,
            rate,
            amount,
            cgst_percent,
            sgst_percent,
            cgst_amount,
            sgst_amount,
            total,
        })
    }

    pub fn at_rate(qty: Decimal, rate: Decimal, gst: GstRate) -> DomainResult<Self> {
        let (cgst, sgst) = gst.split();
        Self::compute(qty, rate, cgst, sgst)
    }
}

/// Anything that carries computed [`TaxLine`] figures.
pub trait TaxBearing {
    fn figures(&self) -> &TaxLine;
}

impl TaxBearing for TaxLine {
    fn figures(&self) -> &TaxLine {
        self
    }
}

/// Document-level sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotals {
    pub subtotal: Decimal,
    pub cgst_total: Decimal,
    pub sgst_total: Decimal,
    pub gst_amount: Decimal,
}

/// Whole-rupee net amount and the signed adjustment that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedTotal {
    pub round_off: Decimal,
    pub net_amount: Decimal,
}

impl TaxTotals {
    /// Sum the lines. Succeeds only if the gross is representable too, so
    /// [`TaxTotals::gross`] and [`TaxTotals::rounded`] cannot overflow afterwards.
    pub fn of<'a, L, I>(lines: I) -> DomainResult<Self>
    where
        L: TaxBearing + 'a,
        I: IntoIterator<Item = &'a L>,
    {
        let add = |acc: Decimal, v: Decimal| acc.checked_add(v).ok_or_else(|| too_large("document total"));
        let mut totals = Self::default();
        for line in lines {
            let f = line.figures();
            totals.subtotal = add(totals.subtotal, f.amount)?;
            totals.cgst_total = add(totals.cgst_total, f.cgst_amount)?;
            totals.sgst_total = add(totals.sgst_total, f.sgst_amount)?;
        }
        totals.gst_amount = add(totals.cgst_total, totals.sgst_total)?;
        add(totals.subtotal, totals.gst_amount)?;
        Ok(totals)
    }

    /// `subtotal + gst_amount`, unrounded.
    pub fn gross(&self) -> Decimal {
        self.subtotal + self.gst_amount
    }

    /// Round the gross to the nearest rupee, halves away from zero.
    pub fn rounded(&self) -> RoundedTotal {
        let gross = self.gross();
        let net_amount = gross.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        RoundedTotal {
            round_off: net_amount - gross,
            net_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flat_rate_splits_evenly() {
        assert_eq!(GstRate::percent(dec!(18)).split(), (dec!(9), dec!(9)));
        assert_eq!(GstRate::percent(dec!(5)).split(), (dec!(2.5), dec!(2.5)));
    }

    #[test]
    fn line_figures() {
        let line = TaxLine::at_rate(dec!(8), dec!(10), GstRate::percent(dec!(18))).unwrap();
        assert_eq!(line.amount, dec!(80));
        assert_eq!(line.cgst_amount, dec!(7.2));
        assert_eq!(line.sgst_amount, dec!(7.2));
        assert_eq!(line.total, dec!(94.4));
    }

    #[test]
    fn totals_and_round_off() {
        let lines = vec![
            TaxLine::compute(dec!(3), dec!(33.33), dec!(9), dec!(9)).unwrap(),
            TaxLine::compute(dec!(1), dec!(12.5), dec!(6), dec!(6)).unwrap(),
        ];
        let totals = TaxTotals::of(&lines).unwrap();
        assert_eq!(totals.subtotal, dec!(112.49));
        assert_eq!(totals.gst_amount, totals.cgst_total + totals.sgst_total);

        let rounded = totals.rounded();
        assert_eq!(rounded.net_amount, dec!(132));
        assert_eq!(rounded.net_amount - rounded.round_off, totals.gross());
    }

    #[test]
    fn half_rupee_rounds_up() {
        let totals = TaxTotals {
            subtotal: dec!(100.5),
            ..TaxTotals::default()
        };
        let rounded = totals.rounded();
        assert_eq!(rounded.net_amount, dec!(101));
        assert_eq!(rounded.round_off, dec!(0.5));
    }

    #[test]
    fn empty_documents_total_zero() {
        let totals = TaxTotals::of::<TaxLine, _>(&[]).unwrap();
        assert_eq!(totals, TaxTotals::default());
        assert_eq!(totals.rounded().net_amount, Decimal::ZERO);
    }

    #[test]
    fn out_of_range_figures_are_validation_errors() {
        let err = TaxLine::compute(Decimal::MAX, dec!(2), dec!(9), dec!(9)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = TaxLine::at_rate(Decimal::MAX, dec!(1), GstRate::percent(dec!(200))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let big = TaxLine::compute(Decimal::MAX, dec!(1), dec!(0), dec!(0)).unwrap();
        let err = TaxTotals::of(&[big.clone(), big]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn percent() -> impl Strategy<Value = Decimal> {
        (0i64..5_000).prop_map(|bp| Decimal::new(bp, 2))
    }

    proptest! {
        #[test]
        fn tax_line_identity(qty in 0i64..100_000, rate in money(), c in percent(), s in percent()) {
            let qty = Decimal::from(qty);
            let line = TaxLine::compute(qty, rate, c, s).unwrap();
            prop_assert_eq!(line.amount, qty * rate);
            prop_assert_eq!(line.total, line.amount + line.cgst_amount + line.sgst_amount);
        }

        #[test]
        fn round_off_is_bounded(lines in prop::collection::vec((0i64..1_000, money(), percent()), 0..20)) {
            let lines: Vec<TaxLine> = lines
                .into_iter()
                .map(|(q, r, p)| TaxLine::at_rate(Decimal::from(q), r, GstRate::percent(p)).unwrap())
                .collect();
            let totals = TaxTotals::of(&lines).unwrap();
            let rounded = totals.rounded();
            prop_assert!(rounded.round_off.abs() < Decimal::ONE);
            prop_assert_eq!(rounded.net_amount, totals.gross().round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero));
            prop_assert_eq!(rounded.net_amount.fract(), Decimal::ZERO);
        }
    }
}
