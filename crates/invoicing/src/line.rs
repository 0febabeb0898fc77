//! Tax-bearing line types and the challan line merge.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult};
use billbook_products::ItemId;
use billbook_sales::ChallanLine;

use crate::tax::{GstRate, TaxBearing, TaxLine};

/// A line on a bill: merged challan quantities priced at a flat GST rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub name: String,
    #[serde(default)]
    pub hsn_code: String,
    #[serde(flatten)]
    pub figures: TaxLine,
}

impl BillLine {
    pub fn priced(
        name: impl Into<String>,
        hsn_code: impl Into<String>,
        qty: Decimal,
        rate: Decimal,
        gst: GstRate,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: name.into(),
            hsn_code: hsn_code.into(),
            figures: TaxLine::at_rate(qty, rate, gst)?,
        })
    }
}

impl TaxBearing for BillLine {
    fn figures(&self) -> &TaxLine {
        &self.figures
    }
}

/// A line on an invoice. Percents are carried per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub name: String,
    #[serde(default)]
    pub hsn_code: String,
    #[serde(flatten)]
    pub figures: TaxLine,
}

impl TaxBearing for InvoiceLine {
    fn figures(&self) -> &TaxLine {
        &self.figures
    }
}

/// Challan quantity aggregated under one `(name, rate)` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedLine {
    pub name: String,
    pub rate: Decimal,
    pub qty: Decimal,
}

/// Sum quantities of lines sharing the same name and rate.
///
/// Output keeps the order in which each key was first seen. Names compare
/// exactly; `Decimal` equality ignores scale, so `10` and `10.00` share a key.
pub fn merge_lines<'a, I>(lines: I) -> DomainResult<Vec<MergedLine>>
where
    I: IntoIterator<Item = &'a ChallanLine>,
{
    let mut index: HashMap<(String, Decimal), usize> = HashMap::new();
    let mut merged: Vec<MergedLine> = Vec::new();

    for line in lines {
        let key = (line.name.clone(), line.rate);
        match index.get(&key) {
            Some(&pos) => {
                let entry = &mut merged[pos];
                entry.qty = entry
                    .qty
                    .checked_add(line.qty)
                    .ok_or_else(|| DomainError::validation(format!("merged quantity of {} is too large", line.name)))?;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(MergedLine {
                    name: line.name.clone(),
                    rate: line.rate,
                    qty: line.qty,
                });
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn same_name_and_rate_merge() {
        let lines = vec![
            ChallanLine::new("Bolt", dec!(5), dec!(10)).unwrap(),
            ChallanLine::new("Nut", dec!(1), dec!(2)).unwrap(),
            ChallanLine::new("Bolt", dec!(3), dec!(10.00)).unwrap(),
        ];
        let merged = merge_lines(&lines).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Bolt");
        assert_eq!(merged[0].qty, dec!(8));
        assert_eq!(merged[1].name, "Nut");
    }

    #[test]
    fn different_rates_stay_separate() {
        let lines = vec![
            ChallanLine::new("Bolt", dec!(5), dec!(10)).unwrap(),
            ChallanLine::new("Bolt", dec!(3), dec!(12)).unwrap(),
            ChallanLine::new("bolt", dec!(1), dec!(10)).unwrap(),
        ];
        assert_eq!(merge_lines(&lines).unwrap().len(), 3);
    }

    #[test]
    fn merged_quantity_overflow_is_rejected() {
        let lines = vec![
            ChallanLine::new("Bolt", Decimal::MAX, dec!(0)).unwrap(),
            ChallanLine::new("Bolt", Decimal::MAX, dec!(0)).unwrap(),
        ];
        assert!(matches!(merge_lines(&lines), Err(DomainError::Validation(_))));
    }

    #[test]
    fn bill_lines_serialize_flat() {
        let line = BillLine::priced("Bolt", "7318", dec!(2), dec!(10), GstRate::percent(dec!(18))).unwrap();
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["hsn_code"], "7318");
        assert!(json.get("figures").is_none());
        assert!(json.get("cgst_amount").is_some());

        let back: BillLine = serde_json::from_value(json).unwrap();
        assert_eq!(back, line);
    }
}
