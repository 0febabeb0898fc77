//! Calendar period filters for statements and document history.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Year/month filter. Empty lists mean "any".
///
/// Months are 0-based (January = 0), matching how the filters are
/// presented to users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodFilter {
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub months: Vec<u32>,
}

impl PeriodFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(years: Vec<i32>, months: Vec<u32>) -> Self {
        Self { years, months }
    }

    pub fn is_active(&self) -> bool {
        !self.years.is_empty() || !self.months.is_empty()
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        if !self.years.is_empty() && !self.years.contains(&date.year()) {
            return false;
        }
        if !self.months.is_empty() && !self.months.contains(&date.month0()) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let f = PeriodFilter::any();
        assert!(!f.is_active());
        assert!(f.matches(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()));
    }

    #[test]
    fn months_are_zero_based() {
        let f = PeriodFilter::new(vec![2025], vec![0]);
        assert!(f.matches(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()));
        assert!(!f.matches(NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()));
        assert!(!f.matches(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
    }
}
