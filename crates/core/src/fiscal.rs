//! Financial-year labels and document numbering.
//!
//! A financial year runs from 1 April to 31 March and is labelled
//! `YYYY-YY` (e.g. `2025-26`). Document numbers append a zero-padded
//! sequence: `2025-26-001`.
//!
//! Numbering is read-then-write: [`next_document_number`] looks at the
//! numbers already persisted for a family and returns `max + 1`. Nothing
//! reserves the number, so two writers racing on the same state can receive
//! the same value. Callers must persist before the next computation reads.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Index of April in chrono's 0-based month numbering.
const FIRST_MONTH0: u32 = 3;

/// An April-to-March financial year, identified by the calendar year it
/// starts in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialYear {
    start_year: i32,
}

impl ValueObject for FinancialYear {}

impl FinancialYear {
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The financial year a date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month0() >= FIRST_MONTH0 {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// `"{year}-{(year+1) mod 100:02}"`.
    pub fn label(&self) -> String {
        format!(
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }

    /// Prefix shared by every document number in this year.
    pub fn number_prefix(&self) -> String {
        format!("{}-", self.label())
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, 4, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year + 1, 3, 31)
    }
}

impl core::fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.label())
    }
}

/// A financial-year scoped document number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentNumber {
    year: FinancialYear,
    sequence: u64,
}

impl ValueObject for DocumentNumber {}

impl DocumentNumber {
    pub fn new(year: FinancialYear, sequence: u64) -> Self {
        Self { year, sequence }
    }

    /// First number of a year (`{label}-001`).
    pub fn first(year: FinancialYear) -> Self {
        Self::new(year, 1)
    }

    pub fn year(&self) -> FinancialYear {
        self.year
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{:03}", self.year.label(), self.sequence)
    }
}

impl core::str::FromStr for DocumentNumber {
    type Err = DomainError;

    /// Strict parse of `YYYY-YY-NNN` (the sequence may grow past three
    /// digits once a year issues more than 999 documents).
    fn from_str(s: &str) -> DomainResult<Self> {
        let invalid = || DomainError::validation(format!("malformed document number: {s:?}"));

        let mut parts = s.split('-');
        let (Some(year), Some(short), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || short.len() != 2 || seq.len() < 3 {
            return Err(invalid());
        }
        if !(all_digits(year) && all_digits(short) && all_digits(seq)) {
            return Err(invalid());
        }

        let start_year: i32 = year.parse().map_err(|_| invalid())?;
        let fy = FinancialYear::starting(start_year);
        if fy.label() != format!("{year}-{short}") {
            return Err(invalid());
        }
        let sequence: u64 = seq.parse().map_err(|_| invalid())?;

        Ok(Self::new(fy, sequence))
    }
}

impl Serialize for DocumentNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Numeric suffix of a stored document number.
///
/// Takes the segment after the last `-` and reads its leading digits.
/// No leading digits counts as 0, and a digit run too long for `u64`
/// saturates to `u64::MAX` rather than resetting the sequence. Never fails.
pub fn sequence_suffix(number: &str) -> u64 {
    let last = number.rsplit('-').next().unwrap_or_default();
    let digits: &str = {
        let end = last
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(last.len());
        &last[..end]
    };
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Next free number for a family, given the numbers it already holds.
///
/// Only numbers starting with the year's `"{label}-"` prefix are considered.
pub fn next_document_number<'a, I>(existing: I, date: NaiveDate) -> DocumentNumber
where
    I: IntoIterator<Item = &'a str>,
{
    let year = FinancialYear::containing(date);
    let prefix = year.number_prefix();

    let max = existing
        .into_iter()
        .filter(|n| n.starts_with(&prefix))
        .map(sequence_suffix)
        .max();

    match max {
        None => DocumentNumber::first(year),
        Some(max) => DocumentNumber::new(year, max.saturating_add(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn financial_year_boundary_is_first_of_april() {
        assert_eq!(FinancialYear::containing(date(2025, 3, 31)).label(), "2024-25");
        assert_eq!(FinancialYear::containing(date(2025, 4, 1)).label(), "2025-26");
        assert_eq!(FinancialYear::containing(date(2026, 1, 15)).label(), "2025-26");
    }

    #[test]
    fn label_wraps_the_century() {
        assert_eq!(FinancialYear::starting(2099).label(), "2099-00");
        assert_eq!(FinancialYear::starting(2008).label(), "2008-09");
    }

    #[test]
    fn first_number_of_a_year_is_001() {
        let n = next_document_number(std::iter::empty(), date(2025, 6, 1));
        assert_eq!(n.to_string(), "2025-26-001");
    }

    #[test]
    fn next_number_takes_max_within_the_year_only() {
        let existing = ["2025-26-001", "2025-26-007", "2024-25-120", "2025-26-003"];
        let n = next_document_number(existing, date(2025, 12, 1));
        assert_eq!(n.to_string(), "2025-26-008");
    }

    #[test]
    fn malformed_suffixes_count_as_zero() {
        assert_eq!(sequence_suffix("2025-26-abc"), 0);
        assert_eq!(sequence_suffix("2025-26-"), 0);
        assert_eq!(sequence_suffix("2025-26-12x"), 12);
        assert_eq!(sequence_suffix(""), 0);

        let existing = ["2025-26-oops", "2025-26-"];
        let n = next_document_number(existing, date(2025, 4, 1));
        assert_eq!(n.to_string(), "2025-26-001");
    }

    #[test]
    fn huge_suffixes_do_not_reset_the_sequence() {
        assert_eq!(sequence_suffix("2025-26-4294967296"), 4_294_967_296);
        assert_eq!(sequence_suffix("2025-26-99999999999999999999999"), u64::MAX);

        let existing = ["2025-26-4294967296"];
        let n = next_document_number(existing, date(2025, 4, 1));
        assert_eq!(n.to_string(), "2025-26-4294967297");

        let existing = ["2025-26-99999999999999999999999", "2025-26-005"];
        let n = next_document_number(existing, date(2025, 4, 1));
        assert_eq!(n.sequence(), u64::MAX);
    }

    #[test]
    fn sequence_grows_past_three_digits() {
        let existing = ["2025-26-999"];
        let n = next_document_number(existing, date(2025, 4, 1));
        assert_eq!(n.to_string(), "2025-26-1000");
        assert_eq!("2025-26-1000".parse::<DocumentNumber>().unwrap(), n);
    }

    #[test]
    fn parse_rejects_inconsistent_labels() {
        assert!("2025-27-001".parse::<DocumentNumber>().is_err());
        assert!("2025-26-01".parse::<DocumentNumber>().is_err());
        assert!("2025-26".parse::<DocumentNumber>().is_err());
        assert_eq!(
            "2025-26-014".parse::<DocumentNumber>().unwrap(),
            DocumentNumber::new(FinancialYear::starting(2025), 14)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Each number handed out for a year exceeds every suffix assigned
        /// before it in that year.
        #[test]
        fn sequencer_is_monotonic(count in 1usize..40, month in 1u32..=12) {
            let day = date(2025, month, 10);
            let mut assigned: Vec<String> = Vec::new();

            for _ in 0..count {
                let next = next_document_number(assigned.iter().map(String::as_str), day);
                for prev in &assigned {
                    prop_assert!(next.sequence() > sequence_suffix(prev));
                }
                assigned.push(next.to_string());
            }

            prop_assert_eq!(assigned.len(), count);
            prop_assert!(assigned[0].ends_with("-001"));
        }
    }
}
