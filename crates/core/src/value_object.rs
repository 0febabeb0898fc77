//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity. Two financial years with the same start
/// year are the same year; two document numbers with the same label and
/// sequence are the same number. They are immutable: "changing" one means
/// building a new value.
///
/// ```ignore
/// let a = FinancialYear::starting(2025);
/// let b = FinancialYear::containing(date(2026, 3, 31));
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
