//! Bills, invoices and the GST arithmetic behind them.
//!
//! Pure domain logic: numbers are assigned and records persisted by
//! `billbook-infra`.

pub mod bill;
pub mod invoice;
pub mod line;
pub mod tax;
pub mod words;

pub use bill::{Bill, BillId, BillRequest, BillStatus};
pub use invoice::{DEFAULT_LINE_PERCENT, Invoice, InvoiceDraft, InvoiceId, InvoiceLineInput, InvoiceStatus};
pub use line::{BillLine, InvoiceLine, MergedLine, merge_lines};
pub use tax::{GstRate, RoundedTotal, TaxBearing, TaxLine, TaxTotals};
pub use words::amount_in_words;
