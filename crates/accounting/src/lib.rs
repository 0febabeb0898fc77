//! Customer balances, derived views and the cash book.
//!
//! Views are pure functions of already-loaded documents and are recomputed
//! on request. The cash book is the one place new records are minted.

pub mod balance;
pub mod cashbook;
pub mod history;
pub mod statement;
pub mod summary;

#[cfg(test)]
pub(crate) mod fixtures;

pub use balance::previous_balance;
pub use cashbook::{
    CashAccount, CashAccountId, CashSummary, CashTransaction, CashTransactionId, NewCashAccount, TransactionDraft,
    TransactionKind, cash_transactions, latest_running_balance,
};
pub use history::{customer_bills, customer_challans, unbilled_challans};
pub use statement::{CustomerStatement, EntryKind, LedgerEntry};
pub use summary::{DashboardSummary, InvoiceSummary, RECENT_INVOICES, search_invoices};
