//! Record families known to the persistence collaborator.

use serde::{Deserialize, Serialize};

/// A family of stored records. The storage layer keys every record by
/// `(tenant, family, id)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    Customers,
    Items,
    DeliveryChallans,
    Bills,
    Invoices,
    /// Saga journals for multi-step billing transitions.
    SagaLogs,
    CashAccounts,
    CashTransactions,
}

impl RecordFamily {
    pub const ALL: [RecordFamily; 8] = [
        RecordFamily::Customers,
        RecordFamily::Items,
        RecordFamily::DeliveryChallans,
        RecordFamily::Bills,
        RecordFamily::Invoices,
        RecordFamily::SagaLogs,
        RecordFamily::CashAccounts,
        RecordFamily::CashTransactions,
    ];

    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordFamily::Customers => "customers",
            RecordFamily::Items => "items",
            RecordFamily::DeliveryChallans => "delivery_challans",
            RecordFamily::Bills => "bills",
            RecordFamily::Invoices => "invoices",
            RecordFamily::SagaLogs => "saga_logs",
            RecordFamily::CashAccounts => "cash_accounts",
            RecordFamily::CashTransactions => "cash_transactions",
        }
    }
}

impl core::fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numbered document family. Each family has its own financial-year
/// scoped sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFamily {
    Challan,
    Bill,
    Invoice,
}

impl DocumentFamily {
    pub fn record_family(self) -> RecordFamily {
        match self {
            DocumentFamily::Challan => RecordFamily::DeliveryChallans,
            DocumentFamily::Bill => RecordFamily::Bills,
            DocumentFamily::Invoice => RecordFamily::Invoices,
        }
    }

    /// Name of the persisted field holding the document number.
    pub fn number_field(self) -> &'static str {
        match self {
            DocumentFamily::Challan => "challan_number",
            DocumentFamily::Bill => "bill_number",
            DocumentFamily::Invoice => "invoice_number",
        }
    }
}
