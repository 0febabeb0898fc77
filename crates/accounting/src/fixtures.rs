use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use billbook_invoicing::{Bill, BillId, BillStatus, Invoice, InvoiceDraft, InvoiceId, InvoiceLineInput, InvoiceStatus};
use billbook_parties::{Customer, CustomerId, CustomerRef, NewCustomer};
use billbook_sales::{ChallanDraft, ChallanId, ChallanLineInput, DeliveryChallan};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn customer(name: &str) -> Customer {
    Customer::register(CustomerId::generate(), NewCustomer::named(name), Utc::now()).unwrap()
}

pub fn bill(owner: &CustomerRef, date: NaiveDate, net_amount: Decimal, status: BillStatus) -> Bill {
    Bill {
        id: BillId::generate(),
        bill_number: "2025-26-001".into(),
        date,
        customer: owner.clone(),
        customer_gstin: None,
        customer_address: None,
        challan_ids: vec![],
        lines: vec![],
        subtotal: net_amount,
        cgst_total: Decimal::ZERO,
        sgst_total: Decimal::ZERO,
        gst_amount: Decimal::ZERO,
        round_off: Decimal::ZERO,
        net_amount,
        status,
        created_at: Utc::now(),
    }
}

/// Unbilled challan whose grand total equals `amount`.
pub fn challan(owner: &CustomerRef, date: NaiveDate, amount: Decimal) -> DeliveryChallan {
    DeliveryChallan::create(
        ChallanId::generate(),
        "2025-26-001".into(),
        ChallanDraft {
            date,
            customer: owner.clone(),
            customer_address: None,
            customer_phone: None,
            lines: vec![ChallanLineInput {
                name: "Bolt".into(),
                qty: Decimal::ONE,
                rate: amount,
            }],
        },
        Decimal::ZERO,
        Utc::now(),
    )
    .unwrap()
}

/// Invoice with one zero-tax line, so `grand_total == amount`.
pub fn invoice(owner: &CustomerRef, number: &str, date: NaiveDate, amount: Decimal, status: InvoiceStatus) -> Invoice {
    Invoice::issue(
        InvoiceId::generate(),
        number.into(),
        InvoiceDraft {
            invoice_number: None,
            date,
            customer: owner.clone(),
            gstin: None,
            address: None,
            po: None,
            lines: vec![InvoiceLineInput {
                item_id: None,
                name: "Bolt".into(),
                hsn_code: None,
                qty: Decimal::ONE,
                rate: amount,
                cgst_percent: Some(Decimal::ZERO),
                sgst_percent: Some(Decimal::ZERO),
            }],
            status: Some(status),
        },
        Utc::now(),
    )
    .unwrap()
}
