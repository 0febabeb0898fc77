//! Application services over the record store.
//!
//! [`BillBook`] is the single entry point. Its operations are split by
//! concern across the submodules; each reads fresh state from the store on
//! every call.

mod bills;
mod cashbook;
mod catalog;
mod challans;
mod invoices;
mod numbering;
mod reports;

use std::time::Duration;

use chrono::{DateTime, Utc};

use billbook_events::{EventBus, RecordChanged, Subscription};
use billbook_invoicing::GstRate;
use billbook_parties::{Customer, CustomerId};
use billbook_core::TenantId;

use crate::error::{ServiceError, ServiceResult};
use crate::repository::Books;
use crate::saga::DEFAULT_STALE_AFTER;
use crate::store::RecordStore;

pub struct BillBook<S, B> {
    pub(crate) books: Books<S, B>,
    default_gst: GstRate,
    stale_saga_after: Option<chrono::Duration>,
}

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    pub fn new(store: S, bus: B, default_gst: GstRate) -> Self {
        Self {
            books: Books::new(store, bus),
            default_gst,
            stale_saga_after: chrono::Duration::from_std(DEFAULT_STALE_AFTER).ok(),
        }
    }

    /// How long a saga may stay in progress before repair takes it over.
    pub fn with_stale_saga_after(mut self, after: Duration) -> Self {
        self.stale_saga_after = chrono::Duration::from_std(after).ok();
        self
    }

    pub fn books(&self) -> &Books<S, B> {
        &self.books
    }

    /// GST rate used when a conversion request does not name one.
    pub fn default_gst(&self) -> GstRate {
        self.default_gst
    }

    pub(crate) fn stale_cutoff(&self) -> Option<DateTime<Utc>> {
        self.stale_saga_after.and_then(|after| Utc::now().checked_sub_signed(after))
    }

    /// Change notices for every write made through this instance.
    pub fn subscribe(&self) -> Subscription<RecordChanged> {
        self.books.bus().subscribe()
    }

    pub(crate) async fn load_customer(&self, tenant_id: TenantId, id: CustomerId) -> ServiceResult<Customer> {
        self.books
            .get::<Customer>(tenant_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("customer {id}")))
    }
}
