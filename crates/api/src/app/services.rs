//! Store and bus wiring behind the HTTP handlers.

use std::sync::Arc;

use tracing::{info, warn};

use billbook_events::{InMemoryEventBus, RecordChanged};
use billbook_infra::{AppConfig, BillBook, InMemoryRecordStore, PostgresRecordStore, RecordStore};
use billbook_invoicing::GstRate;

pub type Book = BillBook<Arc<dyn RecordStore>, Arc<InMemoryEventBus<RecordChanged>>>;

#[derive(Clone)]
pub struct AppServices {
    book: Arc<Book>,
}

impl AppServices {
    pub fn new(book: Book) -> Self {
        Self { book: Arc::new(book) }
    }

    /// Dev/test wiring: nothing outlives the process.
    pub fn in_memory(default_gst: GstRate) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        Self::new(BillBook::new(store, Arc::new(InMemoryEventBus::new()), default_gst))
    }

    pub fn book(&self) -> &Book {
        &self.book
    }
}

fn configured(store: Arc<dyn RecordStore>, config: &AppConfig) -> AppServices {
    let book = BillBook::new(store, Arc::new(InMemoryEventBus::new()), config.default_gst_rate)
        .with_stale_saga_after(config.saga_stale_after);
    AppServices::new(book)
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    if !config.use_persistent_stores {
        return Ok(configured(Arc::new(InMemoryRecordStore::new()), config));
    }
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("USE_PERSISTENT_STORES=true but DATABASE_URL is not set, falling back to in-memory");
        return Ok(configured(Arc::new(InMemoryRecordStore::new()), config));
    };

    let store = PostgresRecordStore::connect(database_url).await?;
    store.migrate().await?;
    info!("using postgres record store");

    Ok(configured(Arc::new(store), config))
}
