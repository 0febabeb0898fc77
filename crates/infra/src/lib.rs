//! Infrastructure layer: record storage, configuration and the billing
//! services that tie the domain crates together.

pub mod config;
pub mod error;
pub mod repository;
pub mod saga;
pub mod services;
pub mod session;
pub mod store;


pub use config::AppConfig;
pub use error::{ServiceError, ServiceResult};
pub use repository::{Books, Record};
pub use saga::{
    Compensation, CompensationLog, ConsistencyIssue, ConvertChallans, RepairReport, SagaId, SagaKind, SagaLog,
    SagaStatus,
};
pub use services::BillBook;
pub use session::Session;
pub use store::{InMemoryRecordStore, ListQuery, OrderBy, PostgresRecordStore, RecordStore, StoreError, StoredRecord};
