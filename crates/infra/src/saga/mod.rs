//! Multi-record billing transitions.
//!
//! Converting challans into a bill, and deleting a bill, each touch several
//! records with no backend transaction around them. Each run is journalled
//! as a [`SagaLog`] record: the log lists the compensating action for every
//! step already applied. When a step fails the compensations are replayed in
//! reverse; if that also fails the log is left in
//! [`SagaStatus::NeedsRepair`] for [`BillBook::repair_pending`] to finish.
//! A log stuck in [`SagaStatus::InProgress`] past [`DEFAULT_STALE_AFTER`]
//! (the process died, or its last log write was lost) is picked up too.
//!
//! [`BillBook::repair_pending`]: crate::BillBook::repair_pending

pub mod billing;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{Entity, record_id};
use billbook_invoicing::BillId;
use billbook_sales::ChallanId;

pub use billing::{ConsistencyIssue, ConvertChallans, RepairReport};

record_id!(
    /// Saga log identifier.
    SagaId
);

/// Age after which an in-progress saga is presumed abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaKind {
    Conversion,
    BillDeletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    InProgress,
    Completed,
    /// A step failed and every applied step was undone.
    Compensated,
    /// A step failed and undoing it failed too.
    NeedsRepair,
}

impl SagaStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::InProgress | Self::NeedsRepair)
    }
}

/// Undo action for one applied step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Compensation {
    DeleteBill { bill_id: BillId },
    UnmarkChallan { challan_id: ChallanId },
    RemarkChallan { challan_id: ChallanId, bill_id: BillId },
}

/// Compensations in the order their steps were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompensationLog(Vec<Compensation>);

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, undo: Compensation) {
        self.0.push(undo);
    }

    /// Newest first: the order compensations must run in.
    pub fn pending(&self) -> impl Iterator<Item = &Compensation> {
        self.0.iter().rev()
    }

    /// Drop the newest entry once it has been undone.
    pub fn pop(&mut self) -> Option<Compensation> {
        self.0.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Journal of one billing transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaLog {
    pub id: SagaId,
    pub kind: SagaKind,
    pub bill_id: BillId,
    pub challan_ids: Vec<ChallanId>,
    pub compensations: CompensationLog,
    pub status: SagaStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl Entity for SagaLog {
    type Id = SagaId;

    fn id(&self) -> SagaId {
        self.id
    }
}

impl SagaLog {
    pub fn start(kind: SagaKind, bill_id: BillId, challan_ids: Vec<ChallanId>, now: DateTime<Utc>) -> Self {
        Self {
            id: SagaId::generate(),
            kind,
            bill_id,
            challan_ids,
            compensations: CompensationLog::new(),
            status: SagaStatus::InProgress,
            last_error: None,
            started_at: now,
        }
    }

    /// Whether repair should take this log. In-progress logs qualify only
    /// once started at or before `stale_before`; `None` means never.
    pub fn awaits_repair(&self, stale_before: Option<DateTime<Utc>>) -> bool {
        match self.status {
            SagaStatus::NeedsRepair => true,
            SagaStatus::InProgress => stale_before.is_some_and(|cutoff| self.started_at <= cutoff),
            SagaStatus::Completed | SagaStatus::Compensated => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compensations_replay_newest_first() {
        let bill_id = BillId::generate();
        let a = ChallanId::generate();
        let b = ChallanId::generate();

        let mut log = CompensationLog::new();
        log.record(Compensation::DeleteBill { bill_id });
        log.record(Compensation::UnmarkChallan { challan_id: a });
        log.record(Compensation::UnmarkChallan { challan_id: b });

        let order: Vec<_> = log.pending().cloned().collect();
        assert_eq!(order[0], Compensation::UnmarkChallan { challan_id: b });
        assert_eq!(order[2], Compensation::DeleteBill { bill_id });
    }

    #[test]
    fn log_serializes_with_tagged_actions() {
        let mut saga = SagaLog::start(SagaKind::Conversion, BillId::generate(), vec![], Utc::now());
        saga.compensations.record(Compensation::DeleteBill { bill_id: saga.bill_id });
        let json = serde_json::to_value(&saga).unwrap();
        assert_eq!(json["kind"], "conversion");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["compensations"][0]["action"], "delete_bill");

        let back: SagaLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, saga);
    }

    #[test]
    fn in_progress_logs_await_repair_only_once_stale() {
        let started = Utc::now();
        let mut saga = SagaLog::start(SagaKind::Conversion, BillId::generate(), vec![], started);

        assert!(!saga.awaits_repair(None));
        assert!(!saga.awaits_repair(Some(started - chrono::Duration::seconds(1))));
        assert!(saga.awaits_repair(Some(started)));

        saga.status = SagaStatus::NeedsRepair;
        assert!(saga.awaits_repair(None));

        saga.status = SagaStatus::Completed;
        assert!(!saga.awaits_repair(Some(started)));
    }

    #[test]
    fn pending_statuses() {
        assert!(SagaStatus::NeedsRepair.is_pending());
        assert!(SagaStatus::InProgress.is_pending());
        assert!(!SagaStatus::Compensated.is_pending());
    }
}
