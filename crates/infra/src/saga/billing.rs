//! Challan → bill conversion and bill deletion as compensating sagas.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use billbook_core::{DocumentFamily, DomainError, RecordFamily, RecordId, TenantId};
use billbook_events::{EventBus, RecordChanged};
use billbook_invoicing::{Bill, BillId, BillRequest, GstRate};
use billbook_parties::CustomerId;
use billbook_products::Item;
use billbook_sales::{ChallanId, DeliveryChallan};

use super::{Compensation, CompensationLog, SagaId, SagaKind, SagaLog, SagaStatus};
use crate::error::{ServiceError, ServiceResult};
use crate::services::BillBook;
use crate::session::Session;
use crate::store::{RecordStore, StoreError};

/// Request to consolidate unbilled challans into one bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertChallans {
    pub customer_id: CustomerId,
    pub challan_ids: Vec<ChallanId>,
    pub date: NaiveDate,
    /// Flat GST percent; the configured default when absent.
    #[serde(default)]
    pub gst_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Rolled back to the state before the operation.
    pub repaired: Vec<SagaId>,
    /// Found fully applied and closed as completed.
    pub completed: Vec<SagaId>,
    pub unresolved: Vec<SagaId>,
}

/// A broken link between a bill and its challans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ConsistencyIssue {
    /// `is_billed` disagrees with the presence of `bill_id`.
    FlagMismatch { challan_id: ChallanId },
    /// The challan points at a bill that no longer exists.
    DanglingBill { challan_id: ChallanId, bill_id: RecordId },
    /// The challan points at a bill that does not list it.
    UnlistedChallan { challan_id: ChallanId, bill_id: RecordId },
    /// The bill lists a challan that does not point back at it.
    MissingBackReference { bill_id: BillId, challan_id: ChallanId },
}

fn billed_fields(challan: &DeliveryChallan) -> serde_json::Value {
    json!({ "is_billed": challan.is_billed(), "bill_id": challan.bill_id() })
}

fn ignore_missing(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => other,
    }
}

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    /// Convert a customer's unbilled challans into one unpaid bill.
    ///
    /// The bill is stored first, then each challan is marked billed. If
    /// storing the bill fails nothing has changed. If marking a challan
    /// fails, the challans already marked are unmarked and the bill removed;
    /// should that rollback fail as well, the call returns
    /// [`ServiceError::PartialFailure`] and the saga log is left for
    /// [`BillBook::repair_pending`].
    #[instrument(skip_all, fields(customer_id = %request.customer_id, challans = request.challan_ids.len()))]
    pub async fn convert_challans(&self, session: &Session, request: ConvertChallans) -> ServiceResult<Bill> {
        let tenant_id = session.require_owner()?;
        if request.challan_ids.is_empty() {
            return Err(DomainError::validation("no challans selected").into());
        }
        let gst = match request.gst_rate {
            Some(rate) if rate < Decimal::ZERO => {
                return Err(DomainError::validation("GST rate cannot be negative").into());
            }
            Some(rate) => GstRate::percent(rate),
            None => self.default_gst(),
        };

        let customer = self.load_customer(tenant_id, request.customer_id).await?;
        let mut challans = Vec::with_capacity(request.challan_ids.len());
        for id in &request.challan_ids {
            challans.push(self.load_challan(tenant_id, *id).await?);
        }
        let catalog: Vec<Item> = self.books.all(tenant_id).await?;
        let number = self.next_number_for(tenant_id, DocumentFamily::Bill, request.date).await?;

        let bill = Bill::prepare(
            BillId::generate(),
            number,
            BillRequest {
                customer: &customer,
                date: request.date,
                gst,
            },
            &challans,
            &catalog,
            Utc::now(),
        )?;

        let mut saga = SagaLog::start(SagaKind::Conversion, bill.id, bill.challan_ids.clone(), Utc::now());
        self.books.insert(tenant_id, &saga).await?;

        if let Err(err) = self.books.insert(tenant_id, &bill).await {
            warn!(%tenant_id, saga_id = %saga.id, error = %err, "bill insert failed; nothing to undo");
            saga.last_error = Some(err.to_string());
            self.finish(tenant_id, &mut saga, SagaStatus::Compensated).await;
            return Err(err.into());
        }
        saga.compensations.record(Compensation::DeleteBill { bill_id: bill.id });
        self.checkpoint(tenant_id, &saga).await;

        for challan in &mut challans {
            let marked = match challan.mark_billed(bill.id.record_id()) {
                Ok(()) => self
                    .books
                    .patch(tenant_id, RecordFamily::DeliveryChallans, challan.id.record_id(), billed_fields(challan))
                    .await
                    .map_err(ServiceError::from),
                Err(err) => Err(err.into()),
            };
            if let Err(err) = marked {
                return Err(self.unwind(tenant_id, saga, err).await);
            }
            saga.compensations.record(Compensation::UnmarkChallan { challan_id: challan.id });
            self.checkpoint(tenant_id, &saga).await;
        }

        self.finish(tenant_id, &mut saga, SagaStatus::Completed).await;
        info!(
            %tenant_id,
            bill_id = %bill.id,
            number = %bill.bill_number,
            net_amount = %bill.net_amount,
            "challans converted to bill"
        );
        Ok(bill)
    }

    /// Delete a bill, first returning each of its challans to unbilled.
    #[instrument(skip_all, fields(bill_id = %bill_id))]
    pub async fn delete_bill(&self, session: &Session, bill_id: BillId) -> ServiceResult<()> {
        let tenant_id = session.require_owner()?;
        let bill = self.load_bill(tenant_id, bill_id).await?;

        let mut saga = SagaLog::start(SagaKind::BillDeletion, bill.id, bill.challan_ids.clone(), Utc::now());
        self.books.insert(tenant_id, &saga).await?;

        for challan_id in &bill.challan_ids {
            match self.unmark_if_billed_to(tenant_id, *challan_id, bill.id).await {
                Ok(true) => {
                    saga.compensations.record(Compensation::RemarkChallan {
                        challan_id: *challan_id,
                        bill_id: bill.id,
                    });
                    self.checkpoint(tenant_id, &saga).await;
                }
                Ok(false) => {}
                Err(err) => return Err(self.unwind(tenant_id, saga, err).await),
            }
        }

        if let Err(err) = self.books.delete::<Bill>(tenant_id, bill.id).await {
            return Err(self.unwind(tenant_id, saga, err.into()).await);
        }

        self.finish(tenant_id, &mut saga, SagaStatus::Completed).await;
        info!(%tenant_id, bill_id = %bill.id, "bill deleted");
        Ok(())
    }

    /// Saga logs that are still running or waiting for repair.
    pub async fn pending_sagas(&self, session: &Session) -> ServiceResult<Vec<SagaLog>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        let logs: Vec<SagaLog> = self.books.all(tenant_id).await?;
        Ok(logs.into_iter().filter(|l| l.status.is_pending()).collect())
    }

    /// Settle every saga left in [`SagaStatus::NeedsRepair`], plus every
    /// [`SagaStatus::InProgress`] one older than the stale threshold.
    ///
    /// A stale in-progress saga whose steps are all visible in the records
    /// is closed as completed. Anything else is restored to the state from
    /// before the operation: a conversion is rolled back, a deletion leaves
    /// the bill and its challans linked again. Each step checks current
    /// state first, so running repair twice is harmless.
    #[instrument(skip_all)]
    pub async fn repair_pending(&self, session: &Session) -> ServiceResult<RepairReport> {
        let tenant_id = session.require_owner()?;
        let stale_before = self.stale_cutoff();
        let logs: Vec<SagaLog> = self.books.all(tenant_id).await?;

        let mut report = RepairReport::default();
        for mut log in logs.into_iter().filter(|l| l.awaits_repair(stale_before)) {
            match self.settle(tenant_id, &log).await {
                Ok(outcome) => {
                    log.compensations = CompensationLog::new();
                    log.status = outcome;
                    match self.books.save(tenant_id, &log).await {
                        Ok(()) if outcome == SagaStatus::Completed => {
                            info!(%tenant_id, saga_id = %log.id, "stale saga found complete");
                            report.completed.push(log.id);
                        }
                        Ok(()) => {
                            info!(%tenant_id, saga_id = %log.id, "saga repaired");
                            report.repaired.push(log.id);
                        }
                        Err(err) => {
                            warn!(%tenant_id, saga_id = %log.id, error = %err, "repaired but could not close saga log");
                            report.unresolved.push(log.id);
                        }
                    }
                }
                Err(err) => {
                    warn!(%tenant_id, saga_id = %log.id, error = %err, "saga repair failed");
                    log.last_error = Some(err.to_string());
                    self.checkpoint(tenant_id, &log).await;
                    report.unresolved.push(log.id);
                }
            }
        }
        Ok(report)
    }

    /// Cross-check every bill against the challans that point at it.
    pub async fn consistency_report(&self, session: &Session) -> ServiceResult<Vec<ConsistencyIssue>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        let bills: Vec<Bill> = self.books.all(tenant_id).await?;
        let challans: Vec<DeliveryChallan> = self.books.all(tenant_id).await?;

        let listed: HashMap<RecordId, HashSet<ChallanId>> = bills
            .iter()
            .map(|b| (b.id.record_id(), b.challan_ids.iter().copied().collect()))
            .collect();
        let pointing: HashMap<ChallanId, Option<RecordId>> =
            challans.iter().map(|c| (c.id, c.bill_id())).collect();

        let mut issues = Vec::new();
        for challan in &challans {
            if !challan.billing_consistent() {
                issues.push(ConsistencyIssue::FlagMismatch { challan_id: challan.id });
            }
            if let Some(bill_id) = challan.bill_id() {
                match listed.get(&bill_id) {
                    None => issues.push(ConsistencyIssue::DanglingBill {
                        challan_id: challan.id,
                        bill_id,
                    }),
                    Some(ids) if !ids.contains(&challan.id) => issues.push(ConsistencyIssue::UnlistedChallan {
                        challan_id: challan.id,
                        bill_id,
                    }),
                    Some(_) => {}
                }
            }
        }
        for bill in &bills {
            for challan_id in &bill.challan_ids {
                if pointing.get(challan_id) != Some(&Some(bill.id.record_id())) {
                    issues.push(ConsistencyIssue::MissingBackReference {
                        bill_id: bill.id,
                        challan_id: *challan_id,
                    });
                }
            }
        }
        Ok(issues)
    }

    async fn unmark_if_billed_to(&self, tenant_id: TenantId, challan_id: ChallanId, bill_id: BillId) -> ServiceResult<bool> {
        let Some(mut challan) = self.books.get::<DeliveryChallan>(tenant_id, challan_id).await? else {
            return Ok(false);
        };
        if challan.bill_id() != Some(bill_id.record_id()) {
            return Ok(false);
        }
        challan.mark_unbilled();
        self.books
            .patch(tenant_id, RecordFamily::DeliveryChallans, challan_id.record_id(), billed_fields(&challan))
            .await?;
        Ok(true)
    }

    async fn compensate(&self, tenant_id: TenantId, step: &Compensation) -> Result<(), StoreError> {
        match step {
            Compensation::DeleteBill { bill_id } => ignore_missing(self.books.delete::<Bill>(tenant_id, *bill_id).await),
            Compensation::UnmarkChallan { challan_id } => ignore_missing(
                self.books
                    .patch(
                        tenant_id,
                        RecordFamily::DeliveryChallans,
                        challan_id.record_id(),
                        json!({ "is_billed": false, "bill_id": null }),
                    )
                    .await,
            ),
            Compensation::RemarkChallan { challan_id, bill_id } => ignore_missing(
                self.books
                    .patch(
                        tenant_id,
                        RecordFamily::DeliveryChallans,
                        challan_id.record_id(),
                        json!({ "is_billed": true, "bill_id": bill_id }),
                    )
                    .await,
            ),
        }
    }

    /// Undo applied steps newest first. Returns the error for the caller.
    async fn unwind(&self, tenant_id: TenantId, mut saga: SagaLog, cause: ServiceError) -> ServiceError {
        let reason = cause.to_string();
        warn!(%tenant_id, saga_id = %saga.id, kind = ?saga.kind, %reason, steps = saga.compensations.len(), "saga step failed; compensating");

        loop {
            let next = saga.compensations.pending().next().cloned();
            let Some(step) = next else {
                break;
            };
            if let Err(err) = self.compensate(tenant_id, &step).await {
                let detail = format!("{reason}; compensation {step:?} failed: {err}");
                error!(%tenant_id, saga_id = %saga.id, %detail, "saga needs repair");
                saga.last_error = Some(detail.clone());
                saga.status = SagaStatus::NeedsRepair;
                self.checkpoint(tenant_id, &saga).await;
                return ServiceError::PartialFailure {
                    saga_id: saga.id.record_id(),
                    reason: detail,
                };
            }
            saga.compensations.pop();
        }

        saga.last_error = Some(reason);
        self.finish(tenant_id, &mut saga, SagaStatus::Compensated).await;
        cause
    }

    async fn settle(&self, tenant_id: TenantId, log: &SagaLog) -> ServiceResult<SagaStatus> {
        if log.status == SagaStatus::InProgress && self.fully_applied(tenant_id, log).await? {
            return Ok(SagaStatus::Completed);
        }
        self.restore(tenant_id, log).await?;
        Ok(SagaStatus::Compensated)
    }

    /// Whether every forward step of the saga shows in current state.
    async fn fully_applied(&self, tenant_id: TenantId, log: &SagaLog) -> ServiceResult<bool> {
        let bill_exists = self.books.get::<Bill>(tenant_id, log.bill_id).await?.is_some();
        let target = Some(log.bill_id.record_id());
        for challan_id in &log.challan_ids {
            let linked = self
                .books
                .get::<DeliveryChallan>(tenant_id, *challan_id)
                .await?
                .is_some_and(|c| c.bill_id() == target);
            let applied = match log.kind {
                SagaKind::Conversion => linked,
                SagaKind::BillDeletion => !linked,
            };
            if !applied {
                return Ok(false);
            }
        }
        Ok(match log.kind {
            SagaKind::Conversion => bill_exists,
            SagaKind::BillDeletion => !bill_exists,
        })
    }

    /// Bring records back to their pre-saga state, reading current state
    /// rather than trusting the stored compensation list.
    async fn restore(&self, tenant_id: TenantId, log: &SagaLog) -> ServiceResult<()> {
        let bill_exists = self.books.get::<Bill>(tenant_id, log.bill_id).await?.is_some();
        match log.kind {
            SagaKind::Conversion => {
                for challan_id in &log.challan_ids {
                    self.unmark_if_billed_to(tenant_id, *challan_id, log.bill_id).await?;
                }
                if bill_exists {
                    ignore_missing(self.books.delete::<Bill>(tenant_id, log.bill_id).await)?;
                }
            }
            SagaKind::BillDeletion if bill_exists => {
                for challan_id in &log.challan_ids {
                    let Some(mut challan) = self.books.get::<DeliveryChallan>(tenant_id, *challan_id).await? else {
                        continue;
                    };
                    if challan.bill_id() == Some(log.bill_id.record_id()) {
                        continue;
                    }
                    challan.mark_billed(log.bill_id.record_id())?;
                    self.books
                        .patch(tenant_id, RecordFamily::DeliveryChallans, challan_id.record_id(), billed_fields(&challan))
                        .await?;
                }
            }
            SagaKind::BillDeletion => {
                for challan_id in &log.challan_ids {
                    self.unmark_if_billed_to(tenant_id, *challan_id, log.bill_id).await?;
                }
            }
        }
        Ok(())
    }

    async fn checkpoint(&self, tenant_id: TenantId, saga: &SagaLog) {
        if let Err(err) = self.books.save(tenant_id, saga).await {
            warn!(%tenant_id, saga_id = %saga.id, error = %err, "could not write saga log");
        }
    }

    async fn finish(&self, tenant_id: TenantId, saga: &mut SagaLog, status: SagaStatus) {
        saga.status = status;
        self.checkpoint(tenant_id, saga).await;
    }
}
