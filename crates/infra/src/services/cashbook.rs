use chrono::Utc;
use tracing::{info, instrument};

use billbook_accounting::{
    CashAccount, CashAccountId, CashSummary, CashTransaction, CashTransactionId, NewCashAccount, TransactionDraft,
    cash_transactions, latest_running_balance,
};
use billbook_core::PeriodFilter;
use billbook_events::{EventBus, RecordChanged};

use super::BillBook;
use crate::error::ServiceResult;
use crate::session::Session;
use crate::store::{ListQuery, RecordStore};

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    pub async fn list_cash_accounts(&self, session: &Session) -> ServiceResult<Vec<CashAccount>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        Ok(self.books.list(tenant_id, &ListQuery::new().order_by("name")).await?)
    }

    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn open_cash_account(&self, session: &Session, input: NewCashAccount) -> ServiceResult<CashAccount> {
        let tenant_id = session.require_owner()?;
        let account = CashAccount::open(CashAccountId::generate(), input, Utc::now())?;
        self.books.insert(tenant_id, &account).await?;
        info!(%tenant_id, account_id = %account.id, "cash account opened");
        Ok(account)
    }

    /// Record a payment on top of the latest running balance.
    ///
    /// The balance is read and then written without a lock, so concurrent
    /// recordings for one tenant can both build on the same balance.
    #[instrument(skip(self, session, draft), fields(kind = ?draft.kind, amount = %draft.amount))]
    pub async fn record_cash_transaction(
        &self,
        session: &Session,
        draft: TransactionDraft,
    ) -> ServiceResult<CashTransaction> {
        let tenant_id = session.require_owner()?;
        draft.validate()?;
        let existing: Vec<CashTransaction> = self.books.all(tenant_id).await?;
        let last_balance = latest_running_balance(&existing);
        let transaction = CashTransaction::record(CashTransactionId::generate(), draft, last_balance, Utc::now())?;
        self.books.insert(tenant_id, &transaction).await?;
        info!(
            %tenant_id,
            transaction_id = %transaction.id,
            running_balance = %transaction.running_balance,
            "cash transaction recorded"
        );
        Ok(transaction)
    }

    /// Transactions in `period`, newest date first.
    pub async fn cash_transactions(
        &self,
        session: &Session,
        period: &PeriodFilter,
    ) -> ServiceResult<Vec<CashTransaction>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        let all: Vec<CashTransaction> = self.books.all(tenant_id).await?;
        Ok(cash_transactions(&all, period).into_iter().cloned().collect())
    }

    pub async fn cash_summary(&self, session: &Session) -> ServiceResult<CashSummary> {
        let transactions: Vec<CashTransaction> = match session.owner() {
            Some(tenant_id) => self.books.all(tenant_id).await?,
            None => Vec::new(),
        };
        Ok(CashSummary::from_transactions(&transactions)?)
    }
}
