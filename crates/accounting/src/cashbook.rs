//! Cash book: payments made and received, with a running balance.
//!
//! Each transaction stores the balance after it was applied. The next
//! transaction builds on the balance of the most recently recorded one, so
//! backdated entries do not rewrite history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, PeriodFilter, record_id};

record_id!(
    /// Cash-book account identifier.
    CashAccountId
);

record_id!(
    /// Cash-book transaction identifier.
    CashTransactionId
);

/// A party money is paid to or received from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashAccount {
    pub id: CashAccountId,
    pub name: String,
    #[serde(default)]
    pub gstin: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for CashAccount {
    type Id = CashAccountId;

    fn id(&self) -> CashAccountId {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCashAccount {
    pub name: String,
    #[serde(default)]
    pub gstin: Option<String>,
}

impl CashAccount {
    pub fn open(id: CashAccountId, input: NewCashAccount, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("account name is required"));
        }
        Ok(Self {
            id,
            name,
            gstin: non_blank(input.gstin),
            created_at: now,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money paid out.
    Made,
    Received,
}

impl TransactionKind {
    fn apply(self, balance: Decimal, amount: Decimal) -> Option<Decimal> {
        match self {
            TransactionKind::Made => balance.checked_sub(amount),
            TransactionKind::Received => balance.checked_add(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: CashTransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Payee of a payment made.
    #[serde(default)]
    pub to_account: Option<String>,
    /// Payer of a payment received.
    #[serde(default)]
    pub from_account: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub running_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Entity for CashTransaction {
    type Id = CashTransactionId;

    fn id(&self) -> CashTransactionId {
        self.id
    }
}

/// Input for recording a transaction. `counterparty` names the account on
/// the other side: the payee for `made`, the payer for `received`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TransactionDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount must be greater than zero"));
        }
        Ok(())
    }
}

impl CashTransaction {
    /// Apply `draft` on top of `last_balance`.
    pub fn record(
        id: CashTransactionId,
        draft: TransactionDraft,
        last_balance: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        draft.validate()?;
        let running_balance = draft
            .kind
            .apply(last_balance, draft.amount)
            .ok_or_else(|| DomainError::validation("running balance is too large"))?;

        let counterparty = non_blank(draft.counterparty);
        let (to_account, from_account) = match draft.kind {
            TransactionKind::Made => (counterparty, None),
            TransactionKind::Received => (None, counterparty),
        };

        Ok(Self {
            id,
            kind: draft.kind,
            amount: draft.amount,
            date: draft.date,
            to_account,
            from_account,
            description: non_blank(draft.description),
            running_balance,
            created_at: now,
        })
    }

    pub fn counterparty(&self) -> Option<&str> {
        self.to_account.as_deref().or(self.from_account.as_deref())
    }
}

/// Balance after the most recently recorded transaction, zero for an empty
/// book.
pub fn latest_running_balance(transactions: &[CashTransaction]) -> Decimal {
    transactions
        .iter()
        .max_by_key(|t| (t.created_at, t.id))
        .map_or(Decimal::ZERO, |t| t.running_balance)
}

/// Transactions within `period`, newest date first.
pub fn cash_transactions<'a>(transactions: &'a [CashTransaction], period: &PeriodFilter) -> Vec<&'a CashTransaction> {
    let mut out: Vec<_> = transactions.iter().filter(|t| period.matches(t.date)).collect();
    out.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashSummary {
    pub total_made: Decimal,
    pub total_received: Decimal,
    /// Received minus made.
    pub balance: Decimal,
    pub transaction_count: usize,
}

impl CashSummary {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a CashTransaction>) -> DomainResult<Self> {
        let overflow = || DomainError::validation("cash book total is too large");
        let mut summary = Self::default();
        for t in transactions {
            match t.kind {
                TransactionKind::Made => {
                    summary.total_made = summary.total_made.checked_add(t.amount).ok_or_else(overflow)?
                }
                TransactionKind::Received => {
                    summary.total_received = summary.total_received.checked_add(t.amount).ok_or_else(overflow)?
                }
            }
            summary.transaction_count += 1;
        }
        summary.balance = summary
            .total_received
            .checked_sub(summary.total_made)
            .ok_or_else(overflow)?;
        Ok(summary)
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::day;
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn draft(kind: TransactionKind, amount: Decimal, date: NaiveDate) -> TransactionDraft {
        TransactionDraft {
            kind,
            amount,
            date,
            counterparty: Some("Sharma Traders".into()),
            description: None,
        }
    }

    /// Record drafts in order, one second apart.
    fn book(drafts: Vec<TransactionDraft>) -> Vec<CashTransaction> {
        let start = Utc::now();
        let mut out: Vec<CashTransaction> = Vec::new();
        for (i, d) in drafts.into_iter().enumerate() {
            let last = latest_running_balance(&out);
            let at = start + Duration::seconds(i as i64);
            out.push(CashTransaction::record(CashTransactionId::generate(), d, last, at).unwrap());
        }
        out
    }

    #[test]
    fn accounts_need_a_name() {
        let err = CashAccount::open(CashAccountId::generate(), NewCashAccount::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let acct = CashAccount::open(
            CashAccountId::generate(),
            NewCashAccount {
                name: "  Bank  ".into(),
                gstin: Some(" ".into()),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(acct.name, "Bank");
        assert_eq!(acct.gstin, None);
    }

    #[test]
    fn balance_runs_from_the_latest_recorded_entry() {
        let txs = book(vec![
            draft(TransactionKind::Received, dec!(1000), day(2025, 4, 10)),
            draft(TransactionKind::Made, dec!(250.50), day(2025, 4, 12)),
            // backdated, still applied on top of the latest balance
            draft(TransactionKind::Made, dec!(100), day(2025, 4, 1)),
        ]);
        let balances: Vec<_> = txs.iter().map(|t| t.running_balance).collect();
        assert_eq!(balances, vec![dec!(1000), dec!(749.50), dec!(649.50)]);
        assert_eq!(latest_running_balance(&txs), dec!(649.50));
        assert_eq!(latest_running_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn counterparty_lands_on_the_right_side() {
        let txs = book(vec![
            draft(TransactionKind::Made, dec!(10), day(2025, 4, 1)),
            draft(TransactionKind::Received, dec!(10), day(2025, 4, 1)),
        ]);
        assert_eq!(txs[0].to_account.as_deref(), Some("Sharma Traders"));
        assert_eq!(txs[0].from_account, None);
        assert_eq!(txs[1].from_account.as_deref(), Some("Sharma Traders"));
        assert_eq!(txs[1].to_account, None);
        assert_eq!(txs[1].counterparty(), Some("Sharma Traders"));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [dec!(0), dec!(-5)] {
            let err = CashTransaction::record(
                CashTransactionId::generate(),
                draft(TransactionKind::Received, amount, day(2025, 4, 1)),
                Decimal::ZERO,
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn balance_overflow_is_a_validation_error() {
        let err = CashTransaction::record(
            CashTransactionId::generate(),
            draft(TransactionKind::Received, Decimal::MAX, day(2025, 4, 1)),
            dec!(1),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn period_listing_is_newest_first() {
        let txs = book(vec![
            draft(TransactionKind::Received, dec!(1), day(2025, 3, 2)),
            draft(TransactionKind::Received, dec!(2), day(2025, 4, 9)),
            draft(TransactionKind::Made, dec!(3), day(2025, 4, 20)),
            draft(TransactionKind::Made, dec!(4), day(2024, 4, 20)),
        ]);

        let april_2025 = cash_transactions(&txs, &PeriodFilter::new(vec![2025], vec![3]));
        assert_eq!(april_2025.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![dec!(3), dec!(2)]);

        let all = cash_transactions(&txs, &PeriodFilter::any());
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].amount, dec!(4));
    }

    #[test]
    fn summary_totals_each_side() {
        let txs = book(vec![
            draft(TransactionKind::Received, dec!(500), day(2025, 4, 1)),
            draft(TransactionKind::Made, dec!(120), day(2025, 4, 2)),
            draft(TransactionKind::Made, dec!(30), day(2025, 4, 3)),
        ]);
        let summary = CashSummary::from_transactions(&txs).unwrap();
        assert_eq!(summary.total_received, dec!(500));
        assert_eq!(summary.total_made, dec!(150));
        assert_eq!(summary.balance, dec!(350));
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(CashSummary::from_transactions(&[]).unwrap(), CashSummary::default());
    }

    #[test]
    fn transactions_use_the_stored_type_tag() {
        let tx = &book(vec![draft(TransactionKind::Made, dec!(1), day(2025, 4, 1))])[0];
        let json = serde_json::to_value(tx).unwrap();
        assert_eq!(json["type"], "made");
        let back: CashTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(&back, tx);
    }

    proptest! {
        #[test]
        fn latest_balance_is_received_minus_made(
            entries in prop::collection::vec((any::<bool>(), 1u32..100_000u32), 0..20)
        ) {
            let drafts = entries
                .iter()
                .map(|(received, paise)| {
                    let kind = if *received { TransactionKind::Received } else { TransactionKind::Made };
                    draft(kind, Decimal::new(i64::from(*paise), 2), day(2025, 4, 1))
                })
                .collect();
            let txs = book(drafts);
            let summary = CashSummary::from_transactions(&txs).unwrap();
            prop_assert_eq!(latest_running_balance(&txs), summary.balance);
        }
    }
}
