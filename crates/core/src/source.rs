use crate::domain::records::{
    Bill, Budget, Debt, Goal, RecurringTransaction, Transaction, UserSnapshot,
};
use anyhow::Result;
use uuid::Uuid;

/// User-scoped reads of every record type the calendar and alert pass consume.
///
/// Implementations must only return rows owned by `user_id`.
#[async_trait::async_trait]
pub trait UserDataSource: Send + Sync {
    async fn fetch_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>>;

    async fn fetch_bills(&self, user_id: Uuid) -> Result<Vec<Bill>>;

    async fn fetch_goals(&self, user_id: Uuid) -> Result<Vec<Goal>>;

    async fn fetch_debts(&self, user_id: Uuid) -> Result<Vec<Debt>>;

    async fn fetch_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>>;

    async fn fetch_recurring(&self, user_id: Uuid) -> Result<Vec<RecurringTransaction>>;

    /// Issues all six fetches concurrently and waits for every one of them.
    /// The first failure aborts the whole snapshot.
    async fn snapshot(&self, user_id: Uuid) -> Result<UserSnapshot> {
        let (transactions, bills, goals, debts, budgets, recurring) = tokio::try_join!(
            self.fetch_transactions(user_id),
            self.fetch_bills(user_id),
            self.fetch_goals(user_id),
            self.fetch_debts(user_id),
            self.fetch_budgets(user_id),
            self.fetch_recurring(user_id),
        )?;

        Ok(UserSnapshot {
            transactions,
            bills,
            goals,
            debts,
            budgets,
            recurring,
        })
    }
}

/// Serves one fixed snapshot regardless of user. Handy for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub data: UserSnapshot,
}

impl InMemorySource {
    pub fn new(data: UserSnapshot) -> Self {
        Self { data }
    }
}

#[async_trait::async_trait]
impl UserDataSource for InMemorySource {
    async fn fetch_transactions(&self, _user_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self.data.transactions.clone())
    }

    async fn fetch_bills(&self, _user_id: Uuid) -> Result<Vec<Bill>> {
        Ok(self.data.bills.clone())
    }

    async fn fetch_goals(&self, _user_id: Uuid) -> Result<Vec<Goal>> {
        Ok(self.data.goals.clone())
    }

    async fn fetch_debts(&self, _user_id: Uuid) -> Result<Vec<Debt>> {
        Ok(self.data.debts.clone())
    }

    async fn fetch_budgets(&self, _user_id: Uuid) -> Result<Vec<Budget>> {
        Ok(self.data.budgets.clone())
    }

    async fn fetch_recurring(&self, _user_id: Uuid) -> Result<Vec<RecurringTransaction>> {
        Ok(self.data.recurring.clone())
    }
}
