use crate::domain::deposit::UserDeposit;
use crate::domain::money::Amount;
use crate::domain::points::{PointTransaction, PointTransactionKind, UserPoints};
use crate::domain::ports::{DepositStore, PointsLedger};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for user deposits.
///
/// Uses `Arc<RwLock<HashMap<String, UserDeposit>>>` keyed by deposit id.
#[derive(Default, Clone)]
pub struct InMemoryDepositStore {
    deposits: Arc<RwLock<HashMap<String, UserDeposit>>>,
}

impl InMemoryDepositStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DepositStore for InMemoryDepositStore {
    async fn store(&self, deposit: UserDeposit) -> Result<()> {
        let mut deposits = self.deposits.write().await;
        deposits.insert(deposit.id.clone(), deposit);
        Ok(())
    }

    async fn get(&self, deposit_id: &str) -> Result<Option<UserDeposit>> {
        let deposits = self.deposits.read().await;
        Ok(deposits.get(deposit_id).cloned())
    }

    async fn find_by_user_and_meetup(
        &self,
        user_id: &str,
        meetup_id: &str,
    ) -> Result<Option<UserDeposit>> {
        let deposits = self.deposits.read().await;
        Ok(deposits
            .values()
            .filter(|d| d.user_id == user_id && d.meetup_id == meetup_id)
            .max_by_key(|d| d.precedence())
            .cloned())
    }

    async fn list_by_meetup(&self, meetup_id: &str) -> Result<Vec<UserDeposit>> {
        let deposits = self.deposits.read().await;
        Ok(deposits
            .values()
            .filter(|d| d.meetup_id == meetup_id)
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<UserDeposit>> {
        let deposits = self.deposits.read().await;
        Ok(deposits.values().cloned().collect())
    }
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<String, UserPoints>,
    transactions: Vec<PointTransaction>,
}

/// A thread-safe in-memory points ledger.
///
/// Balances and the append-only transaction log live behind one lock so a
/// credit or debit updates both atomically.
#[derive(Default, Clone)]
pub struct InMemoryPointsLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryPointsLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PointsLedger for InMemoryPointsLedger {
    async fn get_user_points(&self, user_id: &str) -> Result<UserPoints> {
        let state = self.state.read().await;
        Ok(state
            .balances
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPoints::new(user_id)))
    }

    async fn add_points(
        &self,
        user_id: &str,
        amount: Amount,
        description: &str,
        related_deposit_id: Option<&str>,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .balances
            .entry(user_id.to_string())
            .or_insert_with(|| UserPoints::new(user_id))
            .add(amount)?;

        let mut tx = PointTransaction::new(user_id, PointTransactionKind::Earn, amount, description);
        tx.related_deposit_id = related_deposit_id.map(str::to_string);
        tx.expiry_date = expiry_date;
        state.transactions.push(tx);
        Ok(())
    }

    async fn deduct_points(&self, user_id: &str, amount: Amount, description: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let mut balance = state
            .balances
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPoints::new(user_id));
        balance.deduct(amount)?;
        state.balances.insert(user_id.to_string(), balance);
        state.transactions.push(PointTransaction::new(
            user_id,
            PointTransactionKind::Use,
            amount,
            description,
        ));
        Ok(())
    }

    async fn transactions(&self, user_id: &str) -> Result<Vec<PointTransaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_balances(&self) -> Result<Vec<UserPoints>> {
        let state = self.state.read().await;
        Ok(state.balances.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deposit::{DepositStatus, PaymentMethod};
    use crate::error::DepositError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_deposit_store() {
        let store = InMemoryDepositStore::new();
        let deposit = UserDeposit::new("d1", "u1", "m1", amount(dec!(3000)), PaymentMethod::Card);

        store.store(deposit.clone()).await.unwrap();
        let retrieved = store.get("d1").await.unwrap().unwrap();
        assert_eq!(retrieved, deposit);

        assert!(store.get("d2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deposit_store_queries() {
        let store = InMemoryDepositStore::new();
        store
            .store(UserDeposit::new("d1", "u1", "m1", amount(dec!(3000)), PaymentMethod::Card))
            .await
            .unwrap();
        store
            .store(UserDeposit::new("d2", "u2", "m1", amount(dec!(3000)), PaymentMethod::Points))
            .await
            .unwrap();
        store
            .store(UserDeposit::new("d3", "u1", "m2", amount(dec!(2000)), PaymentMethod::KakaoPay))
            .await
            .unwrap();

        let found = store.find_by_user_and_meetup("u1", "m2").await.unwrap().unwrap();
        assert_eq!(found.id, "d3");
        assert!(store.find_by_user_and_meetup("u2", "m2").await.unwrap().is_none());

        assert_eq!(store.list_by_meetup("m1").await.unwrap().len(), 2);
        assert_eq!(store.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_store_overwrites_status() {
        let store = InMemoryDepositStore::new();
        let mut deposit = UserDeposit::new("d1", "u1", "m1", amount(dec!(3000)), PaymentMethod::Card);
        store.store(deposit.clone()).await.unwrap();

        deposit.mark_paid(Some("pay-1".to_string())).unwrap();
        store.store(deposit).await.unwrap();

        let retrieved = store.get("d1").await.unwrap().unwrap();
        assert_eq!(retrieved.status, DepositStatus::Paid);
    }

    #[tokio::test]
    async fn test_ledger_add_and_deduct() {
        let ledger = InMemoryPointsLedger::new();
        assert_eq!(
            ledger.get_user_points("u1").await.unwrap().available_points,
            Decimal::ZERO
        );

        ledger
            .add_points("u1", amount(dec!(3000)), "converted deposit", Some("d1"), None)
            .await
            .unwrap();
        ledger
            .deduct_points("u1", amount(dec!(1000)), "meetup deposit")
            .await
            .unwrap();

        let points = ledger.get_user_points("u1").await.unwrap();
        assert_eq!(points.total_points, dec!(3000));
        assert_eq!(points.available_points, dec!(2000));
        assert_eq!(points.used_points, dec!(1000));

        let txs = ledger.transactions("u1").await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, PointTransactionKind::Earn);
        assert_eq!(txs[0].related_deposit_id.as_deref(), Some("d1"));
        assert_eq!(txs[1].kind, PointTransactionKind::Use);
    }

    #[tokio::test]
    async fn test_ledger_rejects_overdraft() {
        let ledger = InMemoryPointsLedger::new();
        let result = ledger.deduct_points("u1", amount(dec!(1)), "meetup deposit").await;
        assert!(matches!(result, Err(DepositError::InsufficientPoints { .. })));
        assert!(ledger.transactions("u1").await.unwrap().is_empty());
        assert!(ledger.all_balances().await.unwrap().is_empty());
    }
}
