use super::deposit::UserDeposit;
use super::money::Amount;
use super::payment::{PaymentRequest, PaymentResponse};
use super::points::{PointTransaction, UserPoints};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait DepositStore: Send + Sync {
    async fn store(&self, deposit: UserDeposit) -> Result<()>;
    async fn get(&self, deposit_id: &str) -> Result<Option<UserDeposit>>;
    async fn find_by_user_and_meetup(
        &self,
        user_id: &str,
        meetup_id: &str,
    ) -> Result<Option<UserDeposit>>;
    async fn list_by_meetup(&self, meetup_id: &str) -> Result<Vec<UserDeposit>>;
    async fn get_all(&self) -> Result<Vec<UserDeposit>>;
}

#[async_trait]
pub trait PointsLedger: Send + Sync {
    /// Balance of `user_id`; users without history have a zero balance.
    async fn get_user_points(&self, user_id: &str) -> Result<UserPoints>;
    async fn add_points(
        &self,
        user_id: &str,
        amount: Amount,
        description: &str,
        related_deposit_id: Option<&str>,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Result<()>;
    /// Fails with `InsufficientPoints` without touching the balance when short.
    async fn deduct_points(&self, user_id: &str, amount: Amount, description: &str) -> Result<()>;
    async fn transactions(&self, user_id: &str) -> Result<Vec<PointTransaction>>;
    async fn all_balances(&self) -> Result<Vec<UserPoints>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn pay_deposit(&self, request: &PaymentRequest) -> Result<PaymentResponse>;
    async fn refund(&self, payment_id: &str, amount: Amount) -> Result<()>;
}

pub type DepositStoreBox = Box<dyn DepositStore>;
pub type PointsLedgerBox = Box<dyn PointsLedger>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
