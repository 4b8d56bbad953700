use super::money::Amount;
use crate::error::DepositError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate point balance of a user.
///
/// `total_points` counts everything ever earned, `available_points` is what
/// can still be spent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UserPoints {
    pub user_id: String,
    pub total_points: Decimal,
    pub available_points: Decimal,
    pub used_points: Decimal,
    pub expired_points: Decimal,
    pub last_updated_at: DateTime<Utc>,
}

impl UserPoints {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            total_points: Decimal::ZERO,
            available_points: Decimal::ZERO,
            used_points: Decimal::ZERO,
            expired_points: Decimal::ZERO,
            last_updated_at: Utc::now(),
        }
    }

    /// Credits earned points. Fails without changing the balance when the
    /// totals would overflow.
    pub fn add(&mut self, amount: Amount) -> Result<(), DepositError> {
        let overflow = || {
            DepositError::ValidationError(format!(
                "crediting {} points to {} overflows the balance",
                amount, self.user_id
            ))
        };
        let total = self
            .total_points
            .checked_add(amount.value())
            .ok_or_else(overflow)?;
        let available = self
            .available_points
            .checked_add(amount.value())
            .ok_or_else(overflow)?;
        self.total_points = total;
        self.available_points = available;
        self.last_updated_at = Utc::now();
        Ok(())
    }

    /// Spends points if the available balance covers `amount`.
    pub fn deduct(&mut self, amount: Amount) -> Result<(), DepositError> {
        if self.available_points < amount.value() {
            return Err(DepositError::InsufficientPoints {
                user_id: self.user_id.clone(),
                requested: amount.value(),
                available: self.available_points,
            });
        }
        self.available_points -= amount.value();
        self.used_points += amount.value();
        self.last_updated_at = Utc::now();
        Ok(())
    }

    pub fn has_available(&self, amount: Amount) -> bool {
        self.available_points >= amount.value()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PointTransactionKind {
    Earn,
    Use,
}

/// Append-only ledger entry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PointTransaction {
    pub id: String,
    pub user_id: String,
    pub kind: PointTransactionKind,
    pub amount: Amount,
    pub description: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub related_deposit_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PointTransaction {
    pub fn new(
        user_id: impl Into<String>,
        kind: PointTransactionKind,
        amount: Amount,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind,
            amount,
            description: description.into(),
            expiry_date: None,
            related_deposit_id: None,
            created_at: Utc::now(),
        }
    }
}
