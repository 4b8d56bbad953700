use super::money::Amount;
use crate::error::DepositError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalogue entry describing the deposit required for a meetup category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositPolicy {
    pub id: String,
    pub name: String,
    pub amount: Amount,
    pub description: String,
    pub is_default: bool,
}

impl DepositPolicy {
    /// The system-wide default deposit.
    pub fn default_policy() -> Self {
        Self {
            id: "default".to_string(),
            name: "기본 약속금".to_string(),
            amount: Amount::DEFAULT_DEPOSIT,
            description: "노쇼 방지를 위한 기본 약속금".to_string(),
            is_default: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Paid,
    Refunded,
    Converted,
    Forfeited,
    Failed,
}

impl DepositStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositStatus::Refunded
                | DepositStatus::Converted
                | DepositStatus::Forfeited
                | DepositStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: DepositStatus) -> bool {
        matches!(
            (self, next),
            (DepositStatus::Pending, DepositStatus::Paid)
                | (DepositStatus::Pending, DepositStatus::Failed)
                | (DepositStatus::Paid, DepositStatus::Refunded)
                | (DepositStatus::Paid, DepositStatus::Converted)
                | (DepositStatus::Paid, DepositStatus::Forfeited)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Paid => "paid",
            DepositStatus::Refunded => "refunded",
            DepositStatus::Converted => "converted",
            DepositStatus::Forfeited => "forfeited",
            DepositStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    KakaoPay,
    Points,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    NormalAttendance,
    NoShow,
    UserCancelled,
    MeetupCancelled,
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefundReason::NormalAttendance => "normal_attendance",
            RefundReason::NoShow => "no_show",
            RefundReason::UserCancelled => "user_cancelled",
            RefundReason::MeetupCancelled => "meetup_cancelled",
        })
    }
}

/// A deposit a user paid (or tried to pay) to join a meetup.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UserDeposit {
    pub id: String,
    pub user_id: String,
    pub meetup_id: String,
    pub amount: Amount,
    pub status: DepositStatus,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<RefundReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserDeposit {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        meetup_id: impl Into<String>,
        amount: Amount,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            meetup_id: meetup_id.into(),
            amount,
            status: DepositStatus::Pending,
            payment_method,
            payment_id: None,
            paid_at: None,
            refunded_at: None,
            refund_amount: None,
            refund_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the deposit to `next`, rejecting any transition that would go
    /// backwards or leave a terminal state.
    pub fn transition(&mut self, next: DepositStatus) -> Result<(), DepositError> {
        if !self.status.can_transition_to(next) {
            return Err(DepositError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Ordering key used when a user has several deposits for one meetup:
    /// a deposit that did not fail beats a failed one, then the newest wins.
    pub fn precedence(&self) -> (bool, DateTime<Utc>) {
        (self.status != DepositStatus::Failed, self.created_at)
    }

    /// Marks a pending deposit as paid.
    pub fn mark_paid(&mut self, payment_id: Option<String>) -> Result<(), DepositError> {
        self.transition(DepositStatus::Paid)?;
        self.payment_id = payment_id;
        self.paid_at = Some(self.updated_at);
        Ok(())
    }

    /// Closes a paid deposit with the settled amount and reason.
    ///
    /// `next` must be one of the settlement states (refunded, converted or
    /// forfeited). The settled amount is capped by the deposit amount.
    pub fn settle(
        &mut self,
        next: DepositStatus,
        amount: Decimal,
        reason: RefundReason,
    ) -> Result<(), DepositError> {
        if amount < Decimal::ZERO || amount > self.amount.value() {
            return Err(DepositError::ValidationError(format!(
                "settlement of {} is outside the deposit amount {}",
                amount, self.amount
            )));
        }
        self.transition(next)?;
        self.refund_amount = Some(amount);
        self.refund_reason = Some(reason);
        self.refunded_at = Some(self.updated_at);
        Ok(())
    }
}
