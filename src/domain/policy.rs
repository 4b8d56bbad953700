//! Refund policy table and the pure refund calculation over it.
//!
//! The table has four branches, one per settlement scenario. Cancellation
//! refunds are driven by an ordered list of time-before-meetup tiers; the
//! list is validated on construction so the first tier whose threshold is
//! met is always the most generous one that applies.

use super::deposit::{RefundReason, UserDeposit};
use super::money::{Amount, Rate};
use crate::error::{DepositError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum RefundScenario {
    NormalAttendanceWithReview,
    NormalAttendanceWithoutReview,
    NoShow,
    Cancellation,
}

impl RefundScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundScenario::NormalAttendanceWithReview => "normal_attendance_with_review",
            RefundScenario::NormalAttendanceWithoutReview => "normal_attendance_without_review",
            RefundScenario::NoShow => "no_show",
            RefundScenario::Cancellation => "cancellation",
        }
    }
}

impl FromStr for RefundScenario {
    type Err = DepositError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "normal_attendance_with_review" => Ok(RefundScenario::NormalAttendanceWithReview),
            "normal_attendance_without_review" => {
                Ok(RefundScenario::NormalAttendanceWithoutReview)
            }
            "no_show" => Ok(RefundScenario::NoShow),
            "cancellation" => Ok(RefundScenario::Cancellation),
            other => Err(DepositError::UnknownScenario(other.to_string())),
        }
    }
}

impl fmt::Display for RefundScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attended and left a review: refunded automatically.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReviewRefundRule {
    pub refund_rate: Rate,
    pub auto_refund_hours: u32,
}

/// Attended without a review: the deposit becomes points instead of cash.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PointConversionRule {
    pub conversion_rate: Rate,
    pub conversion_days: u32,
}

/// Did not show up: the deposit is forfeited and optionally shared out.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NoShowRule {
    pub refund_rate: Rate,
    pub redistribute_to_attendees: bool,
}

/// Refund rate granted when cancelling at least `hours` before the meetup.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct CancellationTier {
    pub hours: Decimal,
    pub refund_rate: Rate,
}

/// Cancellation tiers in strictly descending `hours` order. Never empty.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(try_from = "Vec<CancellationTier>", into = "Vec<CancellationTier>")]
pub struct CancellationSchedule(Vec<CancellationTier>);

impl CancellationSchedule {
    pub fn new(tiers: Vec<CancellationTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(DepositError::InvalidPolicy(
                "cancellation schedule needs at least one tier".to_string(),
            ));
        }
        if let Some(tier) = tiers.iter().find(|t| t.hours < Decimal::ZERO) {
            return Err(DepositError::InvalidPolicy(format!(
                "cancellation tier hours must not be negative, got {}",
                tier.hours
            )));
        }
        if tiers.windows(2).any(|pair| pair[0].hours <= pair[1].hours) {
            return Err(DepositError::InvalidPolicy(
                "cancellation tiers must be listed in strictly descending hours".to_string(),
            ));
        }
        Ok(Self(tiers))
    }

    pub fn tiers(&self) -> &[CancellationTier] {
        &self.0
    }

    /// First tier whose threshold is met, or the strictest tier when the
    /// cancellation came later than every threshold.
    pub fn tier_for(&self, hours_before_meetup: Decimal) -> CancellationTier {
        self.0
            .iter()
            .find(|tier| tier.hours <= hours_before_meetup)
            .or_else(|| self.0.last())
            .copied()
            .unwrap_or(CancellationTier {
                hours: Decimal::ZERO,
                refund_rate: Rate::ZERO,
            })
    }
}

impl TryFrom<Vec<CancellationTier>> for CancellationSchedule {
    type Error = DepositError;

    fn try_from(tiers: Vec<CancellationTier>) -> Result<Self> {
        Self::new(tiers)
    }
}

impl From<CancellationSchedule> for Vec<CancellationTier> {
    fn from(schedule: CancellationSchedule) -> Self {
        schedule.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefundCalculation {
    pub refund_amount: Decimal,
    pub reason: RefundReason,
    pub refund_rate: Rate,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RefundPolicy {
    pub with_review: ReviewRefundRule,
    pub without_review: PointConversionRule,
    pub no_show: NoShowRule,
    pub cancellation: CancellationSchedule,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        let tier = |hours: Decimal, rate: Decimal| CancellationTier {
            hours,
            refund_rate: Rate::new(rate).unwrap_or(Rate::ZERO),
        };
        Self {
            with_review: ReviewRefundRule {
                refund_rate: Rate::FULL,
                auto_refund_hours: 24,
            },
            without_review: PointConversionRule {
                conversion_rate: Rate::FULL,
                conversion_days: 2,
            },
            no_show: NoShowRule {
                refund_rate: Rate::ZERO,
                redistribute_to_attendees: true,
            },
            cancellation: CancellationSchedule(vec![
                tier(dec!(1.0), dec!(1.0)),
                tier(dec!(0.5), dec!(0.6)),
                tier(dec!(0.33), dec!(0.3)),
                tier(dec!(0.17), dec!(0.0)),
            ]),
        }
    }
}

impl RefundPolicy {
    /// Computes the cash refund owed for `deposit` under `scenario`.
    ///
    /// `hours_before_meetup` is only read for cancellations, where it is
    /// required and must not be negative.
    pub fn calculate_refund_amount(
        &self,
        deposit: &UserDeposit,
        scenario: RefundScenario,
        hours_before_meetup: Option<Decimal>,
    ) -> Result<RefundCalculation> {
        let calculation = match scenario {
            RefundScenario::NormalAttendanceWithReview => RefundCalculation {
                refund_amount: self.with_review.refund_rate.apply(deposit.amount),
                reason: RefundReason::NormalAttendance,
                refund_rate: self.with_review.refund_rate,
            },
            RefundScenario::NormalAttendanceWithoutReview => RefundCalculation {
                refund_amount: Decimal::ZERO,
                reason: RefundReason::NormalAttendance,
                refund_rate: Rate::ZERO,
            },
            // Reason kept as `normal_attendance`; the settlement path records
            // `no_show` on the deposit itself.
            RefundScenario::NoShow => RefundCalculation {
                refund_amount: self.no_show.refund_rate.apply(deposit.amount),
                reason: RefundReason::NormalAttendance,
                refund_rate: self.no_show.refund_rate,
            },
            RefundScenario::Cancellation => {
                let hours = hours_before_meetup.ok_or(DepositError::MissingCancellationTiming)?;
                let tier = self.cancellation_tier(hours)?;
                RefundCalculation {
                    refund_amount: tier.refund_rate.apply(deposit.amount),
                    reason: RefundReason::UserCancelled,
                    refund_rate: tier.refund_rate,
                }
            }
        };
        Ok(calculation)
    }

    pub fn cancellation_tier(&self, hours_before_meetup: Decimal) -> Result<CancellationTier> {
        if hours_before_meetup < Decimal::ZERO {
            return Err(DepositError::ValidationError(format!(
                "hours_before_meetup must not be negative, got {}",
                hours_before_meetup
            )));
        }
        Ok(self.cancellation.tier_for(hours_before_meetup))
    }

    /// Points credited when an attended deposit is converted instead of refunded.
    pub fn conversion_points(&self, amount: Amount) -> Decimal {
        self.without_review.conversion_rate.apply(amount)
    }
}
