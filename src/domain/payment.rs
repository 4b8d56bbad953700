use super::deposit::{PaymentMethod, RefundReason};
use super::money::Amount;
use super::policy::RefundScenario;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to collect a meetup deposit from a user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub user_id: String,
    pub meetup_id: String,
    pub amount: Amount,
    pub method: PaymentMethod,
}

/// Outcome of a payment attempt. Declines are reported here, not as errors.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// External payment page (e.g. KakaoPay) the client must open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PaymentResponse {
    pub fn approved(payment_id: impl Into<String>) -> Self {
        Self {
            success: true,
            payment_id: Some(payment_id.into()),
            ..Default::default()
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub deposit_id: String,
    pub scenario: RefundScenario,
    #[serde(default)]
    pub hours_before_meetup: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub success: bool,
    pub refund_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RefundReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RefundResponse {
    pub fn settled(refund_amount: Decimal, reason: RefundReason) -> Self {
        Self {
            success: true,
            refund_amount,
            reason: Some(reason),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            refund_amount: Decimal::ZERO,
            reason: None,
            error_message: Some(message.into()),
        }
    }
}

/// Result of sharing forfeited no-show deposits among a meetup's attendees.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NoShowSettlement {
    pub meetup_id: String,
    pub forfeited_total: Decimal,
    pub per_attendee: Decimal,
    pub credited_attendees: Vec<String>,
    /// Points lost to rounding each share down to a whole point.
    pub undistributed: Decimal,
}

impl NoShowSettlement {
    pub fn empty(meetup_id: impl Into<String>) -> Self {
        Self {
            meetup_id: meetup_id.into(),
            forfeited_total: Decimal::ZERO,
            per_attendee: Decimal::ZERO,
            credited_attendees: Vec::new(),
            undistributed: Decimal::ZERO,
        }
    }
}
