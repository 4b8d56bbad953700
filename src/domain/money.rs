use crate::error::DepositError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive amount of won (or points, which are 1:1 with won).
///
/// Deposits, payments and point credits are always expressed through this
/// type so a zero or negative deposit can never enter the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Deposit charged when a meetup category has no policy of its own.
    pub const DEFAULT_DEPOSIT: Self = Self(rust_decimal_macros::dec!(3000));

    /// Largest accepted amount. Sums of bounded amounts stay far below
    /// `Decimal::MAX`.
    pub const MAX: Self = Self(rust_decimal_macros::dec!(1000000000000));

    pub fn new(value: Decimal) -> Result<Self, DepositError> {
        if value <= Decimal::ZERO {
            return Err(DepositError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value > Self::MAX.0 {
            return Err(DepositError::ValidationError(format!(
                "Amount must not exceed {}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DepositError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// A rate in `[0, 1]` applied to a deposit amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const FULL: Self = Self(Decimal::ONE);

    pub fn new(value: Decimal) -> Result<Self, DepositError> {
        if value >= Decimal::ZERO && value <= Decimal::ONE {
            Ok(Self(value))
        } else {
            Err(DepositError::InvalidPolicy(format!(
                "rate {} is outside [0, 1]",
                value
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Applies the rate to an amount. The result never exceeds the amount.
    pub fn apply(&self, amount: Amount) -> Decimal {
        (amount.value() * self.0).normalize()
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = DepositError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(2000)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0)),
            Err(DepositError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1)),
            Err(DepositError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_upper_bound() {
        assert!(Amount::new(dec!(1000000000000)).is_ok());
        assert!(matches!(
            Amount::new(dec!(1000000000000.01)),
            Err(DepositError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(Decimal::MAX),
            Err(DepositError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(Rate::new(dec!(0)).is_ok());
        assert!(Rate::new(dec!(1)).is_ok());
        assert!(Rate::new(dec!(0.6)).is_ok());
        assert!(matches!(
            Rate::new(dec!(1.01)),
            Err(DepositError::InvalidPolicy(_))
        ));
        assert!(matches!(
            Rate::new(dec!(-0.1)),
            Err(DepositError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_rate_apply() {
        let amount = Amount::new(dec!(2000)).unwrap();
        assert_eq!(Rate::new(dec!(0.6)).unwrap().apply(amount), dec!(1200));
        assert_eq!(Rate::FULL.apply(amount), dec!(2000));
        assert_eq!(Rate::ZERO.apply(amount), Decimal::ZERO);
    }

    #[test]
    fn test_amount_deserialization_rejects_zero() {
        let parsed: Result<Amount, _> = serde_json::from_str("0");
        assert!(parsed.is_err());
        let parsed: Amount = serde_json::from_str("3000").unwrap();
        assert_eq!(parsed.value(), dec!(3000));
    }
}
