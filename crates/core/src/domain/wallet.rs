use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletEntryId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletDirection {
    Credit,
    Debit,
}

impl WalletDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("insufficient wallet balance")]
    InsufficientBalance,
    #[error("transaction already processed")]
    DuplicateReference,
}

/// One row of the append-only wallet ledger. The user record carries a
/// denormalized running balance; `balance_after` records it at append time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: WalletEntryId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub direction: WalletDirection,
    pub source: String,
    pub description: String,
    pub balance_after: Decimal,
    /// Idempotency key from the upstream payment gateway, when present.
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Computes the balance after applying a ledger movement, rejecting
/// non-positive amounts and overdrafts.
pub fn apply_movement(
    balance: Decimal,
    amount: Decimal,
    direction: WalletDirection,
) -> Result<Decimal, WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::NonPositiveAmount);
    }

    match direction {
        WalletDirection::Credit => Ok(balance + amount),
        WalletDirection::Debit if balance < amount => Err(WalletError::InsufficientBalance),
        WalletDirection::Debit => Ok(balance - amount),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{apply_movement, WalletDirection, WalletError};

    #[test]
    fn credit_raises_the_balance() {
        let balance = apply_movement(Decimal::new(10_000, 2), Decimal::new(2_500, 2), WalletDirection::Credit)
            .expect("credit");
        assert_eq!(balance, Decimal::new(12_500, 2));
    }

    #[test]
    fn debit_requires_sufficient_funds() {
        let error =
            apply_movement(Decimal::new(1_000, 2), Decimal::new(2_500, 2), WalletDirection::Debit)
                .expect_err("overdraft");
        assert_eq!(error, WalletError::InsufficientBalance);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        for direction in [WalletDirection::Credit, WalletDirection::Debit] {
            assert_eq!(
                apply_movement(Decimal::ZERO, Decimal::ZERO, direction),
                Err(WalletError::NonPositiveAmount)
            );
            assert_eq!(
                apply_movement(Decimal::ZERO, Decimal::new(-100, 2), direction),
                Err(WalletError::NonPositiveAmount)
            );
        }
    }
}
