use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use fixbid_core::domain::wallet::{
    apply_movement, WalletDirection, WalletEntry, WalletEntryId, WalletError,
};
use fixbid_core::domain::UserId;

use crate::repositories::{RepositoryError, WalletRepository};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

/// Append-only wallet ledger over a denormalized per-user balance. External
/// references from the payment gateway make recharges idempotent.
pub struct WalletLedger {
    wallets: Arc<dyn WalletRepository>,
}

impl WalletLedger {
    pub fn new(wallets: Arc<dyn WalletRepository>) -> Self {
        Self { wallets }
    }

    pub async fn record(
        &self,
        user: &UserId,
        amount: Decimal,
        direction: WalletDirection,
        source: &str,
        description: &str,
        external_reference: Option<String>,
    ) -> Result<WalletEntry, LedgerError> {
        if let Some(ref reference) = external_reference {
            if self.wallets.find_by_reference(reference).await?.is_some() {
                return Err(WalletError::DuplicateReference.into());
            }
        }

        let amount = amount.round_dp(2);
        let balance = self.wallets.balance(user).await?;
        let balance_after = apply_movement(balance, amount, direction)?;

        let entry = WalletEntry {
            id: WalletEntryId(Uuid::new_v4().to_string()),
            user_id: user.clone(),
            amount,
            direction,
            source: source.to_string(),
            description: description.to_string(),
            balance_after,
            external_reference,
            created_at: Utc::now(),
        };

        self.wallets.record(entry.clone()).await?;
        Ok(entry)
    }

    pub async fn balance(&self, user: &UserId) -> Result<Decimal, LedgerError> {
        Ok(self.wallets.balance(user).await?)
    }

    pub async fn statement(&self, user: &UserId) -> Result<Vec<WalletEntry>, LedgerError> {
        Ok(self.wallets.entries_for_user(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use fixbid_core::domain::wallet::{WalletDirection, WalletError};
    use fixbid_core::domain::UserId;

    use crate::repositories::InMemoryWalletRepository;

    use super::{LedgerError, WalletLedger};

    fn ledger() -> WalletLedger {
        WalletLedger::new(Arc::new(InMemoryWalletRepository::default()))
    }

    #[tokio::test]
    async fn credits_and_debits_move_the_balance() {
        let ledger = ledger();
        let user = UserId("user-1".to_string());

        ledger
            .record(&user, Decimal::new(500, 0), WalletDirection::Credit, "topup", "Recharge", None)
            .await
            .expect("credit");
        ledger
            .record(&user, Decimal::new(150, 0), WalletDirection::Debit, "booking", "Job fee", None)
            .await
            .expect("debit");

        assert_eq!(ledger.balance(&user).await.expect("balance"), Decimal::new(350, 0));
        assert_eq!(ledger.statement(&user).await.expect("statement").len(), 2);
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_an_entry() {
        let ledger = ledger();
        let user = UserId("user-1".to_string());

        let error = ledger
            .record(&user, Decimal::new(100, 0), WalletDirection::Debit, "booking", "Job fee", None)
            .await
            .expect_err("overdraft");

        assert!(matches!(error, LedgerError::Wallet(WalletError::InsufficientBalance)));
        assert!(ledger.statement(&user).await.expect("statement").is_empty());
    }

    #[tokio::test]
    async fn duplicate_gateway_reference_is_idempotent_rejected() {
        let ledger = ledger();
        let user = UserId("user-1".to_string());

        ledger
            .record(
                &user,
                Decimal::new(500, 0),
                WalletDirection::Credit,
                "recharge",
                "Gateway recharge",
                Some("pay_123".to_string()),
            )
            .await
            .expect("first recharge");

        let error = ledger
            .record(
                &user,
                Decimal::new(500, 0),
                WalletDirection::Credit,
                "recharge",
                "Gateway recharge",
                Some("pay_123".to_string()),
            )
            .await
            .expect_err("replayed recharge");

        assert!(matches!(error, LedgerError::Wallet(WalletError::DuplicateReference)));
        assert_eq!(ledger.balance(&user).await.expect("balance"), Decimal::new(500, 0));
    }
}
