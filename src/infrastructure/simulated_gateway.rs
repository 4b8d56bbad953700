use crate::domain::money::Amount;
use crate::domain::payment::{PaymentRequest, PaymentResponse};
use crate::domain::ports::PaymentGateway;
use crate::error::{DepositError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Offline payment gateway.
///
/// Approves every payment with a generated id unless switched to decline,
/// and records refunds so tests and the CLI can inspect them. Clones share
/// state.
#[derive(Default, Clone)]
pub struct SimulatedPaymentGateway {
    declining: Arc<AtomicBool>,
    unreachable: Arc<AtomicBool>,
    refunds: Arc<RwLock<Vec<(String, Amount)>>>,
}

impl SimulatedPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payments are answered with `success: false` while set.
    pub fn set_declining(&self, declining: bool) {
        self.declining.store(declining, Ordering::SeqCst);
    }

    /// Every call fails with a transport error while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub async fn refunds(&self) -> Vec<(String, Amount)> {
        self.refunds.read().await.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DepositError::GatewayError(
                "payment server unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn pay_deposit(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        self.check_reachable()?;
        if self.declining.load(Ordering::SeqCst) {
            return Ok(PaymentResponse::declined(format!(
                "payment of {} declined",
                request.amount
            )));
        }
        Ok(PaymentResponse::approved(format!(
            "sim-{}",
            uuid::Uuid::new_v4()
        )))
    }

    async fn refund(&self, payment_id: &str, amount: Amount) -> Result<()> {
        self.check_reachable()?;
        self.refunds
            .write()
            .await
            .push((payment_id.to_string(), amount));
        Ok(())
    }
}
