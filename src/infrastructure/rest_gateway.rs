use crate::config::GatewaySettings;
use crate::domain::money::Amount;
use crate::domain::payment::{PaymentRequest, PaymentResponse};
use crate::domain::ports::PaymentGateway;
use crate::error::{DepositError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundBody<'a> {
    payment_id: &'a str,
    amount: Amount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundReply {
    success: bool,
    #[serde(default)]
    error_message: Option<String>,
}

/// Payment gateway backed by the app's payment server.
///
/// Deposits are collected with `POST {base_url}/deposits/payment` and
/// returned with `POST {base_url}/deposits/refund`, both JSON.
pub struct RestPaymentGateway {
    client: Client,
    base_url: String,
}

impl RestPaymentGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PaymentGateway for RestPaymentGateway {
    async fn pay_deposit(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        let url = self.url("/deposits/payment");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                DepositError::from(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, "payment server rejected deposit payment");
            return Ok(PaymentResponse::declined(format!(
                "payment server responded with {}",
                status
            )));
        }

        Ok(response.json::<PaymentResponse>().await?)
    }

    async fn refund(&self, payment_id: &str, amount: Amount) -> Result<()> {
        let url = self.url("/deposits/refund");
        let reply: RefundReply = self
            .client
            .post(&url)
            .json(&RefundBody { payment_id, amount })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                DepositError::from(e)
            })?
            .error_for_status()?
            .json()
            .await?;

        if reply.success {
            Ok(())
        } else {
            Err(DepositError::GatewayError(
                reply
                    .error_message
                    .unwrap_or_else(|| "refund rejected".to_string()),
            ))
        }
    }
}
