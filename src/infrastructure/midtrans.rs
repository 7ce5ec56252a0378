use super::http_backend::endpoint_url;
use crate::config::MidtransConfig;
use crate::domain::gateway::{FraudStatus, GatewayStatus, TransactionStatus};
use crate::domain::ports::PaymentGateway;
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Body of `GET /v2/{order_id}/status`.
///
/// The gateway answers HTTP 200 even for unknown orders and reports the real
/// outcome in `status_code`.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: String,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    transaction_status: Option<String>,
    #[serde(default)]
    fraud_status: Option<FraudStatus>,
    #[serde(default)]
    gross_amount: Option<Decimal>,
}

/// Status client for a Midtrans-style payment gateway.
pub struct MidtransGateway {
    config: MidtransConfig,
    client: reqwest::Client,
}

impl MidtransGateway {
    pub fn new(config: MidtransConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MidtransGateway {
    fn name(&self) -> &'static str {
        "midtrans"
    }

    async fn fetch_status(&self, order_id: &str) -> Result<GatewayStatus> {
        let url = endpoint_url(
            self.config.base_url.trim_end_matches('/'),
            &["v2", order_id, "status"],
        )?;

        let resp = self
            .client
            .get(url)
            .basic_auth(&self.config.server_key, Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await?;

        let http_status = resp.status();
        if !http_status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReconcileError::GatewayError(format!(
                "HTTP_{}: {}",
                http_status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: StatusResponse = resp.json().await?;
        let Some(transaction_status) = body.transaction_status else {
            return Err(ReconcileError::GatewayError(format!(
                "{} {}",
                body.status_code,
                body.status_message.unwrap_or_default()
            )));
        };

        tracing::debug!(
            order_id,
            status_code = %body.status_code,
            transaction_status = %transaction_status,
            "gateway status fetched"
        );

        Ok(GatewayStatus {
            order_id: body.order_id.unwrap_or_else(|| order_id.to_string()),
            transaction_status: TransactionStatus::from(transaction_status),
            fraud_status: body.fraud_status,
            status_code: Some(body.status_code),
            gross_amount: body.gross_amount,
        })
    }
}
