use crate::config::OrderServiceConfig;
use crate::domain::ports::OrderNotifier;
use crate::domain::settlement::SettlementNotice;
use crate::error::{PaymentError, Result};
use crate::infrastructure::gateways::http_client;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Tells the order service how a payment settled:
/// `PUT {base}/orders/{order_id}` with `{"status": "confirmed" | "failed"}`.
pub struct HttpOrderNotifier {
    base_url: String,
    client: reqwest::Client,
}

impl HttpOrderNotifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }

    pub fn from_config(config: &OrderServiceConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl OrderNotifier for HttpOrderNotifier {
    async fn on_payment_settled(&self, notice: &SettlementNotice) -> Result<()> {
        let url = format!("{}/orders/{}", self.base_url, notice.order_id);
        let response = self
            .client
            .put(&url)
            .json(&json!({ "status": notice.outcome }))
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(format!("order service: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::GatewayRejected(format!(
                "order service returned {status} for order {}",
                notice.order_id
            )));
        }
        Ok(())
    }
}
