use super::{http_client, id_of, message_of, read_body, transport_error};
use crate::domain::gateway::{Authorization, GatewayProvider, InitializeRequest, Verification};
use crate::domain::money::Amount;
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, instrument, warn};

const PROVIDER: GatewayProvider = GatewayProvider::Flutterwave;

/// Flutterwave v3 standard checkout. Amounts are sent in major units.
pub struct FlutterwaveGateway {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl FlutterwaveGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            client: http_client(timeout)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn envelope_ok(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("success")
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn provider(&self) -> GatewayProvider {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization> {
        let payload = json!({
            "tx_ref": request.reference,
            "amount": PROVIDER.encode_amount(request.amount)?,
            "currency": request.currency.as_str(),
            "redirect_url": request.callback_url,
            "customer": { "email": request.payer_email },
            "meta": request.metadata.clone().unwrap_or_else(|| json!({})),
        });

        let response = self
            .client
            .post(self.url("/payments"))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        if !status.is_success() || !envelope_ok(&body) {
            warn!(%status, message = %message_of(&body), "flutterwave declined initialization");
            return Err(PaymentError::PaymentInitiationFailed(message_of(&body)));
        }

        let authorization_url = body
            .pointer("/data/link")
            .and_then(Value::as_str)
            .ok_or_else(|| PaymentError::PaymentInitiationFailed("missing payment link".to_string()))?
            .to_string();

        info!("flutterwave payment link created");
        // Hosted links carry no separate access code.
        Ok(Authorization {
            authorization_url,
            access_code: String::new(),
        })
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<Verification> {
        let response = self
            .client
            .get(self.url("/transactions/verify_by_reference"))
            .query(&[("tx_ref", reference)])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        let succeeded = status.is_success()
            && envelope_ok(&body)
            && body.pointer("/data/status").and_then(Value::as_str) == Some("successful");

        Ok(Verification {
            succeeded,
            gateway_transaction_id: id_of(body.pointer("/data/id")),
            raw_response: body,
        })
    }

    #[instrument(skip(self))]
    async fn refund(&self, gateway_transaction_id: &str, amount: Option<Amount>) -> Result<Value> {
        let payload = match amount {
            Some(amount) => json!({ "amount": PROVIDER.encode_amount(amount)? }),
            None => json!({}),
        };

        let response = self
            .client
            .post(self.url(&format!("/transactions/{gateway_transaction_id}/refund")))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        if !status.is_success() || !envelope_ok(&body) {
            return Err(PaymentError::GatewayRejected(message_of(&body)));
        }
        Ok(body)
    }
}
