use super::{http_client, id_of, message_of, read_body, transport_error};
use crate::domain::gateway::{Authorization, GatewayProvider, InitializeRequest, Verification};
use crate::domain::money::Amount;
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, instrument, warn};

const PROVIDER: GatewayProvider = GatewayProvider::Paystack;

/// Paystack's REST API. Amounts go out in kobo and every response is wrapped
/// in a `{status, message, data}` envelope.
pub struct PaystackGateway {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl PaystackGateway {
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
    body.get("status").and_then(Value::as_bool).unwrap_or(false)
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn provider(&self) -> GatewayProvider {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization> {
        let payload = json!({
            "email": request.payer_email,
            "amount": PROVIDER.encode_amount(request.amount)?,
            "currency": request.currency.as_str(),
            "reference": request.reference,
            "callback_url": request.callback_url,
            "metadata": request.metadata.clone().unwrap_or_else(|| json!({})),
        });

        let response = self
            .client
            .post(self.url("/transaction/initialize"))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        if !status.is_success() || !envelope_ok(&body) {
            warn!(%status, message = %message_of(&body), "paystack declined initialization");
            return Err(PaymentError::PaymentInitiationFailed(message_of(&body)));
        }

        let data = &body["data"];
        let authorization_url = data["authorization_url"]
            .as_str()
            .ok_or_else(|| PaymentError::PaymentInitiationFailed("missing authorization_url".to_string()))?
            .to_string();
        let access_code = data["access_code"].as_str().unwrap_or_default().to_string();

        info!("paystack transaction initialized");
        Ok(Authorization {
            authorization_url,
            access_code,
        })
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<Verification> {
        let response = self
            .client
            .get(self.url(&format!("/transaction/verify/{reference}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        let succeeded = status.is_success()
            && envelope_ok(&body)
            && body.pointer("/data/status").and_then(Value::as_str) == Some("success");

        Ok(Verification {
            succeeded,
            gateway_transaction_id: id_of(body.pointer("/data/id")),
            raw_response: body,
        })
    }

    #[instrument(skip(self))]
    async fn refund(&self, gateway_transaction_id: &str, amount: Option<Amount>) -> Result<Value> {
        let mut payload = json!({ "transaction": gateway_transaction_id });
        if let Some(amount) = amount {
            payload["amount"] = PROVIDER.encode_amount(amount)?;
        }

        let response = self
            .client
            .post(self.url("/refund"))
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
