use super::{http_client, id_of, message_of, read_body, transport_error};
use crate::domain::gateway::{Authorization, GatewayProvider, InitializeRequest, Verification};
use crate::domain::money::Amount;
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

const PROVIDER: GatewayProvider = GatewayProvider::Stripe;

/// Stripe Checkout. Requests are form-encoded with basic auth; the payment
/// reference travels in session and intent metadata so verify can search
/// for it.
pub struct StripeGateway {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl StripeGateway {
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

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> GatewayProvider {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization> {
        let minor_units = request.amount.to_minor_units()?.to_string();
        let currency = request.currency.as_str().to_ascii_lowercase();
        let params: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("success_url", request.callback_url.as_str()),
            ("cancel_url", request.callback_url.as_str()),
            ("customer_email", request.payer_email.as_str()),
            ("client_reference_id", request.reference.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", currency.as_str()),
            ("line_items[0][price_data][unit_amount]", minor_units.as_str()),
            ("line_items[0][price_data][product_data][name]", "Course Payment"),
            ("metadata[reference]", request.reference.as_str()),
            ("payment_intent_data[metadata][reference]", request.reference.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        if !status.is_success() {
            warn!(%status, message = %message_of(&body), "stripe declined checkout session");
            return Err(PaymentError::PaymentInitiationFailed(message_of(&body)));
        }

        let authorization_url = body["url"]
            .as_str()
            .ok_or_else(|| PaymentError::PaymentInitiationFailed("missing checkout url".to_string()))?
            .to_string();
        let access_code = body["id"].as_str().unwrap_or_default().to_string();

        info!(session = %access_code, "stripe checkout session created");
        Ok(Authorization {
            authorization_url,
            access_code,
        })
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<Verification> {
        let query = format!("metadata['reference']:'{reference}'");
        let response = self
            .client
            .get(self.url("/v1/payment_intents/search"))
            .query(&[("query", query.as_str())])
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        let intent = body.pointer("/data/0");
        let succeeded = status.is_success()
            && intent
                .and_then(|i| i.get("status"))
                .and_then(Value::as_str)
                == Some("succeeded");

        Ok(Verification {
            succeeded,
            gateway_transaction_id: id_of(intent.and_then(|i| i.get("id"))),
            raw_response: body,
        })
    }

    #[instrument(skip(self))]
    async fn refund(&self, gateway_transaction_id: &str, amount: Option<Amount>) -> Result<Value> {
        let mut params = vec![("payment_intent", gateway_transaction_id.to_string())];
        if let Some(amount) = amount {
            params.push(("amount", amount.to_minor_units()?.to_string()));
        }

        let response = self
            .client
            .post(self.url("/v1/refunds"))
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let (status, body) = read_body(PROVIDER, response).await?;

        if !status.is_success() {
            return Err(PaymentError::GatewayRejected(message_of(&body)));
        }
        Ok(body)
    }
}
