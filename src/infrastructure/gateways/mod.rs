//! HTTP clients for the supported payment processors and the registry that
//! picks one per payment method.

pub mod flutterwave;
pub mod paystack;
pub mod stripe;

pub use flutterwave::FlutterwaveGateway;
pub use paystack::PaystackGateway;
pub use stripe::StripeGateway;

use crate::config::GatewaysConfig;
use crate::domain::gateway::GatewayProvider;
use crate::domain::payment::PaymentMethod;
use crate::domain::ports::GatewayBox;
use crate::error::{PaymentError, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Provider clients keyed by provider, built once from configuration.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayProvider, GatewayBox>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a client for every enabled provider.
    pub fn from_config(config: &GatewaysConfig) -> Result<Self> {
        let mut registry = Self::new();
        for provider in config.enabled_providers()? {
            let settings = config.provider(provider);
            let base_url = config.base_url(provider);
            let gateway: GatewayBox = match provider {
                GatewayProvider::Paystack => Arc::new(PaystackGateway::new(
                    base_url,
                    settings.secret_key.clone(),
                    config.timeout(),
                )?),
                GatewayProvider::Flutterwave => Arc::new(FlutterwaveGateway::new(
                    base_url,
                    settings.secret_key.clone(),
                    config.timeout(),
                )?),
                GatewayProvider::Stripe => Arc::new(StripeGateway::new(
                    base_url,
                    settings.secret_key.clone(),
                    config.timeout(),
                )?),
            };
            tracing::info!(%provider, "payment gateway enabled");
            registry = registry.with(gateway);
        }
        Ok(registry)
    }

    /// Registers `gateway` under its own provider, replacing any previous one.
    pub fn with(mut self, gateway: GatewayBox) -> Self {
        self.gateways.insert(gateway.provider(), gateway);
        self
    }

    pub fn get(&self, provider: GatewayProvider) -> Result<GatewayBox> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| PaymentError::UnsupportedGateway(provider.name().to_string()))
    }

    /// The gateway that settles `method`.
    pub fn for_method(&self, method: PaymentMethod) -> Result<GatewayBox> {
        self.get(method.require_provider()?)
    }

    pub fn providers(&self) -> Vec<GatewayProvider> {
        let mut providers: Vec<_> = self.gateways.keys().copied().collect();
        providers.sort_by_key(|p| p.name());
        providers
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PaymentError::Config(format!("building HTTP client: {e}")))
}

/// Transport failures are always worth retrying; anything else means the
/// provider answered with something we cannot use.
pub(crate) fn transport_error(provider: GatewayProvider, err: reqwest::Error) -> PaymentError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        PaymentError::GatewayUnavailable(format!("{provider}: {err}"))
    } else {
        PaymentError::GatewayRejected(format!("{provider}: {err}"))
    }
}

/// Reads a provider response as JSON. Server errors map to
/// `GatewayUnavailable`; client errors are returned with their body so the
/// caller can decide.
pub(crate) async fn read_body(
    provider: GatewayProvider,
    response: reqwest::Response,
) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;
    if status.is_server_error() {
        return Err(PaymentError::GatewayUnavailable(format!(
            "{provider} returned {status}"
        )));
    }
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

/// The `message` field providers put on their envelopes, if any.
pub(crate) fn message_of(body: &Value) -> String {
    body.get("message")
        .or_else(|| body.pointer("/error/message"))
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string()
}

/// Renders a JSON scalar id (providers mix numbers and strings).
pub(crate) fn id_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
