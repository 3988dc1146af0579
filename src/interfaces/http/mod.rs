//! HTTP API. Handlers are thin: they extract the caller and the body, call
//! the orchestrator or the ledger, and let `PaymentError` pick the status.

pub mod actor;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;

use crate::application::orchestrator::SettlementOrchestrator;
use crate::domain::gateway::GatewayProvider;
use axum::Router;
use axum::routing::{get, post, put};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub orchestrator: SettlementOrchestrator,
    /// Providers with a configured client, for the health report.
    pub gateways: Vec<GatewayProvider>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/payments/initiate", post(handlers::initiate_payment))
        .route("/payments/verify/{payment_id}", get(handlers::verify_payment))
        .route(
            "/payments",
            post(handlers::create_payment).get(handlers::list_payments),
        )
        .route(
            "/payments/{payment_id}",
            get(handlers::get_payment).put(handlers::update_payment),
        )
        .route(
            "/payments/{payment_id}/transactions",
            get(handlers::payment_transactions),
        )
        .route(
            "/payments/{payment_id}/refunds",
            get(handlers::payment_refunds),
        )
        .route(
            "/refunds",
            post(handlers::create_refund).get(handlers::list_refunds),
        )
        .route("/refunds/{refund_id}", put(handlers::process_refund))
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route("/invoices/{invoice_number}", get(handlers::get_invoice))
        .route("/wallet", get(handlers::get_wallet))
        .route("/wallet/transactions", get(handlers::wallet_transactions))
        .route(
            "/wallets/{payer_id}/transactions",
            post(handlers::post_wallet_entry),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
