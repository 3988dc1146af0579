use super::AppState;
use super::dto::*;
use super::extract::{JsonBody, PathParam, QueryParams};
use crate::application::ledger::{PaymentDraft, RefundRequest};
use crate::application::orchestrator::{InitiatePayment, PaymentOverride};
use crate::domain::actor::Actor;
use crate::domain::invoice::Invoice;
use crate::domain::money::Amount;
use crate::domain::payment::Payment;
use crate::domain::ports::Page;
use crate::domain::refund::Refund;
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{Wallet, WalletEntryRequest, WalletTransaction};
use crate::error::Result;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

type Shared = State<Arc<AppState>>;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "payment-settlement",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health(State(state): Shared) -> Json<Value> {
    let gateways: Vec<&str> = state.gateways.iter().map(|p| p.name()).collect();
    Json(json!({
        "status": "healthy",
        "gateways": gateways,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn initiate_payment(
    State(state): Shared,
    actor: Actor,
    JsonBody(body): JsonBody<InitiatePaymentBody>,
) -> Result<Json<InitiatePaymentResponse>> {
    let initiated = state
        .orchestrator
        .initiate_payment(
            &actor,
            InitiatePayment {
                order_id: body.order_id,
                amount: Amount::new(body.amount)?,
                method: body.payment_method,
                callback_url: body.callback_url,
                metadata: body.metadata,
                description: body.description,
            },
        )
        .await?;
    Ok(Json(initiated.into()))
}

pub async fn verify_payment(
    State(state): Shared,
    actor: Actor,
    PathParam(payment_id): PathParam<String>,
) -> Result<Json<VerifyPaymentResponse>> {
    let payment = state.orchestrator.verify_payment(&actor, &payment_id).await?;
    Ok(Json(payment.into()))
}

pub async fn create_payment(
    State(state): Shared,
    actor: Actor,
    JsonBody(body): JsonBody<CreatePaymentBody>,
) -> Result<(StatusCode, Json<Payment>)> {
    let payment = state
        .orchestrator
        .ledger()
        .create_payment(
            &actor,
            PaymentDraft {
                order_id: body.order_id,
                amount: Amount::new(body.amount)?,
                method: body.payment_method,
                description: body.description,
                metadata: body.metadata,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_payments(
    State(state): Shared,
    actor: Actor,
    QueryParams(page): QueryParams<Page>,
) -> Result<Json<Vec<Payment>>> {
    Ok(Json(state.orchestrator.ledger().list_payments(&actor, page).await?))
}

pub async fn get_payment(
    State(state): Shared,
    actor: Actor,
    PathParam(payment_id): PathParam<String>,
) -> Result<Json<Payment>> {
    Ok(Json(state.orchestrator.ledger().payment(&actor, &payment_id).await?))
}

pub async fn update_payment(
    State(state): Shared,
    actor: Actor,
    PathParam(payment_id): PathParam<String>,
    JsonBody(update): JsonBody<PaymentOverride>,
) -> Result<Json<Payment>> {
    Ok(Json(
        state
            .orchestrator
            .override_payment(&actor, &payment_id, update)
            .await?,
    ))
}

pub async fn payment_transactions(
    State(state): Shared,
    actor: Actor,
    PathParam(payment_id): PathParam<String>,
) -> Result<Json<Vec<Transaction>>> {
    Ok(Json(
        state
            .orchestrator
            .ledger()
            .transactions(&actor, &payment_id)
            .await?,
    ))
}

pub async fn payment_refunds(
    State(state): Shared,
    actor: Actor,
    PathParam(payment_id): PathParam<String>,
) -> Result<Json<Vec<Refund>>> {
    Ok(Json(
        state
            .orchestrator
            .ledger()
            .payment_refunds(&actor, &payment_id)
            .await?,
    ))
}

pub async fn create_refund(
    State(state): Shared,
    actor: Actor,
    JsonBody(body): JsonBody<CreateRefundBody>,
) -> Result<(StatusCode, Json<Refund>)> {
    let refund = state
        .orchestrator
        .ledger()
        .request_refund(
            &actor,
            RefundRequest {
                payment_reference: body.payment_id,
                amount: Amount::new(body.amount)?,
                reason: body.reason,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(refund)))
}

pub async fn list_refunds(
    State(state): Shared,
    actor: Actor,
    QueryParams(page): QueryParams<Page>,
) -> Result<Json<Vec<Refund>>> {
    Ok(Json(state.orchestrator.ledger().list_refunds(&actor, page).await?))
}

pub async fn process_refund(
    State(state): Shared,
    actor: Actor,
    PathParam(refund_id): PathParam<String>,
    JsonBody(body): JsonBody<ProcessRefundBody>,
) -> Result<Json<Refund>> {
    Ok(Json(
        state
            .orchestrator
            .process_refund(&actor, &refund_id, body.action)
            .await?,
    ))
}

pub async fn create_invoice(
    State(state): Shared,
    actor: Actor,
    JsonBody(body): JsonBody<CreateInvoiceBody>,
) -> Result<(StatusCode, Json<Invoice>)> {
    let invoice = state
        .orchestrator
        .ledger()
        .create_invoice(&actor, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): Shared,
    actor: Actor,
    QueryParams(page): QueryParams<Page>,
) -> Result<Json<Vec<Invoice>>> {
    Ok(Json(state.orchestrator.ledger().list_invoices(&actor, page).await?))
}

pub async fn get_invoice(
    State(state): Shared,
    actor: Actor,
    PathParam(invoice_number): PathParam<String>,
) -> Result<Json<Invoice>> {
    Ok(Json(
        state
            .orchestrator
            .ledger()
            .invoice(&actor, &invoice_number)
            .await?,
    ))
}

pub async fn get_wallet(State(state): Shared, actor: Actor) -> Result<Json<Wallet>> {
    Ok(Json(state.orchestrator.ledger().wallet(&actor).await?))
}

pub async fn wallet_transactions(
    State(state): Shared,
    actor: Actor,
    QueryParams(page): QueryParams<Page>,
) -> Result<Json<Vec<WalletTransaction>>> {
    Ok(Json(
        state
            .orchestrator
            .ledger()
            .wallet_entries(&actor, page)
            .await?,
    ))
}

pub async fn post_wallet_entry(
    State(state): Shared,
    actor: Actor,
    PathParam(payer_id): PathParam<u64>,
    JsonBody(body): JsonBody<WalletEntryBody>,
) -> Result<(StatusCode, Json<WalletEntryResponse>)> {
    let (wallet, transaction) = state
        .orchestrator
        .ledger()
        .post_wallet_entry(
            &actor,
            payer_id,
            WalletEntryRequest {
                kind: body.kind,
                amount: Amount::new(body.amount)?,
                description: body.description,
                reference: body.reference,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(WalletEntryResponse { wallet, transaction }),
    ))
}
