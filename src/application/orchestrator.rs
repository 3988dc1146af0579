use super::ledger::{PaymentDraft, PaymentLedger, Transition};
use super::notifier::SettlementDispatcher;
use crate::domain::actor::Actor;
use crate::domain::gateway::{Authorization, InitializeRequest};
use crate::domain::money::Amount;
use crate::domain::payment::{Payment, PaymentEvent, PaymentMethod, PaymentStatus};
use crate::domain::refund::{Refund, RefundStatus};
use crate::domain::settlement::{SettlementNotice, SettlementOutcome};
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use crate::infrastructure::gateways::GatewayRegistry;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct InitiatePayment {
    pub order_id: u64,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub callback_url: String,
    pub metadata: Option<serde_json::Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub authorization: Authorization,
}

/// Fields an administrator may set on a payment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentOverride {
    pub status: Option<PaymentStatus>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_reference: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundAction {
    Approve,
    Reject,
    Complete,
}

/// Drives a payment from creation through the gateway to settlement and
/// tells the order service about the outcome.
#[derive(Clone)]
pub struct SettlementOrchestrator {
    ledger: PaymentLedger,
    gateways: GatewayRegistry,
    dispatcher: SettlementDispatcher,
    payer_email_domain: String,
}

impl SettlementOrchestrator {
    pub fn new(
        ledger: PaymentLedger,
        gateways: GatewayRegistry,
        dispatcher: SettlementDispatcher,
        payer_email_domain: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            gateways,
            dispatcher,
            payer_email_domain: payer_email_domain.into(),
        }
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    /// Records a PENDING payment and asks the gateway for a checkout URL.
    ///
    /// A gateway failure marks the payment FAILED (the record is kept) and
    /// surfaces as `PaymentInitiationFailed`.
    #[instrument(skip(self, actor, request), fields(order_id = request.order_id, method = request.method.as_str()))]
    pub async fn initiate_payment(&self, actor: &Actor, request: InitiatePayment) -> Result<InitiatedPayment> {
        let gateway = self.gateways.for_method(request.method)?;

        let payment = self
            .ledger
            .create_payment(
                actor,
                PaymentDraft {
                    order_id: request.order_id,
                    amount: request.amount,
                    method: request.method,
                    description: request.description,
                    metadata: request.metadata.clone(),
                },
            )
            .await?;

        let init = InitializeRequest {
            payer_email: self.payer_email(actor),
            amount: payment.amount,
            currency: payment.currency.clone(),
            reference: payment.reference.clone(),
            callback_url: request.callback_url,
            metadata: request.metadata,
        };

        match gateway.initialize(&init).await {
            Ok(authorization) => {
                info!(reference = %payment.reference, provider = %gateway.provider(), "payment initialized");
                Ok(InitiatedPayment {
                    payment,
                    authorization,
                })
            }
            Err(e) => {
                warn!(reference = %payment.reference, error = %e, "gateway initialization failed");
                let reference = payment.reference.clone();
                if let Err(mark) = self
                    .ledger
                    .transition(payment, PaymentEvent::GatewayFailed, None)
                    .await
                {
                    warn!(%reference, error = %mark, "could not mark payment failed");
                }
                Err(match e {
                    PaymentError::PaymentInitiationFailed(message) => {
                        PaymentError::PaymentInitiationFailed(message)
                    }
                    other => PaymentError::PaymentInitiationFailed(other.to_string()),
                })
            }
        }
    }

    /// Settles a payment against its gateway.
    ///
    /// Settled payments are returned as stored with no gateway call. A
    /// gateway outage leaves the payment PROCESSING and returns the error
    /// so the caller can retry; any other adapter error fails the payment.
    #[instrument(skip(self, actor))]
    pub async fn verify_payment(&self, actor: &Actor, reference: &str) -> Result<Payment> {
        let mut payment = self.ledger.payment(actor, reference).await?;
        if payment.status.is_terminal() {
            return Ok(payment);
        }

        if payment.status == PaymentStatus::Pending {
            payment = self
                .ledger
                .transition(payment, PaymentEvent::VerificationStarted, None)
                .await?
                .into_payment();
            if payment.status.is_terminal() {
                return Ok(payment);
            }
        }

        let gateway = self.gateways.for_method(payment.method)?;
        let verification = match gateway.verify(reference).await {
            Ok(verification) => verification,
            Err(e) if e.is_retryable() => return Err(e),
            Err(e) => {
                warn!(%reference, provider = %gateway.provider(), error = %e, "verification unusable, failing payment");
                payment.gateway_response = Some(serde_json::json!({ "error": e.to_string() }));
                return Ok(self
                    .ledger
                    .transition(payment, PaymentEvent::GatewayFailed, None)
                    .await?
                    .into_payment());
            }
        };

        payment.gateway_response = Some(verification.raw_response.clone());
        if verification.succeeded {
            payment.gateway_transaction_id = verification.gateway_transaction_id.clone();
            let audit = Transaction::charge(
                &payment.reference,
                payment.amount,
                verification.gateway_transaction_id,
                Some(verification.raw_response),
                Utc::now(),
            );
            match self
                .ledger
                .transition(payment, PaymentEvent::GatewaySucceeded, Some(audit))
                .await?
            {
                Transition::Applied(payment) => {
                    self.notify(&payment, SettlementOutcome::Confirmed);
                    Ok(payment)
                }
                Transition::Superseded(current) => Ok(current),
            }
        } else {
            warn!(%reference, provider = %gateway.provider(), "gateway reported payment as failed");
            Ok(self
                .ledger
                .transition(payment, PaymentEvent::GatewayFailed, None)
                .await?
                .into_payment())
        }
    }

    /// Administrator override. The requested status must be reachable
    /// through the payment state machine.
    #[instrument(skip(self, actor, update))]
    pub async fn override_payment(
        &self,
        actor: &Actor,
        reference: &str,
        update: PaymentOverride,
    ) -> Result<Payment> {
        actor.require_admin()?;
        let mut payment = self.ledger.find_payment(reference).await?;

        if let Some(id) = update.gateway_transaction_id {
            payment.gateway_transaction_id = Some(id);
        }
        if let Some(gw_ref) = update.gateway_reference {
            payment.gateway_reference = Some(gw_ref);
        }
        if let Some(response) = update.gateway_response {
            payment.gateway_response = Some(response);
        }

        let Some(target) = update.status else {
            return match self.ledger.update_fields(payment).await? {
                Transition::Applied(p) => Ok(p),
                Transition::Superseded(p) => Err(PaymentError::Conflict(format!(
                    "Payment {} changed to {:?} concurrently",
                    p.reference, p.status
                ))),
            };
        };

        let event = PaymentEvent::leading_to(target).ok_or_else(|| {
            PaymentError::ValidationError(format!("Status {target:?} cannot be set manually"))
        })?;
        let audit = (event == PaymentEvent::GatewaySucceeded).then(|| {
            Transaction::charge(
                &payment.reference,
                payment.amount,
                payment.gateway_transaction_id.clone(),
                payment.gateway_response.clone(),
                Utc::now(),
            )
        });

        match self.ledger.transition(payment, event, audit).await? {
            Transition::Applied(payment) => {
                info!(%reference, status = ?payment.status, admin = actor.user_id, "payment status overridden");
                match payment.status {
                    PaymentStatus::Completed => self.notify(&payment, SettlementOutcome::Confirmed),
                    PaymentStatus::Failed => self.notify(&payment, SettlementOutcome::Failed),
                    _ => {}
                }
                Ok(payment)
            }
            Transition::Superseded(current) => Err(PaymentError::Conflict(format!(
                "Payment {} changed to {:?} concurrently",
                current.reference, current.status
            ))),
        }
    }

    /// Approves, rejects or pays out a refund. Paying out claims the
    /// refund, calls the gateway and only then records it as completed; a
    /// failed payout hands the claim back.
    #[instrument(skip(self, actor))]
    pub async fn process_refund(&self, actor: &Actor, reference: &str, action: RefundAction) -> Result<Refund> {
        actor.require_admin()?;
        match action {
            RefundAction::Approve => {
                self.ledger
                    .decide_refund(actor, reference, RefundStatus::Approved)
                    .await
            }
            RefundAction::Reject => {
                self.ledger
                    .decide_refund(actor, reference, RefundStatus::Rejected)
                    .await
            }
            RefundAction::Complete => {
                let refund = self.ledger.find_refund(reference).await?;
                refund.status.transition(RefundStatus::Processing)?;

                let payment = self.ledger.find_payment(&refund.payment_reference).await?;
                let gateway = self.gateways.for_method(payment.method)?;
                let gateway_tx = payment.gateway_transaction_id.as_deref().ok_or_else(|| {
                    PaymentError::ValidationError(format!(
                        "Payment {} has no gateway transaction to refund",
                        payment.reference
                    ))
                })?;
                let partial = (refund.amount != payment.amount).then_some(refund.amount);

                // The claim is the only way past APPROVED, so at most one
                // caller reaches the gateway for this refund.
                let claimed = self.ledger.claim_refund(actor, reference).await?;
                match gateway.refund(gateway_tx, partial).await {
                    Ok(response) => {
                        info!(refund = %claimed.reference, provider = %gateway.provider(), "gateway refund issued");
                        self.ledger.complete_refund(actor, claimed, response).await
                    }
                    Err(e) => {
                        warn!(refund = %claimed.reference, error = %e, "gateway refund failed, releasing claim");
                        let reference = claimed.reference.clone();
                        if let Err(release) = self.ledger.release_refund(claimed).await {
                            warn!(%reference, error = %release, "could not release refund claim");
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    fn notify(&self, payment: &Payment, outcome: SettlementOutcome) {
        self.dispatcher.dispatch(SettlementNotice {
            order_id: payment.order_id,
            payment_reference: payment.reference.clone(),
            outcome,
        });
    }

    fn payer_email(&self, actor: &Actor) -> String {
        actor
            .email
            .clone()
            .unwrap_or_else(|| format!("payer{}@{}", actor.user_id, self.payer_email_domain))
    }
}
