use crate::domain::actor::Actor;
use crate::domain::invoice::{Invoice, InvoiceDraft};
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{NewPayment, Payment, PaymentEvent, PaymentMethod, PaymentStatus};
use crate::domain::ports::{Page, Stores};
use crate::domain::reference::ReferenceKind;
use crate::domain::refund::{Refund, RefundStatus};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{Wallet, WalletEntryRequest, WalletTransaction};
use crate::error::{PaymentError, Result};
use chrono::{Duration, Utc};
use tracing::{info, warn};

/// How many fresh references to try before giving up on a collision.
const MAX_REFERENCE_ATTEMPTS: usize = 5;
/// How many times to re-read and re-apply a wallet entry that lost a race.
const MAX_WALLET_ATTEMPTS: usize = 5;

/// Settings the ledger needs from configuration.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub currency: Currency,
    pub payment_ttl: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            payment_ttl: Duration::hours(1),
        }
    }
}

/// A payment to record, on behalf of the calling payer.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub order_id: u64,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub payment_reference: String,
    pub amount: Amount,
    pub reason: Option<String>,
}

/// Result of applying an event through compare-and-swap.
#[derive(Debug)]
pub enum Transition {
    /// Our write landed; holds the stored payment.
    Applied(Payment),
    /// Someone else changed the payment first; holds what they stored.
    Superseded(Payment),
}

impl Transition {
    pub fn into_payment(self) -> Payment {
        match self {
            Self::Applied(p) | Self::Superseded(p) => p,
        }
    }
}

/// Owns the durable records: payments and their audit trail, refunds,
/// invoices and wallets. Every status change goes through the payment and
/// refund state machines and lands with a compare-and-swap.
///
/// Access checks happen here, against the calling [`Actor`].
#[derive(Clone)]
pub struct PaymentLedger {
    stores: Stores,
    settings: LedgerSettings,
}

impl PaymentLedger {
    pub fn new(stores: Stores, settings: LedgerSettings) -> Self {
        Self { stores, settings }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Records a PENDING payment for the caller. References are regenerated
    /// if the store reports a collision.
    pub async fn create_payment(&self, actor: &Actor, draft: PaymentDraft) -> Result<Payment> {
        let now = Utc::now();
        let input = NewPayment {
            order_id: draft.order_id,
            payer_id: actor.user_id,
            amount: draft.amount,
            currency: self.settings.currency.clone(),
            method: draft.method,
            description: draft.description,
            metadata: draft.metadata,
        };

        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let payment = Payment::new(
                ReferenceKind::Payment.generate(),
                input.clone(),
                now,
                self.settings.payment_ttl,
            );
            match self.stores.payments.insert(payment.clone()).await {
                Ok(()) => {
                    info!(
                        reference = %payment.reference,
                        order_id = payment.order_id,
                        amount = %payment.amount,
                        method = payment.method.as_str(),
                        "payment created"
                    );
                    return Ok(payment);
                }
                Err(PaymentError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(PaymentError::Conflict(
            "could not allocate a unique payment reference".to_string(),
        ))
    }

    /// Loads a payment without any access check.
    pub async fn find_payment(&self, reference: &str) -> Result<Payment> {
        self.stores
            .payments
            .get(reference)
            .await?
            .ok_or_else(|| PaymentError::payment_not_found(reference))
    }

    pub async fn payment(&self, actor: &Actor, reference: &str) -> Result<Payment> {
        let payment = self.find_payment(reference).await?;
        actor.require_owner_or_admin(payment.payer_id)?;
        Ok(payment)
    }

    /// Admins see every payment, payers their own.
    pub async fn list_payments(&self, actor: &Actor, page: Page) -> Result<Vec<Payment>> {
        let payer = (!actor.is_admin()).then_some(actor.user_id);
        self.stores.payments.list(payer, page).await
    }

    pub async fn transactions(&self, actor: &Actor, reference: &str) -> Result<Vec<Transaction>> {
        self.payment(actor, reference).await?;
        self.stores.payments.transactions(reference).await
    }

    /// Applies `event` to `payment` and stores it if nobody changed the
    /// payment's status since it was read. `audit` lands in the same step.
    pub async fn transition(
        &self,
        mut payment: Payment,
        event: PaymentEvent,
        audit: Option<Transaction>,
    ) -> Result<Transition> {
        let expected = payment.status;
        let next = payment.apply(event, Utc::now())?;

        if self
            .stores
            .payments
            .compare_and_swap(expected, payment.clone(), audit)
            .await?
        {
            info!(
                reference = %payment.reference,
                from = ?expected,
                to = ?next,
                event = ?event,
                "payment status changed"
            );
            Ok(Transition::Applied(payment))
        } else {
            let current = self.find_payment(&payment.reference).await?;
            info!(
                reference = %payment.reference,
                status = ?current.status,
                "payment changed concurrently, keeping stored state"
            );
            Ok(Transition::Superseded(current))
        }
    }

    /// Stores changes to a payment's gateway fields, keeping its status.
    pub async fn update_fields(&self, mut payment: Payment) -> Result<Transition> {
        payment.updated_at = Utc::now();
        if self
            .stores
            .payments
            .compare_and_swap(payment.status, payment.clone(), None)
            .await?
        {
            Ok(Transition::Applied(payment))
        } else {
            Ok(Transition::Superseded(self.find_payment(&payment.reference).await?))
        }
    }

    /// Opens a refund against a completed payment.
    ///
    /// The amount is checked against the payment before anything is stored;
    /// the store then enforces the cumulative cap over all live refunds.
    pub async fn request_refund(&self, actor: &Actor, request: RefundRequest) -> Result<Refund> {
        let payment = self.payment(actor, &request.payment_reference).await?;

        if request.amount > payment.amount {
            return Err(PaymentError::ValidationError(format!(
                "Refund amount {} exceeds payment amount {}",
                request.amount, payment.amount
            )));
        }
        if !matches!(payment.status, PaymentStatus::Completed | PaymentStatus::Refunded) {
            return Err(PaymentError::ValidationError(format!(
                "Payment {} is {:?} and cannot be refunded",
                payment.reference, payment.status
            )));
        }

        let now = Utc::now();
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let refund = Refund::new(
                ReferenceKind::Refund.generate(),
                &payment.reference,
                request.amount,
                request.reason.clone(),
                actor.user_id,
                now,
            );
            match self
                .stores
                .refunds
                .insert_capped(refund.clone(), payment.amount)
                .await
            {
                Ok(()) => {
                    info!(
                        refund = %refund.reference,
                        payment = %payment.reference,
                        amount = %refund.amount,
                        "refund requested"
                    );
                    return Ok(refund);
                }
                Err(PaymentError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(PaymentError::Conflict(
            "could not allocate a unique refund reference".to_string(),
        ))
    }

    pub async fn find_refund(&self, reference: &str) -> Result<Refund> {
        self.stores
            .refunds
            .get(reference)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Refund {reference}")))
    }

    /// Refunds raised against one payment, for its owner or an admin.
    pub async fn payment_refunds(&self, actor: &Actor, payment_reference: &str) -> Result<Vec<Refund>> {
        self.payment(actor, payment_reference).await?;
        self.stores.refunds.for_payment(payment_reference).await
    }

    pub async fn list_refunds(&self, actor: &Actor, page: Page) -> Result<Vec<Refund>> {
        actor.require_admin()?;
        self.stores.refunds.list(page).await
    }

    /// Approves or rejects a pending refund.
    pub async fn decide_refund(&self, actor: &Actor, reference: &str, to: RefundStatus) -> Result<Refund> {
        actor.require_admin()?;
        if !matches!(to, RefundStatus::Approved | RefundStatus::Rejected) {
            return Err(PaymentError::ValidationError(
                "Completing a refund goes through the gateway".to_string(),
            ));
        }
        let mut refund = self.find_refund(reference).await?;
        let expected = refund.status;
        refund.advance(to, actor.user_id, Utc::now())?;
        self.swap_refund(expected, refund).await
    }

    /// Claims an approved refund for payout. Only one caller wins the
    /// claim; the others get `Conflict` and must not call the gateway.
    pub async fn claim_refund(&self, actor: &Actor, reference: &str) -> Result<Refund> {
        actor.require_admin()?;
        let mut refund = self.find_refund(reference).await?;
        let expected = refund.status;
        refund.advance(RefundStatus::Processing, actor.user_id, Utc::now())?;
        self.swap_refund(expected, refund).await
    }

    /// Returns a claimed refund to APPROVED after its payout failed.
    pub async fn release_refund(&self, mut refund: Refund) -> Result<Refund> {
        let expected = refund.status;
        refund.status = refund.status.release()?;
        self.swap_refund(expected, refund).await
    }

    /// Records a claimed refund the gateway has paid out: the refund
    /// becomes COMPLETED and the payment REFUNDED, with a `refund`
    /// transaction in its trail.
    pub async fn complete_refund(
        &self,
        actor: &Actor,
        mut refund: Refund,
        gateway_response: serde_json::Value,
    ) -> Result<Refund> {
        actor.require_admin()?;
        let now = Utc::now();
        let expected = refund.status;
        refund.advance(RefundStatus::Completed, actor.user_id, now)?;
        refund.gateway_refund_id = refund_id_of(&gateway_response);
        refund.gateway_response = Some(gateway_response.clone());
        let refund = self.swap_refund(expected, refund).await?;

        // Only this refund could have moved to COMPLETED, so keep retrying
        // until the payment reflects it.
        loop {
            let payment = self.find_payment(&refund.payment_reference).await?;
            let audit = Transaction::refund(
                &payment.reference,
                refund.amount,
                refund.gateway_refund_id.clone(),
                Some(gateway_response.clone()),
                now,
            );
            if let Transition::Applied(_) = self
                .transition(payment, PaymentEvent::RefundCompleted, Some(audit))
                .await?
            {
                return Ok(refund);
            }
        }
    }

    async fn swap_refund(&self, expected: RefundStatus, refund: Refund) -> Result<Refund> {
        if self
            .stores
            .refunds
            .compare_and_swap(expected, refund.clone())
            .await?
        {
            info!(refund = %refund.reference, from = ?expected, to = ?refund.status, "refund status changed");
            Ok(refund)
        } else {
            warn!(refund = %refund.reference, "refund changed concurrently");
            Err(PaymentError::Conflict(format!(
                "Refund {} was modified concurrently",
                refund.reference
            )))
        }
    }

    /// Issues the single invoice for a payment.
    pub async fn create_invoice(&self, actor: &Actor, draft: InvoiceDraft) -> Result<Invoice> {
        draft.validate()?;
        let payment = self.payment(actor, &draft.payment_reference).await?;
        if draft.order_id != payment.order_id {
            return Err(PaymentError::ValidationError(format!(
                "Order {} does not match payment {}",
                draft.order_id, payment.reference
            )));
        }

        let number = self.unused_invoice_number().await?;
        let total = draft.total()?;
        let invoice = Invoice {
            number,
            payment_reference: payment.reference.clone(),
            order_id: payment.order_id,
            payer_id: payment.payer_id,
            subtotal: draft.subtotal,
            tax: draft.tax,
            discount: draft.discount,
            total,
            currency: payment.currency.clone(),
            billing: draft.billing,
            items: draft.items,
            is_paid: matches!(payment.status, PaymentStatus::Completed | PaymentStatus::Refunded),
            paid_at: payment.paid_at,
            created_at: Utc::now(),
        };
        self.stores.invoices.insert(invoice.clone()).await?;
        info!(invoice = %invoice.number, payment = %invoice.payment_reference, total = %invoice.total, "invoice issued");
        Ok(invoice)
    }

    async fn unused_invoice_number(&self) -> Result<String> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let number = ReferenceKind::Invoice.generate();
            if self.stores.invoices.get(&number).await?.is_none() {
                return Ok(number);
            }
        }
        Err(PaymentError::Conflict(
            "could not allocate a unique invoice number".to_string(),
        ))
    }

    pub async fn invoice(&self, actor: &Actor, number: &str) -> Result<Invoice> {
        let invoice = self
            .stores
            .invoices
            .get(number)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Invoice {number}")))?;
        actor.require_owner_or_admin(invoice.payer_id)?;
        Ok(invoice)
    }

    pub async fn list_invoices(&self, actor: &Actor, page: Page) -> Result<Vec<Invoice>> {
        let payer = (!actor.is_admin()).then_some(actor.user_id);
        self.stores.invoices.list(payer, page).await
    }

    /// The caller's wallet, created empty on first access.
    pub async fn wallet(&self, actor: &Actor) -> Result<Wallet> {
        self.wallet_of(actor.user_id).await
    }

    async fn wallet_of(&self, payer_id: u64) -> Result<Wallet> {
        let fresh = Wallet::new(payer_id, self.settings.currency.clone(), Utc::now());
        self.stores.wallets.get_or_insert(fresh).await
    }

    pub async fn wallet_entries(&self, actor: &Actor, page: Page) -> Result<Vec<WalletTransaction>> {
        self.stores.wallets.entries(actor.user_id, page).await
    }

    /// Credits or debits a payer's wallet. Admin only.
    pub async fn post_wallet_entry(
        &self,
        actor: &Actor,
        payer_id: u64,
        request: WalletEntryRequest,
    ) -> Result<(Wallet, WalletTransaction)> {
        actor.require_admin()?;

        for _ in 0..MAX_WALLET_ATTEMPTS {
            let mut wallet = self.wallet_of(payer_id).await?;
            let expected = wallet.version;
            let entry = wallet.apply(request.clone(), Utc::now())?;
            if self
                .stores
                .wallets
                .compare_and_swap(expected, wallet.clone(), entry.clone())
                .await?
            {
                info!(
                    payer_id,
                    kind = ?entry.kind,
                    amount = %entry.amount,
                    balance = %entry.balance_after,
                    "wallet updated"
                );
                return Ok((wallet, entry));
            }
        }
        Err(PaymentError::Conflict(format!(
            "Wallet for payer {payer_id} is too busy, try again"
        )))
    }
}

fn refund_id_of(response: &serde_json::Value) -> Option<String> {
    let id = response.pointer("/data/id").or_else(|| response.get("id"))?;
    match id {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::Role;
    use crate::domain::invoice::BillingDetails;
    use crate::domain::wallet::EntryKind;
    use crate::infrastructure::in_memory;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ledger() -> PaymentLedger {
        PaymentLedger::new(in_memory::stores(), LedgerSettings::default())
    }

    fn student(id: u64) -> Actor {
        Actor::new(id, Role::Student)
    }

    fn admin() -> Actor {
        Actor::new(1, Role::Admin)
    }

    fn draft(amount: Decimal) -> PaymentDraft {
        PaymentDraft {
            order_id: 77,
            amount: Amount::new(amount).unwrap(),
            method: PaymentMethod::Paystack,
            description: None,
            metadata: None,
        }
    }

    async fn completed_payment(ledger: &PaymentLedger, payer: &Actor, amount: Decimal) -> Payment {
        let payment = ledger.create_payment(payer, draft(amount)).await.unwrap();
        let audit = Transaction::charge(&payment.reference, payment.amount, Some("1".into()), None, Utc::now());
        ledger
            .transition(payment, PaymentEvent::GatewaySucceeded, Some(audit))
            .await
            .unwrap()
            .into_payment()
    }

    #[tokio::test]
    async fn test_create_payment_is_pending_with_expiry() {
        let ledger = ledger();
        let payment = ledger.create_payment(&student(5), draft(dec!(5000.00))).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.payer_id, 5);
        assert!(ReferenceKind::Payment.matches(&payment.reference));
        assert_eq!(payment.expires_at - payment.created_at, Duration::hours(1));
    }

    #[tokio::test]
    async fn test_payment_access_is_owner_or_admin() {
        let ledger = ledger();
        let payment = ledger.create_payment(&student(5), draft(dec!(10))).await.unwrap();

        assert!(ledger.payment(&student(5), &payment.reference).await.is_ok());
        assert!(ledger.payment(&admin(), &payment.reference).await.is_ok());
        assert!(matches!(
            ledger.payment(&student(6), &payment.reference).await,
            Err(PaymentError::Forbidden(_))
        ));
        assert!(matches!(
            ledger.payment(&student(5), "PAY-FFFFFFFFFFFF").await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_payments_scopes_to_payer() {
        let ledger = ledger();
        ledger.create_payment(&student(5), draft(dec!(10))).await.unwrap();
        ledger.create_payment(&student(6), draft(dec!(20))).await.unwrap();

        assert_eq!(ledger.list_payments(&student(5), Page::default()).await.unwrap().len(), 1);
        assert_eq!(ledger.list_payments(&admin(), Page::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_payment_untouched() {
        let ledger = ledger();
        let payment = completed_payment(&ledger, &student(5), dec!(10)).await;

        let result = ledger
            .transition(payment.clone(), PaymentEvent::VerificationStarted, None)
            .await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidStateTransition {
                from: PaymentStatus::Completed,
                event: PaymentEvent::VerificationStarted
            })
        ));
        assert_eq!(ledger.find_payment(&payment.reference).await.unwrap(), payment);
    }

    #[tokio::test]
    async fn test_stale_transition_is_superseded() {
        let ledger = ledger();
        let payment = ledger.create_payment(&student(5), draft(dec!(10))).await.unwrap();

        let first = ledger
            .transition(payment.clone(), PaymentEvent::GatewaySucceeded, None)
            .await
            .unwrap();
        assert!(matches!(first, Transition::Applied(_)));

        // Same stale read, different outcome: the stored COMPLETED wins.
        let second = ledger
            .transition(payment, PaymentEvent::GatewayFailed, None)
            .await
            .unwrap();
        match second {
            Transition::Superseded(current) => assert_eq!(current.status, PaymentStatus::Completed),
            other => panic!("expected superseded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refund_larger_than_payment_is_rejected_before_storage() {
        let ledger = ledger();
        let payer = student(5);
        let payment = completed_payment(&ledger, &payer, dec!(3000.00)).await;

        let result = ledger
            .request_refund(
                &payer,
                RefundRequest {
                    payment_reference: payment.reference.clone(),
                    amount: Amount::new(dec!(5000.00)).unwrap(),
                    reason: None,
                },
            )
            .await;

        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
        assert!(ledger.list_refunds(&admin(), Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_payment_cannot_be_refunded() {
        let ledger = ledger();
        let payer = student(5);
        let payment = ledger.create_payment(&payer, draft(dec!(100))).await.unwrap();

        let result = ledger
            .request_refund(
                &payer,
                RefundRequest {
                    payment_reference: payment.reference,
                    amount: Amount::new(dec!(50)).unwrap(),
                    reason: None,
                },
            )
            .await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_refund_completion_moves_payment_to_refunded() {
        let ledger = ledger();
        let payer = student(5);
        let payment = completed_payment(&ledger, &payer, dec!(100)).await;

        let refund = ledger
            .request_refund(
                &payer,
                RefundRequest {
                    payment_reference: payment.reference.clone(),
                    amount: Amount::new(dec!(40)).unwrap(),
                    reason: Some("duplicate".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(ReferenceKind::Refund.matches(&refund.reference));

        ledger
            .decide_refund(&admin(), &refund.reference, RefundStatus::Approved)
            .await
            .unwrap();
        let claimed = ledger.claim_refund(&admin(), &refund.reference).await.unwrap();
        assert_eq!(claimed.status, RefundStatus::Processing);
        assert!(matches!(
            ledger.claim_refund(&admin(), &refund.reference).await,
            Err(PaymentError::InvalidRefundTransition { .. })
        ));
        let done = ledger
            .complete_refund(&admin(), claimed, json!({"status": true, "data": {"id": 991}}))
            .await
            .unwrap();

        assert_eq!(done.status, RefundStatus::Completed);
        assert_eq!(done.gateway_refund_id.as_deref(), Some("991"));
        let stored = ledger.find_payment(&payment.reference).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Refunded);
        let trail = ledger.transactions(&payer, &payment.reference).await.unwrap();
        assert_eq!(trail.len(), 2);
    }

    #[tokio::test]
    async fn test_refund_decisions_require_admin_and_legal_moves() {
        let ledger = ledger();
        let payer = student(5);
        let payment = completed_payment(&ledger, &payer, dec!(100)).await;
        let refund = ledger
            .request_refund(
                &payer,
                RefundRequest {
                    payment_reference: payment.reference,
                    amount: Amount::new(dec!(10)).unwrap(),
                    reason: None,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            ledger.decide_refund(&payer, &refund.reference, RefundStatus::Approved).await,
            Err(PaymentError::Forbidden(_))
        ));
        let rejected = ledger
            .decide_refund(&admin(), &refund.reference, RefundStatus::Rejected)
            .await
            .unwrap();
        assert!(matches!(
            ledger.complete_refund(&admin(), rejected, json!({})).await,
            Err(PaymentError::InvalidRefundTransition { .. })
        ));
        assert!(matches!(
            ledger.claim_refund(&admin(), &refund.reference).await,
            Err(PaymentError::InvalidRefundTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_released_claim_can_be_claimed_again() {
        let ledger = ledger();
        let payer = student(5);
        let payment = completed_payment(&ledger, &payer, dec!(100)).await;
        let refund = ledger
            .request_refund(
                &payer,
                RefundRequest {
                    payment_reference: payment.reference,
                    amount: Amount::new(dec!(10)).unwrap(),
                    reason: None,
                },
            )
            .await
            .unwrap();
        ledger
            .decide_refund(&admin(), &refund.reference, RefundStatus::Approved)
            .await
            .unwrap();

        let claimed = ledger.claim_refund(&admin(), &refund.reference).await.unwrap();
        let released = ledger.release_refund(claimed).await.unwrap();
        assert_eq!(released.status, RefundStatus::Approved);
        assert!(ledger.claim_refund(&admin(), &refund.reference).await.is_ok());
    }

    fn invoice_draft(payment: &Payment) -> InvoiceDraft {
        InvoiceDraft {
            payment_reference: payment.reference.clone(),
            order_id: payment.order_id,
            subtotal: dec!(5000.00),
            tax: dec!(375.00),
            discount: dec!(500.00),
            billing: BillingDetails {
                name: "Ada Obi".to_string(),
                email: "ada@example.com".to_string(),
                address: None,
                city: Some("Lagos".to_string()),
                state: None,
                country: "Nigeria".to_string(),
            },
            items: vec![json!({"course_id": 12, "title": "Rust 101"})],
        }
    }

    #[tokio::test]
    async fn test_one_invoice_per_payment() {
        let ledger = ledger();
        let payer = student(5);
        let payment = completed_payment(&ledger, &payer, dec!(4875.00)).await;

        let invoice = ledger.create_invoice(&payer, invoice_draft(&payment)).await.unwrap();
        assert_eq!(invoice.total, dec!(4875.00));
        assert!(invoice.is_paid);
        assert!(ReferenceKind::Invoice.matches(&invoice.number));

        assert!(matches!(
            ledger.create_invoice(&payer, invoice_draft(&payment)).await,
            Err(PaymentError::Conflict(_))
        ));
        assert!(matches!(
            ledger.invoice(&student(6), &invoice.number).await,
            Err(PaymentError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_wallet_credit_then_overdraft() {
        let ledger = ledger();
        let payer = student(5);

        let wallet = ledger.wallet(&payer).await.unwrap();
        assert_eq!(wallet.version, 0);

        let credit = WalletEntryRequest {
            kind: EntryKind::Credit,
            amount: Amount::new(dec!(100)).unwrap(),
            description: Some("top up".to_string()),
            reference: None,
        };
        let (wallet, entry) = ledger.post_wallet_entry(&admin(), 5, credit).await.unwrap();
        assert_eq!(wallet.balance.0, dec!(100));
        assert_eq!(entry.balance_before.0, dec!(0));

        let overdraft = WalletEntryRequest {
            kind: EntryKind::Debit,
            amount: Amount::new(dec!(150)).unwrap(),
            description: None,
            reference: None,
        };
        assert!(matches!(
            ledger.post_wallet_entry(&admin(), 5, overdraft.clone()).await,
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            ledger.post_wallet_entry(&payer, 5, overdraft).await,
            Err(PaymentError::Forbidden(_))
        ));
        assert_eq!(ledger.wallet_entries(&payer, Page::default()).await.unwrap().len(), 1);
    }
}
