use crate::domain::invoice::Invoice;
use crate::domain::money::{Amount, Balance};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{
    InvoiceStore, Page, PaymentStore, RefundStore, Stores, WalletStore,
};
use crate::domain::refund::{Refund, RefundStatus};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{Wallet, WalletTransaction};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds a full set of empty in-memory stores.
pub fn stores() -> Stores {
    Stores {
        payments: Arc::new(InMemoryPaymentStore::new()),
        refunds: Arc::new(InMemoryRefundStore::new()),
        invoices: Arc::new(InMemoryInvoiceStore::new()),
        wallets: Arc::new(InMemoryWalletStore::new()),
    }
}

#[derive(Default)]
struct PaymentTable {
    order: Vec<String>,
    payments: HashMap<String, Payment>,
    trails: HashMap<String, Vec<Transaction>>,
}

/// A thread-safe in-memory payment store.
///
/// Payments and their audit trails share one lock, so a status swap and
/// the transaction it produces land together or not at all.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    table: Arc<RwLock<PaymentTable>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut table = self.table.write().await;
        if table.payments.contains_key(&payment.reference) {
            return Err(PaymentError::Conflict(format!(
                "Payment reference {} already exists",
                payment.reference
            )));
        }
        table.order.push(payment.reference.clone());
        table.payments.insert(payment.reference.clone(), payment);
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<Payment>> {
        let table = self.table.read().await;
        Ok(table.payments.get(reference).cloned())
    }

    async fn list(&self, payer_id: Option<u64>, page: Page) -> Result<Vec<Payment>> {
        let table = self.table.read().await;
        let payments = table
            .order
            .iter()
            .filter_map(|reference| table.payments.get(reference))
            .filter(|p| payer_id.is_none_or(|id| p.payer_id == id))
            .cloned();
        Ok(page.apply(payments))
    }

    async fn compare_and_swap(
        &self,
        expected: PaymentStatus,
        payment: Payment,
        audit: Option<Transaction>,
    ) -> Result<bool> {
        let mut table = self.table.write().await;
        let current = table
            .payments
            .get(&payment.reference)
            .ok_or_else(|| PaymentError::payment_not_found(&payment.reference))?;
        if current.status != expected {
            return Ok(false);
        }
        if let Some(tx) = audit {
            table.trails.entry(payment.reference.clone()).or_default().push(tx);
        }
        table.payments.insert(payment.reference.clone(), payment);
        Ok(true)
    }

    async fn transactions(&self, reference: &str) -> Result<Vec<Transaction>> {
        let table = self.table.read().await;
        Ok(table.trails.get(reference).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct RefundTable {
    order: Vec<String>,
    refunds: HashMap<String, Refund>,
}

#[derive(Default, Clone)]
pub struct InMemoryRefundStore {
    table: Arc<RwLock<RefundTable>>,
}

impl InMemoryRefundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sum of refunds still holding a claim on the payment's amount.
pub(crate) fn reserved_total<'a>(refunds: impl Iterator<Item = &'a Refund>) -> Result<Balance> {
    refunds
        .filter(|r| r.reserves_funds())
        .try_fold(Balance::ZERO, |acc, r| acc.checked_add(r.amount.into()))
}

pub(crate) fn check_refund_cap(existing: Balance, refund: &Refund, cap: Amount) -> Result<()> {
    let requested = existing.checked_add(refund.amount.into())?;
    if requested > Balance::from(cap) {
        return Err(PaymentError::ValidationError(format!(
            "Refunds for {} would total {}, exceeding the payment amount {}",
            refund.payment_reference, requested.0, cap
        )));
    }
    Ok(())
}

#[async_trait]
impl RefundStore for InMemoryRefundStore {
    async fn insert_capped(&self, refund: Refund, cap: Amount) -> Result<()> {
        let mut table = self.table.write().await;
        if table.refunds.contains_key(&refund.reference) {
            return Err(PaymentError::Conflict(format!(
                "Refund reference {} already exists",
                refund.reference
            )));
        }
        let existing = reserved_total(
            table
                .refunds
                .values()
                .filter(|r| r.payment_reference == refund.payment_reference),
        )?;
        check_refund_cap(existing, &refund, cap)?;
        table.order.push(refund.reference.clone());
        table.refunds.insert(refund.reference.clone(), refund);
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<Refund>> {
        let table = self.table.read().await;
        Ok(table.refunds.get(reference).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<Refund>> {
        let table = self.table.read().await;
        Ok(page.apply(
            table
                .order
                .iter()
                .filter_map(|reference| table.refunds.get(reference))
                .cloned(),
        ))
    }

    async fn for_payment(&self, payment_reference: &str) -> Result<Vec<Refund>> {
        let table = self.table.read().await;
        Ok(table
            .order
            .iter()
            .filter_map(|reference| table.refunds.get(reference))
            .filter(|r| r.payment_reference == payment_reference)
            .cloned()
            .collect())
    }

    async fn compare_and_swap(&self, expected: RefundStatus, refund: Refund) -> Result<bool> {
        let mut table = self.table.write().await;
        let current = table
            .refunds
            .get(&refund.reference)
            .ok_or_else(|| PaymentError::NotFound(format!("Refund {}", refund.reference)))?;
        if current.status != expected {
            return Ok(false);
        }
        table.refunds.insert(refund.reference.clone(), refund);
        Ok(true)
    }
}

#[derive(Default)]
struct InvoiceTable {
    order: Vec<String>,
    invoices: HashMap<String, Invoice>,
    by_payment: HashMap<String, String>,
}

#[derive(Default, Clone)]
pub struct InMemoryInvoiceStore {
    table: Arc<RwLock<InvoiceTable>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn insert(&self, invoice: Invoice) -> Result<()> {
        let mut table = self.table.write().await;
        if table.invoices.contains_key(&invoice.number) {
            return Err(PaymentError::Conflict(format!(
                "Invoice number {} already exists",
                invoice.number
            )));
        }
        if let Some(existing) = table.by_payment.get(&invoice.payment_reference) {
            return Err(PaymentError::Conflict(format!(
                "Payment {} is already invoiced as {existing}",
                invoice.payment_reference
            )));
        }
        table
            .by_payment
            .insert(invoice.payment_reference.clone(), invoice.number.clone());
        table.order.push(invoice.number.clone());
        table.invoices.insert(invoice.number.clone(), invoice);
        Ok(())
    }

    async fn get(&self, number: &str) -> Result<Option<Invoice>> {
        let table = self.table.read().await;
        Ok(table.invoices.get(number).cloned())
    }

    async fn list(&self, payer_id: Option<u64>, page: Page) -> Result<Vec<Invoice>> {
        let table = self.table.read().await;
        Ok(page.apply(
            table
                .order
                .iter()
                .filter_map(|number| table.invoices.get(number))
                .filter(|i| payer_id.is_none_or(|id| i.payer_id == id))
                .cloned(),
        ))
    }
}

#[derive(Default)]
struct WalletTable {
    wallets: HashMap<u64, Wallet>,
    entries: HashMap<u64, Vec<WalletTransaction>>,
}

#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    table: Arc<RwLock<WalletTable>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get_or_insert(&self, fresh: Wallet) -> Result<Wallet> {
        let mut table = self.table.write().await;
        Ok(table.wallets.entry(fresh.payer_id).or_insert(fresh).clone())
    }

    async fn get(&self, payer_id: u64) -> Result<Option<Wallet>> {
        let table = self.table.read().await;
        Ok(table.wallets.get(&payer_id).cloned())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        wallet: Wallet,
        entry: WalletTransaction,
    ) -> Result<bool> {
        let mut table = self.table.write().await;
        let current = table
            .wallets
            .get(&wallet.payer_id)
            .ok_or_else(|| PaymentError::NotFound(format!("Wallet for payer {}", wallet.payer_id)))?;
        if current.version != expected_version {
            return Ok(false);
        }
        table.entries.entry(wallet.payer_id).or_default().push(entry);
        table.wallets.insert(wallet.payer_id, wallet);
        Ok(true)
    }

    async fn entries(&self, payer_id: u64, page: Page) -> Result<Vec<WalletTransaction>> {
        let table = self.table.read().await;
        Ok(page.apply(table.entries.get(&payer_id).into_iter().flatten().cloned()))
    }
}
