use super::gateway::{Authorization, GatewayProvider, InitializeRequest, Verification};
use super::invoice::Invoice;
use super::money::Amount;
use super::payment::{Payment, PaymentStatus};
use super::refund::{Refund, RefundStatus};
use super::settlement::SettlementNotice;
use super::transaction::Transaction;
use super::wallet::{Wallet, WalletTransaction};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Offset pagination, as exposed by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "Page::default_limit")]
    pub limit: usize,
}

impl Page {
    pub const MAX_LIMIT: usize = 100;

    fn default_limit() -> usize {
        Self::MAX_LIMIT
    }

    pub fn new(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit: limit.min(Self::MAX_LIMIT),
        }
    }

    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        items.skip(self.skip).take(self.limit.min(Self::MAX_LIMIT)).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::MAX_LIMIT)
    }
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Fails with `Conflict` if the reference is already taken.
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn get(&self, reference: &str) -> Result<Option<Payment>>;
    /// Payments in creation order, optionally restricted to one payer.
    async fn list(&self, payer_id: Option<u64>, page: Page) -> Result<Vec<Payment>>;
    /// Replaces the stored payment only if its status is still `expected`,
    /// appending `audit` to its trail in the same atomic step. Returns
    /// `false` when another writer got there first.
    async fn compare_and_swap(
        &self,
        expected: PaymentStatus,
        payment: Payment,
        audit: Option<Transaction>,
    ) -> Result<bool>;
    async fn transactions(&self, reference: &str) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait RefundStore: Send + Sync {
    /// Inserts `refund` only if, together with the payment's other
    /// non-rejected refunds, it stays within `cap`. Fails with
    /// `ValidationError` otherwise and `Conflict` on a duplicate reference.
    async fn insert_capped(&self, refund: Refund, cap: Amount) -> Result<()>;
    async fn get(&self, reference: &str) -> Result<Option<Refund>>;
    async fn list(&self, page: Page) -> Result<Vec<Refund>>;
    async fn for_payment(&self, payment_reference: &str) -> Result<Vec<Refund>>;
    async fn compare_and_swap(&self, expected: RefundStatus, refund: Refund) -> Result<bool>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate number or a second invoice for
    /// the same payment.
    async fn insert(&self, invoice: Invoice) -> Result<()>;
    async fn get(&self, number: &str) -> Result<Option<Invoice>>;
    async fn list(&self, payer_id: Option<u64>, page: Page) -> Result<Vec<Invoice>>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Returns the payer's wallet, storing `fresh` first if none exists.
    async fn get_or_insert(&self, fresh: Wallet) -> Result<Wallet>;
    async fn get(&self, payer_id: u64) -> Result<Option<Wallet>>;
    /// Stores `wallet` and appends `entry` if the stored version is still
    /// `expected_version`.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        wallet: Wallet,
        entry: WalletTransaction,
    ) -> Result<bool>;
    async fn entries(&self, payer_id: u64, page: Page) -> Result<Vec<WalletTransaction>>;
}

/// One capability set over every third-party processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> GatewayProvider;
    async fn initialize(&self, request: &InitializeRequest) -> Result<Authorization>;
    async fn verify(&self, reference: &str) -> Result<Verification>;
    async fn refund(&self, gateway_transaction_id: &str, amount: Option<Amount>) -> Result<serde_json::Value>;
}

/// Receiver of settlement outcomes (the order/enrollment subsystem).
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn on_payment_settled(&self, notice: &SettlementNotice) -> Result<()>;
}

pub type PaymentStoreBox = Arc<dyn PaymentStore>;
pub type RefundStoreBox = Arc<dyn RefundStore>;
pub type InvoiceStoreBox = Arc<dyn InvoiceStore>;
pub type WalletStoreBox = Arc<dyn WalletStore>;
pub type GatewayBox = Arc<dyn PaymentGateway>;
pub type NotifierBox = Arc<dyn OrderNotifier>;

/// The set of stores the ledger works against.
#[derive(Clone)]
pub struct Stores {
    pub payments: PaymentStoreBox,
    pub refunds: RefundStoreBox,
    pub invoices: InvoiceStoreBox,
    pub wallets: WalletStoreBox,
}
