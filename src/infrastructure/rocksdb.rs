use crate::domain::invoice::Invoice;
use crate::domain::money::Amount;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{InvoiceStore, Page, PaymentStore, RefundStore, Stores, WalletStore};
use crate::domain::refund::{Refund, RefundStatus};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::{Wallet, WalletTransaction};
use crate::error::{PaymentError, Result};
use crate::infrastructure::in_memory::{check_refund_cap, reserved_total};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_PAYMENTS: &str = "payments";
/// Audit trail, keyed `{payment reference}/{sequence}`.
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_REFUNDS: &str = "refunds";
pub const CF_INVOICES: &str = "invoices";
/// Payment reference -> invoice number, enforcing one invoice per payment.
pub const CF_INVOICE_BY_PAYMENT: &str = "invoice_by_payment";
pub const CF_WALLETS: &str = "wallets";
/// Wallet entries, keyed `{payer id}/{sequence}`.
pub const CF_WALLET_ENTRIES: &str = "wallet_entries";

const ALL_CFS: [&str; 7] = [
    CF_PAYMENTS,
    CF_TRANSACTIONS,
    CF_REFUNDS,
    CF_INVOICES,
    CF_INVOICE_BY_PAYMENT,
    CF_WALLETS,
    CF_WALLET_ENTRIES,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own column family as JSON. Read-check-write
/// sequences run under one async mutex and commit through a `WriteBatch`,
/// which gives the same compare-and-swap guarantees as the in-memory stores.
///
/// `Clone` shares the underlying `Arc<DB>` and the write mutex.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a database at `path` with all column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// The same database behind every store port.
    pub fn stores(self) -> Stores {
        Stores {
            payments: Arc::new(self.clone()),
            refunds: Arc::new(self.clone()),
            invoices: Arc::new(self.clone()),
            wallets: Arc::new(self),
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Storage(format!("Column family {name} not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, batch: &mut WriteBatch, cf: &str, key: &[u8], value: &T) -> Result<()> {
        batch.put_cf(self.cf(cf)?, key, serde_json::to_vec(value)?);
        Ok(())
    }

    /// All values whose key starts with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(&self, cf: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let iter = self
            .db
            .iterator_cf(self.cf(cf)?, IteratorMode::From(prefix, Direction::Forward));
        let mut values = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn count_prefix(&self, cf: &str, prefix: &[u8]) -> Result<usize> {
        let iter = self
            .db
            .iterator_cf(self.cf(cf)?, IteratorMode::From(prefix, Direction::Forward));
        let mut count = 0;
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}

fn trail_prefix(reference: &str) -> Vec<u8> {
    format!("{reference}/").into_bytes()
}

fn wallet_prefix(payer_id: u64) -> Vec<u8> {
    format!("{payer_id:020}/").into_bytes()
}

fn sequenced(prefix: &[u8], seq: usize) -> Vec<u8> {
    let mut key = prefix.to_vec();
    key.extend_from_slice(format!("{seq:010}").as_bytes());
    key
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = payment.reference.as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_PAYMENTS)?, key)?.is_some() {
            return Err(PaymentError::Conflict(format!(
                "Payment reference {} already exists",
                payment.reference
            )));
        }
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_PAYMENTS, key, &payment)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, reference.as_bytes())
    }

    async fn list(&self, payer_id: Option<u64>, page: Page) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.scan(CF_PAYMENTS, b"")?;
        payments.sort_by_key(|p| p.created_at);
        Ok(page.apply(
            payments
                .into_iter()
                .filter(|p| payer_id.is_none_or(|id| p.payer_id == id)),
        ))
    }

    async fn compare_and_swap(
        &self,
        expected: PaymentStatus,
        payment: Payment,
        audit: Option<Transaction>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current: Payment = self
            .get_json(CF_PAYMENTS, payment.reference.as_bytes())?
            .ok_or_else(|| PaymentError::payment_not_found(&payment.reference))?;
        if current.status != expected {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        if let Some(tx) = audit {
            let prefix = trail_prefix(&payment.reference);
            let seq = self.count_prefix(CF_TRANSACTIONS, &prefix)?;
            self.put_json(&mut batch, CF_TRANSACTIONS, &sequenced(&prefix, seq), &tx)?;
        }
        self.put_json(&mut batch, CF_PAYMENTS, payment.reference.as_bytes(), &payment)?;
        self.db.write(batch)?;
        Ok(true)
    }

    async fn transactions(&self, reference: &str) -> Result<Vec<Transaction>> {
        self.scan(CF_TRANSACTIONS, &trail_prefix(reference))
    }
}

#[async_trait]
impl RefundStore for RocksDBStore {
    async fn insert_capped(&self, refund: Refund, cap: Amount) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = refund.reference.as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_REFUNDS)?, key)?.is_some() {
            return Err(PaymentError::Conflict(format!(
                "Refund reference {} already exists",
                refund.reference
            )));
        }
        let siblings: Vec<Refund> = self.scan(CF_REFUNDS, b"")?;
        let existing = reserved_total(
            siblings
                .iter()
                .filter(|r| r.payment_reference == refund.payment_reference),
        )?;
        check_refund_cap(existing, &refund, cap)?;

        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_REFUNDS, key, &refund)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<Refund>> {
        self.get_json(CF_REFUNDS, reference.as_bytes())
    }

    async fn list(&self, page: Page) -> Result<Vec<Refund>> {
        let mut refunds: Vec<Refund> = self.scan(CF_REFUNDS, b"")?;
        refunds.sort_by_key(|r| r.requested_at);
        Ok(page.apply(refunds.into_iter()))
    }

    async fn for_payment(&self, payment_reference: &str) -> Result<Vec<Refund>> {
        let mut refunds: Vec<Refund> = self.scan(CF_REFUNDS, b"")?;
        refunds.retain(|r| r.payment_reference == payment_reference);
        refunds.sort_by_key(|r| r.requested_at);
        Ok(refunds)
    }

    async fn compare_and_swap(&self, expected: RefundStatus, refund: Refund) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current: Refund = self
            .get_json(CF_REFUNDS, refund.reference.as_bytes())?
            .ok_or_else(|| PaymentError::NotFound(format!("Refund {}", refund.reference)))?;
        if current.status != expected {
            return Ok(false);
        }
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_REFUNDS, refund.reference.as_bytes(), &refund)?;
        self.db.write(batch)?;
        Ok(true)
    }
}

#[async_trait]
impl InvoiceStore for RocksDBStore {
    async fn insert(&self, invoice: Invoice) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = invoice.number.as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_INVOICES)?, key)?.is_some() {
            return Err(PaymentError::Conflict(format!(
                "Invoice number {} already exists",
                invoice.number
            )));
        }
        let payment_key = invoice.payment_reference.as_bytes();
        if let Some(existing) = self.get_json::<String>(CF_INVOICE_BY_PAYMENT, payment_key)? {
            return Err(PaymentError::Conflict(format!(
                "Payment {} is already invoiced as {existing}",
                invoice.payment_reference
            )));
        }

        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_INVOICE_BY_PAYMENT, payment_key, &invoice.number)?;
        self.put_json(&mut batch, CF_INVOICES, key, &invoice)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, number: &str) -> Result<Option<Invoice>> {
        self.get_json(CF_INVOICES, number.as_bytes())
    }

    async fn list(&self, payer_id: Option<u64>, page: Page) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self.scan(CF_INVOICES, b"")?;
        invoices.sort_by_key(|i| i.created_at);
        Ok(page.apply(
            invoices
                .into_iter()
                .filter(|i| payer_id.is_none_or(|id| i.payer_id == id)),
        ))
    }
}

#[async_trait]
impl WalletStore for RocksDBStore {
    async fn get_or_insert(&self, fresh: Wallet) -> Result<Wallet> {
        let _guard = self.write_lock.lock().await;
        let key = fresh.payer_id.to_be_bytes();
        if let Some(existing) = self.get_json(CF_WALLETS, &key)? {
            return Ok(existing);
        }
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_WALLETS, &key, &fresh)?;
        self.db.write(batch)?;
        Ok(fresh)
    }

    async fn get(&self, payer_id: u64) -> Result<Option<Wallet>> {
        self.get_json(CF_WALLETS, &payer_id.to_be_bytes())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        wallet: Wallet,
        entry: WalletTransaction,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = wallet.payer_id.to_be_bytes();
        let current: Wallet = self
            .get_json(CF_WALLETS, &key)?
            .ok_or_else(|| PaymentError::NotFound(format!("Wallet for payer {}", wallet.payer_id)))?;
        if current.version != expected_version {
            return Ok(false);
        }

        let prefix = wallet_prefix(wallet.payer_id);
        let seq = self.count_prefix(CF_WALLET_ENTRIES, &prefix)?;
        let mut batch = WriteBatch::default();
        self.put_json(&mut batch, CF_WALLET_ENTRIES, &sequenced(&prefix, seq), &entry)?;
        self.put_json(&mut batch, CF_WALLETS, &key, &wallet)?;
        self.db.write(batch)?;
        Ok(true)
    }

    async fn entries(&self, payer_id: u64, page: Page) -> Result<Vec<WalletTransaction>> {
        let entries: Vec<WalletTransaction> = self.scan(CF_WALLET_ENTRIES, &wallet_prefix(payer_id))?;
        Ok(page.apply(entries.into_iter()))
    }
}
