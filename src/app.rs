//! Wiring from configuration to a running service.

use crate::application::ledger::{LedgerSettings, PaymentLedger};
use crate::application::notifier::SettlementDispatcher;
use crate::application::orchestrator::SettlementOrchestrator;
use crate::config::Config;
use crate::domain::ports::{NotifierBox, Stores};
use crate::error::Result;
use crate::infrastructure::gateways::GatewayRegistry;
use crate::infrastructure::in_memory;
use crate::infrastructure::order_client::HttpOrderNotifier;
use crate::interfaces::http::AppState;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Opens the configured store: RocksDB when a path is set and the
/// `storage-rocksdb` feature is compiled in, memory otherwise.
pub fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            tracing::info!(path = %path.display(), "using RocksDB storage");
            Ok(crate::infrastructure::rocksdb::RocksDBStore::open(path)?.stores())
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "built without the storage-rocksdb feature, falling back to in-memory storage"
            );
            eprintln!(
                "warning: built without the storage-rocksdb feature; ignoring {} and using in-memory storage",
                path.display()
            );
            Ok(in_memory::stores())
        }
        None => Ok(in_memory::stores()),
    }
}

pub struct Service {
    pub state: Arc<AppState>,
    /// Notification worker; finishes once the state is dropped.
    pub notifier_worker: JoinHandle<()>,
}

/// Builds the service around `stores` with the given gateways and order
/// notifier. Must run inside a tokio runtime.
pub fn assemble(config: &Config, stores: Stores, gateways: GatewayRegistry, notifier: NotifierBox) -> Result<Service> {
    let settings = LedgerSettings {
        currency: config.payments.currency()?,
        payment_ttl: config.payments.expiry(),
    };
    let (dispatcher, notifier_worker) = SettlementDispatcher::spawn(notifier);
    let providers = gateways.providers();
    let orchestrator = SettlementOrchestrator::new(
        PaymentLedger::new(stores, settings),
        gateways,
        dispatcher,
        config.payments.payer_email_domain.clone(),
    );

    Ok(Service {
        state: Arc::new(AppState {
            orchestrator,
            gateways: providers,
        }),
        notifier_worker,
    })
}

/// Builds the production service from configuration alone.
pub fn from_config(config: &Config) -> Result<Service> {
    let stores = open_stores(config.storage.db_path.as_deref())?;
    let gateways = GatewayRegistry::from_config(&config.gateways)?;
    let notifier: NotifierBox = Arc::new(HttpOrderNotifier::from_config(&config.order_service)?);
    assemble(config, stores, gateways, notifier)
}
