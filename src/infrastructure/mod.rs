pub mod gateways;
pub mod in_memory;
pub mod order_client;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
