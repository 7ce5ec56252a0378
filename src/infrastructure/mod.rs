//! Adapters implementing the domain ports.

pub mod http_backend;
pub mod in_memory;
pub mod midtrans;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod scripted;
