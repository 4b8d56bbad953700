//! Adapters implementing the domain ports.

pub mod in_memory;
pub mod rest_gateway;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod simulated_gateway;
