//! Sled 嵌入式存储

mod kv_store;

pub use kv_store::{SledKeyValueStore, SledStoreConfig};
