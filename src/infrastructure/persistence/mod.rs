//! Persistence Layer - 数据持久化
//!
//! Sled 键值存储与基于它的会话存储

mod kv_session_store;
pub mod sled;

pub use self::sled::SledKeyValueStore;
pub use kv_session_store::KvSessionStore;
