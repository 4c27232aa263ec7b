//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现，以及 HTTP 入口和后台 worker

pub mod adapters;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod worker;

pub use memory::InMemorySessionStore;
pub use persistence::KvSessionStore;
pub use worker::{UpdatePoller, UpdatePollerConfig, UpdateWorker, UpdateWorkerConfig};
