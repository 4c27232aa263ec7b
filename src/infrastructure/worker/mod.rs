//! Worker Layer - Background Update Processing
//!
//! UpdatePoller 通过 long polling 拉取 Telegram 更新，
//! UpdateWorker 从队列消费入站消息并并发分发

mod update_poller;
mod update_worker;

pub use update_poller::{UpdatePoller, UpdatePollerConfig};
pub use update_worker::{UpdateWorker, UpdateWorkerConfig};
