//! Memory Layer - In-Memory State Management
//!
//! 进程内会话存储

mod session_store;

pub use session_store::InMemorySessionStore;
