//! Application State

use tokio::sync::mpsc;

use crate::application::InboundMessage;

/// 应用状态
///
/// webhook 收到的更新与 long polling 共用同一个处理队列
pub struct AppState {
    pub queue_sender: mpsc::Sender<InboundMessage>,
    /// `setWebhook` 时注册的 secret token
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(queue_sender: mpsc::Sender<InboundMessage>, webhook_secret: Option<String>) -> Self {
        Self {
            queue_sender,
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
        }
    }
}
