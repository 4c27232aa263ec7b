//! Update Poller - Telegram long polling

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::application::InboundMessage;
use crate::infrastructure::adapters::TelegramClient;

/// Poller 配置
#[derive(Debug, Clone)]
pub struct UpdatePollerConfig {
    /// 请求失败后的等待时间
    pub retry_delay: Duration,
}

impl Default for UpdatePollerConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// 拉取更新并送入处理队列
pub struct UpdatePoller {
    config: UpdatePollerConfig,
    client: Arc<TelegramClient>,
    queue_sender: mpsc::Sender<InboundMessage>,
}

impl UpdatePoller {
    pub fn new(
        config: UpdatePollerConfig,
        client: Arc<TelegramClient>,
        queue_sender: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            config,
            client,
            queue_sender,
        }
    }

    /// 运行直到收到关闭信号或队列关闭
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = self.client.delete_webhook().await {
            tracing::warn!(error = %e, "Failed to remove webhook before polling");
        }

        tracing::info!("UpdatePoller started");
        let mut offset: Option<i64> = None;

        loop {
            let updates = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.client.get_updates(offset) => result,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, retrying");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.config.retry_delay) => continue,
                    }
                }
            };

            for update in updates {
                // 确认已收到，下次请求不再返回
                offset = Some(update.update_id + 1);

                let Some(message) = update.into_inbound() else {
                    continue;
                };
                if self.queue_sender.send(message).await.is_err() {
                    tracing::info!("Update queue closed");
                    return;
                }
            }
        }

        tracing::info!("UpdatePoller stopped");
    }
}
