//! Update Worker - Background Inbound Message Processor

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::application::{Dispatcher, InboundMessage};
use crate::domain::conversation::ChatId;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct UpdateWorkerConfig {
    /// 最大并发处理数
    pub max_concurrent: usize,
    /// chat 队列空闲多久后回收
    pub chat_idle_timeout: Duration,
}

impl Default for UpdateWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            chat_idle_timeout: Duration::from_secs(30),
        }
    }
}

type Queued = (InboundMessage, OwnedSemaphorePermit);

/// 单个 chat 的队列及其处理任务
struct Lane {
    sender: mpsc::UnboundedSender<Queued>,
    task: JoinHandle<()>,
}

/// 入站消息 Worker
///
/// 每个 chat 一条独立的队列，由单个任务按到达顺序分发；
/// 不同 chat 并行处理，总并发数受 semaphore 限制
pub struct UpdateWorker {
    config: UpdateWorkerConfig,
    queue_receiver: mpsc::Receiver<InboundMessage>,
    dispatcher: Arc<Dispatcher>,
}

impl UpdateWorker {
    pub fn new(
        config: UpdateWorkerConfig,
        queue_receiver: mpsc::Receiver<InboundMessage>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            dispatcher,
        }
    }

    /// 启动 Worker，队列关闭且所有任务完成后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            "UpdateWorker started"
        );

        let max_concurrent = self.config.max_concurrent.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut lanes: HashMap<ChatId, Lane> = HashMap::new();

        while let Some(message) = self.queue_receiver.recv().await {
            // permit 随消息进入 chat 队列，排队中的消息也计入并发数
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    continue;
                }
            };

            let chat_id = message.chat_id;
            let mut item = (message, permit);
            let mut previous = None;

            if let Some(lane) = lanes.remove(&chat_id) {
                match lane.sender.send(item) {
                    Ok(()) => {
                        lanes.insert(chat_id, lane);
                        continue;
                    }
                    // 队列已因空闲关闭，新队列要等旧任务排空
                    Err(mpsc::error::SendError(returned)) => {
                        item = returned;
                        previous = Some(lane.task);
                    }
                }
            }

            let (sender, receiver) = mpsc::unbounded_channel();
            if sender.send(item).is_err() {
                continue;
            }
            let task = tokio::spawn(run_lane(
                chat_id,
                receiver,
                previous,
                self.dispatcher.clone(),
                self.config.chat_idle_timeout,
            ));

            lanes.retain(|_, lane| !lane.task.is_finished());
            lanes.insert(chat_id, Lane { sender, task });
        }

        // 关闭所有 chat 队列，等待进行中和排队中的分发完成
        drop(lanes);
        let _ = semaphore.acquire_many(max_concurrent as u32).await;

        tracing::info!("UpdateWorker stopped");
    }
}

/// 按顺序处理单个 chat 的消息，空闲超时后退出
async fn run_lane(
    chat_id: ChatId,
    mut receiver: mpsc::UnboundedReceiver<Queued>,
    previous: Option<JoinHandle<()>>,
    dispatcher: Arc<Dispatcher>,
    idle_timeout: Duration,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }
    tracing::debug!(chat_id = %chat_id, "Chat lane opened");

    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some((message, permit))) => deliver(&dispatcher, message, permit).await,
            Ok(None) => break,
            Err(_) => {
                // 拒绝新消息，处理完已排队的再退出
                receiver.close();
                while let Some((message, permit)) = receiver.recv().await {
                    deliver(&dispatcher, message, permit).await;
                }
                break;
            }
        }
    }

    tracing::debug!(chat_id = %chat_id, "Chat lane closed");
}

async fn deliver(dispatcher: &Dispatcher, message: InboundMessage, _permit: OwnedSemaphorePermit) {
    let chat_id = message.chat_id;
    if let Err(e) = dispatcher.dispatch(message).await {
        tracing::error!(chat_id = %chat_id, error = %e, "Failed to deliver reply");
    }
}
