//! voxrelay - Telegram 语音对话中继
//!
//! 入站消息（long polling 或 webhook）进入同一个队列，由 UpdateWorker 分发处理

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use voxrelay::application::ports::{SessionStorePort, SynthesizerPort};
use voxrelay::application::{ChatLocks, ConversationHandler, ConversationSettings, Dispatcher};
use voxrelay::config::{load_config, print_config, AppConfig, StorageBackend, TelegramMode};
use voxrelay::domain::voice::VoiceCatalog;
use voxrelay::infrastructure::adapters::{
    ChatCompletionAgentFactory, HttpSynthesizer, HttpSynthesizerConfig, OpenAiClientConfig,
    OpusVoiceCodec, TelegramClient, TelegramConfig, VoiceCodecConfig, WhisperTranscriber,
};
use voxrelay::infrastructure::http::{AppState, HttpServer, ServerConfig};
use voxrelay::infrastructure::memory::InMemorySessionStore;
use voxrelay::infrastructure::persistence::sled::{SledKeyValueStore, SledStoreConfig};
use voxrelay::infrastructure::persistence::KvSessionStore;
use voxrelay::infrastructure::worker::{
    UpdatePoller, UpdatePollerConfig, UpdateWorker, UpdateWorkerConfig,
};

/// 入站消息队列容量
const QUEUE_CAPACITY: usize = 256;

/// 空闲 chat 锁的清理间隔
const LOCK_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},voxrelay={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_session_store(
    config: &AppConfig,
    catalog: VoiceCatalog,
) -> anyhow::Result<Arc<dyn SessionStorePort>> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemorySessionStore::new(catalog))),
        StorageBackend::Sled => {
            if let Some(parent) = std::path::Path::new(&config.storage.sled_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let kv = SledKeyValueStore::new(&SledStoreConfig {
                db_path: config.storage.sled_path.clone(),
            })?;
            Ok(Arc::new(KvSessionStore::new(Arc::new(kv), catalog)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("voxrelay {}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // 编解码与外部服务适配器
    let codec = Arc::new(OpusVoiceCodec::new(VoiceCodecConfig::default()));

    let synthesizer = Arc::new(HttpSynthesizer::new(
        HttpSynthesizerConfig::new(config.synthesizer.provider.clone())
            .with_timeout(config.synthesizer.timeout_secs),
        codec.clone(),
    )?);
    let capabilities = synthesizer.capabilities();

    let openai = OpenAiClientConfig::new(&config.openai.api_key)
        .with_base_url(&config.openai.base_url)
        .with_timeout(config.openai.timeout_secs);
    let transcriber = Arc::new(WhisperTranscriber::new(
        openai.clone(),
        &config.openai.transcription_model,
        codec.clone(),
    )?);
    let agents = Arc::new(ChatCompletionAgentFactory::new(openai)?);

    let telegram = Arc::new(TelegramClient::new(TelegramConfig {
        token: config.telegram.token.clone(),
        api_base_url: config.telegram.api_base_url.clone(),
        timeout_secs: config.telegram.timeout_secs,
        poll_timeout_secs: config.telegram.poll_timeout_secs,
    })?);

    // 会话存储
    let catalog = VoiceCatalog::new(
        config
            .conversation
            .voice_catalog(&config.synthesizer.provider),
    )?;
    tracing::info!(voices = catalog.len(), default_voice = %catalog.default_voice(), "Voice catalog loaded");
    let store = open_session_store(&config, catalog).await?;
    let locks = Arc::new(ChatLocks::new(config.conversation.serialize_per_chat));

    // 应用层
    let conversation = Arc::new(ConversationHandler::new(
        store.clone(),
        transcriber,
        agents,
        synthesizer,
        codec.clone(),
        locks.clone(),
        ConversationSettings {
            system_prompt: config.conversation.system_prompt.clone(),
            model: config.openai.model.clone(),
            max_tokens: config.openai.max_tokens,
            on_corrupt: config.memory.on_corrupt,
        },
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        telegram.clone(),
        codec,
        conversation,
        store.clone(),
        locks.clone(),
        capabilities,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);

    let worker = UpdateWorker::new(
        UpdateWorkerConfig {
            max_concurrent: config.telegram.max_concurrent,
            ..Default::default()
        },
        queue_rx,
        dispatcher,
    );
    let worker_handle = tokio::spawn(worker.run());

    let mut tasks = Vec::new();

    // 清理空闲的 chat 锁
    {
        let locks = locks.clone();
        let mut shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOCK_PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => {
                        let pruned = locks.prune();
                        if pruned > 0 {
                            tracing::debug!(pruned, "Pruned idle chat locks");
                        }
                    }
                }
            }
        }));
    }

    match config.telegram.mode {
        TelegramMode::Polling => {
            let poller = UpdatePoller::new(
                UpdatePollerConfig::default(),
                telegram.clone(),
                queue_tx.clone(),
            );
            tasks.push(tokio::spawn(poller.run(shutdown_rx.clone())));
        }
        TelegramMode::Webhook => {
            let url = config.telegram.webhook_url.as_deref().unwrap_or_default();
            telegram
                .set_webhook(
                    url,
                    config.telegram.webhook_secret.as_deref().filter(|s| !s.is_empty()),
                )
                .await?;
        }
    }

    if config.server.enabled {
        let server = HttpServer::new(
            ServerConfig::new(&config.server.host, config.server.port),
            AppState::new(queue_tx.clone(), config.telegram.webhook_secret.clone()),
        );
        let mut shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let result = server
                .run_with_shutdown(async move {
                    let _ = shutdown.changed().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
            }
        }));
    }

    // 只有 poller 和 server 持有发送端，它们退出后队列关闭
    drop(queue_tx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task panicked");
        }
    }
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "UpdateWorker panicked");
    }

    store.flush().await?;
    tracing::info!("Shutdown complete");

    Ok(())
}
