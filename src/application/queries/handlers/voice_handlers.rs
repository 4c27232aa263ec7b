//! Voice Query Handlers

use std::fmt;
use std::sync::Arc;

use crate::application::error::VoiceCommandError;
use crate::application::ports::SessionStorePort;
use crate::application::queries::{ListVoices, WhoAmI};
use crate::domain::voice::Voice;

// ============================================================================
// Response DTOs
// ============================================================================

/// 音色列表响应
///
/// 显示为每行 `"{index}: {name}{ - description}"`
#[derive(Debug, Clone)]
pub struct VoiceListResponse {
    pub voices: Vec<Voice>,
}

impl fmt::Display for VoiceListResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, voice) in self.voices.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", index, voice)?;
        }
        Ok(())
    }
}

/// 当前音色响应
#[derive(Debug, Clone)]
pub struct WhoAmIResponse {
    pub voice: Voice,
}

impl fmt::Display for WhoAmIResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I am currently '{}'.", self.voice.label())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// ListVoices Handler
pub struct ListVoicesHandler {
    store: Arc<dyn SessionStorePort>,
}

impl ListVoicesHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: ListVoices) -> Result<VoiceListResponse, VoiceCommandError> {
        let session = self.store.get_or_create(query.chat_id).await?;
        Ok(VoiceListResponse {
            voices: session.available_voices().to_vec(),
        })
    }
}

/// WhoAmI Handler
pub struct WhoAmIHandler {
    store: Arc<dyn SessionStorePort>,
}

impl WhoAmIHandler {
    pub fn new(store: Arc<dyn SessionStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: WhoAmI) -> Result<WhoAmIResponse, VoiceCommandError> {
        let session = self.store.get_or_create(query.chat_id).await?;
        Ok(WhoAmIResponse {
            voice: session.current_voice().clone(),
        })
    }
}
