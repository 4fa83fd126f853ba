//! The shipped model backend.
//!
//! [`MultiProviderBackend`] asks every configured provider for a reply to the
//! same conversation, so each provider contributes one candidate. It keeps its
//! own provider-facing history, mirroring what the user committed.

pub mod builtin;
pub mod stream;

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use self::builtin::{load_builtin_providers, AuthMode};
use self::stream::{spawn_candidate_stream, CandidateRequest};
use crate::api::ChatMessage;
use crate::core::backend::{ModelBackend, ResponseStream};
use crate::core::config::{ApiKeys, Config};

/// A provider that has a key and will be asked for a candidate.
#[derive(Clone)]
pub struct ProviderEndpoint {
    pub id: String,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub auth_mode: AuthMode,
    pub max_tokens: Option<u32>,
}

impl fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Pairs the built-in providers with the available keys and config overrides.
pub fn resolve_endpoints(keys: &ApiKeys, config: &Config) -> Vec<ProviderEndpoint> {
    load_builtin_providers()
        .into_iter()
        .filter_map(|provider| {
            if config.is_disabled(&provider.id) {
                debug!(provider = %provider.id, "provider disabled in config");
                return None;
            }
            let Some(api_key) = keys.get(&provider.key_name) else {
                debug!(provider = %provider.id, key = %provider.key_name, "no key for provider");
                return None;
            };
            let auth_mode = provider.auth_mode();
            let model = config
                .model_for(&provider.id)
                .map(str::to_owned)
                .unwrap_or(provider.model);
            Some(ProviderEndpoint {
                id: provider.id,
                base_url: provider.base_url,
                model,
                api_key: api_key.to_string(),
                auth_mode,
                max_tokens: provider.max_tokens,
            })
        })
        .collect()
}

pub struct MultiProviderBackend {
    client: reqwest::Client,
    endpoints: Vec<ProviderEndpoint>,
    system_message: String,
    history: Vec<ChatMessage>,
}

impl MultiProviderBackend {
    pub fn new(client: reqwest::Client, endpoints: Vec<ProviderEndpoint>) -> Self {
        Self {
            client,
            endpoints,
            system_message: String::new(),
            history: Vec::new(),
        }
    }

    /// The messages sent with the next request.
    pub fn request_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        if !self.system_message.is_empty() {
            messages.push(ChatMessage::new("system", self.system_message.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages
    }
}

impl ModelBackend for MultiProviderBackend {
    fn set_system_message(&mut self, text: &str) {
        self.system_message = text.to_string();
    }

    fn create_response(&mut self, prompt: &str) -> ResponseStream {
        if !prompt.is_empty() {
            self.history.push(ChatMessage::new("user", prompt));
        }

        let messages = self.request_messages();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            info!(index, provider = %endpoint.id, model = %endpoint.model, "requesting candidate");
            spawn_candidate_stream(
                CandidateRequest {
                    client: self.client.clone(),
                    endpoint: endpoint.clone(),
                    messages: messages.clone(),
                    index,
                    cancel: cancel.clone(),
                },
                tx.clone(),
            );
        }

        ResponseStream::from_receiver(self.endpoints.len(), rx, cancel)
    }

    fn append_assistant_message(&mut self, text: &str) {
        self.history.push(ChatMessage::new("assistant", text));
    }
}
