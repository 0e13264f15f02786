//! Adapter trait for relaying a prompt through a provider's web protocol.

use std::sync::Arc;
use std::time::Duration;

use clawapi_core::{ProtocolKind, ProviderDescriptor};

use crate::providers::claude::ClaudeWebClient;
use crate::runtime::RuntimeState;

/// Provider-scoped failure of one relay cycle.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Provider '{0}' is not running.")]
    NotActive(String),

    #[error("Auth failed (HTTP {status}). Please re-authenticate.")]
    UpstreamAuth { status: u16 },

    #[error("{reason}")]
    ModelUnavailable { reason: String },

    #[error("{message}")]
    UpstreamFatal { message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid session header '{name}'")]
    InvalidHeader { name: String },

    #[error("No response received from {provider}")]
    EmptyResponse { provider: String },

    #[error("Native HTTP engine not yet implemented for provider '{0}'")]
    Unimplemented(String),

    #[error("Relay cycle exceeded {}s and was abandoned", .0.as_secs())]
    Timeout(Duration),
}

/// One provider's relay protocol.
///
/// `complete` runs a full upstream cycle for a flattened prompt and returns
/// the reply text. Callers hold the provider's serialization lock.
#[async_trait::async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Provider name this adapter serves
    fn provider(&self) -> &str;

    async fn complete(&self, state: &RuntimeState, prompt: &str) -> Result<String, RelayError>;
}

/// Adapter for providers that can be logged into but not relayed yet.
pub struct UnimplementedAdapter {
    provider: String,
}

impl UnimplementedAdapter {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

#[async_trait::async_trait]
impl ProtocolAdapter for UnimplementedAdapter {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, _state: &RuntimeState, _prompt: &str) -> Result<String, RelayError> {
        Err(RelayError::Unimplemented(self.provider.clone()))
    }
}

/// Options shared by every adapter built at startup.
#[derive(Debug, Clone, Default)]
pub struct AdapterOptions {
    pub connect_timeout: Option<Duration>,
    /// Directory for request/response dumps; `None` disables dumping.
    pub dump_dir: Option<std::path::PathBuf>,
}

/// Build the adapter matching a descriptor's protocol kind.
pub fn adapter_for(
    descriptor: &ProviderDescriptor,
    options: &AdapterOptions,
) -> Result<Arc<dyn ProtocolAdapter>, RelayError> {
    Ok(match descriptor.protocol.kind {
        ProtocolKind::ClaudeWeb => Arc::new(ClaudeWebClient::new(&descriptor.name, options)?),
        ProtocolKind::Unsupported => Arc::new(UnimplementedAdapter::new(&descriptor.name)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawapi_core::{ProviderRegistry, SessionCredentials};

    #[tokio::test]
    async fn test_unsupported_provider_fails_with_named_error() {
        let registry = ProviderRegistry::builtin();
        let chatgpt = registry.get("chatgpt").cloned().unwrap();
        let adapter = adapter_for(&chatgpt, &AdapterOptions::default()).unwrap();
        let state = RuntimeState::new(
            chatgpt,
            SessionCredentials {
                cookie_header: "a=b".to_string(),
                user_agent: "UA".to_string(),
            },
        );

        let err = adapter.complete(&state, "hi").await.unwrap_err();
        assert!(matches!(err, RelayError::Unimplemented(ref p) if p == "chatgpt"));
        assert_eq!(
            err.to_string(),
            "Native HTTP engine not yet implemented for provider 'chatgpt'"
        );
    }

    #[test]
    fn test_claude_gets_web_client() {
        let registry = ProviderRegistry::builtin();
        let claude = registry.get("claude").unwrap();
        let adapter = adapter_for(claude, &AdapterOptions::default()).unwrap();
        assert_eq!(adapter.provider(), "claude");
    }
}
