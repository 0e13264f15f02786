//! claude.ai web client replaying a browser session.
//!
//! One relay cycle resolves the account organization, opens a fresh
//! conversation, probes the account's models, then walks the fallback chain
//! until a model streams back text.

use std::path::PathBuf;

use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use clawapi_core::ProtocolParams;

use crate::providers::adapter::{AdapterOptions, ProtocolAdapter, RelayError};
use crate::providers::event_stream::collect_completion;
use crate::providers::query_dump::QueryDump;
use crate::runtime::RuntimeState;

const CONVERSATION_NAME: &str = "ClawAPI Session";

/// claude.ai relay adapter
pub struct ClaudeWebClient {
    provider: String,
    http_client: reqwest::Client,
    dump_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Organization {
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct AccountModel {
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    details: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    error_code: Option<String>,
}

/// Outcome of one completion attempt that did not hit a fatal error
enum Attempt {
    Text(String),
    Unavailable(String),
}

/// Build the ordered list of models to try.
///
/// The preferred model comes first, then whatever the account probe
/// returned, then the legacy list. Duplicates keep their first position.
pub fn fallback_chain(params: &ProtocolParams, probed: Vec<String>) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    let candidates = params
        .preferred_model
        .iter()
        .cloned()
        .chain(probed)
        .chain(params.legacy_models.iter().cloned());
    for model in candidates {
        if !model.is_empty() && !chain.contains(&model) {
            chain.push(model);
        }
    }
    chain
}

/// Whether an upstream error body says the model is not offered to this
/// account.
fn is_model_unavailable(body: &str) -> bool {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return false;
    };
    let Some(error) = envelope.error else {
        return false;
    };
    error.kind.as_deref() == Some("permission_error")
        && error
            .details
            .and_then(|d| d.error_code)
            .is_some_and(|code| code == "model_not_available")
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), RelayError> {
    let invalid = || RelayError::InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.insert(header_name, header_value);
    Ok(())
}

impl ClaudeWebClient {
    pub fn new(provider: impl Into<String>, options: &AdapterOptions) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            provider: provider.into(),
            http_client: builder.build()?,
            dump_dir: options.dump_dir.clone(),
        })
    }

    /// Browser-like headers for every upstream call of a cycle.
    fn session_headers(&self, state: &RuntimeState) -> Result<HeaderMap, RelayError> {
        let base_url = &state.descriptor.base_url;
        let mut headers = HeaderMap::new();

        for (name, value) in &state.descriptor.protocol.header_template {
            insert_header(&mut headers, name, value)?;
        }
        insert_header(&mut headers, COOKIE.as_str(), &state.credentials.cookie_header)?;
        insert_header(&mut headers, USER_AGENT.as_str(), &state.credentials.user_agent)?;
        insert_header(&mut headers, REFERER.as_str(), &format!("{base_url}/chat"))?;
        insert_header(&mut headers, ORIGIN.as_str(), base_url)?;
        Ok(headers)
    }

    async fn resolve_organization(
        &self,
        api: &str,
        headers: &HeaderMap,
    ) -> Result<String, RelayError> {
        let response = self
            .http_client
            .get(format!("{api}/organizations"))
            .headers(headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamAuth {
                status: status.as_u16(),
            });
        }

        let organizations: Vec<Organization> = response.json().await?;
        organizations
            .into_iter()
            .next()
            .map(|org| org.uuid)
            .ok_or_else(|| RelayError::UpstreamFatal {
                message: "No organization found for this account".to_string(),
            })
    }

    async fn create_conversation(
        &self,
        org_url: &str,
        headers: &HeaderMap,
    ) -> Result<String, RelayError> {
        let conversation_id = Uuid::new_v4().to_string();
        let response = self
            .http_client
            .post(format!("{org_url}/chat_conversations"))
            .headers(headers.clone())
            .json(&json!({
                "uuid": conversation_id,
                "name": CONVERSATION_NAME,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamFatal {
                message: format!("Failed to create conversation (HTTP {})", status.as_u16()),
            });
        }
        Ok(conversation_id)
    }

    /// Models the account advertises. Probe failures are not fatal.
    async fn probe_models(&self, org_url: &str, headers: &HeaderMap) -> Vec<String> {
        let response = match self
            .http_client
            .get(format!("{org_url}/models"))
            .headers(headers.clone())
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Model probe returned HTTP {}", response.status());
                return Vec::new();
            }
            Err(e) => {
                debug!("Model probe failed: {}", e);
                return Vec::new();
            }
        };

        match response.json::<Vec<AccountModel>>().await {
            Ok(models) => models.into_iter().filter_map(|m| m.model).collect(),
            Err(e) => {
                debug!("Model probe returned an unexpected body: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_model(
        &self,
        completion_url: &str,
        headers: &HeaderMap,
        model: &str,
        prompt: &str,
    ) -> Result<Attempt, RelayError> {
        let body = json!({
            "prompt": prompt,
            "timezone": "UTC",
            "model": model,
            "attachments": [],
            "files": [],
            "rendering_mode": "markdown",
        });

        let dump = match &self.dump_dir {
            Some(dir) => QueryDump::request(dir, &self.provider, model, &body).await,
            None => None,
        };

        let response = self
            .http_client
            .post(completion_url)
            .headers(headers.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if let Some(dump) = &dump {
                dump.response(&json!({ "status": status.as_u16(), "body": error_body }))
                    .await;
            }
            if is_model_unavailable(&error_body) {
                return Ok(Attempt::Unavailable(format!("Model {model} not available")));
            }
            return Err(RelayError::UpstreamFatal {
                message: format!("Claude API rejected response (HTTP {})", status.as_u16()),
            });
        }

        let text = collect_completion(Box::pin(response.bytes_stream())).await?;
        if let Some(dump) = &dump {
            dump.response(&json!({ "status": status.as_u16(), "text": text }))
                .await;
        }
        Ok(Attempt::Text(text))
    }
}

#[async_trait::async_trait]
impl ProtocolAdapter for ClaudeWebClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, state: &RuntimeState, prompt: &str) -> Result<String, RelayError> {
        let headers = self.session_headers(state)?;
        let api = format!("{}/api", state.descriptor.base_url);

        let org_id = self.resolve_organization(&api, &headers).await?;
        let org_url = format!("{api}/organizations/{org_id}");
        let conversation_id = self.create_conversation(&org_url, &headers).await?;
        debug!("Opened conversation {} on '{}'", conversation_id, self.provider);

        let probed = self.probe_models(&org_url, &headers).await;
        let chain = fallback_chain(&state.descriptor.protocol, probed);
        let completion_url = format!("{org_url}/chat_conversations/{conversation_id}/completion");

        let mut last_reason = None;
        for model in &chain {
            info!("Relaying to '{}' with model {}", self.provider, model);
            match self.try_model(&completion_url, &headers, model, prompt).await? {
                Attempt::Text(text) if !text.is_empty() => return Ok(text.trim().to_string()),
                Attempt::Text(_) => debug!("Model {} returned no text", model),
                Attempt::Unavailable(reason) => {
                    warn!("{}, trying next model", reason);
                    last_reason = Some(reason);
                }
            }
        }

        Err(match last_reason {
            Some(reason) => RelayError::ModelUnavailable { reason },
            None => RelayError::EmptyResponse {
                provider: state.descriptor.display_name.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawapi_core::ProviderRegistry;

    fn claude_params() -> ProtocolParams {
        ProviderRegistry::builtin()
            .get("claude")
            .unwrap()
            .protocol
            .clone()
    }

    #[test]
    fn test_fallback_chain_order_and_dedup() {
        let params = claude_params();
        let chain = fallback_chain(
            &params,
            vec![
                "claude-sonnet-4".to_string(),
                "claude-haiku-4-5-20251001".to_string(),
                "claude-2.1".to_string(),
            ],
        );

        assert_eq!(chain[0], "claude-haiku-4-5-20251001");
        assert_eq!(chain[1], "claude-sonnet-4");
        assert_eq!(chain[2], "claude-2.1");
        assert_eq!(
            &chain[3..],
            &[
                "claude-3-5-sonnet-20240620",
                "claude-3-haiku-20240307",
                "claude-2.0"
            ]
        );
    }

    #[test]
    fn test_fallback_chain_without_probe() {
        let params = claude_params();
        let chain = fallback_chain(&params, Vec::new());
        assert_eq!(chain.len(), 1 + params.legacy_models.len());
    }

    #[test]
    fn test_model_unavailable_detection() {
        let unavailable = r#"{"type":"error","error":{"type":"permission_error","message":"no","details":{"error_code":"model_not_available"}}}"#;
        assert!(is_model_unavailable(unavailable));

        let other_permission =
            r#"{"error":{"type":"permission_error","details":{"error_code":"account_banned"}}}"#;
        assert!(!is_model_unavailable(other_permission));
        assert!(!is_model_unavailable(r#"{"error":{"type":"rate_limit_error"}}"#));
        assert!(!is_model_unavailable("<html>Cloudflare</html>"));
    }
}
