//! Static catalog of supported upstream providers.
//!
//! Each descriptor carries everything an adapter needs to impersonate the
//! provider's own web client: base URL, header template, the preferred and
//! legacy model identifiers for the fallback chain, and the cookie names that
//! prove an authenticated identity.

use serde::Serialize;

/// Which upstream protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// claude.ai web protocol (organizations / chat_conversations / completion)
    ClaudeWeb,
    /// Registered and loginable, but no relay adapter exists yet
    Unsupported,
}

/// Provider-specific protocol parameters.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolParams {
    pub kind: ProtocolKind,
    /// Headers sent with every upstream call, mimicking the browser client.
    /// `Cookie` and `User-Agent` are added from the session at runtime.
    pub header_template: Vec<(String, String)>,
    /// Model tried first, before anything the account probe returns.
    pub preferred_model: Option<String>,
    /// Known-stable models tried last.
    pub legacy_models: Vec<String>,
    /// Cookie names whose presence proves a logged-in identity.
    pub identity_cookies: Vec<String>,
}

/// Immutable description of one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub display_name: String,
    pub vendor: String,
    pub base_url: String,
    pub login_url: String,
    pub notes: String,
    pub protocol: ProtocolParams,
}

impl ProviderDescriptor {
    /// Point the descriptor at a different upstream host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn claude() -> Self {
        let headers = [
            ("Accept", "application/json, text/event-stream"),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Content-Type", "application/json"),
            (
                "Sec-Ch-Ua",
                r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
            ),
            ("Sec-Ch-Ua-Mobile", "?0"),
            ("Sec-Ch-Ua-Platform", r#""Windows""#),
            ("Sec-Fetch-Dest", "empty"),
            ("Sec-Fetch-Mode", "cors"),
            ("Sec-Fetch-Site", "same-origin"),
            ("anthropic-client-version", "5.4.3"),
            ("anthropic-client-sha", "da0583fac"),
        ];

        Self {
            name: "claude".to_string(),
            display_name: "Claude".to_string(),
            vendor: "Anthropic".to_string(),
            base_url: "https://claude.ai".to_string(),
            login_url: "https://claude.ai/login".to_string(),
            notes: "Free tier available. Login via email or Google.".to_string(),
            protocol: ProtocolParams {
                kind: ProtocolKind::ClaudeWeb,
                header_template: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                preferred_model: Some("claude-haiku-4-5-20251001".to_string()),
                legacy_models: [
                    "claude-3-5-sonnet-20240620",
                    "claude-3-haiku-20240307",
                    "claude-2.1",
                    "claude-2.0",
                ]
                .iter()
                .map(|m| m.to_string())
                .collect(),
                identity_cookies: vec!["sessionKey".to_string()],
            },
        }
    }

    fn chatgpt() -> Self {
        Self {
            name: "chatgpt".to_string(),
            display_name: "ChatGPT".to_string(),
            vendor: "OpenAI".to_string(),
            base_url: "https://chatgpt.com".to_string(),
            login_url: "https://chatgpt.com/auth/login".to_string(),
            notes: "Session capture only; relay not implemented yet.".to_string(),
            protocol: ProtocolParams {
                kind: ProtocolKind::Unsupported,
                header_template: Vec::new(),
                preferred_model: None,
                legacy_models: Vec::new(),
                identity_cookies: vec!["__Secure-next-auth.session-token".to_string()],
            },
        }
    }
}

/// Ordered, read-only set of provider descriptors.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Registry built from an explicit list (registration order is kept).
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        Self { providers }
    }

    /// The providers shipped with clawapi.
    pub fn builtin() -> Self {
        Self::new(vec![
            ProviderDescriptor::claude(),
            ProviderDescriptor::chatgpt(),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.iter()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.names(), vec!["claude", "chatgpt"]);
        assert!(registry.exists("claude"));
        assert!(!registry.exists("bard"));

        let claude = registry.get("claude").unwrap();
        assert_eq!(claude.protocol.kind, ProtocolKind::ClaudeWeb);
        assert_eq!(claude.protocol.identity_cookies, vec!["sessionKey"]);
        assert_eq!(
            claude.protocol.preferred_model.as_deref(),
            Some("claude-haiku-4-5-20251001")
        );
        assert_eq!(claude.protocol.legacy_models.last().unwrap(), "claude-2.0");
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let claude = ProviderRegistry::builtin()
            .get("claude")
            .cloned()
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/");
        assert_eq!(claude.base_url, "http://127.0.0.1:9999");
    }
}
