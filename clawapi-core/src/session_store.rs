//! Persisted provider sessions.
//!
//! A session is the cookie collection and user agent captured by the login
//! collaborator, stored as `sessions/<provider>/cookies.json` and
//! `sessions/<provider>/userAgent.txt`. The store never writes them; it only
//! decides whether they qualify as an authenticated identity and turns them
//! into request headers.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registry::ProviderDescriptor;

pub const COOKIES_FILE: &str = "cookies.json";
pub const USER_AGENT_FILE: &str = "userAgent.txt";

/// A collection must hold more than this many cookies to qualify when the
/// provider declares no identity cookie.
pub const MIN_COOKIE_COUNT: usize = 3;

/// User agent used when the login collaborator captured none.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One persisted cookie. Browser exports carry more fields (domain, expiry,
/// flags); only the pair is relevant for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
}

/// Headers derived from a validated session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub cookie_header: String,
    pub user_agent: String,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("cookie_header", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Why a session could not be used.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No {COOKIES_FILE} found for '{provider}'. Please re-authenticate.")]
    Missing { provider: String },

    #[error("Failed to read session for '{provider}': {source}")]
    Io {
        provider: String,
        #[source]
        source: io::Error,
    },

    #[error("Session cookies for '{provider}' are not a valid cookie list: {source}")]
    Parse {
        provider: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session for '{provider}' has no cookies")]
    Empty { provider: String },

    #[error("Session for '{provider}' does not look authenticated ({reason})")]
    NotQualified { provider: String, reason: String },
}

/// Decide whether a cookie collection proves a logged-in identity.
///
/// With a declared identity set, one matching cookie is required and
/// sufficient. Without one, more than [`MIN_COOKIE_COUNT`] cookies are needed.
pub fn qualifies(cookies: &[StoredCookie], identity_cookies: &[String]) -> Result<(), String> {
    if cookies.is_empty() {
        return Err("no cookies".to_string());
    }
    if !identity_cookies.is_empty() {
        return if cookies
            .iter()
            .any(|c| identity_cookies.iter().any(|id| id == &c.name))
        {
            Ok(())
        } else {
            Err(format!(
                "missing identity cookie ({})",
                identity_cookies.join(", ")
            ))
        };
    }
    if cookies.len() > MIN_COOKIE_COUNT {
        Ok(())
    } else {
        Err(format!(
            "only {} cookies, need more than {}",
            cookies.len(),
            MIN_COOKIE_COUNT
        ))
    }
}

/// Join cookies into a single `Cookie` header value.
pub fn cookie_header(cookies: &[StoredCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// File-backed session store rooted at the `sessions/` directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn session_dir(&self, provider: &str) -> PathBuf {
        self.sessions_dir.join(provider)
    }

    /// Read and parse the cookie collection without judging it.
    pub fn read_cookies(&self, provider: &str) -> Result<Vec<StoredCookie>, SessionError> {
        let path = self.session_dir(provider).join(COOKIES_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SessionError::Missing {
                    provider: provider.to_string(),
                });
            }
            Err(source) => {
                return Err(SessionError::Io {
                    provider: provider.to_string(),
                    source,
                });
            }
        };

        let cookies: Vec<StoredCookie> =
            serde_json::from_str(&raw).map_err(|source| SessionError::Parse {
                provider: provider.to_string(),
                source,
            })?;
        if cookies.is_empty() {
            return Err(SessionError::Empty {
                provider: provider.to_string(),
            });
        }
        Ok(cookies)
    }

    /// Read the cookie collection and apply the qualification heuristic.
    pub fn inspect(&self, provider: &ProviderDescriptor) -> Result<Vec<StoredCookie>, SessionError> {
        let cookies = self.read_cookies(&provider.name)?;
        qualifies(&cookies, &provider.protocol.identity_cookies).map_err(|reason| {
            SessionError::NotQualified {
                provider: provider.name.clone(),
                reason,
            }
        })?;
        Ok(cookies)
    }

    /// Whether the provider has a session that qualifies as authenticated.
    pub fn validate(&self, provider: &ProviderDescriptor) -> bool {
        self.inspect(provider).is_ok()
    }

    /// Load a qualifying session as request credentials.
    pub fn load(&self, provider: &ProviderDescriptor) -> Result<SessionCredentials, SessionError> {
        let cookies = self.inspect(provider)?;
        Ok(SessionCredentials {
            cookie_header: cookie_header(&cookies),
            user_agent: self.read_user_agent(&provider.name),
        })
    }

    fn read_user_agent(&self, provider: &str) -> String {
        let path = self.session_dir(provider).join(USER_AGENT_FILE);
        match fs::read_to_string(&path) {
            Ok(ua) if !ua.trim().is_empty() => ua.trim().to_string(),
            _ => {
                warn!("No {} for '{}', using default UA", USER_AGENT_FILE, provider);
                DEFAULT_USER_AGENT.to_string()
            }
        }
    }

    /// Delete the whole session directory. Returns `false` if none existed.
    pub fn reset(&self, provider: &str) -> io::Result<bool> {
        let dir = self.session_dir(provider);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(dir)?;
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::registry::ProviderRegistry;

    pub(crate) fn cookie(name: &str) -> StoredCookie {
        StoredCookie {
            name: name.to_string(),
            value: format!("{name}-value"),
        }
    }

    pub(crate) fn write_session(store: &SessionStore, provider: &str, cookies: &[StoredCookie]) {
        let dir = store.session_dir(provider);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(COOKIES_FILE),
            serde_json::to_string(cookies).unwrap(),
        )
        .unwrap();
    }

    fn claude() -> ProviderDescriptor {
        ProviderRegistry::builtin().get("claude").cloned().unwrap()
    }

    #[test]
    fn test_qualifies_count_fallback() {
        let three = vec![cookie("a"), cookie("b"), cookie("c")];
        assert!(qualifies(&three, &[]).is_err());

        let four = vec![cookie("a"), cookie("b"), cookie("c"), cookie("d")];
        assert!(qualifies(&four, &[]).is_ok());
        assert!(qualifies(&[], &[]).is_err());
    }

    #[test]
    fn test_qualifies_identity_cookie() {
        let identity = vec!["sessionKey".to_string()];

        let tracking_only = vec![cookie("a"), cookie("b"), cookie("c"), cookie("d"), cookie("e")];
        assert!(qualifies(&tracking_only, &identity).is_err());

        let with_identity = vec![cookie("sessionKey")];
        assert!(qualifies(&with_identity, &identity).is_ok());
    }

    #[test]
    fn test_cookie_header_joins_pairs() {
        let cookies = vec![cookie("a"), cookie("b")];
        assert_eq!(cookie_header(&cookies), "a=a-value; b=b-value");
    }

    #[test]
    fn test_browser_export_parses() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let session = store.session_dir("claude");
        fs::create_dir_all(&session).unwrap();
        fs::write(
            session.join(COOKIES_FILE),
            r#"[{"name":"sessionKey","value":"sk-1","domain":".claude.ai","path":"/","httpOnly":true}]"#,
        )
        .unwrap();
        fs::write(session.join(USER_AGENT_FILE), "TestAgent/1.0\n").unwrap();

        let creds = store.load(&claude()).unwrap();
        assert_eq!(creds.cookie_header, "sessionKey=sk-1");
        assert_eq!(creds.user_agent, "TestAgent/1.0");
        assert!(!format!("{creds:?}").contains("sk-1"));
    }

    #[test]
    fn test_missing_and_invalid_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let claude = claude();

        assert!(matches!(
            store.load(&claude),
            Err(SessionError::Missing { .. })
        ));

        let session = store.session_dir("claude");
        fs::create_dir_all(&session).unwrap();
        fs::write(session.join(COOKIES_FILE), r#"{"cookieString":"a=b"}"#).unwrap();
        assert!(matches!(
            store.load(&claude),
            Err(SessionError::Parse { .. })
        ));

        fs::write(session.join(COOKIES_FILE), "[]").unwrap();
        assert!(matches!(store.load(&claude), Err(SessionError::Empty { .. })));

        write_session(&store, "claude", &[cookie("cf_clearance"), cookie("_ga")]);
        assert!(matches!(
            store.load(&claude),
            Err(SessionError::NotQualified { .. })
        ));
        assert!(!store.validate(&claude));
    }

    #[test]
    fn test_default_user_agent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        write_session(&store, "claude", &[cookie("sessionKey")]);

        let creds = store.load(&claude()).unwrap();
        assert_eq!(creds.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_reset_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        write_session(&store, "claude", &[cookie("sessionKey")]);

        assert!(store.validate(&claude()));
        assert!(store.reset("claude").unwrap());
        assert!(!store.session_dir("claude").exists());
        assert!(!store.reset("claude").unwrap());
    }
}
