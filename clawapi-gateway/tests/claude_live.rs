//! Live relay through a real claude.ai session (requires --features live-tests).
//!
//! Uses the session stored under `CLAWAPI_HOME` (or `~/.clawapi`).
//! Run with: cargo test --features live-tests --test claude_live

#[cfg(feature = "live-tests")]
use clawapi_core::{Paths, ProviderRegistry, SessionStore};
#[cfg(feature = "live-tests")]
use clawapi_gateway::providers::claude::ClaudeWebClient;
#[cfg(feature = "live-tests")]
use clawapi_gateway::providers::{AdapterOptions, ProtocolAdapter};
#[cfg(feature = "live-tests")]
use clawapi_gateway::runtime::RuntimeState;

#[cfg(feature = "live-tests")]
fn load_claude_state() -> Option<RuntimeState> {
    clawapi_core::load_dotenv();

    let paths = Paths::resolve()?;
    let registry = ProviderRegistry::builtin();
    let descriptor = registry.get("claude")?.clone();
    let store = SessionStore::new(paths.sessions_dir());

    match store.load(&descriptor) {
        Ok(credentials) => Some(RuntimeState::new(descriptor, credentials)),
        Err(e) => {
            eprintln!("No usable claude session ({e}); skipping Claude live test.");
            None
        }
    }
}

#[cfg(feature = "live-tests")]
#[tokio::test]
async fn test_claude_live_relay() {
    let Some(state) = load_claude_state() else {
        return;
    };
    let client = ClaudeWebClient::new("claude", &AdapterOptions::default()).unwrap();

    let reply = client
        .complete(&state, "Reply with exactly the word: pong")
        .await
        .expect("relay cycle failed");

    assert!(
        reply.to_lowercase().contains("pong"),
        "unexpected reply: {reply}"
    );
}
