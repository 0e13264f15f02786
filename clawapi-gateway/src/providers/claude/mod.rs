pub mod client;

pub use client::{ClaudeWebClient, fallback_chain};
