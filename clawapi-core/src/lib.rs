pub mod config;
pub mod message;
pub mod registry;
pub mod session_archive;
pub mod session_store;

// Config re-exports
pub use config::{
    Config, ConfigError, GatewaySettings, LoggingSettings, Paths, RelaySettings, Settings,
    SettingsError, load_dotenv,
};

// Message re-exports
pub use message::{ChatMessage, ContentPart, MessageContent, MessageRole, flatten_prompt};

pub use registry::{ProtocolKind, ProtocolParams, ProviderDescriptor, ProviderRegistry};
pub use session_archive::{ArchiveError, export_session, import_session};
pub use session_store::{SessionCredentials, SessionError, SessionStore, StoredCookie};
