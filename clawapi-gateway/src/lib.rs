pub mod error;
pub mod providers;
pub mod runtime;
pub mod serializer;
pub mod server;
pub mod state;

pub use error::GatewayError;
pub use providers::{ProtocolAdapter, RelayError};
pub use runtime::{ProviderRuntime, RuntimeState};
pub use state::AppState;
