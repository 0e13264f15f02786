pub mod adapter;
pub mod claude;
pub mod event_stream;
pub mod query_dump;

pub use adapter::{AdapterOptions, ProtocolAdapter, RelayError, UnimplementedAdapter, adapter_for};
