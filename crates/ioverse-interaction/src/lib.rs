//! HTTP interaction layer of the ioverse client.
//!
//! - [`TokenManager`]: credential state, expiry checks, silent refresh
//! - [`AuthenticatedClient`]: bearer attachment with one refresh-and-retry on 401
//! - [`ChatApi`] / [`AccountApi`] / [`AssistantApi`]: typed endpoint facades
//! - [`StreamingEventConsumer`]: server-push event stream reader

pub mod api;
pub mod event_stream;
pub mod pipeline;
pub mod token_manager;
pub mod transport;

pub use api::{AccountApi, AssistantApi, ChatApi};
pub use event_stream::{EventStreamHandler, StreamOutcome, StreamingEventConsumer};
pub use pipeline::AuthenticatedClient;
pub use token_manager::TokenManager;
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestTransport};
