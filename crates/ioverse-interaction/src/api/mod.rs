//! Typed endpoint facades over the request pipeline.

mod account;
mod assistant;
mod chat;

pub use account::AccountApi;
pub use assistant::{AssistantApi, file_batch_status_path, vector_store_status_path};
pub use chat::ChatApi;
