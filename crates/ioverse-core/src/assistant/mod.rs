//! Assistant workspace domain module.
//!
//! Assistants, threads and their messages, uploaded files, vector stores,
//! and the prompt-driven generators behind the configuration screens.

mod model;

pub use model::{
    Assistant, AssistantFile, AssistantParams, FileBatch, FileBatchRequest, GenerateRequest,
    GenerateResponse, GenerationKind, NewThreadMessage, Thread, ThreadMessage, ThreadParams,
    VectorStore, VectorStoreCreated, VectorStoreFile, VectorStoreParams,
};
