use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A configured assistant.
///
/// Fields the client does not interpret (tools, response format, sampling
/// settings) are kept in `extra` so an update sends them back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of assistant create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A conversation thread with an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a thread update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message stored in a thread.
///
/// `content` is either plain text or a list of typed parts (text, image
/// file references).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /assistant/message/{thread_id}/create/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThreadMessage {
    pub thread_id: String,
    pub role: String,
    pub content: Value,
}

impl NewThreadMessage {
    pub fn user_text(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            role: "user".to_string(),
            content: Value::String(text.into()),
        }
    }
}

/// An uploaded file available to assistants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A vector store used by the file-search tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `in_progress`, `completed` or `expired`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub file_counts: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of vector store create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of a vector store create.
///
/// A store created with files is still ingesting them; the server then
/// returns a status stream URL to follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorStoreCreated {
    Ingesting {
        vector_store: VectorStore,
        sse_url: String,
    },
    Ready(VectorStore),
}

impl VectorStoreCreated {
    pub fn vector_store(&self) -> &VectorStore {
        match self {
            VectorStoreCreated::Ingesting { vector_store, .. } => vector_store,
            VectorStoreCreated::Ready(vector_store) => vector_store,
        }
    }

    pub fn status_stream_url(&self) -> Option<&str> {
        match self {
            VectorStoreCreated::Ingesting { sse_url, .. } => Some(sse_url),
            VectorStoreCreated::Ready(_) => None,
        }
    }
}

/// A file attached to a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreFile {
    pub id: String,
    #[serde(default)]
    pub vector_store_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /assistant/vector_store_batch/create/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBatchRequest {
    pub vector_store_id: String,
    pub file_ids: Vec<String>,
}

/// A batch of files being added to a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBatch {
    pub id: String,
    pub vector_store_id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Absolute URL of the batch status stream.
    #[serde(default)]
    pub sse_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a generate call drafts from a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    SystemInstructions,
    Function,
    Schema,
}

impl GenerationKind {
    pub fn path(&self) -> &'static str {
        match self {
            GenerationKind::SystemInstructions => "/assistant/generate/system_instructions/",
            GenerationKind::Function => "/assistant/generate/function/",
            GenerationKind::Schema => "/assistant/generate/schema/",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationKind::SystemInstructions => "instructions",
            GenerationKind::Function => "function",
            GenerationKind::Schema => "schema",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for GenerationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instructions" => Ok(GenerationKind::SystemInstructions),
            "function" => Ok(GenerationKind::Function),
            "schema" => Ok(GenerationKind::Schema),
            other => Err(format!("unknown generation kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Generated draft: text for instructions, a JSON object for functions and
/// schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub message: Value,
}
