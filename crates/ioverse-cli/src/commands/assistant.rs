use anyhow::Result;
use serde_json::Value;

use ioverse_application::{SessionContext, file_batch_stream_target};
use ioverse_core::assistant::{AssistantParams, GenerationKind, ThreadMessage};

use super::stream::{PrintHandler, finish};
use super::user_facing;

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| {
                part.pointer("/text/value")
                    .or_else(|| part.get("text"))
                    .and_then(Value::as_str)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn print_message(message: &ThreadMessage) {
    println!("{}: {}", message.role, content_text(&message.content));
}

pub async fn list(context: &SessionContext) -> Result<()> {
    let assistants = context
        .assistants()
        .assistants()
        .await
        .map_err(user_facing)?;

    if assistants.is_empty() {
        println!("No assistants yet");
    }
    for assistant in &assistants {
        println!(
            "{:<32} {:<30} {}",
            assistant.id,
            assistant.name.as_deref().unwrap_or("(unnamed)"),
            assistant.model.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn create(
    context: &SessionContext,
    name: String,
    model: String,
    instructions: Option<String>,
) -> Result<()> {
    let params = AssistantParams {
        name: Some(name),
        model: Some(model),
        instructions,
        ..Default::default()
    };
    let created = context
        .assistants()
        .create_assistant(&params)
        .await
        .map_err(user_facing)?;
    println!("Created assistant {}", created.id);
    Ok(())
}

pub async fn delete(context: &SessionContext, id: &str) -> Result<()> {
    context
        .assistants()
        .delete_assistant(id)
        .await
        .map_err(user_facing)?;
    println!("Deleted assistant {}", id);
    Ok(())
}

pub async fn threads(context: &SessionContext) -> Result<()> {
    let threads = context.assistants().threads().await.map_err(user_facing)?;
    if threads.is_empty() {
        println!("No threads yet");
    }
    for thread in &threads {
        println!("{}", thread.id);
    }
    Ok(())
}

pub async fn new_thread(context: &SessionContext) -> Result<()> {
    let thread = context
        .assistants()
        .create_thread()
        .await
        .map_err(user_facing)?;
    println!("Created thread {}", thread.id);
    Ok(())
}

pub async fn delete_thread(context: &SessionContext, id: &str) -> Result<()> {
    context
        .assistants()
        .delete_thread(id)
        .await
        .map_err(user_facing)?;
    println!("Deleted thread {}", id);
    Ok(())
}

pub async fn messages(context: &SessionContext, thread_id: &str) -> Result<()> {
    let messages = context
        .assistants()
        .messages(thread_id)
        .await
        .map_err(user_facing)?;
    for message in &messages {
        print_message(message);
    }
    Ok(())
}

pub async fn post(context: &SessionContext, thread_id: &str, text: &str) -> Result<()> {
    let stored = context
        .assistants()
        .post_message(thread_id, text)
        .await
        .map_err(user_facing)?;
    print_message(&stored);
    Ok(())
}

pub async fn generate(context: &SessionContext, kind: GenerationKind, prompt: &str) -> Result<()> {
    let generated = context
        .assistants()
        .generate(kind, prompt)
        .await
        .map_err(user_facing)?;
    match &generated.message {
        Value::String(text) => println!("{}", text),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

pub async fn vector_stores(context: &SessionContext) -> Result<()> {
    let stores = context
        .assistants()
        .vector_stores()
        .await
        .map_err(user_facing)?;
    for store in &stores {
        println!(
            "{:<32} {:<30} {}",
            store.id,
            store.name.as_deref().unwrap_or("(unnamed)"),
            store.status.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Adds files to a vector store and, with `follow`, prints ingestion
/// progress until the server reports completion.
pub async fn add_files(
    context: &SessionContext,
    vector_store_id: &str,
    file_ids: Vec<String>,
    follow: bool,
) -> Result<()> {
    let workspace = context.assistants();
    let batch = workspace
        .add_files(vector_store_id, file_ids)
        .await
        .map_err(user_facing)?;
    println!("Started file batch {}", batch.id);

    if !follow {
        return Ok(());
    }
    let mut handler = PrintHandler::default();
    let outcome = workspace
        .follow_ingestion(&file_batch_stream_target(&batch), &mut handler)
        .await
        .map_err(user_facing)?;
    finish(outcome)
}
