use anyhow::Result;

use ioverse_application::SessionContext;
use ioverse_core::chat::{Conversation, Message, Sender};

use super::user_facing;

fn print_message(message: &Message) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    println!("[{}] {}: {}", message.timestamp, who, message.message_body);
}

fn print_conversation(conversation: &Conversation) {
    println!(
        "#{} {}",
        conversation.id,
        conversation.title.as_deref().unwrap_or("(untitled)")
    );
    for message in &conversation.messages {
        print_message(message);
    }
}

pub async fn list(context: &SessionContext) -> Result<()> {
    let list = context
        .conversations()
        .conversations()
        .await
        .map_err(user_facing)?;

    if list.results.is_empty() {
        println!("No conversations yet");
    }
    for conversation in &list.results {
        println!(
            "#{:<6} {:<40} {} messages",
            conversation.id,
            conversation.title.as_deref().unwrap_or("(untitled)"),
            conversation.messages.len()
        );
    }
    Ok(())
}

pub async fn show(context: &SessionContext, id: i64) -> Result<()> {
    let conversation = context.conversations().open(id).await.map_err(user_facing)?;
    print_conversation(&conversation);
    Ok(())
}

pub async fn rename(context: &SessionContext, id: i64, title: &str) -> Result<()> {
    context
        .conversations()
        .rename(id, title)
        .await
        .map_err(user_facing)?;
    println!("Renamed conversation #{}", id);
    Ok(())
}

pub async fn delete(context: &SessionContext, id: i64) -> Result<()> {
    context
        .conversations()
        .delete(id)
        .await
        .map_err(user_facing)?;
    println!("Deleted conversation #{}", id);
    Ok(())
}

pub async fn shared(context: &SessionContext, token: &str) -> Result<()> {
    let conversation = context
        .chat_api()
        .shared_conversation(token)
        .await
        .map_err(user_facing)?;
    print_conversation(&conversation);
    Ok(())
}

pub async fn send(context: &SessionContext, conversation: Option<i64>, body: &str) -> Result<()> {
    if let Some(id) = conversation {
        // Load the conversation so the reply is patched into the cached list.
        context.conversations().open(id).await.map_err(user_facing)?;
    }

    let response = context
        .chat_send()
        .send(conversation, body)
        .await
        .map_err(user_facing)?;

    if conversation.is_none()
        && let Some(id) = response.conversation_id()
    {
        println!("Started conversation #{}", id);
    }
    print_message(&response.ai_message);
    Ok(())
}
