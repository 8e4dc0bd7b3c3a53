use anyhow::Result;
use serde_json::Value;

use ioverse_application::SessionContext;
use ioverse_core::IoverseError;
use ioverse_interaction::{EventStreamHandler, StreamOutcome};

use super::user_facing;

/// Prints every payload as one JSON line.
#[derive(Default)]
pub struct PrintHandler {
    received: usize,
}

impl EventStreamHandler for PrintHandler {
    fn on_message(&mut self, payload: &Value) {
        self.received += 1;
        println!("{}", payload);
    }

    fn on_complete(&mut self, _payload: &Value) {
        tracing::info!("[CLI] Stream completed after {} events", self.received);
    }

    fn on_error(&mut self, error: &IoverseError) {
        eprintln!("Stream closed: {}", error.user_message());
    }
}

pub async fn follow(context: &SessionContext, target: &str) -> Result<()> {
    // Streams cannot refresh mid-flight, so start with a usable token.
    context
        .chat_api()
        .client()
        .usable_access_token()
        .await
        .map_err(user_facing)?;

    let mut handler = PrintHandler::default();
    let outcome = context
        .events()
        .connect(target, &mut handler)
        .await
        .map_err(user_facing)?;
    finish(outcome)
}

pub fn finish(outcome: StreamOutcome) -> Result<()> {
    match outcome {
        StreamOutcome::Completed(_) => Ok(()),
        StreamOutcome::Failed(e) => Err(user_facing(e)),
    }
}
