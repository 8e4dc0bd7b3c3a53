pub mod assistant;
pub mod auth;
pub mod chat;
pub mod stream;
pub mod theme;

use ioverse_core::IoverseError;

/// Turns a client error into the message shown on the terminal.
pub fn user_facing(error: IoverseError) -> anyhow::Error {
    tracing::debug!("[CLI] Command failed: {:?}", error);
    if error.is_authentication() {
        anyhow::anyhow!("{} Run `ioverse login` first.", error.user_message())
    } else {
        anyhow::anyhow!(error.user_message())
    }
}
