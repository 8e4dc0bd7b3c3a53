use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ioverse_application::SessionContext;
use ioverse_core::assistant::GenerationKind;
use ioverse_core::auth::ThemePreference;
use ioverse_infrastructure::{ConfigService, IoversePaths};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "ioverse")]
#[command(about = "Ioverse CLI - chat with the ioverse assistant from the terminal", long_about = None)]
struct Cli {
    /// Directory holding config.toml, state.toml and logs
    #[arg(long, global = true, env = "IOVERSE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session tokens
    Login {
        username: String,
        #[arg(long, env = "IOVERSE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Keep the session across restarts
        #[arg(long, conflicts_with = "session_only")]
        remember: bool,
        /// Keep the session in memory only
        #[arg(long)]
        session_only: bool,
    },
    /// Drop the stored session
    Logout,
    /// Show whether a usable session exists
    Status,
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(long, env = "IOVERSE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        password_confirm: Option<String>,
    },
    /// Request a password reset email
    ResetPassword { email: String },
    /// Manage conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Send a message and print the reply
    Send {
        message: String,
        /// Conversation to continue; starts a new one when omitted
        #[arg(long, short)]
        conversation: Option<i64>,
    },
    /// Follow a server-push event stream until it completes
    Stream {
        /// Absolute URL or path under the API base URL
        target: String,
    },
    /// Manage assistants, threads and vector stores
    Assistant {
        #[command(subcommand)]
        action: AssistantAction,
    },
    /// Show or set the theme preference
    Theme { value: Option<ThemePreference> },
}

#[derive(Subcommand)]
enum AssistantAction {
    /// List assistants
    List,
    /// Create an assistant
    Create {
        name: String,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// System instructions
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Delete an assistant
    Delete { id: String },
    /// List threads
    Threads,
    /// Create an empty thread
    NewThread,
    /// Delete a thread
    DeleteThread { id: String },
    /// Print the messages of a thread
    Messages { thread: String },
    /// Post a user message to a thread
    Post { thread: String, text: String },
    /// Draft instructions, a function tool or a response schema
    Generate {
        /// One of: instructions, function, schema
        kind: GenerationKind,
        prompt: String,
    },
    /// List vector stores
    VectorStores,
    /// Add uploaded files to a vector store
    AddFiles {
        vector_store: String,
        #[arg(required = true)]
        file_ids: Vec<String>,
        /// Print ingestion progress until it completes
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversations
    List,
    /// Print one conversation
    Show { id: i64 },
    /// Rename a conversation
    Rename { id: i64, title: String },
    /// Delete a conversation
    Delete { id: i64 },
    /// Print a conversation shared by link
    Shared { token: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = IoversePaths::new(cli.config_dir.as_deref());
    let config = ConfigService::new(paths.clone()).get_config();
    let _log_guard = logging::init(&config.log_level, paths.logs_dir().ok().as_deref());

    let context =
        SessionContext::new(config, &paths).context("Failed to set up the client session")?;

    match cli.command {
        Commands::Login {
            username,
            password,
            remember,
            session_only,
        } => {
            let remember_me = match (remember, session_only) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::auth::login(&context, &username, &password, remember_me).await?
        }
        Commands::Logout => commands::auth::logout(&context).await,
        Commands::Status => commands::auth::status(&context).await?,
        Commands::Register {
            username,
            email,
            password,
            password_confirm,
        } => {
            let password_confirm = password_confirm.unwrap_or_else(|| password.clone());
            commands::auth::register(&context, username, email, password, password_confirm)
                .await?
        }
        Commands::ResetPassword { email } => {
            commands::auth::reset_password(&context, &email).await?
        }
        Commands::Conversations { action } => match action {
            ConversationAction::List => commands::chat::list(&context).await?,
            ConversationAction::Show { id } => commands::chat::show(&context, id).await?,
            ConversationAction::Rename { id, title } => {
                commands::chat::rename(&context, id, &title).await?
            }
            ConversationAction::Delete { id } => commands::chat::delete(&context, id).await?,
            ConversationAction::Shared { token } => {
                commands::chat::shared(&context, &token).await?
            }
        },
        Commands::Send {
            message,
            conversation,
        } => commands::chat::send(&context, conversation, &message).await?,
        Commands::Stream { target } => commands::stream::follow(&context, &target).await?,
        Commands::Assistant { action } => match action {
            AssistantAction::List => commands::assistant::list(&context).await?,
            AssistantAction::Create {
                name,
                model,
                instructions,
            } => commands::assistant::create(&context, name, model, instructions).await?,
            AssistantAction::Delete { id } => commands::assistant::delete(&context, &id).await?,
            AssistantAction::Threads => commands::assistant::threads(&context).await?,
            AssistantAction::NewThread => commands::assistant::new_thread(&context).await?,
            AssistantAction::DeleteThread { id } => {
                commands::assistant::delete_thread(&context, &id).await?
            }
            AssistantAction::Messages { thread } => {
                commands::assistant::messages(&context, &thread).await?
            }
            AssistantAction::Post { thread, text } => {
                commands::assistant::post(&context, &thread, &text).await?
            }
            AssistantAction::Generate { kind, prompt } => {
                commands::assistant::generate(&context, kind, &prompt).await?
            }
            AssistantAction::VectorStores => commands::assistant::vector_stores(&context).await?,
            AssistantAction::AddFiles {
                vector_store,
                file_ids,
                follow,
            } => commands::assistant::add_files(&context, &vector_store, file_ids, follow).await?,
        },
        Commands::Theme { value } => commands::theme::run(&context, value)?,
    }

    Ok(())
}
