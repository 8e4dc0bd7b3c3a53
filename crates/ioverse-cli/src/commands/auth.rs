use anyhow::Result;

use ioverse_application::{AuthStatus, SessionContext};
use ioverse_core::account::RegisterRequest;

use super::user_facing;

pub async fn login(
    context: &SessionContext,
    username: &str,
    password: &str,
    remember_me: Option<bool>,
) -> Result<()> {
    context
        .auth()
        .login(username, password, remember_me)
        .await
        .map_err(user_facing)?;

    let user = context.account().current_user().await.map_err(user_facing)?;
    println!("Logged in as {}", user.username);
    Ok(())
}

pub async fn logout(context: &SessionContext) {
    context.auth().logout().await;
    println!("Logged out");
}

pub async fn status(context: &SessionContext) -> Result<()> {
    match context.auth().initialize().await {
        AuthStatus::Authenticated => {
            let user = context.account().current_user().await.map_err(user_facing)?;
            println!("Logged in as {}", user.username);

            let tokens = context.tokens();
            if let Some(expiry) = tokens.access_token_expiry() {
                println!("Access token expires at {}", expiry.to_rfc3339());
            }
            if let Some(expiry) = tokens.refresh_token_expiry() {
                println!("Session expires at {}", expiry.to_rfc3339());
            }
        }
        AuthStatus::Unauthenticated => println!("Not logged in"),
    }
    Ok(())
}

pub async fn register(
    context: &SessionContext,
    username: String,
    email: String,
    password: String,
    password_confirm: String,
) -> Result<()> {
    let request = RegisterRequest {
        username,
        email,
        password,
        password_confirm,
    };

    match context.account().register(&request).await {
        Ok(()) => {
            println!("Account created. You can now log in.");
            Ok(())
        }
        Err(e) => {
            if let Some(errors) = e.validation_errors() {
                for (field, messages) in errors.fields() {
                    for message in messages {
                        eprintln!("{}: {}", field, message);
                    }
                }
                anyhow::bail!("Registration failed");
            }
            Err(user_facing(e))
        }
    }
}

pub async fn reset_password(context: &SessionContext, email: &str) -> Result<()> {
    let response = context
        .account()
        .reset_password(email)
        .await
        .map_err(user_facing)?;
    println!("{}", response.message);
    Ok(())
}
