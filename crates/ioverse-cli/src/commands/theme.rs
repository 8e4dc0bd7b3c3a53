use anyhow::{Context, Result};

use ioverse_application::SessionContext;
use ioverse_core::auth::ThemePreference;

pub fn run(context: &SessionContext, value: Option<ThemePreference>) -> Result<()> {
    match value {
        Some(theme) => {
            context
                .theme()
                .set(theme)
                .context("Failed to save theme preference")?;
            println!("Theme set to {}", theme);
        }
        None => {
            let theme = context
                .theme()
                .get()
                .context("Failed to read theme preference")?
                .unwrap_or_default();
            println!("{}", theme);
        }
    }
    Ok(())
}
