//! The `examkit register` command.

use anyhow::{Context as _, Result};

use examkit_core::auth;
use examkit_core::model::{NewUser, Role};

use super::Context;

pub async fn execute(
    ctx: &Context,
    username: String,
    password: String,
    name: String,
    role: String,
) -> Result<()> {
    let role: Role = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let store = ctx.open_store().await?;
    let user = auth::register(
        store.as_ref(),
        &NewUser {
            username,
            password,
            display_name: name,
            role,
        },
    )
    .await
    .context("registration failed")?;
    store.close().await;

    println!(
        "Registered {} ({}) with id {}",
        user.username, user.role, user.id
    );
    Ok(())
}
