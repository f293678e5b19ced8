//! The `examkit logout` command.

use anyhow::Result;

use examkit_core::auth;

use super::{login, Context};

pub async fn execute(ctx: &Context, user: String, password: String) -> Result<()> {
    let store = ctx.open_store().await?;
    let user = login(&store, &user, &password).await?;
    let purged = auth::logout(store.as_ref(), &user).await?;
    store.close().await;

    println!(
        "Logged out {}; discarded {purged} in-progress attempt(s).",
        user.username
    );
    Ok(())
}
