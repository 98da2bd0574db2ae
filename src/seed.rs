use tracing::info;

use crate::auth::password::hash_password;
use crate::auth::repo_types::{NewUser, Role};
use crate::state::AppState;

/// Demo accounts for local development. Existing usernames are left
/// untouched, so the command is safe to re-run.
pub async fn run(state: &AppState) -> anyhow::Result<()> {
    let demo = [
        ("user1", "user123", "User One", "user1@example.com", Role::User),
        ("admin1", "admin123", "Admin One", "admin1@example.com", Role::Admin),
        ("user2", "user123", "User Two", "user2@example.com", Role::User),
    ];

    for (username, password, name, email, role) in demo {
        if state.users.find_by_username(username).await?.is_some() {
            info!(%username, "seed: user already exists, skipping");
            continue;
        }
        let user = state
            .users
            .insert_user(NewUser {
                username: username.into(),
                password_hash: hash_password(password)?,
                name: name.into(),
                email: email.into(),
                role,
            })
            .await?;
        info!(user_id = %user.id, %username, role = role.as_str(), "seed: user created");
    }
    Ok(())
}
