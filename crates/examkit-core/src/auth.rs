//! Toy account handling: plaintext login, registration and logout.
//!
//! There is no security model here. The session machine trusts whatever
//! [`User`] these helpers hand back.

use crate::error::{ExamError, Result};
use crate::model::{NewUser, User};
use crate::traits::{ExamStore, UserStore};

/// Look up `username` and compare `password` in plaintext.
#[tracing::instrument(skip(store, password))]
pub async fn login(store: &dyn UserStore, username: &str, password: &str) -> Result<User> {
    let username = username.trim();
    let password = password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ExamError::validation("username and password required"));
    }

    match store.find_user_by_username(username).await? {
        Some(user) if user.password == password => {
            tracing::info!(user_id = user.id, role = %user.role, "login succeeded");
            Ok(user)
        }
        _ => Err(ExamError::Unauthorized(
            "invalid username or password".into(),
        )),
    }
}

/// Create an account. Usernames are unique.
#[tracing::instrument(skip_all, fields(username = %new_user.username))]
pub async fn register(store: &dyn UserStore, new_user: &NewUser) -> Result<User> {
    let username = new_user.username.trim();
    if username.is_empty() || new_user.password.trim().is_empty() {
        return Err(ExamError::validation("username and password required"));
    }
    if new_user.display_name.trim().is_empty() {
        return Err(ExamError::validation("display name required"));
    }
    if store.find_user_by_username(username).await?.is_some() {
        return Err(ExamError::validation("username already exists"));
    }

    let user = store
        .insert_user(&NewUser {
            username: username.to_string(),
            password: new_user.password.trim().to_string(),
            display_name: new_user.display_name.trim().to_string(),
            role: new_user.role,
        })
        .await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok(user)
}

/// Log `user` out, purging every in-flight progress row they own.
///
/// Returns how many rows were removed. The purge cannot be undone.
#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn logout(store: &dyn ExamStore, user: &User) -> Result<u64> {
    let purged = store.delete_progress_for_user(user.id).await?;
    tracing::info!(purged, "user logged out");
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::{QuizProgress, Role};
    use chrono::Utc;

    fn student() -> NewUser {
        NewUser {
            username: "student".into(),
            password: "password123".into(),
            display_name: "Student One".into(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let store = MemoryStore::new();
        let user = register(&store, &student()).await.unwrap();
        let logged_in = login(&store, " student ", "password123 ").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(logged_in.role, Role::Student);
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = MemoryStore::new();
        register(&store, &student()).await.unwrap();
        let err = register(&store, &student()).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let store = MemoryStore::new();
        register(&store, &student()).await.unwrap();
        let err = login(&store, "student", "nope").await.unwrap_err();
        assert!(matches!(err, ExamError::Unauthorized(_)));
        let err = login(&store, "", "").await.unwrap_err();
        assert!(matches!(err, ExamError::Validation(_)));
    }

    #[tokio::test]
    async fn logout_purges_progress() {
        let store = MemoryStore::new();
        let user = register(&store, &student()).await.unwrap();
        for exam_id in [1, 2] {
            store
                .upsert_progress(&QuizProgress {
                    exam_id,
                    user_id: user.id,
                    answers: [(0, 1)].into_iter().collect(),
                    last_updated: Utc::now(),
                    time_left_secs: 30,
                })
                .await
                .unwrap();
        }

        assert_eq!(logout(&store, &user).await.unwrap(), 2);
        assert_eq!(store.progress_rows(), 0);
    }
}
