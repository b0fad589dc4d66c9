use super::auth::{AuthToken, AuthTokenValue, UserAuthCredentials};
use super::UserStore;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::SystemTime;

/// Account and session operations on top of a [`UserStore`].
pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    /// Creates a new account with password credentials, returning the user id.
    pub fn register_user(&self, user_handle: &str, password: &str) -> Result<usize> {
        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.");
        }
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle already exists.");
        }

        let user_id = self.user_store.create_user(user_handle)?;
        self.user_store
            .update_user_auth_credentials(UserAuthCredentials::from_password(user_id, password)?)?;
        Ok(user_id)
    }

    /// Sets or replaces the password of an existing user.
    pub fn set_user_password(&self, user_handle: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        let user_id = self
            .user_store
            .get_user_id(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        self.user_store
            .update_user_auth_credentials(UserAuthCredentials::from_password(user_id, password)?)
    }

    /// Checks a handle/password pair, returning the user id on success and
    /// `None` for unknown users or wrong passwords alike.
    pub fn verify_password(&self, user_handle: &str, password: &str) -> Result<Option<usize>> {
        match self.user_store.get_user_auth_credentials(user_handle)? {
            None => Ok(None),
            Some(credentials) => {
                if credentials.hasher.verify(password, &credentials.hash)? {
                    Ok(Some(credentials.user_id))
                } else {
                    Ok(None)
                }
            }
        }
    }

    pub fn generate_auth_token(&self, user_id: usize) -> Result<AuthToken> {
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_user_auth_token(token.clone())?;
        Ok(token)
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.get_user_auth_token(value)
    }

    pub fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .update_user_auth_token_last_used_timestamp(value)
    }

    /// Deletes an auth token owned by the given user. Deleting someone
    /// else's token is refused and leaves the token in place.
    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        match self.user_store.delete_user_auth_token(token_value)? {
            Some(removed) => {
                if removed.user_id == user_id {
                    Ok(())
                } else {
                    let _ = self.user_store.add_user_auth_token(removed.clone());
                    bail!(
                        "User {} tried to delete a token owned by user {}",
                        user_id,
                        removed.user_id
                    );
                }
            }
            None => bail!("Auth token not found"),
        }
    }

    pub fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.user_store.get_user_handle(user_id)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.get_all_user_handles()
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store.prune_unused_auth_tokens(unused_for_days)
    }
}
