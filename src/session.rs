//! Session identity.
//!
//! The signed-in identity is resolved once at startup (CLI flags, then
//! config file, then environment for the token) and passed explicitly to
//! everything that needs it. Nothing reads identity from globals.

use secrecy::SecretString;
use thiserror::Error;

use crate::config::Config;

/// Environment variable holding the session token.
pub const SESSION_TOKEN_ENV: &str = "SMARTMARKS_SESSION_TOKEN";

const MAX_OWNER_ID_LENGTH: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No user configured. Pass --user <ID> or set user_id in config.toml")]
    MissingOwner,
    #[error("Invalid user id: {0}")]
    InvalidOwner(String),
}

/// Authenticated identity for one session.
///
/// The Debug impl never prints the token.
pub struct SessionContext {
    owner_id: String,
    email: Option<String>,
    token: Option<SecretString>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("owner_id", &self.owner_id)
            .field("email", &self.email)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SessionContext {
    pub fn new(owner_id: &str, email: Option<&str>) -> Result<Self, SessionError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(SessionError::MissingOwner);
        }
        if owner_id.len() > MAX_OWNER_ID_LENGTH {
            return Err(SessionError::InvalidOwner(format!(
                "longer than {} characters",
                MAX_OWNER_ID_LENGTH
            )));
        }
        if owner_id.chars().any(char::is_control) {
            return Err(SessionError::InvalidOwner(
                "contains control characters".to_string(),
            ));
        }

        Ok(Self {
            owner_id: owner_id.to_string(),
            email: email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            token: None,
        })
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Build the session from CLI overrides, the config file and the
    /// environment token (which wins over the config file's token).
    pub fn resolve(
        cli_user: Option<&str>,
        cli_email: Option<&str>,
        config: &Config,
        env_token: Option<String>,
    ) -> Result<Self, SessionError> {
        let owner = cli_user
            .or(config.user_id.as_deref())
            .ok_or(SessionError::MissingOwner)?;
        let email = cli_email.or(config.email.as_deref());
        let session = Self::new(owner, email)?;

        let token = env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| config.session_token.clone());
        Ok(match token {
            Some(token) => session.with_token(SecretString::from(token)),
            None => session,
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Header label: the email when known, otherwise the owner id.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.owner_id)
    }
}
