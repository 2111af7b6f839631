//! Per-process session context.
//!
//! Holds the feed credential and the time the session started. Built once
//! at startup and passed by reference to whatever needs it.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config::AppConfig;

#[derive(Debug)]
pub struct Session {
    api_key: Option<SecretString>,
    pub opened_at: DateTime<Utc>,
}

impl Session {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()).map(SecretString::new),
            opened_at: Utc::now(),
        }
    }

    /// Read the credential from the environment variable `env_name`.
    /// A missing variable yields a session without a credential; feeds
    /// that need one will fail when fetching.
    pub fn from_env(env_name: &str) -> Self {
        match AppConfig::resolve_env(env_name) {
            Ok(key) => {
                info!(env = env_name, "Loaded feed credential");
                Self::new(Some(key))
            }
            Err(_) => {
                warn!(env = env_name, "Feed credential not set");
                Self::new(None)
            }
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }
}
