//! Credential sources
//!
//! The credential is an opaque bearer string obtained elsewhere. Sources are
//! asked for it on demand, so a revoked or rotated token is picked up on the
//! next `refresh_credential`.

use std::sync::RwLock;

/// Environment variable the binaries read the credential from
pub const TOKEN_ENV: &str = "NODEDOC_TOKEN";

pub trait CredentialSource: Send + Sync {
    /// Current credential, `None` when signed out
    fn credential(&self) -> Option<String>;
}

/// Normalize a raw credential; blank means absent
pub fn normalize(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Credential held in memory and replaced explicitly
#[derive(Debug, Default)]
pub struct StaticCredential {
    token: RwLock<Option<String>>,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    pub fn revoke(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }
}

impl CredentialSource for StaticCredential {
    fn credential(&self) -> Option<String> {
        let slot = self.token.read().ok()?;
        normalize(slot.as_deref())
    }
}

/// Credential read from an environment variable each time it is asked for
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(TOKEN_ENV)
    }
}

impl CredentialSource for EnvCredential {
    fn credential(&self) -> Option<String> {
        normalize(std::env::var(&self.var).ok().as_deref())
    }
}
