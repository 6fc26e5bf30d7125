//! Credential resolution: per-session keys layered over process defaults.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use implodesc_core::{DomainError, SessionId};

/// A remote analysis backend that needs a secret.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Selection order when several providers are resolvable.
    pub const PRIORITY: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Format check only; a well-formed key may still be rejected upstream.
    pub fn accepts_key(&self, key: &str) -> bool {
        match self {
            ProviderKind::OpenAi => key.starts_with("sk-") && key.len() > 20,
            ProviderKind::Anthropic => key.len() > 10,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(DomainError::invalid_input(format!("unknown provider: {other}"))),
        }
    }
}

/// Which backends a session could use right now. The deterministic
/// generator is always available.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAvailability {
    pub openai: bool,
    pub anthropic: bool,
    pub mock: bool,
}

/// Resolves provider secrets for a session.
///
/// Lookup order: the session's overlay, then the process-wide default.
/// Secrets never appear in logs.
#[derive(Debug, Default)]
pub struct CredentialResolver {
    defaults: HashMap<ProviderKind, String>,
    overlays: RwLock<HashMap<SessionId, HashMap<ProviderKind, String>>>,
}

impl CredentialResolver {
    /// Blank defaults are treated as absent.
    pub fn new(openai: Option<String>, anthropic: Option<String>) -> Self {
        let defaults = [(ProviderKind::OpenAi, openai), (ProviderKind::Anthropic, anthropic)]
            .into_iter()
            .filter_map(|(kind, key)| {
                let key = key?.trim().to_string();
                (!key.is_empty()).then_some((kind, key))
            })
            .collect();

        Self {
            defaults,
            overlays: RwLock::new(HashMap::new()),
        }
    }

    /// Store validated keys for a session and return the providers accepted.
    ///
    /// Unknown provider names and malformed keys are dropped with a warning.
    /// Blank values are ignored.
    pub fn set_credentials(
        &self,
        session_id: SessionId,
        keys: &HashMap<String, String>,
    ) -> Vec<ProviderKind> {
        let mut accepted: HashMap<ProviderKind, String> = HashMap::new();

        for (name, secret) in keys {
            let secret = secret.trim();
            if secret.is_empty() {
                continue;
            }
            let kind = match name.parse::<ProviderKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    warn!(session_id = %session_id, provider = %name, "ignoring key for unknown provider");
                    continue;
                }
            };
            if !kind.accepts_key(secret) {
                warn!(session_id = %session_id, provider = %kind, "invalid key format");
                continue;
            }
            info!(session_id = %session_id, provider = %kind, "valid key provided");
            accepted.insert(kind, secret.to_string());
        }

        let mut providers: Vec<ProviderKind> = accepted.keys().copied().collect();
        providers.sort();

        if !accepted.is_empty() {
            if let Ok(mut overlays) = self.overlays.write() {
                overlays.entry(session_id).or_default().extend(accepted);
            }
        }

        providers
    }

    pub fn resolve(&self, kind: ProviderKind, session_id: Option<SessionId>) -> Option<String> {
        if let Some(session_id) = session_id {
            let from_session = self
                .overlays
                .read()
                .ok()
                .and_then(|overlays| overlays.get(&session_id)?.get(&kind).cloned());
            if from_session.is_some() {
                debug!(session_id = %session_id, provider = %kind, "using session key");
                return from_session;
            }
        }

        let default = self.defaults.get(&kind).cloned();
        if default.is_some() {
            debug!(provider = %kind, "using process key");
        }
        default
    }

    pub fn available(&self, session_id: Option<SessionId>) -> ProviderAvailability {
        ProviderAvailability {
            openai: self.resolve(ProviderKind::OpenAi, session_id).is_some(),
            anthropic: self.resolve(ProviderKind::Anthropic, session_id).is_some(),
            mock: true,
        }
    }

    pub fn clear_session(&self, session_id: SessionId) {
        if let Ok(mut overlays) = self.overlays.write() {
            if overlays.remove(&session_id).is_some() {
                debug!(session_id = %session_id, "cleared session keys");
            }
        }
    }
}
