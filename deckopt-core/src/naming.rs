//! Display names for component tokens.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::codec::Token;

/// Human-readable name of a card plus its secondary modifier (rune).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentName {
    pub name: String,
    #[serde(default)]
    pub modifier: Option<String>,
}

impl ComponentName {
    /// Fallback used when a lookup fails.
    #[must_use]
    pub fn raw(token: &Token) -> Self {
        Self {
            name: token.to_string(),
            modifier: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self.modifier.as_deref().map(str::trim) {
            Some(modifier) if !modifier.is_empty() => format!("{} ({modifier})", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Backend that can decode a token into a display name.
#[async_trait::async_trait]
pub trait NameSource: Send + Sync {
    async fn lookup(&self, token: &Token) -> Result<ComponentName>;

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Memoising front for a [`NameSource`]. Never fails: a token that cannot be
/// resolved is labelled with itself.
pub struct NameResolver {
    source: Box<dyn NameSource>,
    cache: Mutex<HashMap<Token, ComponentName>>,
}

impl NameResolver {
    pub fn new(source: impl NameSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, token: &Token) -> ComponentName {
        if let Some(hit) = self.cache.lock().await.get(token) {
            return hit.clone();
        }

        let resolved = match self.source.lookup(token).await {
            Ok(name) if !name.name.trim().is_empty() => name,
            Ok(_) => {
                log::debug!("empty name for {token}, using raw token");
                ComponentName::raw(token)
            }
            Err(e) => {
                log::warn!("name lookup failed for {token}: {e:#}");
                ComponentName::raw(token)
            }
        };

        self.cache
            .lock()
            .await
            .insert(token.clone(), resolved.clone());
        resolved
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.source.shutdown().await {
            log::debug!("name source shutdown failed: {e:#}");
        }
    }
}
