use anyhow::{Context, Result};
use deckopt_core::{ComponentName, Token};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::page::WebDriverPage;

const LOOKUP_SCRIPT: &str = r"
const decoded = hash_decode(arguments[0]);
const unit = (decoded && decoded.deck && decoded.deck[0]) || (decoded && decoded.commander);
if (!unit) { return null; }
const card = typeof getCardByID === 'function'
    ? getCardByID(unit.id)
    : (window.CARDS ? window.CARDS[unit.id] : null);
const runeId = unit.runes && unit.runes.length ? unit.runes[0].id : null;
const rune = runeId === null ? null
    : (typeof getRune === 'function' ? getRune(runeId) : (window.RUNES ? window.RUNES[runeId] : null));
return {
    name: card && card.name ? String(card.name) : null,
    modifier: rune && rune.name ? String(rune.name) : null,
};
";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("hash_decode is not available. Is the simulator URL correct?")]
    SimulatorMissing,
    #[error("simulator has no card for {0}")]
    UnknownToken(Token),
}

/// What the lookup script hands back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupReply {
    pub name: Option<String>,
    pub modifier: Option<String>,
}

impl LookupReply {
    pub fn into_name(self, token: &Token) -> Result<ComponentName, BridgeError> {
        match self.name {
            Some(name) if !name.trim().is_empty() => Ok(ComponentName {
                name: name.trim().to_string(),
                modifier: self.modifier.filter(|m| !m.trim().is_empty()),
            }),
            _ => Err(BridgeError::UnknownToken(token.clone())),
        }
    }
}

/// Calls into the simulator's own decoding helpers on a loaded page.
#[derive(Clone, Copy)]
pub struct SimBridge<'a> {
    page: &'a WebDriverPage,
}

impl<'a> SimBridge<'a> {
    pub const fn new(page: &'a WebDriverPage) -> Self {
        Self { page }
    }

    pub async fn ensure_available(&self) -> Result<()> {
        let result = self
            .page
            .execute("return typeof hash_decode === 'function'", vec![])
            .await?;
        if !result.as_bool().unwrap_or(false) {
            return Err(BridgeError::SimulatorMissing.into());
        }
        Ok(())
    }

    pub async fn describe(&self, token: &Token) -> Result<ComponentName> {
        let result = self
            .page
            .execute(LOOKUP_SCRIPT, vec![Value::from(token.as_str())])
            .await
            .with_context(|| format!("running lookup for {token}"))?;
        let reply: LookupReply = if result.is_null() {
            LookupReply::default()
        } else {
            serde_json::from_value(result).context("decoding lookup reply")?
        };
        Ok(reply.into_name(token)?)
    }
}
