use anyhow::Result;
use async_trait::async_trait;
use deckopt_core::{ComponentName, NameSource, OraclePage, PageContext, Token};
use tokio::sync::Mutex;

use super::bridge::SimBridge;
use super::page::{WebDriverContext, WebDriverPage};

/// Resolves card names by asking a loaded simulator page to decode tokens.
///
/// Lookups share one session, opened on first use and kept until shutdown.
pub struct BrowserNameSource {
    context: WebDriverContext,
    sim_url: String,
    page: Mutex<Option<WebDriverPage>>,
}

impl BrowserNameSource {
    pub fn new(context: WebDriverContext, sim_url: impl Into<String>) -> Self {
        Self {
            context,
            sim_url: sim_url.into(),
            page: Mutex::new(None),
        }
    }
}

#[async_trait]
impl NameSource for BrowserNameSource {
    async fn lookup(&self, token: &Token) -> Result<ComponentName> {
        let mut slot = self.page.lock().await;
        if slot.is_none() {
            let mut page = self.context.new_page().await?;
            let ready = match page.goto(&self.sim_url).await {
                Ok(()) => SimBridge::new(&page).ensure_available().await,
                Err(e) => Err(e),
            };
            if let Err(e) = ready {
                let _ = page.close().await;
                return Err(e);
            }
            *slot = Some(page);
        }
        match slot.as_ref() {
            Some(page) => SimBridge::new(page).describe(token).await,
            None => anyhow::bail!("name lookup page unavailable"),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(mut page) = self.page.lock().await.take() {
            page.close().await?;
        }
        Ok(())
    }
}
