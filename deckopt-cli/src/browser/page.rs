//! WebDriver-backed pages for the simulation client.
//!
//! A single WebDriver session has one active window, so concurrent tabs would
//! fight over it. Each page is therefore its own session, opened from the
//! shared context and quit when the page closes.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use deckopt_core::{OraclePage, PageContext};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thirtyfour::prelude::*;

use super::session::{BrowserConfig, BrowserKind, new_session};
use crate::util::{artifacts_dir, capture_artifacts};

#[derive(Debug, Clone)]
pub struct WebDriverContext {
    kind: BrowserKind,
    cfg: BrowserConfig,
    artifacts: Option<PathBuf>,
    opened: Arc<AtomicUsize>,
}

impl WebDriverContext {
    #[must_use]
    pub fn new(kind: BrowserKind, cfg: BrowserConfig) -> Self {
        Self {
            kind,
            cfg,
            artifacts: None,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Write screenshots and DOM dumps for failed pages under `dir`.
    #[must_use]
    pub fn with_artifacts(mut self, dir: Option<PathBuf>) -> Self {
        self.artifacts = dir;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> BrowserKind {
        self.kind
    }

    /// Pages opened so far through this context.
    #[must_use]
    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageContext for WebDriverContext {
    type Page = WebDriverPage;

    async fn new_page(&self) -> Result<WebDriverPage> {
        let driver = new_session(self.kind, &self.cfg)
            .await
            .with_context(|| format!("starting {} session", self.kind.label()))?;
        let number = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let artifacts = self.artifacts.as_ref().map(|base| {
            PathBuf::from(artifacts_dir(
                &base.to_string_lossy(),
                &self.kind.label(),
                number,
            ))
        });
        Ok(WebDriverPage {
            driver: Some(driver),
            url: None,
            artifacts,
        })
    }
}

pub struct WebDriverPage {
    driver: Option<WebDriver>,
    url: Option<String>,
    artifacts: Option<PathBuf>,
}

impl WebDriverPage {
    fn driver(&self) -> Result<&WebDriver> {
        match self.driver.as_ref() {
            Some(driver) => Ok(driver),
            None => bail!("page already closed"),
        }
    }

    /// Run a script against the loaded page.
    pub async fn execute(&self, script: &str, args: Vec<serde_json::Value>) -> Result<serde_json::Value> {
        let ret = self.driver()?.execute(script, args).await?;
        Ok(ret.json().clone())
    }
}

#[async_trait]
impl OraclePage for WebDriverPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.driver()?
            .goto(url)
            .await
            .with_context(|| format!("navigating to {url}"))?;
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn read_text(
        &mut self,
        element_id: &str,
        wait: Duration,
        poll_interval: Duration,
    ) -> Result<Option<String>> {
        let driver = self.driver()?;
        let deadline = Instant::now() + wait;
        loop {
            if let Some(element) = driver.find_all(By::Id(element_id)).await?.into_iter().next() {
                let text = element.text().await?;
                if !text.trim().is_empty() {
                    return Ok(Some(text));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn capture_failure(&mut self, reason: &str) {
        let (Some(dir), Some(driver)) = (self.artifacts.as_ref(), self.driver.as_ref()) else {
            return;
        };
        let url = self.url.as_deref().unwrap_or("<never loaded>");
        if let Err(e) = capture_artifacts(driver, dir, reason, url).await {
            log::debug!("could not write failure artifacts: {e:#}");
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await?;
        }
        Ok(())
    }
}
