//! Single-request simulation client.
//!
//! The client owns the retry and page-lifetime rules; the page backend
//! (WebDriver, or the in-memory stub) only knows how to navigate and read text.

use anyhow::Result;
use std::time::Duration;
use tokio::time::timeout;

use crate::codec::Deck;
use crate::scenario::Scenario;

/// One isolated page. Owned by exactly one simulation task.
#[async_trait::async_trait]
pub trait OraclePage: Send {
    /// Navigate and wait for the page to load.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Poll for the element with id `element_id` for up to `wait`, returning
    /// its text once non-empty. `Ok(None)` means it never appeared.
    async fn read_text(
        &mut self,
        element_id: &str,
        wait: Duration,
        poll_interval: Duration,
    ) -> Result<Option<String>>;

    /// Record diagnostics for a page that produced no result.
    async fn capture_failure(&mut self, _reason: &str) {}

    /// Release the page. Called exactly once per page.
    async fn close(&mut self) -> Result<()>;
}

/// Shared factory for pages; one per optimization run.
#[async_trait::async_trait]
pub trait PageContext: Send + Sync {
    type Page: OraclePage + 'static;

    async fn new_page(&self) -> Result<Self::Page>;

    /// Tear the context down at the end of a run.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Simulator page the scenario query is appended to.
    pub sim_url: String,
    /// Id of the element holding the win-rate text.
    pub result_element: String,
    /// Navigation attempts per simulation.
    pub attempts: u32,
    /// Upper bound on a single navigation.
    pub page_timeout: Duration,
    /// Upper bound on waiting for the result element after a load.
    pub result_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sim_url: "https://vuzaldo.github.io/SIMSpellstone/Titans.html".to_string(),
            result_element: "winrate".to_string(),
            attempts: 3,
            page_timeout: Duration::from_secs(100),
            result_wait: Duration::from_secs(100),
            poll_interval: Duration::from_millis(250),
        }
    }
}

pub struct SimulationClient<C> {
    context: C,
    config: ClientConfig,
}

impl<C: PageContext> SimulationClient<C> {
    pub const fn new(context: C, config: ClientConfig) -> Self {
        Self { context, config }
    }

    #[must_use]
    pub const fn context(&self) -> &C {
        &self.context
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one simulation and return the trimmed result text.
    ///
    /// Every failure mode (no page, navigation exhausted, missing element)
    /// comes back as `None`; nothing is raised to the caller.
    pub async fn simulate(&self, attack: &Deck, defense: &Deck, scenario: &Scenario) -> Option<String> {
        let url = scenario.url(&self.config.sim_url, attack, defense);

        let mut page = match self.context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("could not open a page for {attack} vs {defense}: {e:#}");
                return None;
            }
        };

        let outcome = self.drive(&mut page, &url).await;

        if let Err(e) = page.close().await {
            log::debug!("page close failed for {attack} vs {defense}: {e:#}");
        }

        if outcome.is_none() {
            log::warn!("no result for {attack} vs {defense}");
        }
        outcome
    }

    async fn drive(&self, page: &mut C::Page, url: &str) -> Option<String> {
        if !self.load_with_retry(page, url).await {
            page.capture_failure("page never loaded").await;
            return None;
        }

        let read = page.read_text(
            &self.config.result_element,
            self.config.result_wait,
            self.config.poll_interval,
        );
        // Backends are expected to honour `result_wait`; the outer bound
        // covers ones that hang inside a single poll.
        let bound = self.config.result_wait + self.config.page_timeout;
        match timeout(bound, read).await {
            Ok(Ok(Some(text))) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    page.capture_failure("result element empty").await;
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Ok(Ok(None)) => {
                page.capture_failure("result element missing").await;
                None
            }
            Ok(Err(e)) => {
                log::debug!("reading #{} failed: {e:#}", self.config.result_element);
                page.capture_failure("result element unreadable").await;
                None
            }
            Err(_) => {
                page.capture_failure("result wait timed out").await;
                None
            }
        }
    }

    async fn load_with_retry(&self, page: &mut C::Page, url: &str) -> bool {
        let attempts = self.config.attempts.max(1);
        for attempt in 1..=attempts {
            match timeout(self.config.page_timeout, page.goto(url)).await {
                Ok(Ok(())) => return true,
                Ok(Err(e)) => {
                    log::debug!("load attempt {attempt}/{attempts} failed: {e:#}");
                }
                Err(_) => {
                    log::debug!(
                        "load attempt {attempt}/{attempts} timed out after {:?}",
                        self.config.page_timeout
                    );
                }
            }
        }
        false
    }
}
