//! In-memory oracle for tests and offline dry runs.
//!
//! `ScriptedOracle` answers each simulation from a closure over the attack and
//! defense hashes decoded from the request URL, and counts every page it hands
//! out so callers can check the resource and concurrency rules.

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::client::{OraclePage, PageContext};
use crate::codec::Token;
use crate::naming::{ComponentName, NameSource};

type Responder = dyn Fn(&str, &str) -> Option<String> + Send + Sync;

/// Failure injection for [`ScriptedOracle`]. Load counts are per page.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubBehavior {
    hanging_loads: usize,
    failing_loads: usize,
    refuse_pages: bool,
    latency: Duration,
}

impl StubBehavior {
    /// The first `n` navigations of every page never complete.
    #[must_use]
    pub const fn hanging_loads(mut self, n: usize) -> Self {
        self.hanging_loads = n;
        self
    }

    /// After any hanging loads, the next `n` navigations of every page fail.
    #[must_use]
    pub const fn failing_loads(mut self, n: usize) -> Self {
        self.failing_loads = n;
        self
    }

    #[must_use]
    pub const fn refusing_pages(mut self) -> Self {
        self.refuse_pages = true;
        self
    }

    /// Delay applied to every navigation and result read.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    navigations: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    failures_captured: AtomicUsize,
    shutdowns: AtomicUsize,
}

/// Snapshot of what a [`ScriptedOracle`] has seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubStats {
    pub navigations: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub peak_in_flight: usize,
    pub failures_captured: usize,
    pub shutdowns: usize,
}

#[derive(Clone)]
pub struct ScriptedOracle {
    responder: Arc<Responder>,
    behavior: StubBehavior,
    counters: Arc<Counters>,
}

impl ScriptedOracle {
    pub fn new(responder: impl Fn(&str, &str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            behavior: StubBehavior::default(),
            counters: Arc::new(Counters::default()),
        }
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: StubBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    #[must_use]
    pub fn stats(&self) -> StubStats {
        let c = &self.counters;
        StubStats {
            navigations: c.navigations.load(Ordering::SeqCst),
            pages_opened: c.pages_opened.load(Ordering::SeqCst),
            pages_closed: c.pages_closed.load(Ordering::SeqCst),
            peak_in_flight: c.peak_in_flight.load(Ordering::SeqCst),
            failures_captured: c.failures_captured.load(Ordering::SeqCst),
            shutdowns: c.shutdowns.load(Ordering::SeqCst),
        }
    }
}

#[async_trait::async_trait]
impl PageContext for ScriptedOracle {
    type Page = ScriptedPage;

    async fn new_page(&self) -> Result<ScriptedPage> {
        if self.behavior.refuse_pages {
            bail!("stub oracle refuses to open pages");
        }
        self.counters.pages_opened.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(ScriptedPage {
            responder: Arc::clone(&self.responder),
            behavior: self.behavior,
            counters: Arc::clone(&self.counters),
            url: None,
            loads: 0,
            closed: false,
        })
    }

    async fn shutdown(&self) -> Result<()> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct ScriptedPage {
    responder: Arc<Responder>,
    behavior: StubBehavior,
    counters: Arc<Counters>,
    url: Option<String>,
    loads: usize,
    closed: bool,
}

#[async_trait::async_trait]
impl OraclePage for ScriptedPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.loads += 1;
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        if !self.behavior.latency.is_zero() {
            tokio::time::sleep(self.behavior.latency).await;
        }
        if self.loads <= self.behavior.hanging_loads {
            std::future::pending::<()>().await;
        }
        if self.loads <= self.behavior.hanging_loads + self.behavior.failing_loads {
            bail!("stub navigation {} failed", self.loads);
        }
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn read_text(
        &mut self,
        _element_id: &str,
        _wait: Duration,
        _poll_interval: Duration,
    ) -> Result<Option<String>> {
        if !self.behavior.latency.is_zero() {
            tokio::time::sleep(self.behavior.latency).await;
        }
        let Some(url) = self.url.as_deref() else {
            bail!("read before navigation");
        };
        let attack = query_param(url, "deck1").unwrap_or_default();
        let defense = query_param(url, "deck2").unwrap_or_default();
        Ok((self.responder)(attack, defense))
    }

    async fn capture_failure(&mut self, _reason: &str) {
        self.counters.failures_captured.fetch_add(1, Ordering::SeqCst);
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Value of `key` in the URL's query string.
#[must_use]
pub fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

/// Name source backed by a fixed table; unknown tokens are lookup errors.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNames {
    names: HashMap<Token, ComponentName>,
    lookups: Arc<AtomicUsize>,
}

impl ScriptedNames {
    #[must_use]
    pub fn with(mut self, token: &str, name: &str, modifier: Option<&str>) -> Self {
        self.names.insert(
            Token::from(token),
            ComponentName {
                name: name.to_string(),
                modifier: modifier.map(str::to_string),
            },
        );
        self
    }

    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NameSource for ScriptedNames {
    async fn lookup(&self, token: &Token) -> Result<ComponentName> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.names.get(token) {
            Some(name) => Ok(name.clone()),
            None => bail!("unknown token {token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_finds_keys_and_skips_flags() {
        let url = "https://sim.test/T.html?deck1=AAA&deck2=BBB&siege&sims=10&autostart";
        assert_eq!(query_param(url, "deck1"), Some("AAA"));
        assert_eq!(query_param(url, "deck2"), Some("BBB"));
        assert_eq!(query_param(url, "siege"), None);
        assert_eq!(query_param("no-query", "deck1"), None);
    }

    #[tokio::test]
    async fn tracks_open_pages() {
        let oracle = ScriptedOracle::new(|_, _| None);
        let mut first = oracle.new_page().await.unwrap();
        let mut second = oracle.new_page().await.unwrap();
        first.close().await.unwrap();
        first.close().await.unwrap();
        second.close().await.unwrap();
        let stats = oracle.stats();
        assert_eq!(stats.peak_in_flight, 2);
        assert_eq!(stats.pages_opened, 2);
        assert_eq!(stats.pages_closed, 2);
    }
}
