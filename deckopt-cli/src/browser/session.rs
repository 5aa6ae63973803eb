use std::time::Duration;
use thirtyfour::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BrowserKind {
    Chrome,
    Edge,
    Firefox,
    Safari,
}

impl BrowserKind {
    #[must_use]
    pub fn label(self) -> String {
        format!("{self:?}").to_lowercase()
    }

    const fn default_hub(self) -> &'static str {
        match self {
            Self::Chrome => "http://localhost:9515",
            Self::Edge => "http://localhost:17556",
            Self::Firefox => "http://localhost:4444",
            Self::Safari => "http://localhost:4445",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub page_load_secs: u64,
    pub remote_hub: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_secs: 100,
            remote_hub: None,
        }
    }
}

impl BrowserConfig {
    #[must_use]
    pub fn hub_url(&self, kind: BrowserKind) -> &str {
        self.remote_hub
            .as_deref()
            .unwrap_or_else(|| kind.default_hub())
    }
}

pub async fn new_session(kind: BrowserKind, cfg: &BrowserConfig) -> WebDriverResult<WebDriver> {
    let url = cfg.hub_url(kind);
    let driver = match kind {
        BrowserKind::Chrome => {
            let mut caps = DesiredCapabilities::chrome();
            if cfg.headless {
                caps.set_headless()?;
            }
            WebDriver::new(url, caps).await?
        }
        BrowserKind::Edge => {
            let mut caps = DesiredCapabilities::edge();
            if cfg.headless {
                caps.set_headless()?;
            }
            WebDriver::new(url, caps).await?
        }
        BrowserKind::Firefox => {
            let mut caps = DesiredCapabilities::firefox();
            if cfg.headless {
                caps.set_headless()?;
            }
            WebDriver::new(url, caps).await?
        }
        BrowserKind::Safari => {
            let caps = DesiredCapabilities::safari();
            WebDriver::new(url, caps).await?
        }
    };

    driver
        .set_page_load_timeout(Duration::from_secs(cfg.page_load_secs))
        .await?;
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_url_defaults_per_browser() {
        let cfg = BrowserConfig::default();
        assert_eq!(cfg.hub_url(BrowserKind::Chrome), "http://localhost:9515");
        assert_eq!(cfg.hub_url(BrowserKind::Firefox), "http://localhost:4444");
    }

    #[test]
    fn remote_hub_overrides_every_browser() {
        let cfg = BrowserConfig {
            remote_hub: Some("http://grid.example:4444".to_string()),
            ..BrowserConfig::default()
        };
        assert_eq!(cfg.hub_url(BrowserKind::Edge), "http://grid.example:4444");
        assert_eq!(cfg.hub_url(BrowserKind::Safari), "http://grid.example:4444");
    }

    #[test]
    fn labels_are_lowercase() {
        assert_eq!(BrowserKind::Firefox.label(), "firefox");
    }
}
