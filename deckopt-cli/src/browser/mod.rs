pub mod bridge;
pub mod names;
pub mod page;
pub mod session;

pub use names::BrowserNameSource;
pub use page::WebDriverContext;
pub use session::{BrowserConfig, BrowserKind};
